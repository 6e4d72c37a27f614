pub mod history;
pub mod orchestrator;

pub use history::SessionHistory;
pub use orchestrator::{CallStrategy, Orchestrator};
