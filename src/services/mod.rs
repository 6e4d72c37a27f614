pub mod image;
pub mod parser;
pub mod upstream; // Hosted VQA model (Hugging Face inference API)
pub mod vqa; // Relay client

pub use image::ImageEncoding;
pub use upstream::{HuggingFaceVqa, VqaModel};
pub use vqa::{RelayVqaClient, VqaClient};
