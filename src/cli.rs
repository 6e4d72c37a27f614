use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::handlers::CallStrategy;

#[derive(Parser)]
#[command(name = "dish-vqa")]
#[command(about = "Estimate a dish's name and calories from a photo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Relay base URL (overrides VQA_RELAY_URL)
    #[arg(long, global = true)]
    pub relay_url: Option<String>,

    /// How the two questions are sent (overrides VQA_CALL_STRATEGY)
    #[arg(long, global = true)]
    pub strategy: Option<CallStrategy>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the POST /api/vqa relay in front of the hosted model
    #[cfg(feature = "relay-server")]
    Serve {
        /// Listen address (overrides RELAY_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Analyze one or more photos and print the results
    Analyze {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print JSON instead of the result panel
        #[arg(long)]
        json: bool,
    },

    /// Interactive session with history
    Session,
}

impl Commands {
    /// True for the relay, which needs a multi-threaded runtime.
    pub fn is_server(&self) -> bool {
        match self {
            #[cfg(feature = "relay-server")]
            Commands::Serve { .. } => true,
            Commands::Analyze { .. } | Commands::Session => false,
        }
    }
}
