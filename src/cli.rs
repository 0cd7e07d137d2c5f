//! Command-line interface definition for VisionChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for the HTTP streaming server, one-shot analysis,
//! and the interactive session.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VisionChat - analyze images with a local multimodal model
#[derive(Parser, Debug, Clone)]
#[command(name = "visionchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for VisionChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the streaming analysis endpoint over HTTP
    Serve {
        /// Override the bind address from config (e.g. 127.0.0.1:8000)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Analyze a single image and print the result
    Analyze {
        /// Path to the image file
        #[arg(short, long)]
        image: PathBuf,

        /// Prompt sent with the image (defaults to the session prompt from config)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Print fragments as the model produces them
        #[arg(long)]
        stream: bool,
    },

    /// Start an interactive analysis session with history
    Chat {
        /// Image to select when the session starts
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Chat {
                image: None,
                model: None,
            },
        }
    }
}
