//! VisionChat - image analysis with a locally hosted multimodal model
//!
//! This library submits an image plus a prompt to a local chat-completion
//! backend (Ollama) and delivers the generated text either incrementally
//! over HTTP or as a complete result inside an interactive session that
//! keeps a history of past analyses.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `analysis`: request assembly plus streaming and synchronous delivery
//! - `history`: append-only record of completed analyses
//! - `session`: at-most-one in-flight guard and the interactive session model
//! - `providers`: backend abstraction and the Ollama implementation
//! - `server`: HTTP streaming endpoint
//! - `preview`: image inspection for the selected file
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use visionchat::analysis::{RequestBuilder, SynchronousDelivery};
//! use visionchat::providers::create_provider;
//! use visionchat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider)?;
//!     let request = RequestBuilder::new(config.provider.ollama.model.clone())
//!         .build("What is in this picture?", std::fs::read("cat.png")?, None)?;
//!     let result = SynchronousDelivery::new(provider).run(request).await;
//!     println!("{}", result.response);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod preview;
pub mod providers;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use analysis::{AnalysisRequest, AnalysisResult, RequestBuilder};
pub use config::Config;
pub use error::{Result, VisionChatError};
pub use history::{HistoryEntry, HistoryStore};
pub use session::{SessionGuard, SessionState};

#[cfg(test)]
pub mod test_utils;
