//! Configuration management for VisionChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, VisionChatError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Main configuration structure for VisionChat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model backend configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// HTTP streaming surface configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Interactive session configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model used when a request does not name one
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Per-request timeout enforced by the HTTP transport (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llava".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed by the CORS layer
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted multipart body size (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024 // 20 MiB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Interactive session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prompt pre-filled when a session starts
    #[serde(default = "default_prompt")]
    pub default_prompt: String,
}

fn default_prompt() -> String {
    "Describe in detail the contents of this image.".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_prompt: default_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VisionChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| VisionChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(host) = std::env::var("VISIONCHAT_OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }

        if let Ok(model) = std::env::var("VISIONCHAT_OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }

        if let Ok(timeout) = std::env::var("VISIONCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.ollama.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid VISIONCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(bind) = std::env::var("VISIONCHAT_BIND") {
            self.server.bind = bind;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        match &cli.command {
            crate::cli::Commands::Serve {
                bind: Some(bind), ..
            } => {
                tracing::debug!("CLI override: server.bind = {}", bind);
                self.server.bind = bind.clone();
            }
            crate::cli::Commands::Analyze {
                model: Some(model), ..
            }
            | crate::cli::Commands::Chat {
                model: Some(model), ..
            } => {
                tracing::debug!("CLI override: provider.ollama.model = {}", model);
                self.provider.ollama.model = model.clone();
            }
            _ => {}
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let ollama = &self.provider.ollama;

        if ollama.host.trim().is_empty() {
            return Err(
                VisionChatError::Config("provider.ollama.host cannot be empty".to_string()).into(),
            );
        }

        if let Err(e) = url::Url::parse(&ollama.host) {
            return Err(VisionChatError::Config(format!(
                "provider.ollama.host is not a valid URL ({}): {}",
                ollama.host, e
            ))
            .into());
        }

        if ollama.model.trim().is_empty() {
            return Err(
                VisionChatError::Config("provider.ollama.model cannot be empty".to_string()).into(),
            );
        }

        if ollama.timeout_seconds == 0 {
            return Err(VisionChatError::Config(
                "provider.ollama.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(VisionChatError::Config(format!(
                "server.bind is not a valid socket address: {}",
                self.server.bind
            ))
            .into());
        }

        if self.server.max_upload_bytes == 0 {
            return Err(VisionChatError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
