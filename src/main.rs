//! VisionChat - image analysis with a local multimodal model
//!
#![doc = "VisionChat - image analysis with a local multimodal model"]
#![doc = "Main entry point for the VisionChat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use visionchat::cli::{Cli, Commands};
use visionchat::commands;
use visionchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { bind } => {
            if let Some(b) = &bind {
                tracing::debug!("Using bind override: {}", b);
            }
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Analyze {
            image,
            prompt,
            model,
            stream,
        } => {
            tracing::debug!("Analyzing image: {}", image.display());
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            commands::analyze::run_analyze(config, image, prompt, stream).await?;
            Ok(())
        }
        Commands::Chat { image, model } => {
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            commands::chat::run_chat(config, image).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they do not interleave with streamed output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "visionchat=debug"
    } else {
        "visionchat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
