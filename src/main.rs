//! GB Studio Hub - asset pipeline orchestrating Ollama and ComfyUI for GB Studio projects

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gbstudio_hub::cli;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gbstudio_hub=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GB Studio Hub v{}", env!("CARGO_PKG_VERSION"));

    cli::run()?;

    Ok(())
}
