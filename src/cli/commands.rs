//! CLI commands

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::AppState;
use crate::db::{AssetRepository, AssetStatus, AssetType, ConversationRepository, Database};
use crate::server::HubServer;

#[derive(Parser)]
#[command(name = "gbstudio-hub")]
#[command(about = "Asset hub orchestrating Ollama and ComfyUI for GB Studio projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.gbstudio-hub/config.yml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Database path, overrides the config file
    #[arg(long, global = true)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        /// Port number, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// List generated assets
    Assets {
        /// Filter by status (generated, approved, integrated)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show recent conversations
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Approve an asset and move it into the project
    Approve {
        /// Asset ID
        asset_id: i64,

        /// Expected asset type
        #[arg(long)]
        asset_type: Option<String>,
    },

    /// Register approved assets, build the ROM and launch the emulator
    Integrate,

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    if let Commands::Config { action } = &cli.command {
        return run_config(action, &config, cli.config.as_deref());
    }

    let db = Database::new(config.resolve_db_path()?)?;

    // Create a multi-threaded runtime for CLI operations
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        match cli.command {
            Commands::Serve { port } => {
                let port = port.unwrap_or(config.server.port);
                tracing::info!("Starting GB Studio Hub on port {}", port);

                let state = Arc::new(AppState::from_config(&config, db)?);
                let server = HubServer::new(config.server.host.clone(), port, state);
                server.run().await?;

                Ok(())
            }

            Commands::Assets { status } => {
                let status = status.map(|s| AssetStatus::from_str(&s)).transpose()?;
                let assets = AssetRepository::new(db).list(status).await?;

                if assets.is_empty() {
                    println!("No assets found");
                } else {
                    for asset in assets {
                        println!(
                            "[{}] {} - {} ({}) - {}",
                            asset.id,
                            asset.task_name,
                            asset.asset_type.as_str(),
                            asset.status.as_str(),
                            asset.source_path.as_deref().unwrap_or("-")
                        );
                    }
                }
                Ok(())
            }

            Commands::History { limit } => {
                let entries = ConversationRepository::new(db).recent(limit).await?;

                if entries.is_empty() {
                    println!("No conversation history found");
                } else {
                    for entry in entries {
                        println!(
                            "[{}] {}\n  User: {}\n  Agent: {}",
                            entry.id,
                            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            entry.user_message,
                            entry.agent_response
                        );
                    }
                }
                Ok(())
            }

            Commands::Approve {
                asset_id,
                asset_type,
            } => {
                let asset_type = asset_type.map(|t| AssetType::from_str(&t)).transpose()?;
                let state = AppState::from_config(&config, db)?;
                let asset = state.integrator.approve(asset_id, asset_type).await?;

                println!(
                    "Approved asset {} ({}) into {}",
                    asset.id,
                    asset.task_name,
                    asset.asset_type.project_subfolder().unwrap_or("-")
                );
                Ok(())
            }

            Commands::Integrate => {
                let state = AppState::from_config(&config, db)?;
                let report = state.integrator.integrate_and_playtest().await?;

                println!("Integrated {} assets", report.moved_assets.len());
                for name in &report.moved_assets {
                    println!("  - {}", name);
                }
                println!("ROM: {}", report.rom_path.display());
                Ok(())
            }

            Commands::Config { .. } => Ok(()),
        }
    })
}

fn run_config(action: &ConfigAction, config: &Config, path: Option<&str>) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let target = Config::config_path(path)?;
            if target.exists() && !*force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    target.display()
                );
            }
            let written = Config::default().save(path)?;
            println!("Wrote config to {}", written.display());
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", serde_yaml::to_string(config)?);
            Ok(())
        }
    }
}
