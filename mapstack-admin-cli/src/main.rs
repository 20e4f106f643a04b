//! MapStack Administration CLI

mod seed;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mapstack_core::{
    open_content_store, Catalog, Database, DocumentRevisionManager, RoadmapVersioner, Settings,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "mapstack-admin")]
#[command(author = "MapStack Contributors")]
#[command(version = "0.1.0")]
#[command(about = "MapStack database and content administration tool")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database schema and storage root
    Init,

    /// Insert sample categories, a roadmap and documents
    Seed,

    /// Inspect documents and their revisions
    Documents {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Inspect roadmap versions
    Roadmaps {
        #[command(subcommand)]
        command: RoadmapCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DocumentCommands {
    /// List all documents
    List,

    /// Print a document's content (latest unless --version is given)
    Show {
        id: Uuid,
        #[arg(short, long)]
        version: Option<String>,
    },

    /// List a document's revisions, newest first
    History { id: Uuid },

    /// Section diff between two versions
    Diff { id: Uuid, from: String, to: String },
}

#[derive(Subcommand, Debug)]
enum RoadmapCommands {
    /// List all versions of a theme's roadmap
    Versions { theme_id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = Settings::load(cli.config.as_deref())?;
    let db = Arc::new(Database::open(&settings.database.path)?);
    let store = open_content_store(&settings.storage).await?;

    match cli.command {
        Commands::Init => {
            println!("Database ready at {}", settings.database.path.display());
            println!("Content store ready ({})", store.backend_name());
        }

        Commands::Seed => {
            let catalog = Catalog::new(db.clone());
            let roadmaps = RoadmapVersioner::new(db.clone());
            let documents = DocumentRevisionManager::new(db, store);
            let summary = seed::run(&catalog, &roadmaps, &documents).await?;
            print_json(&summary)?;
        }

        Commands::Documents { command } => {
            let documents = DocumentRevisionManager::new(db, store);
            match command {
                DocumentCommands::List => print_json(&documents.list_documents().await?)?,
                DocumentCommands::Show { id, version } => {
                    let (revision, content) = match version {
                        Some(version) => documents.get_content_at(id, &version).await?,
                        None => documents.get_latest_content(id).await?,
                    };
                    print_json(&serde_json::json!({
                        "revision": revision,
                        "content": content,
                    }))?;
                }
                DocumentCommands::History { id } => print_json(&documents.list_revisions(id).await?)?,
                DocumentCommands::Diff { id, from, to } => {
                    print_json(&documents.compute_diff(id, &from, &to).await?)?
                }
            }
        }

        Commands::Roadmaps { command } => {
            let roadmaps = RoadmapVersioner::new(db);
            match command {
                RoadmapCommands::Versions { theme_id } => {
                    print_json(&roadmaps.list_versions(theme_id).await?)?
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_filter(debug: bool) -> tracing_subscriber::EnvFilter {
    if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    }
}

/// Logs go to stderr so stdout stays pure JSON
fn init_tracing(debug: bool) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(debug))
        .init();
}
