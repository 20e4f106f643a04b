//! MapStack Server - roadmap and document versioning backend
//!
//! Serves the JSON REST API over HTTP/1.1. Document content lives in a
//! local directory or an S3-compatible bucket; metadata lives in SQLite.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use mapstack_api::{ApiHandler, Config};
use mapstack_core::{open_content_store, Database, Settings};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mapstack")]
#[command(author = "MapStack Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Roadmap and document versioning server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Listen address (e.g., 0.0.0.0:8000); overrides the config file
        #[arg(short, long)]
        addr: Option<String>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Create the database schema and storage root
    Init {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { addr, config, debug } => {
            init_tracing(debug);

            let mut settings = Settings::load(config.as_deref())?;
            if let Some(addr) = addr {
                settings.server.addr = addr;
            }

            info!("Starting MapStack server on {}", settings.server.addr);
            info!("Database: {}", settings.database.path.display());

            let db = Arc::new(
                Database::open(&settings.database.path).context("Failed to open database")?,
            );
            let store = open_content_store(&settings.storage)
                .await
                .context("Failed to open content store")?;
            info!("Content store: {}", store.backend_name());

            let config = Config {
                max_body_size: settings.server.max_body_size,
                debug,
            };
            let handler = Arc::new(ApiHandler::new(config, db, store));

            let addr: SocketAddr = settings
                .server
                .addr
                .parse()
                .with_context(|| format!("Invalid listen address: {}", settings.server.addr))?;
            let listener = TcpListener::bind(addr).await?;
            info!("Server listening on {}", addr);

            loop {
                let (stream, peer) = listener.accept().await?;
                let handler = handler.clone();
                let io = TokioIo::new(stream);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(handler.handle(req).await) }
                    });
                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", peer, e);
                    }
                });
            }
        }

        Commands::Init { config } => {
            init_tracing(false);

            let settings = Settings::load(config.as_deref())?;
            Database::open(&settings.database.path).context("Failed to create database")?;
            let store = open_content_store(&settings.storage)
                .await
                .context("Failed to open content store")?;

            println!("Database ready at {}", settings.database.path.display());
            println!("Content store ready ({})", store.backend_name());
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let env_filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}
