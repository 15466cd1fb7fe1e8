//! EduLang - classroom platform backend
//!
//! Runs the API server, or uploads documents into a class through a running
//! server.

use anyhow::Context;
use clap::{Parser, Subcommand};
use edulang_api::upload::http::{ApiClient, ApiMetadataSink, ApiTargetIssuer, PresignedPut};
use edulang_api::upload::{UploadFile, UploadPipeline};
use edulang_api::{config::Config, server::Server};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// EduLang - classroom platform backend
#[derive(Parser, Debug)]
#[command(name = "edulang")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the API server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Upload files into a class and record them
    Upload {
        /// Base URL of the EduLang API
        #[arg(short, long, default_value = "http://127.0.0.1:8080")]
        server: String,

        /// Session token (as returned by login)
        #[arg(short, long, env = "EDULANG_TOKEN")]
        token: String,

        /// Class the documents belong to
        #[arg(long)]
        class_id: String,

        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Serve { config } => serve(&config).await,
        Command::Upload {
            server,
            token,
            class_id,
            files,
        } => upload(&server, &token, &class_id, &files).await,
    }
}

async fn serve(path: &Path) -> anyhow::Result<()> {
    info!("Starting EduLang API v{}", edulang_api::VERSION);

    let config = Config::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    info!("Loaded configuration from {:?}", path);

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}

async fn upload(
    server: &str,
    token: &str,
    class_id: &str,
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let body = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Not a file name: {}", path.display()))?;
        files.push(UploadFile::new(file_name, &content_type_for(path), body));
    }

    let http = reqwest::Client::new();
    let api = ApiClient::new(http.clone(), server, token);
    let pipeline = UploadPipeline::new(
        ApiTargetIssuer::new(api.clone()),
        PresignedPut::new(http),
        ApiMetadataSink::new(api),
    );

    let records = pipeline.submit(class_id, files).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}

/// MIME type from the file extension
fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
