//! Depot command-line uploader

mod commands;
mod discovery;
mod format;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{BatchCommand, Context};

#[derive(Parser)]
#[command(name = "depot")]
#[command(version)]
#[command(about = "Upload files to the configured storage backend", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "config.yaml", env = "DEPOT_CONFIG_FILE")]
    config: PathBuf,

    /// Override `upload.oss.provider` (aliyun, tencent, huawei, aws, qcloud)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a single file
    Upload {
        /// File to upload
        file: PathBuf,
        /// Print key, size and MIME type
        #[arg(short, long)]
        verbose: bool,
    },
    /// Delete an object by key
    Delete {
        /// Object key
        key: String,
    },
    /// Print the public URL of a key
    Url {
        /// Object key
        key: String,
        /// Print the key alongside the URL
        #[arg(short, long)]
        verbose: bool,
    },
    /// Upload every matching file in a directory
    Batch(BatchCommand),
    /// Interactive session over one uploader
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depot=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = Context::new(cli.config, cli.provider);

    match cli.command {
        Commands::Upload { file, verbose } => commands::upload(&ctx, &file, verbose).await,
        Commands::Delete { key } => commands::delete(&ctx, &key).await,
        Commands::Url { key, verbose } => commands::url(&ctx, &key, verbose),
        Commands::Batch(cmd) => cmd.execute(&ctx).await,
        Commands::Shell => commands::shell(&ctx).await,
    }
}
