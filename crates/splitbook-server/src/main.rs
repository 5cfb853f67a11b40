//! Splitbook server binary
//!
//! Usage:
//!   splitbook-server --db splitbook.db --port 3000

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use splitbook_core::Database;

#[derive(Parser)]
#[command(name = "splitbook-server", about = "Splitbook bookkeeping API server")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, default_value = "splitbook.db")]
    db: String,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db = Database::new(&cli.db)?;
    splitbook_server::serve(db, &cli.host, cli.port).await
}
