//! qtserver: Quality-Threshold clustering over TCP
//!
//! Parses the command line, installs logging, and runs the accept loop until the
//! process is stopped.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use qtserver::{Args, CsvTableSource, QtServer, SessionContext};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    fmt().with_writer(io::stderr).with_env_filter(filter).init();

    let addr = args.bind_addr();
    info!(
        "Starting qtserver {} (data dir {:?}, results dir {:?})",
        env!("CARGO_PKG_VERSION"),
        args.data_dir,
        args.results_dir
    );

    let source = Arc::new(CsvTableSource::new(&args.data_dir));
    let context = SessionContext::new(source, &args.results_dir);
    let server = QtServer::bind(addr, context)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    server.run().await?;
    Ok(())
}
