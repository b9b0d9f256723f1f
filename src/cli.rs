//! Command-line interface definitions and argument parsing

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

/// Port used when none is given or the given one is invalid.
pub const DEFAULT_PORT: u16 = 8080;

/// Quality-Threshold clustering server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TCP port to listen on (falls back to 8080 if missing, invalid or 0)
    pub port: Option<String>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Directory holding `<table>.csv` files
    #[arg(short, long, env = "QT_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Base directory for relative result file paths
    #[arg(short, long, env = "QT_RESULTS_DIR", default_value = ".")]
    pub results_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Port to listen on.
    ///
    /// A value that is not a valid port, or `0`, logs a warning and yields [`DEFAULT_PORT`].
    pub fn resolve_port(&self) -> u16 {
        match self.port.as_deref().map(str::trim) {
            None => DEFAULT_PORT,
            Some(raw) => match raw.parse::<u16>() {
                Ok(0) => {
                    warn!("Port 0 is not allowed, using default port {}", DEFAULT_PORT);
                    DEFAULT_PORT
                }
                Ok(port) => port,
                Err(_) => {
                    warn!(
                        "Invalid port argument '{}', using default port {}",
                        raw, DEFAULT_PORT
                    );
                    DEFAULT_PORT
                }
            },
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.resolve_port())
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
