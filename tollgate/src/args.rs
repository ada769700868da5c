use std::path::PathBuf;

use clap::Parser;

/// Tollgate AI usage governor
#[derive(Debug, Parser)]
#[command(name = "tollgate", about = "Budget, cache and tier governance in front of a paid model backend")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tollgate.toml", env = "TOLLGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "TOLLGATE_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,

    /// Log filter directives (`RUST_LOG` syntax)
    #[arg(long, default_value = "info", env = "TOLLGATE_LOG")]
    pub log: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "TOLLGATE_JSON_LOGS")]
    pub json_logs: bool,
}
