//! CLI argument parsing for the dashboard binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Kaspa pool web dashboard", long_about = None)]
pub struct Args {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to the TOML configuration file (optional, defaults apply when missing)",
        default_value = "config/web-dashboard.toml"
    )]
    pub config_path: PathBuf,
    #[arg(
        short = 'l',
        long = "listen",
        help = "Address the HTTP server binds to, overriding the config file"
    )]
    pub listen_address: Option<String>,
    #[arg(
        short = 'p',
        long = "prometheus-url",
        help = "Base URL of the Prometheus query API, overriding the config file"
    )]
    pub prometheus_url: Option<String>,
    #[arg(
        short = 'f',
        long = "log-file",
        help = "Path to the log file. If not set, logs will only be written to stdout."
    )]
    pub log_file: Option<PathBuf>,
}
