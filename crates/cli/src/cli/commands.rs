use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bucketwatch",
    version,
    about = "S3-compatible bucket browser and change-notification service"
)]
pub struct CliArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Verbose output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API and the bucket change poller
    Serve(ServeArgs),

    /// Check connectivity to the configured S3 endpoint
    Health(HealthArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Directory holding the runtime configuration files
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Seconds between bucket polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Run the API without the background poller
    #[arg(long)]
    pub no_poller: bool,
}

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Directory holding the runtime configuration files
    #[arg(long)]
    pub config_dir: Option<PathBuf>,
}
