use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the satam-edge binary.
#[derive(Debug, Default, Parser)]
#[command(
    name = "satam-edge",
    version,
    about = "Offline caching edge for the Satam school portal"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SATAM_EDGE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the caching proxy.
    Serve(Box<ServeArgs>),
    /// Print the stores held in a cache snapshot file.
    Inspect(InspectArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Origin the portal pages are served under.
    #[arg(long = "public-origin", value_name = "URL")]
    pub public_origin: Option<String>,

    /// Base URL of the portal backend.
    #[arg(long = "upstream-url", value_name = "URL")]
    pub upstream_url: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub upstream_timeout_seconds: Option<u64>,

    /// Override the cache snapshot file.
    #[arg(long = "cache-snapshot-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub cache_snapshot_path: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct InspectArgs {
    /// Snapshot file to read; defaults to `cache.snapshot_path`.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}
