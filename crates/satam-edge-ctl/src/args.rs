//! Command-line surface for `satam-edge-ctl`.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "satam-edge-ctl",
    version,
    about = "Control a running satam-edge",
    long_about = None
)]
pub struct Cli {
    /// Edge base URL, e.g. <http://127.0.0.1:8088>
    #[arg(long, env = "SATAM_EDGE_URL", default_value = "http://127.0.0.1:8088")]
    pub edge: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Ask the worker for its cache version
    Version,
    /// Tell a waiting worker to activate now
    SkipWaiting,
    /// Show worker generations and cache stores
    Status,
}
