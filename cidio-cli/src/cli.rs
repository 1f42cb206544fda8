use std::path::PathBuf;

use cidio_engine::ProxyType;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cidio", version, about = "Content-addressed asset delivery tool")]
pub struct CliArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory backing the persistent asset cache
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// File holding the user gateway list
    #[arg(long, global = true)]
    pub gateways_file: Option<PathBuf>,

    /// Endpoint advertising system gateways
    #[arg(long, global = true)]
    pub config_endpoint: Option<String>,

    /// Hostname to intercept and cache assets from (repeatable)
    #[arg(long = "host", global = true)]
    pub hosts: Vec<String>,

    /// Proxy URL for outbound requests
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Proxy type used with --proxy
    #[arg(long, value_enum, default_value = "all", global = true)]
    pub proxy_type: ProxyType,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the user gateway list
    Gateway {
        #[command(subcommand)]
        action: GatewayAction,
    },
    /// Resolve a CID to a working gateway URL
    Resolve {
        cid: String,

        /// Per-candidate probe timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Fetch a URL through the cache worker
    Fetch {
        url: String,

        /// Write the body to this file instead of discarding it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect and manage the asset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum GatewayAction {
    /// Add a gateway (an absolute URL ending in /ipfs/)
    Add { url: String },
    /// Remove a gateway from the user list
    Remove { url: String },
    /// List gateways in priority order
    List {
        /// Include system gateways in the listing
        #[arg(long)]
        all: bool,
    },
    /// Remove all user gateways
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List cached entries
    List,
    /// Show aggregate statistics
    Stats,
    /// Delete one entry by URL
    Delete { url: String },
    /// Drop the entire cache
    Clear,
    /// Audit total size against the ceiling, evicting oldest entries when
    /// over budget
    Audit,
    /// Show worker version and interception configuration
    Status,
}
