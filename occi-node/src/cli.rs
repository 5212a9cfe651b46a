//! Command-line argument parsing.

use clap::Parser;

/// nova-occi Node - OCCI front for the Nova compute, network and image services
#[derive(Parser, Debug, Default)]
#[command(name = "occi-node")]
#[command(about = "nova-occi Node - OCCI front for the Nova compute, network and image services")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long, env = "OCCI_NODE_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log output format (pretty, json)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Identifier of the network every compute resource is linked to
    #[arg(long)]
    pub default_network: Option<String>,

    /// Seconds before a deleted instance is reclaimed (0 deletes immediately)
    #[arg(long)]
    pub reclaim_interval: Option<u64>,

    /// Print the registered categories as JSON and exit
    #[arg(long)]
    pub dump_categories: bool,
}
