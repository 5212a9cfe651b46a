//! # nova-occi Node
//!
//! Wires the OCCI registry and lifecycle backends to the Nova compute,
//! network and image services, registers the resource and OS templates,
//! and creates the default network.
//!
//! ## Usage
//! ```bash
//! occi-node --config /etc/nova-occi/node.yaml
//! occi-node --dump-categories
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod app;
mod cli;
mod config;
mod policy;

use app::Node;
use cli::Args;
use config::Config;

const DEFAULT_CONFIG_PATH: &str = "/etc/nova-occi/node.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration comes first so the log settings can live in it
    let (config, source) = match &args.config {
        Some(path) => (Config::load(path)?, path.as_str()),
        None => match Config::load(DEFAULT_CONFIG_PATH) {
            Ok(cfg) => (cfg, DEFAULT_CONFIG_PATH),
            Err(_) => (Config::default(), "defaults"),
        },
    };
    let config = config.with_cli_overrides(&args);
    config.validate()?;

    occi_common::init_logging_with_format(&config.logging.level, config.log_format())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %source,
        "Starting nova-occi node"
    );

    let node = match Node::bootstrap(&config).await {
        Ok(node) => node,
        Err(e) => {
            error!(error = %e, "Bootstrap failed");
            return Err(e);
        }
    };

    if args.dump_categories {
        println!("{}", node.dump_categories()?);
        return Ok(());
    }

    info!(
        default_network = %config.service.default_network,
        reclaim_interval_secs = config.service.reclaim_instance_interval_secs,
        "Node ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    node.dispatcher.registry().log_summary()?;
    Ok(())
}
