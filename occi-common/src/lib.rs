//! # nova-occi Common
//!
//! Shared utilities for the nova-occi components.
//!
//! ## Logging
//!
//! ```no_run
//! use occi_common::init_logging;
//!
//! init_logging("info").unwrap();
//! tracing::info!(entity_id = "/compute/42", "Compute resource created");
//! ```

pub mod logging;

pub use logging::{
    init_logging,
    init_logging_json,
    init_logging_with_format,
    LogFormat,
};
