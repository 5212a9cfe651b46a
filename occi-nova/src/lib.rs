//! # nova-occi Services
//!
//! Contracts for the compute, network and image services that the OCCI
//! backends call into, plus an in-memory implementation of all three.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐ ┌────────────────┐ ┌────────────────┐
//! │   ComputeApi   │ │   NetworkApi   │ │  ImageService  │
//! └───────┬────────┘ └───────┬────────┘ └───────┬────────┘
//!         └──────────────────┼──────────────────┘
//!                            ▼
//!                  ┌───────────────────┐
//!                  │     MockCloud     │
//!                  │    (in memory)    │
//!                  └───────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use occi_nova::{ComputeApi, CreateRequest, MockCloud, NovaContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cloud = MockCloud::new();
//!     let ctx = NovaContext::new("demo", "demo");
//!
//!     let instance = cloud
//!         .create(&ctx, CreateRequest::new("m1.small", "img-cirros"))
//!         .await
//!         .unwrap();
//!     cloud.pause(&ctx, &instance.uuid).await.unwrap();
//! }
//! ```

pub mod error;
pub mod traits;
pub mod types;
pub mod mock;

pub use error::NovaError;
pub use traits::{ComputeApi, ImageService, NetworkApi};
pub use types::*;
pub use mock::MockCloud;
