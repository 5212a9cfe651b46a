//! # nova-occi Core
//!
//! OCCI entity model, category registry and backend dispatch, plus the
//! lifecycle backends that drive the compute, network and image services.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                   Dispatcher                   │
//! │  create │ retrieve │ update │ replace │ delete │ action
//! └───────────────────────┬────────────────────────┘
//!                         │ mixin backends, then kind backend
//!                         ▼
//! ┌────────────────────────────────────────────────┐
//! │                    Registry                    │
//! │  entities · categories → backends · id locks   │
//! └───────────────────────┬────────────────────────┘
//!                         ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ Compute  │ │ Network  │ │ Storage  │ │  Links   │
//! └────┬─────┘ └──────────┘ └──────────┘ └──────────┘
//!      ▼
//!  ComputeApi · NetworkApi · ImageService
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use occi_core::{catalog, Dispatcher, Entity, Extras, Registry};
//! use occi_nova::{MockCloud, NovaContext};
//!
//! #[tokio::main]
//! async fn main() -> occi_core::Result<()> {
//!     let registry = Arc::new(Registry::new());
//!     catalog::register_infrastructure(&registry, Default::default())?;
//!
//!     let extras = Extras::from_cloud(NovaContext::new("demo", "demo"), registry.clone(), Arc::new(MockCloud::new()));
//!     catalog::register_templates(&registry, &extras).await?;
//!
//!     let dispatcher = Dispatcher::new(registry);
//!     let vm = dispatcher.retrieve("/compute/1234", &extras).await?;
//!     println!("{:?}", vm.attr("occi.compute.state"));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod catalog;
pub mod category;
pub mod dispatch;
pub mod error;
pub mod extensions;
pub mod infrastructure;
pub mod model;
pub mod registry;
pub mod state;

pub use backend::{Backend, Extras};
pub use category::{Action, Category, CategoryId, Kind, Mixin, MixinChange, MixinRole};
pub use dispatch::Dispatcher;
pub use error::{OcciError, Result};
pub use model::{Attributes, Entity, EntityBody};
pub use registry::{IdentifierPolicy, KeepIdentifier, Registry};
pub use state::{ComputeState, Lifecycle, LinkState, NetworkState, Observed, StorageState};
