//! Conduit Engine - interchange-to-native synchronization
//!
//! One run moves through a fixed sequence of phases:
//!
//! ```text
//! Idle -> Walking -> Scheduling -> Converting -> Reconciling -> Applying -> Done
//! ```
//!
//! with `Cancelled` and `Failed` as the other terminal phases. The
//! [`SyncDriver`] owns that sequence; schema knowledge lives behind
//! [`SchemaMapper`] and the native application behind [`NativeAdapter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_engine::prelude::*;
//!
//! let driver = SyncDriver::new(EngineConfig::default());
//! let outcome = driver.run(&graph, &previous, &mapper, &mut adapter)?;
//! store.save(&outcome.persisted)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod adapter;
pub mod cancel;
pub mod config;
pub mod driver;
pub mod error;
pub mod mapper;
pub mod reconcile;
pub mod scheduler;
pub mod state_machine;
pub mod store;
pub mod summary;
pub mod walker;

pub use adapter::{ExistingPoint, NativeAdapter, SharedAdapter};
pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use driver::{SyncDriver, SYNTHETIC_ID_PREFIX};
pub use error::{AdapterError, ConfigError, StateMachineError, StoreError, SyncError, SyncFailure};
pub use mapper::SchemaMapper;
pub use reconcile::{reconcile, DeleteInstruction};
pub use state_machine::{allowed_transitions, validate_transition, PhaseTracker, SyncPhase};
pub use store::{JsonFileStore, MemoryStore, PlaceholderStore};
pub use summary::{ApplyStats, ExportOutcome, SyncOutcome, SyncSummary};
pub use walker::{flatten, Flattened};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        AdapterError, CancelToken, EngineConfig, NativeAdapter, PlaceholderStore, SchemaMapper,
        SyncDriver, SyncError, SyncFailure, SyncOutcome, SyncPhase,
    };
    pub use conduit_context::{ConversionContext, ConversionReport, ExportContext};
    pub use conduit_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
