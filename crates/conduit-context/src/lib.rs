//! Conduit Context - per-run conversion state
//!
//! Everything a synchronization run accumulates while converting nodes:
//! - [`IdentityRegistry`]: external id to native objects, per variant
//! - [`GeometricIndex`]: tolerance-based point deduplication
//! - [`NameRegistry`]: case-insensitive unique names
//! - [`HandleAllocator`]: native handle reuse across runs
//! - [`ConversionReport`]: ordered info and error log
//! - [`ExportContext`]: handle-keyed cache for the export direction
//!
//! [`ConversionContext`] bundles the import-side structures and supports
//! checkpoint/rollback around each node so a failed node leaves no trace.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod allocator;
pub mod context;
pub mod error;
pub mod export;
pub mod geometric;
pub mod identity;
pub mod naming;
pub mod report;

pub use allocator::{HandleAllocator, HandleSource};
pub use context::{Checkpoint, ContextSettings, ConversionContext, PointResolution};
pub use error::ContextError;
pub use export::ExportContext;
pub use geometric::{EntryOrigin, GeometricEntry, GeometricIndex, PointMatch, DEFAULT_TOLERANCE};
pub use identity::IdentityRegistry;
pub use naming::NameRegistry;
pub use report::{ConversionReport, ReportEntry, Severity};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
