//! Testing utilities for the Conduit workspace
//!
//! Shared adapter, mapper and fixtures for the engine tests.

#![allow(missing_docs)]

pub mod adapter;
pub mod fixtures;
pub mod mapper;

pub use adapter::{AdapterCalls, MemoryAdapter};
pub use mapper::TableMapper;

use conduit_engine::{EngineConfig, SyncDriver};
use conduit_model::{NativeHandle, PlaceholderSet};

/// Driver with default configuration
#[must_use]
pub fn driver() -> SyncDriver {
    SyncDriver::new(EngineConfig::default())
}

/// Handles recorded for `id`, as strings
#[must_use]
pub fn handles_of(placeholders: &PlaceholderSet, id: &str) -> Vec<String> {
    placeholders
        .handles(&id.into())
        .iter()
        .map(NativeHandle::to_string)
        .collect()
}
