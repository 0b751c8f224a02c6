//! Reconciliation engine
//!
//! Compares the previous run's placeholders against the current run's and
//! emits one delete per handle of every id that vanished. Ids present in
//! both sets yield nothing.

use conduit_model::{ExternalId, NativeHandle, PlaceholderSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remove one native object left behind by a vanished id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInstruction {
    pub external_id: ExternalId,
    pub handle: NativeHandle,
}

impl fmt::Display for DeleteInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete {} ({})", self.handle, self.external_id)
    }
}

/// Delete instructions for ids in `previous` but not in `current`
///
/// Handles that some current placeholder still owns are never deleted.
/// Output follows the order of `previous`.
#[must_use]
pub fn reconcile(previous: &PlaceholderSet, current: &PlaceholderSet) -> Vec<DeleteInstruction> {
    previous
        .iter()
        .filter(|p| !current.contains(&p.external_id))
        .flat_map(|p| {
            p.native_handles
                .iter()
                .filter(move |h| !current.owns_handle(h))
                .map(move |handle| DeleteInstruction {
                    external_id: p.external_id.clone(),
                    handle: handle.clone(),
                })
        })
        .collect()
}
