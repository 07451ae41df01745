//! # Patcher
//!
//! Submits a prepared patch against the target through the resource store.
//! Any rejection by the store surfaces as one failure kind; retrying is left
//! to the resync schedule rather than attempted locally.

use crate::controller::reconciler::store::{ResourceStore, StoreError};
use crate::controller::reconciler::strategy::PreparedPatch;
use crate::crd::ObjectRef;
use thiserror::Error;

/// Failure submitting the patch against the target
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("can not patch target {reference}: {source}")]
    Rejected {
        reference: String,
        #[source]
        source: StoreError,
    },
}

/// Submit the prepared payload as a patch of its declared strategy
pub async fn patch_target(
    store: &dyn ResourceStore,
    target: &ObjectRef,
    prepared: &PreparedPatch,
) -> Result<(), PatchError> {
    store
        .apply_patch(target, prepared)
        .await
        .map_err(|source| PatchError::Rejected {
            reference: target.describe(),
            source,
        })
}
