//! # Reconciler
//!
//! Core reconciliation logic for `Patch` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Fetch the latest `Patch` from the cluster
//! 2. Handle deletion (drop the finalizer) or ensure the finalizer
//! 3. Compute the resync schedule from `spec.resyncInterval`
//! 4. Resolve the target and source objects
//! 5. Render the template against them
//! 6. Validate the patch strategy and convert the rendered text
//! 7. Submit the patch against the target
//! 8. Persist the accumulated status conditions

pub mod patcher;
pub mod reconcile;
pub mod render;
pub mod resolve;
pub mod status;
pub mod store;
pub mod strategy;
pub mod types;
pub mod validation;

// Re-export public API
pub use reconcile::reconcile;
pub use types::{Reconciler, ReconcilerError};
