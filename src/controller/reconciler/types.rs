//! # Types
//!
//! Core types for the reconciler.

use crate::controller::reconciler::patcher::PatchError;
use crate::controller::reconciler::render::{self, RenderError};
use crate::controller::reconciler::resolve::ResolveError;
use crate::controller::reconciler::store::{KubeStore, ResourceStore, StoreError};
use crate::controller::reconciler::strategy::StrategyError;
use kube::Client;
use std::sync::Arc;
use tera::Tera;
use thiserror::Error;

/// Failure of a reconciliation pass, returned to the controller runtime so
/// `error_policy` can decide the requeue. Every variant is also reflected in
/// the resource's status conditions before the pass returns.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Shared reconciler context handed to every pass
#[derive(Clone)]
pub struct Reconciler {
    /// Cluster access, behind a trait so tests can swap in a fake store
    pub store: Arc<dyn ResourceStore>,
    /// Template environment with the helper registry. Built once at startup
    /// and never mutated afterwards; render calls clone it per template.
    pub template_env: Tera,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Reconciler backed by the cluster the client points at
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_store(Arc::new(KubeStore::new(client)))
    }

    /// Reconciler over an arbitrary store implementation (used by tests)
    #[must_use]
    pub fn with_store(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            template_env: render::template_env(),
        }
    }
}
