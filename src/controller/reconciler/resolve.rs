//! # Resource Resolver
//!
//! Fetches the target and source objects referenced by a `Patch` spec into
//! the ordered list the template renders against: target first, then the
//! sources in declared order. Resolution is read-only and fail-fast; the
//! first missing or inaccessible object aborts the whole batch, keeping
//! which category failed so the caller can set the matching condition.

use crate::controller::reconciler::store::{ResourceStore, StoreError};
use crate::crd::{ObjectRef, PatchSpec};
use serde_json::Value;
use thiserror::Error;

/// Failure while resolving referenced objects, split by category
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("can not resolve target {reference}: {source}")]
    Target {
        reference: String,
        #[source]
        source: StoreError,
    },
    #[error("can not resolve source {reference}: {source}")]
    Source {
        reference: String,
        #[source]
        source: StoreError,
    },
}

/// Resolve every source reference, in declared order
pub async fn resolve_sources(
    store: &dyn ResourceStore,
    spec: &PatchSpec,
) -> Result<Vec<Value>, ResolveError> {
    let mut sources = Vec::with_capacity(spec.sources.len());
    for reference in &spec.sources {
        sources.push(fetch(store, reference, Category::Source).await?);
    }
    Ok(sources)
}

/// Resolve the target reference
pub async fn resolve_target(
    store: &dyn ResourceStore,
    spec: &PatchSpec,
) -> Result<Value, ResolveError> {
    fetch(store, &spec.target, Category::Target).await
}

/// Resolve everything the template renders against: target first, then the
/// sources in declared order.
pub async fn resolve_resources(
    store: &dyn ResourceStore,
    spec: &PatchSpec,
) -> Result<Vec<Value>, ResolveError> {
    let sources = resolve_sources(store, spec).await?;
    let target = resolve_target(store, spec).await?;

    let mut resources = Vec::with_capacity(sources.len() + 1);
    resources.push(target);
    resources.extend(sources);
    Ok(resources)
}

#[derive(Clone, Copy)]
enum Category {
    Target,
    Source,
}

async fn fetch(
    store: &dyn ResourceStore,
    reference: &ObjectRef,
    category: Category,
) -> Result<Value, ResolveError> {
    let wrap = |source: StoreError| match category {
        Category::Target => ResolveError::Target {
            reference: reference.describe(),
            source,
        },
        Category::Source => ResolveError::Source {
            reference: reference.describe(),
            source,
        },
    };
    let object = store.get(reference).await.map_err(&wrap)?;
    serde_json::to_value(&object)
        .map_err(|err| wrap(StoreError::InvalidPayload(err.to_string())))
}
