//! # Reconciliation Logic
//!
//! Main reconciliation loop for `Patch` resources.
//!
//! One pass is a strictly sequential run of fetch, deletion/finalizer
//! handling, resync computation, the resolve-render-convert-patch pipeline,
//! and exactly one status persist on every pipeline exit path. Pipeline
//! errors are both written into the condition set and returned, so
//! observability does not depend on log output alone.

use crate::constants;
use crate::controller::reconciler::patcher;
use crate::controller::reconciler::render::{self, RenderError};
use crate::controller::reconciler::resolve::{self, ResolveError};
use crate::controller::reconciler::status::{self, new_condition, upsert_condition};
use crate::controller::reconciler::strategy::{self, StrategyError};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::reconciler::validation::parse_kubernetes_duration;
use crate::crd::{Patch, PatchStatus};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Main reconciliation function
///
/// Errors are handled by `error_policy()` in `main.rs`: the pass records the
/// failure as a condition, persists status, and returns the error so the
/// runtime schedules the retry.
pub async fn reconcile(
    patch: Arc<Patch>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let namespace = patch
        .metadata
        .namespace
        .as_deref()
        .unwrap_or("default")
        .to_string();
    let name = patch
        .metadata
        .name
        .as_deref()
        .unwrap_or("unknown")
        .to_string();

    info!("Reconciling Patch: {namespace}/{name}");
    metrics::increment_reconciliations();

    // 1. Get the latest content of the Patch from the cluster
    let mut patch = match ctx.store.get_patch(&namespace, &name).await {
        Ok(Some(latest)) => latest,
        Ok(None) => {
            info!("Patch resource not found. Ignoring since object must be deleted.");
            return Ok(Action::await_change());
        }
        Err(err) => {
            info!("Error getting the Patch from the cluster: {err}");
            return Err(err.into());
        }
    };

    // 2. Marked for deletion: release the finalizer and stop. Previously
    // applied patches are deliberately left in place.
    if patch.metadata.deletion_timestamp.is_some() {
        if has_finalizer(&patch) {
            remove_finalizer(&mut patch);
            if let Err(err) = ctx.store.update_patch(&patch).await {
                warn!("Failed to update finalizer of Patch {name}: {err}");
            }
        }
        return Ok(Action::await_change());
    }

    // 3. Ensure the finalizer in its own update cycle; the watch event from
    // the update re-triggers reconciliation with the finalizer observed.
    if !has_finalizer(&patch) {
        add_finalizer(&mut patch);
        ctx.store.update_patch(&patch).await?;
        return Ok(Action::await_change());
    }

    // 4. Schedule the periodical resync
    let requeue_after = resync_interval(&patch);

    // 5-6. Run the pipeline, accumulating conditions along the way
    let mut conditions = patch.status.clone().unwrap_or_default();
    let outcome = run_pipeline(&ctx, &patch, &mut conditions).await;

    // 7. Persist the status exactly once, on success and on error alike.
    // A failed write is logged but never overrides the pipeline outcome.
    patch.status = Some(conditions);
    if let Err(err) = ctx.store.update_status(&patch).await {
        warn!("Failed to update the condition on Patch {name}: {err}");
    }

    match outcome {
        Ok(()) => {
            metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
            info!("Schedule synchronization in: {}s", requeue_after.as_secs());
            Ok(Action::requeue(requeue_after))
        }
        Err(err) => {
            info!("Can not patch the target for the Patch {name}: {err}");
            Err(err)
        }
    }
}

/// Resolve → render → validate/convert → patch, upserting the conditions
/// each stage owns
async fn run_pipeline(
    ctx: &Reconciler,
    patch: &Patch,
    conditions: &mut PatchStatus,
) -> Result<(), ReconcilerError> {
    // Resource resolution, fail-fast over the whole batch
    let resources = match resolve::resolve_resources(ctx.store.as_ref(), &patch.spec).await {
        Ok(resources) => resources,
        Err(err) => {
            let (reason, message) = match &err {
                ResolveError::Target { .. } => (
                    status::REASON_TARGET_NOT_FOUND,
                    status::MESSAGE_TARGET_NOT_FOUND,
                ),
                ResolveError::Source { .. } => (
                    status::REASON_SOURCE_NOT_FOUND,
                    status::MESSAGE_SOURCE_NOT_FOUND,
                ),
            };
            upsert_condition(
                conditions,
                new_condition(
                    status::CONDITION_TYPE_RESOURCE_PATCHED,
                    status::CONDITION_STATUS_FALSE,
                    reason,
                    message,
                ),
            );
            return Err(err.into());
        }
    };

    // Template rendering; parsing and execution failures carry the engine's
    // message verbatim in the TemplateSucceed condition
    let rendered = match render::render_template(&ctx.template_env, &patch.spec.template, &resources)
    {
        Ok(rendered) => {
            upsert_condition(
                conditions,
                new_condition(
                    status::CONDITION_TYPE_TEMPLATE_SUCCEED,
                    status::CONDITION_STATUS_TRUE,
                    status::REASON_TEMPLATE_PARSED,
                    status::MESSAGE_TEMPLATE_PARSED,
                ),
            );
            rendered
        }
        Err(err) => {
            let (reason, engine_message) = match &err {
                RenderError::Parse(message) => (status::REASON_TEMPLATE_PARSING_FAILED, message),
                RenderError::Execution(message) => {
                    (status::REASON_TEMPLATE_EXECUTION_FAILED, message)
                }
            };
            upsert_condition(
                conditions,
                new_condition(
                    status::CONDITION_TYPE_TEMPLATE_SUCCEED,
                    status::CONDITION_STATUS_FALSE,
                    reason,
                    &format!("Template engine returned: {engine_message}"),
                ),
            );
            upsert_condition(
                conditions,
                new_condition(
                    status::CONDITION_TYPE_RESOURCE_PATCHED,
                    status::CONDITION_STATUS_FALSE,
                    status::REASON_INVALID_TEMPLATE,
                    status::MESSAGE_INVALID_TEMPLATE,
                ),
            );
            return Err(err.into());
        }
    };

    // Strategy validation and payload conversion
    let prepared = match strategy::prepare_patch(&patch.spec.patch_strategy, &rendered) {
        Ok(prepared) => prepared,
        Err(err) => {
            let (reason, message) = match &err {
                StrategyError::Unknown(_) => (
                    status::REASON_INVALID_PATCH_TYPE,
                    status::MESSAGE_INVALID_PATCH_TYPE.to_string(),
                ),
                StrategyError::InvalidYaml(_) => {
                    (status::REASON_INVALID_PATCH, err.to_string())
                }
            };
            upsert_condition(
                conditions,
                new_condition(
                    status::CONDITION_TYPE_RESOURCE_PATCHED,
                    status::CONDITION_STATUS_FALSE,
                    reason,
                    &message,
                ),
            );
            return Err(err.into());
        }
    };

    // Patch submission
    if let Err(err) = patcher::patch_target(ctx.store.as_ref(), &patch.spec.target, &prepared).await
    {
        upsert_condition(
            conditions,
            new_condition(
                status::CONDITION_TYPE_RESOURCE_PATCHED,
                status::CONDITION_STATUS_FALSE,
                status::REASON_INVALID_PATCH,
                &err.to_string(),
            ),
        );
        return Err(err.into());
    }

    metrics::increment_patches_applied();
    upsert_condition(
        conditions,
        new_condition(
            status::CONDITION_TYPE_RESOURCE_PATCHED,
            status::CONDITION_STATUS_TRUE,
            status::REASON_TARGET_PATCHED,
            status::MESSAGE_TARGET_PATCHED,
        ),
    );
    Ok(())
}

/// Resync interval from `spec.resyncInterval`, falling back to the default
/// when absent or unparsable without aborting the pass
fn resync_interval(patch: &Patch) -> Duration {
    let fallback = Duration::from_secs(constants::DEFAULT_RESYNC_INTERVAL_SECS);
    match patch.spec.resync_interval.as_deref() {
        None => fallback,
        Some(raw) => match parse_kubernetes_duration(raw) {
            Ok(duration) => duration,
            Err(err) => {
                warn!(
                    "Can not get synchronization time from the Patch: {err}. Falling back to {}s",
                    fallback.as_secs()
                );
                fallback
            }
        },
    }
}

fn has_finalizer(patch: &Patch) -> bool {
    patch
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| {
            finalizers
                .iter()
                .any(|token| token == constants::PATCH_FINALIZER)
        })
}

fn add_finalizer(patch: &mut Patch) {
    patch
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(constants::PATCH_FINALIZER.to_string());
}

fn remove_finalizer(patch: &mut Patch) {
    if let Some(finalizers) = patch.metadata.finalizers.as_mut() {
        finalizers.retain(|token| token != constants::PATCH_FINALIZER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ObjectRef, PatchSpec};

    fn patch_with_interval(resync_interval: Option<&str>) -> Patch {
        Patch::new(
            "test",
            PatchSpec {
                sources: Vec::new(),
                target: ObjectRef {
                    api_version: "v1".to_string(),
                    kind: "ConfigMap".to_string(),
                    namespace: Some("default".to_string()),
                    name: "cm".to_string(),
                },
                template: String::new(),
                patch_strategy: "merge-patch".to_string(),
                resync_interval: resync_interval.map(str::to_string),
            },
        )
    }

    #[test]
    fn resync_interval_uses_spec_value() {
        let patch = patch_with_interval(Some("30s"));
        assert_eq!(resync_interval(&patch), Duration::from_secs(30));
    }

    #[test]
    fn resync_interval_falls_back_when_absent_or_unparsable() {
        let fallback = Duration::from_secs(constants::DEFAULT_RESYNC_INTERVAL_SECS);
        assert_eq!(resync_interval(&patch_with_interval(None)), fallback);
        assert_eq!(
            resync_interval(&patch_with_interval(Some("soon"))),
            fallback
        );
    }

    #[test]
    fn finalizer_helpers_add_and_remove_the_controller_token() {
        let mut patch = patch_with_interval(None);
        assert!(!has_finalizer(&patch));

        add_finalizer(&mut patch);
        assert!(has_finalizer(&patch));

        remove_finalizer(&mut patch);
        assert!(!has_finalizer(&patch));
        assert_eq!(patch.metadata.finalizers, Some(Vec::new()));
    }
}
