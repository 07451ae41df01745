//! # Patch Controller
//!
//! A Kubernetes controller that keeps a target resource patched from source
//! resources through a user-authored template.
//!
//! ## Overview
//!
//! 1. **Watching `Patch` resources** - Reconciles `Patch` custom resources
//!    across all namespaces
//! 2. **Resolving references** - Fetches the declared target and source
//!    objects as dynamic structured values
//! 3. **Rendering the template** - Executes `spec.template` against the
//!    resolved objects with `toYaml`/`fromYaml` helpers available
//! 4. **Applying the patch** - Submits the rendered result under the
//!    declared patch strategy (`json-patch`, `merge-patch`,
//!    `strategic-merge-patch`, `server-side-apply`)
//! 5. **Reporting status** - Records the outcome of every pass as
//!    `ResourcePatched`/`TemplateSucceed` conditions
//!
//! ## Usage
//!
//! See the [README.md](../README.md) for detailed usage instructions and examples.

use anyhow::Result;
use futures::StreamExt;
use kube::{api::Api, Client};
use kube_runtime::{controller::Action, watcher, Controller};
use patch_controller::controller::reconciler::{reconcile, Reconciler, ReconcilerError};
use patch_controller::crd::Patch;
use patch_controller::{constants, observability, server};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patch_controller=info".into()),
        )
        .init();

    info!("Starting Patch Controller");

    observability::metrics::register_metrics()?;

    // HTTP server for metrics and probes
    let server_state = Arc::new(server::ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });
    let server_port = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(constants::DEFAULT_METRICS_PORT);
    let probe_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(err) = server::start_server(server_port, probe_state).await {
            error!("HTTP server error: {err}");
        }
    });

    let client = Client::try_default().await?;

    // Watch Patch resources across all namespaces
    let patches: Api<Patch> = Api::all(client.clone());
    let reconciler = Arc::new(Reconciler::new(client));

    server_state
        .is_ready
        .store(true, std::sync::atomic::Ordering::Relaxed);

    Controller::new(patches, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|_| std::future::ready(()))
        .await;

    info!("Controller stopped");

    Ok(())
}

/// Requeue policy for failed passes; the pass itself has already recorded
/// the failure in the resource's conditions.
fn error_policy(patch: Arc<Patch>, error: &ReconcilerError, _ctx: Arc<Reconciler>) -> Action {
    error!(
        "Reconciliation error for {}: {error}",
        patch.metadata.name.as_deref().unwrap_or("unknown")
    );
    observability::metrics::increment_reconciliation_errors();
    Action::requeue(std::time::Duration::from_secs(
        constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
    ))
}
