//! # Constants
//!
//! Shared constants used throughout the controller.

/// Finalizer placed on every `Patch` resource while the controller holds it
pub const PATCH_FINALIZER: &str = "patching.microscaler.io/finalizer";

/// Field manager name used for server-side apply submissions
pub const FIELD_MANAGER: &str = "patch-controller";

/// Default resync interval when `spec.resyncInterval` is absent or unparsable (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;
