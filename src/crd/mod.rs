//! # Custom Resource Definitions
//!
//! CRD types for the patch controller.
//!
//! A `Patch` resource declares a target object, an ordered list of source
//! objects, a template rendered against them, and the patch strategy used to
//! submit the rendered result against the target.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Patch Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: patching.microscaler.io/v1alpha1
/// kind: Patch
/// metadata:
///   name: propagate-labels
///   namespace: default
/// spec:
///   sources:
///     - apiVersion: v1
///       kind: ConfigMap
///       namespace: default
///       name: labels-source
///   target:
///     apiVersion: apps/v1
///     kind: Deployment
///     namespace: default
///     name: my-service
///   patchStrategy: merge-patch
///   resyncInterval: 5m
///   template: |
///     metadata:
///       labels:
///         {{ resources.1.data | toYaml | indent(prefix="    ") }}
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Patch",
    group = "patching.microscaler.io",
    version = "v1alpha1",
    namespaced,
    status = "PatchStatus",
    category = "patches",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"ResourcePatched\")].status"}, {"name":"Status", "type":"string", "jsonPath":".status.conditions[?(@.type==\"ResourcePatched\")].reason"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PatchSpec {
    /// Source objects rendered into the template, in declared order.
    /// The render context lists the target first, then the sources.
    #[serde(default)]
    pub sources: Vec<ObjectRef>,
    /// Target object the rendered patch is submitted against
    pub target: ObjectRef,
    /// Template producing the patch body. Rendered with the `resources`
    /// variable (target first, then sources) plus `target` and `sources`
    /// aliases; `toYaml` and `fromYaml` filters are available on top of the
    /// engine's built-in helpers.
    pub template: String,
    /// Patch strategy used for submission. One of `json-patch`,
    /// `merge-patch`, `strategic-merge-patch`, `server-side-apply`.
    /// Validated at reconcile time so unknown values surface as a status
    /// condition rather than an admission failure.
    pub patch_strategy: String,
    /// How often to re-run reconciliation absent a watch event.
    /// Kubernetes duration string (e.g. "30s", "5m", "1h").
    /// Falls back to the controller default when absent or unparsable.
    #[serde(default)]
    pub resync_interval: Option<String>,
}

/// Reference to an arbitrary cluster object
///
/// All fields except `namespace` are required for the lookup to succeed;
/// cluster-scoped objects are not supported, so `namespace` must be set too.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    /// API version of the referenced object (e.g. "v1", "apps/v1")
    pub api_version: String,
    /// Kind of the referenced object
    pub kind: String,
    /// Namespace of the referenced object
    #[serde(default)]
    pub namespace: Option<String>,
    /// Name of the referenced object
    pub name: String,
}

impl ObjectRef {
    /// Human-readable form used in log lines and condition messages
    pub fn describe(&self) -> String {
        format!(
            "{}/{} {}/{}",
            self.api_version,
            self.kind,
            self.namespace.as_deref().unwrap_or(""),
            self.name
        )
    }
}

/// Status of the Patch resource, owned exclusively by the reconciler
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing condition
    #[serde(default)]
    pub message: Option<String>,
}
