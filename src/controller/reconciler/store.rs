//! # Resource Store
//!
//! Typed access to the cluster for the reconciler.
//!
//! The `ResourceStore` trait is the only seam between the reconciliation
//! pipeline and the Kubernetes API: fetching and updating the `Patch`
//! resource itself, resolving arbitrary referenced objects, and submitting
//! the prepared patch against the target. `KubeStore` implements it over a
//! `kube::Client`; integration tests swap in an in-memory store.

use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::strategy::{PatchStrategy, PreparedPatch};
use crate::crd::{ObjectRef, Patch};
use async_trait::async_trait;
use kube::api::{Api, Patch as KubePatch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use thiserror::Error;

/// Failure of a store operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object reference does not carry everything a lookup needs.
    /// Cluster-scoped objects are not supported, so this includes a
    /// missing namespace.
    #[error("object reference is missing the {0} field")]
    InvalidReference(&'static str),
    /// The referenced object does not exist
    #[error("{0} was not found")]
    NotFound(String),
    /// The prepared patch bytes could not be decoded for submission
    #[error("patch payload could not be decoded: {0}")]
    InvalidPayload(String),
    /// The API server refused the patch (conflict, validation, permission)
    #[error("patch was rejected by the API server: {0}")]
    PatchRejected(#[source] kube::Error),
    /// Any other API failure (transport, authorization, ...)
    #[error(transparent)]
    Api(#[from] kube::Error),
}

/// Cluster-state store consumed by the reconciler
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a `Patch` resource by identity; `None` when it no longer exists
    async fn get_patch(&self, namespace: &str, name: &str) -> Result<Option<Patch>, StoreError>;

    /// Persist metadata changes (finalizers) on a `Patch` resource
    async fn update_patch(&self, patch: &Patch) -> Result<Patch, StoreError>;

    /// Persist the status subresource of a `Patch` resource
    async fn update_status(&self, patch: &Patch) -> Result<(), StoreError>;

    /// Fetch an arbitrary referenced object as a dynamic structured value
    async fn get(&self, reference: &ObjectRef) -> Result<DynamicObject, StoreError>;

    /// Submit a prepared patch against the referenced object
    async fn apply_patch(
        &self,
        reference: &ObjectRef,
        prepared: &PreparedPatch,
    ) -> Result<(), StoreError>;
}

/// `ResourceStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Dynamic API handle for an arbitrary object reference
    fn dynamic_api(&self, reference: &ObjectRef) -> Result<Api<DynamicObject>, StoreError> {
        if reference.api_version.trim().is_empty() {
            return Err(StoreError::InvalidReference("apiVersion"));
        }
        if reference.kind.trim().is_empty() {
            return Err(StoreError::InvalidReference("kind"));
        }
        if reference.name.trim().is_empty() {
            return Err(StoreError::InvalidReference("name"));
        }
        let namespace = reference
            .namespace
            .as_deref()
            .filter(|namespace| !namespace.trim().is_empty())
            .ok_or(StoreError::InvalidReference("namespace"))?;

        let gvk = match reference.api_version.split_once('/') {
            Some((group, version)) => GroupVersionKind::gvk(group, version, &reference.kind),
            None => GroupVersionKind::gvk("", &reference.api_version, &reference.kind),
        };
        let resource = ApiResource::from_gvk(&gvk);
        Ok(Api::namespaced_with(
            self.client.clone(),
            namespace,
            &resource,
        ))
    }

    fn patch_api(&self, patch: &Patch) -> Result<(Api<Patch>, String), StoreError> {
        let namespace = patch.metadata.namespace.as_deref().unwrap_or("default");
        let name = patch
            .metadata
            .name
            .clone()
            .ok_or(StoreError::InvalidReference("name"))?;
        Ok((Api::namespaced(self.client.clone(), namespace), name))
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_patch(&self, namespace: &str, name: &str) -> Result<Option<Patch>, StoreError> {
        let api: Api<Patch> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update_patch(&self, patch: &Patch) -> Result<Patch, StoreError> {
        let (api, name) = self.patch_api(patch)?;
        Ok(api.replace(&name, &PostParams::default(), patch).await?)
    }

    async fn update_status(&self, patch: &Patch) -> Result<(), StoreError> {
        let (api, name) = self.patch_api(patch)?;
        let body = serde_json::json!({ "status": patch.status });
        api.patch_status(&name, &PatchParams::default(), &KubePatch::Merge(body))
            .await?;
        Ok(())
    }

    async fn get(&self, reference: &ObjectRef) -> Result<DynamicObject, StoreError> {
        let api = self.dynamic_api(reference)?;
        match api.get(&reference.name).await {
            Ok(object) => Ok(object),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                Err(StoreError::NotFound(reference.describe()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_patch(
        &self,
        reference: &ObjectRef,
        prepared: &PreparedPatch,
    ) -> Result<(), StoreError> {
        let api = self.dynamic_api(reference)?;
        let result = match prepared.strategy {
            PatchStrategy::JsonPatch => {
                let operations: json_patch::Patch = serde_json::from_slice(&prepared.data)
                    .map_err(|err| StoreError::InvalidPayload(err.to_string()))?;
                api.patch(
                    &reference.name,
                    &PatchParams::default(),
                    &KubePatch::<serde_json::Value>::Json(operations),
                )
                .await
            }
            PatchStrategy::MergePatch => {
                let body: serde_json::Value = serde_json::from_slice(&prepared.data)
                    .map_err(|err| StoreError::InvalidPayload(err.to_string()))?;
                api.patch(
                    &reference.name,
                    &PatchParams::default(),
                    &KubePatch::Merge(body),
                )
                .await
            }
            PatchStrategy::StrategicMergePatch => {
                let body: serde_json::Value = serde_json::from_slice(&prepared.data)
                    .map_err(|err| StoreError::InvalidPayload(err.to_string()))?;
                api.patch(
                    &reference.name,
                    &PatchParams::default(),
                    &KubePatch::Strategic(body),
                )
                .await
            }
            PatchStrategy::ServerSideApply => {
                // The apply path takes the rendered text as-is; parse it here
                // because the client submits structured data.
                let body: serde_json::Value = serde_yaml::from_slice(&prepared.data)
                    .map_err(|err| StoreError::InvalidPayload(err.to_string()))?;
                api.patch(
                    &reference.name,
                    &PatchParams::apply(FIELD_MANAGER),
                    &KubePatch::Apply(body),
                )
                .await
            }
        };
        result.map(|_| ()).map_err(StoreError::PatchRejected)
    }
}
