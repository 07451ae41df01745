//! # Patch Strategy Validation and Conversion
//!
//! Validates `spec.patchStrategy` against the fixed set of strategies the
//! API server understands and converts the rendered template text into the
//! byte encoding that strategy is submitted under. The three JSON-based
//! strategies take the rendered YAML re-encoded as JSON; server-side apply
//! takes the rendered text as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every value `spec.patchStrategy` may take, wire-exact
pub const ALLOWED_PATCH_STRATEGIES: [&str; 4] = [
    "json-patch",
    "merge-patch",
    "strategic-merge-patch",
    "server-side-apply",
];

/// Patch strategy for the target submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchStrategy {
    JsonPatch,
    MergePatch,
    StrategicMergePatch,
    ServerSideApply,
}

impl PatchStrategy {
    /// Parse the declared strategy string; unrecognized values are never
    /// coerced.
    pub fn parse(value: &str) -> Result<Self, StrategyError> {
        match value {
            "json-patch" => Ok(Self::JsonPatch),
            "merge-patch" => Ok(Self::MergePatch),
            "strategic-merge-patch" => Ok(Self::StrategicMergePatch),
            "server-side-apply" => Ok(Self::ServerSideApply),
            other => Err(StrategyError::Unknown(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JsonPatch => "json-patch",
            Self::MergePatch => "merge-patch",
            Self::StrategicMergePatch => "strategic-merge-patch",
            Self::ServerSideApply => "server-side-apply",
        }
    }
}

/// Failure while validating the strategy or converting the rendered text
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("patchStrategy '{0}' is invalid. Choose one of the following: json-patch, merge-patch, strategic-merge-patch, server-side-apply")]
    Unknown(String),
    #[error("rendered patch is not valid YAML: {0}")]
    InvalidYaml(String),
}

/// Patch payload ready for submission, tagged with its strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPatch {
    pub strategy: PatchStrategy,
    pub data: Vec<u8>,
}

/// Validate the declared strategy and convert the rendered text into the
/// encoding that strategy is submitted under.
pub fn prepare_patch(strategy: &str, rendered: &str) -> Result<PreparedPatch, StrategyError> {
    let strategy = PatchStrategy::parse(strategy)?;
    let data = match strategy {
        // The apply path accepts the rendered text unchanged.
        PatchStrategy::ServerSideApply => rendered.as_bytes().to_vec(),
        PatchStrategy::JsonPatch | PatchStrategy::MergePatch | PatchStrategy::StrategicMergePatch => {
            let value: serde_json::Value = serde_yaml::from_str(rendered)
                .map_err(|err| StrategyError::InvalidYaml(err.to_string()))?;
            serde_json::to_vec(&value).map_err(|err| StrategyError::InvalidYaml(err.to_string()))?
        }
    };
    Ok(PreparedPatch { strategy, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_allowed_strategy_is_accepted() {
        for value in ALLOWED_PATCH_STRATEGIES {
            assert_eq!(
                PatchStrategy::parse(value).expect("allowed value").as_str(),
                value
            );
        }
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = PatchStrategy::parse("bogus").expect_err("not in the allowed set");
        assert!(matches!(err, StrategyError::Unknown(value) if value == "bogus"));
    }

    #[test]
    fn merge_patch_converts_yaml_to_json_bytes() {
        let prepared = prepare_patch("merge-patch", "metadata:\n  labels:\n    app: web\n")
            .expect("valid input");
        assert_eq!(prepared.strategy, PatchStrategy::MergePatch);
        let body: serde_json::Value =
            serde_json::from_slice(&prepared.data).expect("JSON encoded");
        assert_eq!(body, json!({"metadata": {"labels": {"app": "web"}}}));
    }

    #[test]
    fn json_patch_converts_operation_list() {
        let prepared = prepare_patch(
            "json-patch",
            "- op: replace\n  path: /spec/replicas\n  value: 3\n",
        )
        .expect("valid input");
        assert_eq!(prepared.strategy, PatchStrategy::JsonPatch);
        let body: serde_json::Value =
            serde_json::from_slice(&prepared.data).expect("JSON encoded");
        assert_eq!(
            body,
            json!([{"op": "replace", "path": "/spec/replicas", "value": 3}])
        );
    }

    #[test]
    fn strategic_merge_patch_converts_yaml_to_json_bytes() {
        let prepared =
            prepare_patch("strategic-merge-patch", "spec:\n  replicas: 2\n").expect("valid input");
        assert_eq!(prepared.strategy, PatchStrategy::StrategicMergePatch);
        let body: serde_json::Value =
            serde_json::from_slice(&prepared.data).expect("JSON encoded");
        assert_eq!(body, json!({"spec": {"replicas": 2}}));
    }

    #[test]
    fn server_side_apply_passes_rendered_text_through_unchanged() {
        let rendered = "apiVersion: v1\nkind: ConfigMap\ndata:\n  k: v\n";
        let prepared = prepare_patch("server-side-apply", rendered).expect("valid input");
        assert_eq!(prepared.strategy, PatchStrategy::ServerSideApply);
        assert_eq!(prepared.data, rendered.as_bytes());
    }

    #[test]
    fn malformed_yaml_is_a_conversion_failure() {
        let err = prepare_patch("merge-patch", "a: [unclosed").expect_err("invalid YAML");
        assert!(matches!(err, StrategyError::InvalidYaml(_)));
    }

    #[test]
    fn unknown_strategy_is_rejected_before_conversion() {
        // Even a payload that would never convert is not inspected.
        let err = prepare_patch("bogus", "a: [unclosed").expect_err("unknown strategy");
        assert!(matches!(err, StrategyError::Unknown(_)));
    }
}
