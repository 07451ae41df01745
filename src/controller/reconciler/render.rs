//! # Template Renderer
//!
//! Renders `spec.template` against the resolved resources.
//!
//! The template environment carries the engine's built-in helper library
//! plus two YAML filters:
//!
//! - `toYaml` serializes any value to YAML text. Marshal failures are
//!   swallowed into an empty string so a template never hard-fails here.
//! - `fromYaml` parses YAML text into a mapping. Parse failures produce a
//!   mapping holding a single `Error` key with the failure message instead
//!   of aborting the render, so template authors can branch on it.
//!
//! Templates see the resolved objects as `resources` (target first, then
//! the sources in declared order) with `target` and `sources` aliases.
//! Parsing failures and execution failures are reported separately; the
//! condition vocabulary distinguishes them.

use serde_json::Value;
use std::collections::HashMap;
use tera::{Context, Tera};
use thiserror::Error;

/// Name under which the per-pass template is registered in the environment
const TEMPLATE_NAME: &str = "patch";

/// Failure while rendering a template
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template text is not valid template syntax
    #[error("template parsing failed: {0}")]
    Parse(String),
    /// The template references something the resolved resources do not have,
    /// or a helper failed at execution time
    #[error("template execution failed: {0}")]
    Execution(String),
}

/// Build the template environment with the helper registry.
///
/// Called once at startup; render calls clone the environment per template
/// and never mutate the shared instance.
#[must_use]
pub fn template_env() -> Tera {
    let mut env = Tera::default();
    env.register_filter("toYaml", to_yaml);
    env.register_filter("fromYaml", from_yaml);
    env
}

/// Compile the template once and execute it against the resolved resources
pub fn render_template(
    env: &Tera,
    template: &str,
    resources: &[Value],
) -> Result<String, RenderError> {
    let mut tera = env.clone();
    tera.add_raw_template(TEMPLATE_NAME, template)
        .map_err(|err| RenderError::Parse(error_chain(&err)))?;

    let mut context = Context::new();
    context.insert("resources", resources);
    if let Some((target, sources)) = resources.split_first() {
        context.insert("target", target);
        context.insert("sources", sources);
    }

    tera.render(TEMPLATE_NAME, &context)
        .map_err(|err| RenderError::Execution(error_chain(&err)))
}

/// Serialize a value to YAML text. Always returns a string, even on marshal
/// error (empty string); the serializer's trailing newline is stripped.
fn to_yaml(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match serde_yaml::to_string(value) {
        Ok(text) => {
            let text = text.strip_suffix('\n').unwrap_or(&text).to_string();
            Ok(Value::String(text))
        }
        // Swallow errors inside a template.
        Err(_) => Ok(Value::String(String::new())),
    }
}

/// Parse YAML text into a mapping. Parse failures land in an `Error` key of
/// the returned mapping instead of failing the render.
fn from_yaml(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let Value::String(text) = value else {
        return Ok(error_mapping("fromYaml expects a string"));
    };
    match serde_yaml::from_str::<serde_json::Map<String, Value>>(text) {
        Ok(mapping) => Ok(Value::Object(mapping)),
        Err(err) => Ok(error_mapping(&err.to_string())),
    }
}

fn error_mapping(message: &str) -> Value {
    let mut mapping = serde_json::Map::new();
    mapping.insert("Error".to_string(), Value::String(message.to_string()));
    Value::Object(mapping)
}

/// The engine nests the interesting part of a failure in its source chain;
/// flatten it so conditions carry the full parser/executor message.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_args() -> HashMap<String, Value> {
        HashMap::new()
    }

    #[test]
    fn to_yaml_serializes_and_strips_single_trailing_newline() {
        let value = json!({"a": 1});
        let result = to_yaml(&value, &no_args()).expect("filter never fails");
        assert_eq!(result, Value::String("a: 1".to_string()));
    }

    #[test]
    fn to_yaml_from_yaml_round_trip_preserves_mappings() {
        let value = json!({
            "a": 1,
            "b": ["x", "y"],
            "c": {"d": true, "e": "text"},
        });
        let yaml = to_yaml(&value, &no_args()).expect("filter never fails");
        let back = from_yaml(&yaml, &no_args()).expect("filter never fails");
        assert_eq!(back, value);
    }

    #[test]
    fn from_yaml_malformed_input_yields_error_key() {
        let result = from_yaml(
            &Value::String("not: valid: yaml: :".to_string()),
            &no_args(),
        )
        .expect("filter never fails");
        let mapping = result.as_object().expect("always a mapping");
        assert!(mapping.contains_key("Error"));
    }

    #[test]
    fn from_yaml_non_mapping_input_yields_error_key() {
        let result = from_yaml(&Value::String("- just\n- a\n- list".to_string()), &no_args())
            .expect("filter never fails");
        assert!(result.as_object().expect("always a mapping").contains_key("Error"));
    }

    #[test]
    fn malformed_from_yaml_does_not_abort_the_render() {
        let env = template_env();
        let rendered = render_template(
            &env,
            r#"{{ "not: valid: yaml: :" | fromYaml | get(key="Error") }}"#,
            &[json!({})],
        )
        .expect("render must not abort");
        assert!(!rendered.is_empty());
    }

    #[test]
    fn renders_target_first_with_aliases() {
        let env = template_env();
        let resources = vec![json!({"kind": "Deployment"}), json!({"kind": "ConfigMap"})];
        let rendered = render_template(
            &env,
            "{{ resources.0.kind }}/{{ target.kind }}/{{ sources.0.kind }}",
            &resources,
        )
        .expect("valid template");
        assert_eq!(rendered, "Deployment/Deployment/ConfigMap");
    }

    #[test]
    fn rendering_is_deterministic_for_fixed_inputs() {
        let env = template_env();
        let resources = vec![json!({"metadata": {"name": "cm"}, "data": {"k": "v"}})];
        let first = render_template(&env, "{{ resources.0 | toYaml }}", &resources)
            .expect("valid template");
        let second = render_template(&env, "{{ resources.0 | toYaml }}", &resources)
            .expect("valid template");
        assert_eq!(first, second);
    }

    #[test]
    fn parse_failure_is_reported_as_parse_error() {
        let env = template_env();
        let result = render_template(&env, "{{ unclosed", &[json!({})]);
        assert!(matches!(result, Err(RenderError::Parse(_))));
    }

    #[test]
    fn undefined_variable_is_reported_as_execution_error() {
        let env = template_env();
        let result = render_template(&env, "{{ no_such_variable }}", &[json!({})]);
        assert!(matches!(result, Err(RenderError::Execution(_))));
    }
}
