//! Template store — named, placeholder-bearing payload documents.
//!
//! The built-in "success" and "failure" templates are Rocket.Chat-style
//! incoming-webhook messages. A store can alternatively be loaded once from a
//! JSON file at startup; there is no way to mutate a store afterwards.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use serde_json::{Value, json};

use gpuwatch_common::error::MonitorError;
use gpuwatch_common::types::{Context, keys};

use crate::render::placeholders;

/// Template used for over-threshold readings.
pub const SUCCESS: &str = "success";
/// Template used when the monitor itself cannot sample the GPUs.
pub const FAILURE: &str = "failure";

/// A structural payload document.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// String scalar; may contain `{name}` placeholders.
    Text(String),
    /// Any other scalar (bool, number, null); rendered verbatim.
    Scalar(Value),
    List(Vec<Template>),
    /// Key-ordered map.
    Map(Vec<(String, Template)>),
}

impl Template {
    /// Convert a JSON document into a template, keeping object key order.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Template::Text(s),
            Value::Array(items) => Template::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Template::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
            other => Template::Scalar(other),
        }
    }

    /// Every placeholder name referenced anywhere in the document.
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_placeholders(&mut names);
        names
    }

    /// Placeholders the context cannot resolve.
    pub fn missing_keys(&self, context: &Context) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|name| !context.contains_key(name))
            .collect()
    }

    fn collect_placeholders(&self, names: &mut BTreeSet<String>) {
        match self {
            Template::Text(text) => names.extend(placeholders(text)),
            Template::Scalar(_) => {}
            Template::List(items) => items.iter().for_each(|t| t.collect_placeholders(names)),
            Template::Map(entries) => entries
                .iter()
                .for_each(|(_, t)| t.collect_placeholders(names)),
        }
    }
}

/// Immutable lookup table of named templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<String, Template>,
}

static BUILTIN: LazyLock<TemplateStore> = LazyLock::new(|| TemplateStore {
    templates: HashMap::from([
        (SUCCESS.to_string(), Template::from_json(success_document())),
        (FAILURE.to_string(), Template::from_json(failure_document())),
    ]),
});

impl TemplateStore {
    /// The process-wide built-in templates.
    pub fn builtin() -> &'static TemplateStore {
        &BUILTIN
    }

    /// Build a store from a JSON object whose top-level keys are template names.
    ///
    /// Both the "success" and "failure" templates must be present; extra
    /// names are kept.
    pub fn from_json(document: Value) -> Result<Self, MonitorError> {
        let Value::Object(map) = document else {
            return Err(MonitorError::Config(
                "templates document must be a JSON object keyed by template name".to_string(),
            ));
        };

        let templates: HashMap<String, Template> = map
            .into_iter()
            .map(|(name, doc)| (name, Template::from_json(doc)))
            .collect();

        for required in [SUCCESS, FAILURE] {
            if !templates.contains_key(required) {
                return Err(MonitorError::Config(format!(
                    "templates document is missing the '{required}' template"
                )));
            }
        }

        tracing::info!(count = templates.len(), "Loaded notification templates");
        Ok(Self { templates })
    }

    /// Load a store from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, MonitorError> {
        let raw = std::fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&raw).map_err(|e| {
            MonitorError::Config(format!("invalid templates file {}: {e}", path.display()))
        })?;
        Self::from_json(document)
    }

    /// Resolve a template by name.
    ///
    /// An unknown name is a hard error, never an empty result.
    pub fn lookup(&self, name: &str) -> Result<&Template, MonitorError> {
        self.templates.get(name).ok_or_else(|| {
            tracing::error!(template = name, "Template not found");
            MonitorError::TemplateNotFound(name.to_string())
        })
    }
}

fn field(title: &str, value: String) -> Value {
    json!({ "title": title, "value": value, "short": true })
}

fn success_document() -> Value {
    json!({
        "text": "🌡️GPU Temperature",
        "emoji": ":rotating_light:",
        "attachments": [{
            "title": "GPU Temperature",
            "color": "#FF5733",
            "fields": [
                field("Server", format!("{{{}}}", keys::HOST)),
                field("GPU Model", format!("{{{}}}", keys::GPU_MODEL)),
                field("Temperature", format!("{{{}}} °C", keys::TEMPERATURE)),
                field("Time", format!("{{{}}}", keys::TIMESTAMP)),
            ]
        }]
    })
}

fn failure_document() -> Value {
    json!({
        "text": "🌡️GPU Temperature",
        "emoji": ":rotating_light:",
        "attachments": [{
            "title": "GPU Temperature",
            "color": "#FF5733",
            "fields": [
                field("Server", format!("{{{}}}", keys::HOST)),
                field("Server Message", format!("{{{}}}", keys::MESSAGE)),
                field("Time", format!("{{{}}}", keys::TIMESTAMP)),
            ]
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_both_templates() {
        let store = TemplateStore::builtin();
        assert!(store.lookup(SUCCESS).is_ok());
        assert!(store.lookup(FAILURE).is_ok());
    }

    #[test]
    fn test_builtin_required_keys_are_disjoint_beyond_shared_fields() {
        let store = TemplateStore::builtin();
        let success = store.lookup(SUCCESS).unwrap().placeholders();
        let failure = store.lookup(FAILURE).unwrap().placeholders();

        assert!(success.contains(keys::GPU_MODEL));
        assert!(success.contains(keys::TEMPERATURE));
        assert!(!success.contains(keys::MESSAGE));

        assert!(failure.contains(keys::MESSAGE));
        assert!(!failure.contains(keys::GPU_MODEL));
        assert!(!failure.contains(keys::TEMPERATURE));
    }

    #[test]
    fn test_lookup_unknown_is_error() {
        let err = TemplateStore::builtin().lookup("fail").unwrap_err();
        assert!(matches!(err, MonitorError::TemplateNotFound(name) if name == "fail"));
    }

    #[test]
    fn test_from_json_preserves_structure() {
        let template = Template::from_json(json!({
            "b": "{x}",
            "a": [1, true, null],
        }));
        assert_eq!(
            template,
            Template::Map(vec![
                ("b".to_string(), Template::Text("{x}".to_string())),
                (
                    "a".to_string(),
                    Template::List(vec![
                        Template::Scalar(json!(1)),
                        Template::Scalar(json!(true)),
                        Template::Scalar(Value::Null),
                    ])
                ),
            ])
        );
    }

    #[test]
    fn test_store_from_json() {
        let store = TemplateStore::from_json(json!({
            "success": {"text": "{gpu_model} is hot"},
            "failure": {"text": "{message}"},
        }))
        .unwrap();
        assert!(store.lookup(SUCCESS).is_ok());
        assert!(store.lookup("missing").is_err());
    }

    #[test]
    fn test_store_requires_success_and_failure() {
        for document in [
            json!({"success": {"text": "{gpu_model} is hot"}}),
            json!({"failure": {"text": "{message}"}, "extra": "x"}),
            json!({}),
        ] {
            assert!(matches!(
                TemplateStore::from_json(document),
                Err(MonitorError::Config(msg)) if msg.contains("missing")
            ));
        }
    }

    #[test]
    fn test_store_from_non_object_rejected() {
        assert!(matches!(
            TemplateStore::from_json(json!(["success"])),
            Err(MonitorError::Config(_))
        ));
    }

    #[test]
    fn test_missing_keys() {
        let template = TemplateStore::builtin().lookup(FAILURE).unwrap();
        let ctx = Context::new().with(keys::HOST, "gpu-01");
        assert_eq!(
            template.missing_keys(&ctx),
            vec![keys::MESSAGE.to_string(), keys::TIMESTAMP.to_string()]
        );
    }
}
