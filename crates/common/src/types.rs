use std::collections::BTreeMap;

/// Placeholder names shared by the built-in templates and the contexts the
/// engine assembles.
pub mod keys {
    pub const HOST: &str = "host";
    pub const GPU_MODEL: &str = "gpu_model";
    pub const TEMPERATURE: &str = "temperature";
    pub const TIMESTAMP: &str = "timestamp";
    pub const MESSAGE: &str = "message";
}

/// One GPU's temperature sample from a single pass.
///
/// The model name is not unique: identical cards report the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub gpu_model: String,
    /// Degrees Celsius.
    pub temperature: i64,
}

impl Reading {
    pub fn new(gpu_model: impl Into<String>, temperature: i64) -> Self {
        Self {
            gpu_model: gpu_model.into(),
            temperature,
        }
    }
}

/// Flat placeholder-name → value mapping used to fill a template.
///
/// Built fresh for every notification and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(BTreeMap<String, String>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}
