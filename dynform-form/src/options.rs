//! Runtime options for fields and forms.
//!
//! Both structs deserialize from camelCase JSON or YAML so hosts can keep them
//! next to the schema they apply to.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for a standalone `FieldRuntime`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldOptions {
    /// Validate on every `set_value`, touched or not.
    pub validate_immediately: bool,
}

/// Options for a `FormRuntime`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    /// Re-validate a field whenever `set_field_value` changes it.
    pub validate_on_change: bool,
    /// Values that take precedence over field defaults at construction.
    pub initial_values: IndexMap<String, Value>,
}

impl FormOptions {
    pub fn with_initial_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.initial_values.insert(name.into(), value);
        self
    }

    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }
}
