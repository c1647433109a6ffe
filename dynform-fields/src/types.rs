//! Core descriptor types for dynamic forms.
//!
//! All types serialize to/from YAML and JSON via serde using the camelCase
//! keys the catalog service speaks. Field values are plain `serde_json::Value`s;
//! an absent value is `Value::Null`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{FieldsError, Result};

/// Declarative validation rules for one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Replaces the message of every failing rule on the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Name of a validator registered on the `ValidationEngine`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_validator_ref: Option<String>,
}

impl ValidationRule {
    pub fn is_required(&self) -> bool {
        self.required == Some(true)
    }
}

/// Rendering-agnostic defaults for a field, either declared on the field or
/// inherited from its plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clearable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl FieldConfig {
    /// Overlay this config on `base`. Every value set here wins.
    pub fn merged_over(&self, base: &FieldConfig) -> FieldConfig {
        FieldConfig {
            default_value: self
                .default_value
                .clone()
                .or_else(|| base.default_value.clone()),
            placeholder: self
                .placeholder
                .clone()
                .or_else(|| base.placeholder.clone()),
            disabled: self.disabled.or(base.disabled),
            hidden: self.hidden.or(base.hidden),
            clearable: self.clearable.or(base.clearable),
            readonly: self.readonly.or(base.readonly),
            size: self.size.clone().or_else(|| base.size.clone()),
        }
    }
}

/// A field descriptor: the declarative definition of one form field.
///
/// Identity is `field_name`. Descriptors are never mutated after the schema
/// that owns them is built; form state is mutated instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub field_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub plugin_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<FieldConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_hints: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(
        field_name: impl Into<String>,
        label: impl Into<String>,
        plugin_type: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            label: label.into(),
            plugin_type: plugin_type.into(),
            required: None,
            disabled: None,
            hidden: None,
            config: None,
            validation: None,
            layout_hints: None,
        }
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Label used in templated messages; falls back to the field name.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.field_name
        } else {
            &self.label
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden == Some(true)
    }

    /// The declared default value, if any. Plugin defaults are not consulted here.
    pub fn default_value(&self) -> Option<&Value> {
        self.config.as_ref().and_then(|c| c.default_value.as_ref())
    }
}

/// An ordered list of field descriptors plus opaque layout metadata.
///
/// Field names are unique; both `new` and deserialization reject duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "SchemaDef")]
pub struct FormSchema {
    fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layout: Option<Value>,
}

#[derive(Deserialize)]
struct SchemaDef {
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    layout: Option<Value>,
}

impl TryFrom<SchemaDef> for FormSchema {
    type Error = FieldsError;

    fn try_from(def: SchemaDef) -> Result<Self> {
        let mut schema = FormSchema::new(def.fields)?;
        schema.layout = def.layout;
        Ok(schema)
    }
}

impl FormSchema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for (index, field) in fields.iter().enumerate() {
            if field.field_name.is_empty() {
                return Err(FieldsError::EmptyFieldName { index });
            }
            if !seen.insert(field.field_name.as_str()) {
                return Err(FieldsError::DuplicateFieldName {
                    name: field.field_name.clone(),
                });
            }
        }
        Ok(Self {
            fields,
            layout: None,
        })
    }

    pub fn with_layout(mut self, layout: Value) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(input)?)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.field_name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.field_name.as_str())
    }

    pub fn layout(&self) -> Option<&Value> {
        self.layout.as_ref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One rule violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating one value or one whole form.
///
/// `valid` is true exactly when `errors` is empty, and `message` is always the
/// first error's message. The only constructors keep both in step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "ResultDef")]
pub struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

#[derive(Deserialize)]
struct ResultDef {
    valid: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
}

impl From<ResultDef> for ValidationResult {
    fn from(def: ResultDef) -> Self {
        let mut errors = def.errors.unwrap_or_default();
        // A remote `{valid: false, message}` without details still counts as one error.
        if errors.is_empty() && !def.valid {
            errors.push(FieldError::new(
                "",
                def.message.unwrap_or_else(|| "invalid value".to_string()),
            ));
        }
        Self::from_errors(errors)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            message: errors.first().map(|e| e.message.clone()),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

/// Lifecycle status of a catalog plugin.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    #[default]
    Enabled,
    Disabled,
    /// Any status string this crate does not know.
    #[serde(other)]
    Unknown,
}

/// A plugin descriptor: the server-registered definition of a field type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub config: FieldConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
    #[serde(default)]
    pub status: PluginStatus,
}

/// Catalog ids arrive as strings or numbers; both become a string.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl PluginDescriptor {
    pub fn new(type_: impl Into<String>, name: impl Into<String>) -> Self {
        let type_ = type_.into();
        Self {
            id: type_.clone(),
            type_,
            name: name.into(),
            version: "1.0.0".into(),
            schema: Value::Null,
            config: FieldConfig::default(),
            validation: None,
            status: PluginStatus::Enabled,
        }
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }
}
