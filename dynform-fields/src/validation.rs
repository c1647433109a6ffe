//! ValidationEngine: declarative rule evaluation for field values.
//!
//! Rules run in a fixed order and never short-circuit, so one value can
//! collect several errors:
//!
//! 1. required (null, empty string, empty array)
//! 2. numeric bounds (`min`, `max`)
//! 3. string length bounds (`minLength`, `maxLength`)
//! 4. pattern
//! 5. custom validator, looked up by `customValidatorRef`
//!
//! Validation never fails. A pattern that does not compile is skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::types::{FieldDescriptor, FieldError, ValidationResult, ValidationRule};

/// A named validator referenced from `ValidationRule::custom_validator_ref`.
///
/// Returns `Some(message)` when the value is rejected.
pub type CustomValidator = Arc<dyn Fn(&Value, &FieldDescriptor) -> Option<String> + Send + Sync>;

/// How the engine decides which type-specific rules apply to a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuleDispatch {
    /// Numeric rules apply to JSON numbers and text rules to JSON strings,
    /// whatever the field's plugin type says.
    #[default]
    RuntimeType,
    /// Rules follow the kind declared for the field's plugin type. A value of
    /// the wrong JSON type is reported as an error of its own.
    DeclaredType,
}

/// The value shape a plugin type expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Text,
    /// No declared shape; falls back to runtime-type dispatch.
    Any,
}

const BUILTIN_KINDS: &[(&str, ValueKind)] = &[
    ("number", ValueKind::Number),
    ("slider", ValueKind::Number),
    ("rate", ValueKind::Number),
    ("input", ValueKind::Text),
    ("text", ValueKind::Text),
    ("textarea", ValueKind::Text),
    ("password", ValueKind::Text),
    ("email", ValueKind::Text),
];

/// Evaluates `ValidationRule`s against values.
#[derive(Clone)]
pub struct ValidationEngine {
    dispatch: RuleDispatch,
    kinds: HashMap<String, ValueKind>,
    custom: HashMap<String, CustomValidator>,
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("dispatch", &self.dispatch)
            .field("kinds", &self.kinds)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self {
            dispatch: RuleDispatch::default(),
            kinds: BUILTIN_KINDS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            custom: HashMap::new(),
        }
    }

    pub fn with_dispatch(mut self, dispatch: RuleDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Declare (or override) the value kind of a plugin type.
    pub fn with_kind(mut self, plugin_type: impl Into<String>, kind: ValueKind) -> Self {
        self.kinds.insert(plugin_type.into(), kind);
        self
    }

    /// Register a validator that rules can reference by name.
    pub fn with_custom_validator<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value, &FieldDescriptor) -> Option<String> + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(validator));
        self
    }

    pub fn dispatch(&self) -> RuleDispatch {
        self.dispatch
    }

    pub fn kind_of(&self, plugin_type: &str) -> ValueKind {
        self.kinds
            .get(plugin_type)
            .copied()
            .unwrap_or(ValueKind::Any)
    }

    /// Validate one value against the field's rule. A field without a rule is
    /// always valid.
    pub fn validate(&self, value: &Value, field: &FieldDescriptor) -> ValidationResult {
        let Some(rule) = field.validation.as_ref() else {
            return ValidationResult::ok();
        };
        let label = field.display_label();
        let mut errors = Vec::new();

        if rule.is_required() && is_empty(value) {
            push(&mut errors, field, rule, format!("{label} must not be empty"));
        }

        let (numeric, text) = match self.effective_kind(field) {
            ValueKind::Any => (value.as_f64(), value.as_str()),
            ValueKind::Number => {
                if !value.is_number() && !is_empty(value) {
                    push(&mut errors, field, rule, format!("{label} must be a number"));
                }
                (value.as_f64(), None)
            }
            ValueKind::Text => {
                if !value.is_string() && !is_empty(value) {
                    push(&mut errors, field, rule, format!("{label} must be text"));
                }
                (None, value.as_str())
            }
        };

        if let Some(n) = numeric {
            if let Some(min) = rule.min {
                if n < min {
                    push(&mut errors, field, rule, format!("{label} must not be less than {min}"));
                }
            }
            if let Some(max) = rule.max {
                if n > max {
                    push(&mut errors, field, rule, format!("{label} must not be greater than {max}"));
                }
            }
        }

        if let Some(s) = text {
            let len = s.chars().count();
            if let Some(min_length) = rule.min_length {
                if len < min_length {
                    push(
                        &mut errors,
                        field,
                        rule,
                        format!("{label} must be at least {min_length} characters"),
                    );
                }
            }
            if let Some(max_length) = rule.max_length {
                if len > max_length {
                    push(
                        &mut errors,
                        field,
                        rule,
                        format!("{label} must be at most {max_length} characters"),
                    );
                }
            }
            if let Some(pattern) = rule.pattern.as_deref() {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            push(&mut errors, field, rule, format!("{label} has an invalid format"));
                        }
                    }
                    Err(e) => {
                        warn!(field = %field.field_name, pattern, error = %e, "skipping uncompilable pattern");
                    }
                }
            }
        }

        if let Some(name) = rule.custom_validator_ref.as_deref() {
            match self.custom.get(name) {
                Some(validator) => {
                    if let Some(message) = validator(value, field) {
                        push(&mut errors, field, rule, message);
                    }
                }
                None => debug!(field = %field.field_name, validator = name, "unknown custom validator"),
            }
        }

        trace!(field = %field.field_name, errors = errors.len(), "validated field");
        ValidationResult::from_errors(errors)
    }

    /// Validate every visible field of a form. Hidden fields never contribute
    /// errors; a missing value counts as null. The pass never stops early.
    pub fn validate_form(
        &self,
        values: &IndexMap<String, Value>,
        fields: &[FieldDescriptor],
    ) -> ValidationResult {
        let errors = fields
            .iter()
            .filter(|field| !field.is_hidden())
            .flat_map(|field| {
                let value = values.get(&field.field_name).unwrap_or(&Value::Null);
                self.validate(value, field).into_errors()
            })
            .collect();
        ValidationResult::from_errors(errors)
    }

    fn effective_kind(&self, field: &FieldDescriptor) -> ValueKind {
        match self.dispatch {
            RuleDispatch::RuntimeType => ValueKind::Any,
            RuleDispatch::DeclaredType => self.kind_of(&field.plugin_type),
        }
    }
}

/// Null, the empty string and the empty array count as "no value".
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn push(errors: &mut Vec<FieldError>, field: &FieldDescriptor, rule: &ValidationRule, default: String) {
    let message = rule.message.clone().unwrap_or(default);
    errors.push(FieldError::new(field.field_name.clone(), message));
}
