//! FieldRuntime: mutable state for one field.
//!
//! The state vector is `{value, error, touched, disabled, readonly}`. The
//! runtime keeps these consistent; callers only go through the operations.
//!
//! Re-validation on change is decided outside the runtime: every real value
//! change is offered to the registered [`RevalidationPolicy`] objects as a
//! [`ValueChange`], and the field validates when any of them asks for it.
//! The default policy is [`RevalidateWhenTouched`].

use std::sync::Arc;

use dynform_fields::{FieldConfig, FieldDescriptor, PluginRegistry, ValidationEngine, ValidationResult};
use serde_json::Value;
use tracing::trace;

use crate::options::FieldOptions;

/// Snapshot of a field's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldState {
    pub value: Value,
    pub error: Option<String>,
    pub touched: bool,
    pub disabled: bool,
    pub readonly: bool,
}

/// A value change offered to revalidation policies.
#[derive(Debug)]
pub struct ValueChange<'a> {
    pub field: &'a FieldDescriptor,
    pub previous: &'a Value,
    pub current: &'a Value,
    pub touched: bool,
}

/// Decides whether a value change should trigger validation.
pub trait RevalidationPolicy: Send + Sync {
    fn should_validate(&self, change: &ValueChange<'_>) -> bool;
}

/// Re-validate once the user has touched the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevalidateWhenTouched;

impl RevalidationPolicy for RevalidateWhenTouched {
    fn should_validate(&self, change: &ValueChange<'_>) -> bool {
        change.touched
    }
}

impl<F> RevalidationPolicy for F
where
    F: Fn(&ValueChange<'_>) -> bool + Send + Sync,
{
    fn should_validate(&self, change: &ValueChange<'_>) -> bool {
        self(change)
    }
}

/// Live state of one field, validated through a shared `ValidationEngine`.
pub struct FieldRuntime {
    field: FieldDescriptor,
    config: FieldConfig,
    engine: Arc<ValidationEngine>,
    options: FieldOptions,
    policies: Vec<Box<dyn RevalidationPolicy>>,
    state: FieldState,
}

impl std::fmt::Debug for FieldRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRuntime")
            .field("field", &self.field.field_name)
            .field("options", &self.options)
            .field("policies", &self.policies.len())
            .field("state", &self.state)
            .finish()
    }
}

impl FieldRuntime {
    /// Create a runtime seeded from the field's own config.
    pub fn new(field: FieldDescriptor, engine: Arc<ValidationEngine>, options: FieldOptions) -> Self {
        let config = field.config.clone().unwrap_or_default();
        Self::with_config(field, config, engine, options)
    }

    /// Create a runtime whose defaults fall back to the plugin's default config.
    pub fn with_registry(
        field: FieldDescriptor,
        registry: &PluginRegistry,
        engine: Arc<ValidationEngine>,
        options: FieldOptions,
    ) -> Self {
        let own = field.config.clone().unwrap_or_default();
        let config = match registry.default_config(&field.plugin_type) {
            Some(base) => own.merged_over(base),
            None => own,
        };
        Self::with_config(field, config, engine, options)
    }

    fn with_config(
        field: FieldDescriptor,
        config: FieldConfig,
        engine: Arc<ValidationEngine>,
        options: FieldOptions,
    ) -> Self {
        let state = FieldState {
            value: config.default_value.clone().unwrap_or(Value::Null),
            error: None,
            touched: false,
            disabled: field.disabled.or(config.disabled).unwrap_or(false),
            readonly: config.readonly.unwrap_or(false),
        };
        Self {
            field,
            config,
            engine,
            options,
            policies: vec![Box::new(RevalidateWhenTouched)],
            state,
        }
    }

    /// Add a revalidation policy next to the existing ones.
    pub fn with_policy(mut self, policy: impl RevalidationPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    /// Drop every policy, including the default touched policy.
    pub fn without_policies(mut self) -> Self {
        self.policies.clear();
        self
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn value(&self) -> &Value {
        &self.state.value
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn is_touched(&self) -> bool {
        self.state.touched
    }

    /// Set the value.
    ///
    /// Validates first when `validate_immediately` is on, then, if the value
    /// actually changed, once more when a policy asks for it. Returns the last
    /// validation result, if any ran.
    pub fn set_value(&mut self, value: Value) -> Option<ValidationResult> {
        let previous = std::mem::replace(&mut self.state.value, value);
        let mut result = None;

        if self.options.validate_immediately {
            result = Some(self.validate());
        }

        if previous != self.state.value {
            let change = ValueChange {
                field: &self.field,
                previous: &previous,
                current: &self.state.value,
                touched: self.state.touched,
            };
            // Every policy sees every change.
            let votes = self
                .policies
                .iter()
                .filter(|p| p.should_validate(&change))
                .count();
            if votes > 0 {
                trace!(field = %self.field.field_name, "policy revalidation");
                result = Some(self.validate());
            }
        }

        result
    }

    /// Mark the field as touched, as a blur would.
    pub fn touch(&mut self) {
        self.state.touched = true;
    }

    pub fn set_touched(&mut self, touched: bool) {
        self.state.touched = touched;
    }

    /// Run the engine and store the first message as the field error.
    pub fn validate(&mut self) -> ValidationResult {
        let result = self.engine.validate(&self.state.value, &self.field);
        self.state.error = result.message().map(str::to_owned);
        result
    }

    /// Back to the configured default, no error, untouched.
    pub fn reset(&mut self) {
        self.state.value = self.config.default_value.clone().unwrap_or(Value::Null);
        self.state.error = None;
        self.state.touched = false;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.state.disabled = disabled;
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.state.readonly = readonly;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynform_fields::{PluginDescriptor, ValidationRule};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn name_field() -> FieldDescriptor {
        FieldDescriptor::new("name", "Name", "input")
            .with_config(FieldConfig {
                default_value: Some(json!("guest")),
                ..Default::default()
            })
            .with_validation(ValidationRule {
                required: Some(true),
                max_length: Some(5),
                ..Default::default()
            })
    }

    fn runtime(options: FieldOptions) -> FieldRuntime {
        FieldRuntime::new(name_field(), Arc::new(ValidationEngine::new()), options)
    }

    #[test]
    fn starts_from_default_value() {
        let field = runtime(FieldOptions::default());
        assert_eq!(field.value(), &json!("guest"));
        assert!(field.error().is_none());
        assert!(!field.is_touched());
        assert!(!field.state().disabled);
    }

    #[test]
    fn untouched_change_does_not_validate() {
        let mut field = runtime(FieldOptions::default());
        assert!(field.set_value(json!("")).is_none());
        assert!(field.error().is_none());
    }

    #[test]
    fn touched_change_revalidates() {
        let mut field = runtime(FieldOptions::default());
        field.touch();
        let result = field.set_value(json!("")).unwrap();
        assert!(!result.is_valid());
        assert_eq!(field.error(), Some("Name must not be empty"));

        field.set_value(json!("Ada"));
        assert!(field.error().is_none());
    }

    #[test]
    fn immediate_validation_ignores_touched() {
        let mut field = runtime(FieldOptions {
            validate_immediately: true,
        });
        let result = field.set_value(json!("toolong")).unwrap();
        assert_eq!(result.message(), Some("Name must be at most 5 characters"));
        assert_eq!(field.error(), Some("Name must be at most 5 characters"));

        // Same value again: still validated immediately, no change event.
        assert!(field.set_value(json!("toolong")).is_some());
    }

    #[test]
    fn both_triggers_fire_on_one_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut field = runtime(FieldOptions {
            validate_immediately: true,
        })
        .with_policy(move |change: &ValueChange<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            change.touched
        });
        field.touch();
        field.set_value(json!("x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(field.error().is_none());
    }

    #[test]
    fn policies_see_previous_and_current() {
        let mut field = runtime(FieldOptions::default())
            .without_policies()
            .with_policy(|change: &ValueChange<'_>| {
                change.previous == &json!("guest") && change.current == &json!("")
            });
        field.set_value(json!(""));
        assert_eq!(field.error(), Some("Name must not be empty"));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut field = runtime(FieldOptions::default());
        field.touch();
        field.set_value(json!(""));
        assert!(field.error().is_some());

        field.reset();
        let once = field.state().clone();
        field.reset();
        assert_eq!(field.state(), &once);
        assert_eq!(once.value, json!("guest"));
        assert!(once.error.is_none());
        assert!(!once.touched);
    }

    #[test]
    fn reset_without_default_is_null() {
        let mut field = FieldRuntime::new(
            FieldDescriptor::new("note", "Note", "textarea"),
            Arc::new(ValidationEngine::new()),
            FieldOptions::default(),
        );
        field.set_value(json!("hello"));
        field.reset();
        assert_eq!(field.value(), &Value::Null);
    }

    #[test]
    fn disabled_and_readonly_are_plain_setters() {
        let mut field = runtime(FieldOptions::default());
        field.touch();
        field.set_value(json!(""));
        let error = field.error().map(str::to_owned);

        field.set_disabled(true);
        field.set_readonly(true);
        assert!(field.state().disabled);
        assert!(field.state().readonly);
        assert_eq!(field.value(), &json!(""));
        assert_eq!(field.error().map(str::to_owned), error);
    }

    #[test]
    fn registry_defaults_fill_gaps() {
        let mut registry = PluginRegistry::new();
        registry.register(PluginDescriptor::new("rate", "Rate").with_config(FieldConfig {
            default_value: Some(json!(3)),
            readonly: Some(true),
            ..Default::default()
        }));

        let field = FieldRuntime::with_registry(
            FieldDescriptor::new("score", "Score", "rate").with_disabled(true),
            &registry,
            Arc::new(ValidationEngine::new()),
            FieldOptions::default(),
        );
        assert_eq!(field.value(), &json!(3));
        assert!(field.state().readonly);
        assert!(field.state().disabled);
    }
}
