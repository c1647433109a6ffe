//! FormRuntime: live state for a whole schema.
//!
//! A runtime is built from a `FormSchema`, seeds its `FormState` once at
//! construction, and delegates every validation to the injected
//! `ValidationEngine`. Observers registered with `on_values_change` and
//! `on_submit` run in registration order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dynform_fields::{
    FieldDescriptor, FormSchema, PluginRegistry, ValidationEngine, ValidationResult,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{FormError, Result};
use crate::options::FormOptions;
use crate::state::FormState;

type ValuesChangeObserver = Box<dyn FnMut(&str, &Value) + Send>;
type SubmitObserver = Box<dyn FnMut(&IndexMap<String, Value>) -> anyhow::Result<()> + Send>;

/// Result of a full-form validation pass: every failing visible field with its
/// first message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormValidation {
    pub valid: bool,
    pub errors: IndexMap<String, String>,
}

/// What `submit` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation passed and every submit observer ran with these values.
    Submitted(IndexMap<String, Value>),
    /// Validation failed; no observer ran.
    Invalid(FormValidation),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

/// Live state of a whole form schema, with its observers and submit pipeline.
pub struct FormRuntime {
    schema: FormSchema,
    engine: Arc<ValidationEngine>,
    registry: Option<Arc<PluginRegistry>>,
    options: FormOptions,
    state: FormState,
    submitting: Arc<AtomicBool>,
    value_observers: Vec<ValuesChangeObserver>,
    submit_observers: Vec<SubmitObserver>,
}

impl std::fmt::Debug for FormRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRuntime")
            .field("fields", &self.schema.len())
            .field("options", &self.options)
            .field("state", &self.state)
            .field("submitting", &self.is_submitting())
            .finish()
    }
}

impl FormRuntime {
    pub fn new(schema: FormSchema, engine: Arc<ValidationEngine>, options: FormOptions) -> Self {
        Self::build(schema, engine, None, options)
    }

    /// Like `new`, but field defaults fall back to the plugin's default config.
    pub fn with_registry(
        schema: FormSchema,
        engine: Arc<ValidationEngine>,
        registry: Arc<PluginRegistry>,
        options: FormOptions,
    ) -> Self {
        Self::build(schema, engine, Some(registry), options)
    }

    /// Build a runtime straight from a YAML schema document.
    pub fn from_yaml(yaml: &str, engine: Arc<ValidationEngine>, options: FormOptions) -> Result<Self> {
        let schema = FormSchema::from_yaml(yaml)?;
        Ok(Self::new(schema, engine, options))
    }

    fn build(
        schema: FormSchema,
        engine: Arc<ValidationEngine>,
        registry: Option<Arc<PluginRegistry>>,
        options: FormOptions,
    ) -> Self {
        let mut form = Self {
            schema,
            engine,
            registry,
            options,
            state: FormState::default(),
            submitting: Arc::new(AtomicBool::new(false)),
            value_observers: Vec::new(),
            submit_observers: Vec::new(),
        };
        form.init_field_values();
        debug!(fields = form.schema.len(), "form runtime created");
        form
    }

    /// Seed every schema field missing from `values` (initial value, then
    /// default), and reset errors, touched and validating for all of them.
    pub fn init_field_values(&mut self) {
        for field in self.schema.fields() {
            let initial = self.options.initial_values.get(&field.field_name);
            let default = default_value(field, self.registry.as_deref());
            self.state.seed(&field.field_name, || {
                initial.cloned().unwrap_or(default)
            });
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn get_field_value(&self, name: &str) -> Option<&Value> {
        self.state.value(name)
    }

    /// Snapshot of all values.
    pub fn get_values(&self) -> IndexMap<String, Value> {
        self.state.values().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Shared view of the submitting flag, readable from inside observers.
    pub fn submitting_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.submitting)
    }

    /// Validate one field by name. Unknown names are valid and change nothing.
    pub fn validate_field(&mut self, name: &str) -> ValidationResult {
        let Some(field) = self.schema.field(name) else {
            trace!(field = name, "validate_field on unknown field");
            return ValidationResult::ok();
        };

        self.state.set_validating(name, true);
        let value = self.state.value(name).cloned().unwrap_or(Value::Null);
        let result = self.engine.validate(&value, field);
        self.state.set_error(name, result.message().map(str::to_owned));
        self.state.set_validating(name, false);
        result
    }

    /// Validate every visible field. Always a full pass.
    pub fn validate(&mut self) -> FormValidation {
        let names: Vec<String> = self
            .schema
            .fields()
            .iter()
            .filter(|f| !f.is_hidden())
            .map(|f| f.field_name.clone())
            .collect();

        let mut errors = IndexMap::new();
        for name in names {
            let result = self.validate_field(&name);
            if let Some(message) = result.message() {
                errors.insert(name, message.to_owned());
            }
        }

        FormValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Every field back to its default; errors, touched and validating cleared.
    pub fn reset_fields(&mut self) {
        for field in self.schema.fields() {
            let default = default_value(field, self.registry.as_deref());
            self.state.set_value(&field.field_name, default);
            self.state.set_error(&field.field_name, None);
            self.state.set_touched(&field.field_name, false);
            self.state.set_validating(&field.field_name, false);
        }
        debug!("form fields reset");
    }

    pub fn clear_errors(&mut self) {
        self.state.clear_errors();
    }

    /// Mark a field as touched. Unknown names are ignored.
    pub fn set_field_touched(&mut self, name: &str, touched: bool) {
        self.state.set_touched(name, touched);
    }

    /// Set one value, notify value observers, then re-validate the field when
    /// `validate_on_change` is on. Names outside the schema are ignored.
    pub fn set_field_value(&mut self, name: &str, value: Value) {
        if !self.state.set_value(name, value) {
            debug!(field = name, "ignoring value for unknown field");
            return;
        }

        if let Some(current) = self.state.value(name) {
            for observer in &mut self.value_observers {
                observer(name, current);
            }
        }

        if self.options.validate_on_change {
            self.validate_field(name);
        }
    }

    /// Apply several values. Keys that are not already in `values` are dropped.
    pub fn set_fields_value<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (name, value) in values {
            let name = name.as_ref();
            if self.state.contains(name) {
                self.set_field_value(name, value);
            } else {
                trace!(field = name, "dropping value outside the schema");
            }
        }
    }

    pub fn on_values_change<F>(&mut self, observer: F)
    where
        F: FnMut(&str, &Value) + Send + 'static,
    {
        self.value_observers.push(Box::new(observer));
    }

    pub fn on_submit<F>(&mut self, observer: F)
    where
        F: FnMut(&IndexMap<String, Value>) -> anyhow::Result<()> + Send + 'static,
    {
        self.submit_observers.push(Box::new(observer));
    }

    /// Validate, then hand the values to every submit observer in order.
    ///
    /// The first failing observer stops the pipeline. The submitting flag is
    /// reset before this returns, whatever happened, panics included.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        let flag = Arc::clone(&self.submitting);
        flag.store(true, Ordering::SeqCst);
        let _reset = scopeguard::guard(flag, |flag| flag.store(false, Ordering::SeqCst));

        let validation = self.validate();
        if !validation.valid {
            debug!(errors = validation.errors.len(), "submit blocked by validation");
            return Ok(SubmitOutcome::Invalid(validation));
        }

        let values = self.get_values();
        for observer in &mut self.submit_observers {
            observer(&values).map_err(FormError::SubmitHandler)?;
        }
        debug!(observers = self.submit_observers.len(), "form submitted");
        Ok(SubmitOutcome::Submitted(values))
    }
}

fn default_value(field: &FieldDescriptor, registry: Option<&PluginRegistry>) -> Value {
    field
        .default_value()
        .or_else(|| {
            registry
                .and_then(|r| r.default_config(&field.plugin_type))
                .and_then(|c| c.default_value.as_ref())
        })
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynform_fields::{FieldConfig, PluginDescriptor, ValidationRule};
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Mutex;

    fn required(name: &str, label: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, label, "input").with_validation(ValidationRule {
            required: Some(true),
            ..Default::default()
        })
    }

    fn signup_schema() -> FormSchema {
        FormSchema::new(vec![
            required("name", "Name"),
            FieldDescriptor::new("age", "Age", "number")
                .with_config(FieldConfig {
                    default_value: Some(json!(18)),
                    ..Default::default()
                })
                .with_validation(ValidationRule {
                    required: Some(true),
                    min: Some(18.0),
                    max: Some(65.0),
                    ..Default::default()
                }),
            required("referrer", "Referrer").with_hidden(true),
        ])
        .unwrap()
    }

    fn form(options: FormOptions) -> FormRuntime {
        FormRuntime::new(signup_schema(), Arc::new(ValidationEngine::new()), options)
    }

    #[test]
    fn construction_seeds_all_maps() {
        let form = form(FormOptions::default().with_initial_value("name", json!("Ada")));
        let state = form.state();
        assert!(state.is_consistent());
        let keys: Vec<_> = state.values().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "referrer"]);
        assert_eq!(state.value("name"), Some(&json!("Ada")));
        assert_eq!(state.value("age"), Some(&json!(18)));
        assert_eq!(state.value("referrer"), Some(&Value::Null));
        assert!(state.errors().values().all(Option::is_none));
    }

    #[test]
    fn init_field_values_keeps_current_values() {
        let mut form = form(FormOptions::default());
        form.set_field_value("name", json!("Grace"));
        form.validate();
        form.init_field_values();
        assert_eq!(form.get_field_value("name"), Some(&json!("Grace")));
        assert!(form.state().errors().values().all(Option::is_none));
    }

    #[test]
    fn registry_supplies_plugin_defaults() {
        let registry: PluginRegistry = vec![PluginDescriptor::new("switch", "Switch").with_config(
            FieldConfig {
                default_value: Some(json!(false)),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect();
        let schema = FormSchema::new(vec![FieldDescriptor::new("agree", "Agree", "switch")]).unwrap();
        let form = FormRuntime::with_registry(
            schema,
            Arc::new(ValidationEngine::new()),
            Arc::new(registry),
            FormOptions::default(),
        );
        assert_eq!(form.get_field_value("agree"), Some(&json!(false)));
    }

    #[test]
    fn validate_field_unknown_name_is_valid() {
        let mut form = form(FormOptions::default());
        let before = form.state().clone();
        assert!(form.validate_field("nope").is_valid());
        assert_eq!(form.state(), &before);
    }

    #[test]
    fn validate_reports_every_visible_failure() {
        let mut form = form(FormOptions::default());
        form.set_field_value("age", json!(15));

        let validation = form.validate();
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 2);
        assert_eq!(validation.errors["name"], "Name must not be empty");
        assert_eq!(validation.errors["age"], "Age must not be less than 18");
        assert!(!validation.errors.contains_key("referrer"));
        assert_eq!(form.state().error("age"), Some("Age must not be less than 18"));
        assert!(form.state().validating().values().all(|v| !v));
    }

    #[test]
    fn reset_and_clear() {
        let mut form = form(FormOptions::default().with_initial_value("name", json!("Ada")));
        form.set_field_value("age", json!(99));
        form.set_field_touched("age", true);
        form.validate();
        assert!(form.state().error("age").is_some());

        form.clear_errors();
        assert!(form.state().errors().values().all(Option::is_none));
        assert_eq!(form.get_field_value("age"), Some(&json!(99)));

        form.reset_fields();
        assert_eq!(form.get_field_value("age"), Some(&json!(18)));
        assert_eq!(form.get_field_value("name"), Some(&Value::Null));
        assert!(!form.state().is_touched("age"));
        assert!(form.state().is_consistent());
    }

    #[test]
    fn value_observers_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut form = form(FormOptions::default());
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            form.on_values_change(move |name, value| {
                seen.lock().unwrap().push(format!("{tag}:{name}={value}"));
            });
        }
        form.set_field_value("name", json!("Ada"));
        form.set_field_value("ghost", json!(1));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:name=\"Ada\"", "second:name=\"Ada\""]
        );
    }

    #[rstest]
    #[case(true, Some("Age must not be greater than 65"))]
    #[case(false, None)]
    fn validate_on_change_flag(#[case] enabled: bool, #[case] expected: Option<&str>) {
        let mut form = form(FormOptions::default().validate_on_change(enabled));
        form.set_field_value("age", json!(70));
        assert_eq!(form.state().error("age"), expected);
    }

    #[test]
    fn set_fields_value_drops_unknown_keys() {
        let mut form = form(FormOptions::default());
        form.set_fields_value([("unknownKey", json!("x")), ("name", json!("Ada"))]);

        assert_eq!(form.get_field_value("name"), Some(&json!("Ada")));
        assert!(form.get_field_value("unknownKey").is_none());
        assert_eq!(form.get_values().len(), 3);
        assert!(form.state().is_consistent());
    }

    #[test]
    fn submit_runs_observers_with_values() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut form = form(FormOptions::default().with_initial_value("name", json!("Ada")));
        for i in 0..2 {
            let received = Arc::clone(&received);
            let flag = form.submitting_flag();
            form.on_submit(move |values| {
                assert!(flag.load(Ordering::SeqCst));
                received.lock().unwrap().push((i, values["name"].clone()));
                Ok(())
            });
        }

        let outcome = form.submit().unwrap();
        assert!(outcome.is_submitted());
        assert!(!form.is_submitting());
        assert_eq!(
            *received.lock().unwrap(),
            vec![(0, json!("Ada")), (1, json!("Ada"))]
        );
    }

    #[test]
    fn submit_invalid_skips_observers() {
        let called = Arc::new(AtomicBool::new(false));
        let mut form = form(FormOptions::default());
        let flag = Arc::clone(&called);
        form.on_submit(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        match form.submit().unwrap() {
            SubmitOutcome::Invalid(validation) => {
                assert!(validation.errors.contains_key("name"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(!called.load(Ordering::SeqCst));
        assert!(!form.is_submitting());
    }

    #[test_log::test]
    fn submit_observer_error_resets_flag() {
        let mut form = form(FormOptions::default().with_initial_value("name", json!("Ada")));
        let later = Arc::new(AtomicBool::new(false));
        form.on_submit(|_| Err(anyhow::anyhow!("network down")));
        let flag = Arc::clone(&later);
        form.on_submit(move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let err = form.submit().unwrap_err();
        assert!(matches!(err, FormError::SubmitHandler(_)));
        assert!(err.to_string().contains("network down"));
        assert!(!later.load(Ordering::SeqCst));
        assert!(!form.is_submitting());
    }

    #[test]
    fn submit_observer_panic_resets_flag() {
        let mut form = form(FormOptions::default().with_initial_value("name", json!("Ada")));
        form.on_submit(|_| panic!("observer bug"));
        let flag = form.submitting_flag();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| form.submit()));
        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn from_yaml_schema() {
        let yaml = r#"
fields:
  - fieldName: email
    label: Email
    pluginType: input
    validation:
      pattern: "^[^@]+@[^@]+$"
"#;
        let mut form = FormRuntime::from_yaml(
            yaml,
            Arc::new(ValidationEngine::new()),
            FormOptions::default().with_initial_value("email", json!("nobody")),
        )
        .unwrap();
        assert_eq!(form.validate().errors["email"], "Email has an invalid format");
    }

    proptest! {
        #[test]
        fn key_set_never_drifts(updates in proptest::collection::vec(("[a-z]{1,8}", any::<i32>()), 0..20)) {
            let mut form = form(FormOptions::default().validate_on_change(true));
            form.set_fields_value(updates.into_iter().map(|(k, v)| (k, json!(v))));
            form.validate();
            let keys: Vec<_> = form.state().values().keys().cloned().collect();
            prop_assert_eq!(keys, vec!["name".to_string(), "age".to_string(), "referrer".to_string()]);
            prop_assert!(form.state().is_consistent());
        }
    }
}
