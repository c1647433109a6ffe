//! FormState: the four parallel per-field maps of a form.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Values, errors, touched flags and validating flags, keyed by field name.
///
/// All four maps always hold the same keys. Setters ignore names that are not
/// already present, so the key set can only change through [`FormState::seed`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    values: IndexMap<String, Value>,
    errors: IndexMap<String, Option<String>>,
    touched: IndexMap<String, bool>,
    validating: IndexMap<String, bool>,
}

impl FormState {
    /// Add `name` with `value` if it is new, and reset its flags either way.
    pub(crate) fn seed(&mut self, name: &str, value: impl FnOnce() -> Value) {
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), value());
        }
        self.errors.insert(name.to_string(), None);
        self.touched.insert(name.to_string(), false);
        self.validating.insert(name.to_string(), false);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn errors(&self) -> &IndexMap<String, Option<String>> {
        &self.errors
    }

    pub fn touched(&self) -> &IndexMap<String, bool> {
        &self.touched
    }

    pub fn validating(&self) -> &IndexMap<String, bool> {
        &self.validating
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).and_then(|e| e.as_deref())
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.get(name).copied().unwrap_or(false)
    }

    pub fn is_validating(&self, name: &str) -> bool {
        self.validating.get(name).copied().unwrap_or(false)
    }

    pub(crate) fn set_value(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_error(&mut self, name: &str, error: Option<String>) {
        if let Some(slot) = self.errors.get_mut(name) {
            *slot = error;
        }
    }

    pub(crate) fn set_touched(&mut self, name: &str, touched: bool) {
        if let Some(slot) = self.touched.get_mut(name) {
            *slot = touched;
        }
    }

    pub(crate) fn set_validating(&mut self, name: &str, validating: bool) {
        if let Some(slot) = self.validating.get_mut(name) {
            *slot = validating;
        }
    }

    pub(crate) fn clear_errors(&mut self) {
        self.errors.values_mut().for_each(|e| *e = None);
    }

    /// True when the four maps share one key set.
    pub fn is_consistent(&self) -> bool {
        self.values.len() == self.errors.len()
            && self.values.len() == self.touched.len()
            && self.values.len() == self.validating.len()
            && self.values.keys().all(|k| {
                self.errors.contains_key(k)
                    && self.touched.contains_key(k)
                    && self.validating.contains_key(k)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seed_keeps_existing_values() {
        let mut state = FormState::default();
        state.seed("a", || json!(1));
        state.set_error("a", Some("bad".into()));
        state.set_touched("a", true);

        state.seed("a", || json!(2));
        assert_eq!(state.value("a"), Some(&json!(1)));
        assert!(state.error("a").is_none());
        assert!(!state.is_touched("a"));
        assert!(state.is_consistent());
    }

    #[test]
    fn setters_ignore_unknown_names() {
        let mut state = FormState::default();
        state.seed("a", || Value::Null);

        assert!(!state.set_value("b", json!(1)));
        state.set_error("b", Some("x".into()));
        state.set_touched("b", true);
        state.set_validating("b", true);

        assert!(!state.contains("b"));
        assert_eq!(state.values().len(), 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn serializes_as_four_maps() {
        let mut state = FormState::default();
        state.seed("age", || json!(20));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["values"]["age"], 20);
        assert_eq!(json["errors"]["age"], Value::Null);
        assert_eq!(json["touched"]["age"], false);
        assert_eq!(json["validating"]["age"], false);
    }
}
