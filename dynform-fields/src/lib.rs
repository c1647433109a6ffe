//! Field descriptors, plugin registry and validation engine
//!
//! `dynform-fields` is the schema-only half of dynform. It owns the declarative
//! types (field descriptors, validation rules, plugin descriptors), the local
//! plugin registry, and the pure validation engine. It holds no form state;
//! that lives in `dynform-form`.
//!
//! # Architecture
//!
//! - **Schema-only**: descriptors are immutable once a schema is built
//! - **Owned registry**: `PluginRegistry` is a plain value passed to consumers, never a global
//! - **Pure validation**: `ValidationEngine::validate` maps `(value, field)` to a `ValidationResult`
//!   and never fails; bad rule configuration degrades to a skipped rule

pub mod error;
pub mod registry;
pub mod types;
pub mod validation;

pub use error::{FieldsError, Result};
pub use registry::PluginRegistry;
pub use types::{
    FieldConfig, FieldDescriptor, FieldError, FormSchema, PluginDescriptor, PluginStatus,
    ValidationResult, ValidationRule,
};
pub use validation::{CustomValidator, RuleDispatch, ValidationEngine, ValueKind};
