//! Error types for schema loading and registry operations

use thiserror::Error;

/// Result type for fields operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while building schemas.
///
/// Validation itself never produces one of these: rule violations are values
/// (`ValidationResult`), not errors.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Two descriptors in one schema share a field name
    #[error("duplicate field name: {name}")]
    DuplicateFieldName { name: String },

    /// A descriptor was declared without a field name
    #[error("field at position {index} has an empty field name")]
    EmptyFieldName { index: usize },

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
