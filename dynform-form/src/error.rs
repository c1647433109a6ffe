//! Error types for the form runtime

use dynform_fields::FieldsError;
use thiserror::Error;

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors surfaced by the form runtime.
///
/// Invalid field values are not errors; they come back as a
/// `FormValidation` inside `SubmitOutcome::Invalid`.
#[derive(Debug, Error)]
pub enum FormError {
    /// A submit observer returned an error
    #[error("submit handler failed: {0}")]
    SubmitHandler(anyhow::Error),

    /// The schema could not be built
    #[error(transparent)]
    Schema(#[from] FieldsError),
}
