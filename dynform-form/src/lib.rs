//! Live form state for dynform schemas
//!
//! Two runtimes sit on top of `dynform-fields`:
//!
//! - [`FieldRuntime`] holds the state of a single field (value, error, touched,
//!   disabled, readonly) and re-validates through [`RevalidationPolicy`] objects
//!   that listen to value changes.
//! - [`FormRuntime`] holds a whole schema's [`FormState`], validates all visible
//!   fields, and runs the submit pipeline with its observers.
//!
//! Both are synchronous and owned by a single caller. The `ValidationEngine`
//! and `PluginRegistry` are injected, never global.

pub mod error;
pub mod field;
pub mod form;
pub mod options;
pub mod state;

pub use error::{FormError, Result};
pub use field::{FieldRuntime, FieldState, RevalidateWhenTouched, RevalidationPolicy, ValueChange};
pub use form::{FormRuntime, FormValidation, SubmitOutcome};
pub use options::{FieldOptions, FormOptions};
pub use state::FormState;
