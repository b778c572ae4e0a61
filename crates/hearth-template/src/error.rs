//! Error types for template rendering

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors a template engine may report from a render
///
/// Clone is part of the contract: the template tracker stores the last
/// error to de-duplicate repeated failures. Serializable so render
/// failures can be carried in event payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateError {
    /// Invalid template syntax
    #[error("invalid template syntax: {message}")]
    SyntaxError { message: String },

    /// Failed to render template
    #[error("failed to render template: {message}")]
    RenderError { message: String },

    /// Undefined variable in template
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    /// Type error in template
    #[error("type error: {message}")]
    TypeError { message: String },
}
