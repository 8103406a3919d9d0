use thiserror::Error;

/// Validation errors for canonical primitives.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When an identity pattern cannot be compiled.
    #[error("identity pattern '{pattern}' is invalid: {reason}")]
    InvalidPattern {
        /// Pattern as supplied.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}
