//! Error types for record validation.

use thiserror::Error;

/// Result type for record validation.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised when a record violates an invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A field that may only be set once was changed.
    #[error("field {field} is immutable once set (old={old:?}, new={new:?})")]
    ImmutableField {
        /// Field path.
        field: &'static str,
        /// Previously stored value.
        old: String,
        /// Rejected value.
        new: String,
    },

    /// Record metadata is missing a required value.
    #[error("invalid metadata: {0}")]
    InvalidMeta(String),

    /// An enum value could not be parsed.
    #[error("unknown {kind} value: {value}")]
    UnknownValue {
        /// Enum name.
        kind: &'static str,
        /// Rejected value.
        value: String,
    },
}
