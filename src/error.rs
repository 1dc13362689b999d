//! Error types.
//!
//! The compiler itself is permissive and never fails on odd schema input; the
//! only fallible steps are decoding JSON text or a configuration file and
//! compiling a regular expression.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// Text that is not JSON, or a configuration value of the wrong type.
    #[error("invalid document at JSON path {path}: {message}")]
    Decode { path: String, message: String },

    /// A `pattern` (or configured format pattern) is not a valid regex.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
