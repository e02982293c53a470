//! Error types for pgtext.

use thiserror::Error;

/// The main error type for codec operations.
///
/// Every error aborts the call that raised it; any buffer the call was
/// appending to is rolled back to its length at entry.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed literal text (unbalanced brace, paren or quote, stray character).
    #[error("Format error at position {position}: {message}")]
    Format { position: usize, message: String },

    /// Runtime value does not match the requested SQL type.
    #[error("Type mismatch: cannot encode {found} as {kind}")]
    TypeMismatch { kind: &'static str, found: &'static str },

    /// Precision, scale or length outside a type's declared bounds.
    #[error("Range error: {0}")]
    Range(String),

    /// Bound decoration dimension count differs from the target array.
    #[error("Dimension mismatch: expected {expected} dimension(s), found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Typed record with the wrong number of columns.
    #[error("Column count mismatch: expected {expected} column(s), found {found}")]
    ColumnCount { expected: usize, found: usize },

    /// Element text that cannot be decoded as its declared kind.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Create a format error at the given position.
    pub fn format(position: usize, message: impl Into<String>) -> Self {
        Self::Format {
            position,
            message: message.into(),
        }
    }

    /// Create a range error.
    pub fn range(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }

    /// Create an invalid value error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Position of a format error, if this is one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Format { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::format(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Format error at position 5: unexpected character"
        );
        assert_eq!(err.position(), Some(5));
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = CodecError::TypeMismatch {
            kind: "int4",
            found: "text",
        };
        assert_eq!(err.to_string(), "Type mismatch: cannot encode text as int4");
        assert_eq!(err.position(), None);
    }
}
