//! Centralized error types for mimetree.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mimetree library.
///
/// Only structural failures are surfaced here. Best-effort operations
/// (encoded words, attachment text, multipart structure) degrade to the most
/// literal representation instead of returning one of these.
#[derive(Error, Debug)]
pub enum MimeError {
    /// The header block cannot be delimited from the body at all.
    #[error("Malformed header block: {0}")]
    MalformedHeader(String),

    /// A date-time value did not match the RFC 2822 grammar, even with the
    /// obsolete and tolerant forms applied.
    #[error("Invalid date format '{input}': {reason}")]
    InvalidDateFormat { input: String, reason: String },

    /// Transfer decoding met a character outside the encoding's alphabet.
    #[error("Invalid {encoding} data at offset {offset}: unexpected byte 0x{byte:02x}")]
    InvalidEncoding {
        encoding: &'static str,
        offset: usize,
        byte: u8,
    },

    /// The declared charset does not map to any known decoder.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("Message file not found: {0}")]
    FileNotFound(PathBuf),

    /// An export operation failed.
    #[error("Export error: {0}")]
    ExportError(String),
}

/// Convenience alias for `Result<T, MimeError>`.
pub type Result<T> = std::result::Result<T, MimeError>;

impl MimeError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `InvalidDateFormat` variant.
    pub fn date(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDateFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MimeError`
/// when no path context is available (rare, prefer `MimeError::io`).
impl From<std::io::Error> for MimeError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_encoding_message() {
        let err = MimeError::InvalidEncoding {
            encoding: "base64",
            offset: 7,
            byte: b'*',
        };
        assert_eq!(
            err.to_string(),
            "Invalid base64 data at offset 7: unexpected byte 0x2a"
        );
    }

    #[test]
    fn test_date_helper() {
        let err = MimeError::date("32 Foo 2020", "unknown month");
        assert!(matches!(err, MimeError::InvalidDateFormat { .. }));
        assert!(err.to_string().contains("32 Foo 2020"));
    }
}
