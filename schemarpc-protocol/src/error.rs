//! Protocol error types and error codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing schemas and protocols or while reading and
/// writing datums.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown symbol '{symbol}' for enum {name}")]
    UnknownSymbol { name: String, symbol: String },

    #[error("fixed {name} expects {expected} bytes, got {actual}")]
    FixedSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("no union branch matches {0}")]
    NoUnionBranch(String),

    #[error("incompatible schemas: cannot read {actual} as {expected}")]
    IncompatibleSchema { actual: String, expected: String },

    #[error("unknown message: {0}")]
    UnknownMessage(String),

    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u16),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("value not representable in JSON: {0}")]
    NotRepresentable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,
}

/// Stable error codes for failures reported outside a reply payload.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors
    BadRequest,
    UnsupportedProtocol,
    UnknownMessage,
    InvalidArgument,

    // Binding errors
    MethodNotFound,
    DuplicateMethod,

    // Application errors
    HandlerFault,

    // System errors
    InternalError,
}

impl ErrorCode {
    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::InternalError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::BadRequest => write!(f, "BAD_REQUEST"),
            ErrorCode::UnsupportedProtocol => write!(f, "UNSUPPORTED_PROTOCOL"),
            ErrorCode::UnknownMessage => write!(f, "UNKNOWN_MESSAGE"),
            ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorCode::MethodNotFound => write!(f, "METHOD_NOT_FOUND"),
            ErrorCode::DuplicateMethod => write!(f, "DUPLICATE_METHOD"),
            ErrorCode::HandlerFault => write!(f, "HANDLER_FAULT"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_retryable() {
        assert!(ErrorCode::InternalError.is_retryable());

        assert!(!ErrorCode::BadRequest.is_retryable());
        assert!(!ErrorCode::UnsupportedProtocol.is_retryable());
        assert!(!ErrorCode::UnknownMessage.is_retryable());
        assert!(!ErrorCode::InvalidArgument.is_retryable());
        assert!(!ErrorCode::MethodNotFound.is_retryable());
        assert!(!ErrorCode::DuplicateMethod.is_retryable());
        assert!(!ErrorCode::HandlerFault.is_retryable());
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::BadRequest), "BAD_REQUEST");
        assert_eq!(
            format!("{}", ErrorCode::UnsupportedProtocol),
            "UNSUPPORTED_PROTOCOL"
        );
        assert_eq!(format!("{}", ErrorCode::UnknownMessage), "UNKNOWN_MESSAGE");
        assert_eq!(
            format!("{}", ErrorCode::InvalidArgument),
            "INVALID_ARGUMENT"
        );
        assert_eq!(format!("{}", ErrorCode::MethodNotFound), "METHOD_NOT_FOUND");
        assert_eq!(
            format!("{}", ErrorCode::DuplicateMethod),
            "DUPLICATE_METHOD"
        );
        assert_eq!(format!("{}", ErrorCode::HandlerFault), "HANDLER_FAULT");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::MethodNotFound).unwrap();
        assert_eq!(json, "\"METHOD_NOT_FOUND\"");

        let parsed: ErrorCode = serde_json::from_str("\"HANDLER_FAULT\"").unwrap();
        assert_eq!(parsed, ErrorCode::HandlerFault);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::TypeMismatch {
            expected: "int".to_string(),
            found: "string".to_string(),
        };
        assert_eq!(err.to_string(), "type mismatch: expected int, found string");

        let err = ProtocolError::UnknownSymbol {
            name: "cards.Suit".to_string(),
            symbol: "STARS".to_string(),
        };
        assert!(err.to_string().contains("STARS"));
        assert!(err.to_string().contains("cards.Suit"));

        let err = ProtocolError::FixedSize {
            name: "md5".to_string(),
            expected: 16,
            actual: 4,
        };
        assert!(err.to_string().contains("16"));

        let err = ProtocolError::MissingField("amount".to_string());
        assert!(err.to_string().contains("amount"));

        let err = ProtocolError::UnsupportedVersion(99);
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }
}
