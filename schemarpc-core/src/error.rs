//! Dispatch error types.

use crate::method::Signature;
use crate::native::ConversionError;
use schemarpc_protocol::{ErrorCode, ProtocolError};
use std::error::Error as StdError;
use thiserror::Error;

/// An error produced by a handler, passed through dispatch unchanged.
pub type HandlerFault = Box<dyn StdError + Send + Sync + 'static>;

/// Errors from the request dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no method matches {signature}")]
    MethodResolution { signature: Signature },

    #[error("handler fault: {0}")]
    Handler(#[source] HandlerFault),

    #[error("missing argument '{field}' for message '{message}'")]
    MissingArgument { message: String, field: String },

    #[error("invalid argument '{field}' for message '{message}': {reason}")]
    InvalidArgument {
        message: String,
        field: String,
        #[source]
        reason: ConversionError,
    },

    #[error("unknown message: {0}")]
    UnknownMessage(String),

    #[error("method already registered: {0}")]
    DuplicateMethod(Signature),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl DispatchError {
    /// Returns the handler's original error, if this is a handler fault.
    pub fn handler_fault(&self) -> Option<&HandlerFault> {
        match self {
            DispatchError::Handler(fault) => Some(fault),
            _ => None,
        }
    }

    /// Unwraps the handler's original error, or returns `self` unchanged.
    pub fn into_handler_fault(self) -> Result<HandlerFault, Self> {
        match self {
            DispatchError::Handler(fault) => Ok(fault),
            other => Err(other),
        }
    }

    /// Downcasts a handler fault to its concrete type.
    pub fn downcast_fault<E: StdError + 'static>(&self) -> Option<&E> {
        self.handler_fault().and_then(|fault| fault.downcast_ref::<E>())
    }

    /// Returns whether this error indicates the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        self.error_code().is_retryable()
    }

    /// Returns an error code suitable for reporting outside a reply.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            DispatchError::MethodResolution { .. } => ErrorCode::MethodNotFound,
            DispatchError::Handler(_) => ErrorCode::HandlerFault,
            DispatchError::MissingArgument { .. } => ErrorCode::InvalidArgument,
            DispatchError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            DispatchError::UnknownMessage(_) => ErrorCode::UnknownMessage,
            DispatchError::DuplicateMethod(_) => ErrorCode::DuplicateMethod,
            DispatchError::Protocol(ProtocolError::Io(_)) => ErrorCode::InternalError,
            DispatchError::Protocol(ProtocolError::UnsupportedVersion(_)) => {
                ErrorCode::UnsupportedProtocol
            }
            DispatchError::Protocol(_) => ErrorCode::BadRequest,
        }
    }
}
