//! # schemarpc-core
//!
//! Request dispatcher for schemarpc.
//!
//! This crate provides:
//! - Schema-to-native type resolution
//! - Typed handler registration keyed by message name and parameter types
//! - The service responder that decodes, dispatches and encodes calls
//! - Dispatch errors that carry handler faults unchanged
//! - Dispatcher configuration

pub mod config;
pub mod error;
pub mod method;
pub mod native;
pub mod resolver;
pub mod responder;

pub use config::{Config, ConfigError, DispatchConfig, ResolverConfig, UnwrapMode};
pub use error::{DispatchError, HandlerFault};
pub use method::{Handler, InvokeError, Method, MethodTable, Signature};
pub use native::{take_field, ConversionError, FromValue, IntoValue, NativeType, NativeTypeId};
pub use resolver::{primitive_type_id, TypeResolver};
pub use responder::{Responder, Service, ServiceResponder};
