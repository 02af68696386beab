//! # schemarpc-protocol
//!
//! Schema and message model for schemarpc.
//!
//! This crate provides:
//! - Schema nodes with a JSON declaration parser
//! - Protocol and message declarations
//! - Generic datum values
//! - A line-delimited JSON datum codec with schema resolution
//! - Call/reply envelope types
//! - Error codes and protocol constants

pub mod call;
pub mod codec;
pub mod error;
pub mod message;
pub mod schema;
pub mod value;

pub use call::{Call, CallHeader, Reply, ReplyHeader};
pub use codec::{DatumReader, DatumWriter, Decoder, Encoder};
pub use error::{ErrorCode, ProtocolError};
pub use message::{Message, Protocol};
pub use schema::{EnumSchema, Field, FixedSchema, Name, Primitive, RecordSchema, Schema};
pub use value::{Record, Value};

/// Envelope format version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// File extension conventionally used for protocol declarations.
pub const PROTOCOL_FILE_EXTENSION: &str = "avpr";
