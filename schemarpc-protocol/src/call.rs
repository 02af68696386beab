//! Call and reply envelopes.
//!
//! A call is a [`CallHeader`] line followed by the request datum. A reply is a
//! [`ReplyHeader`] line followed by either the response datum or the error
//! datum, encoded against the message's error union. One-way calls have no
//! reply.

use crate::codec::{DatumReader, DatumWriter, Decoder, Encoder};
use crate::error::ProtocolError;
use crate::message::Message;
use crate::value::{Record, Value};
use crate::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header line of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallHeader {
    /// Name of the message being called.
    pub message: String,

    /// Envelope version. Callers that omit it are assumed to speak the
    /// current version.
    #[serde(default = "current_version")]
    pub version: u16,

    /// Opaque caller metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl CallHeader {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            version: PROTOCOL_VERSION,
            metadata: HashMap::new(),
        }
    }

    /// Rejects envelopes from a different protocol version.
    pub fn check_version(&self) -> Result<(), ProtocolError> {
        if self.version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

fn current_version() -> u16 {
    PROTOCOL_VERSION
}

/// Header line of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyHeader {
    /// Whether the datum that follows is an error.
    pub error: bool,
}

/// Client-side call builder.
pub struct Call;

impl Call {
    /// Encodes a call to `message` with the given arguments.
    pub fn encode(message: &Message, request: &Record) -> Result<Vec<u8>, ProtocolError> {
        Self::encode_with_header(&CallHeader::new(&message.name), message, request)
    }

    pub fn encode_with_header(
        header: &CallHeader,
        message: &Message,
        request: &Record,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut encoder = Encoder::new();
        encoder.write_header(header)?;
        DatumWriter::new(message.request_schema())
            .write(&Value::Record(request.clone()), &mut encoder)?;
        Ok(encoder.into_bytes().to_vec())
    }
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Response(Value),
    /// Error datum: a string for undeclared faults, otherwise a declared
    /// error record.
    Error(Value),
}

impl Reply {
    pub fn decode(message: &Message, bytes: &[u8]) -> Result<Self, ProtocolError> {
        if message.one_way && bytes.is_empty() {
            return Ok(Reply::Response(Value::Null));
        }

        let mut decoder = Decoder::new();
        decoder.extend(bytes);
        let header: ReplyHeader = decoder.read_header()?;

        if header.error {
            let schema = message.error_schema();
            let datum = DatumReader::new(schema.clone(), schema).read(&mut decoder)?;
            Ok(Reply::Error(datum))
        } else {
            let datum = DatumReader::new(message.response.clone(), message.response.clone())
                .read(&mut decoder)?;
            Ok(Reply::Response(datum))
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
