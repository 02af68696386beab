//! Request dispatch.
//!
//! [`Responder`] is the transport-agnostic responder interface: it turns a
//! whole call buffer into a reply buffer. [`ServiceResponder`] implements it
//! for any [`Service`] by resolving each message's parameter types and
//! invoking the matching method from the service's [`MethodTable`].

use crate::config::Config;
use crate::error::{DispatchError, HandlerFault};
use crate::method::{InvokeError, MethodTable, Signature};
use crate::resolver::TypeResolver;
use schemarpc_protocol::{
    CallHeader, DatumReader, DatumWriter, Decoder, Encoder, Message, Protocol, ProtocolError,
    Record, ReplyHeader, Schema, Value,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A service implementation: a protocol plus one handler per message.
pub trait Service: Send + Sync + Sized + 'static {
    fn protocol(&self) -> &Protocol;

    /// Registers this service's handlers.
    fn register(methods: &mut MethodTable<Self>) -> Result<(), DispatchError>;
}

/// Answers calls for a protocol.
pub trait Responder {
    fn protocol(&self) -> &Protocol;

    /// Dispatches one decoded request and returns the raw response datum.
    fn respond(&self, message: &Message, request: &Record) -> Result<Value, DispatchError>;

    fn read_request(
        &self,
        actual: &Schema,
        expected: &Schema,
        decoder: &mut Decoder,
    ) -> Result<Value, DispatchError>;

    fn write_response(
        &self,
        schema: &Schema,
        response: &Value,
        encoder: &mut Encoder,
    ) -> Result<(), DispatchError>;

    fn write_error(
        &self,
        schema: &Schema,
        error: &Value,
        encoder: &mut Encoder,
    ) -> Result<(), DispatchError>;

    /// Converts a handler fault to a datum of `message`'s error union.
    fn fault_value(&self, message: &Message, fault: &HandlerFault) -> Value {
        let _ = message;
        Value::String(fault.to_string())
    }

    /// Handles one complete call and returns the encoded reply.
    ///
    /// Handler faults are encoded in the reply. Every other failure is
    /// returned as an error with no reply written. One-way messages produce
    /// an empty reply.
    fn handle(&self, call: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let mut decoder = Decoder::new();
        decoder.extend(call);

        let header: CallHeader = decoder.read_header()?;
        header.check_version()?;
        let message = self
            .protocol()
            .message(&header.message)
            .ok_or_else(|| DispatchError::UnknownMessage(header.message.clone()))?;

        let schema = message.request_schema();
        let request = match self.read_request(&schema, &schema, &mut decoder)? {
            Value::Record(record) => record,
            other => {
                return Err(ProtocolError::TypeMismatch {
                    expected: "record".to_string(),
                    found: other.kind().to_string(),
                }
                .into())
            }
        };

        let mut encoder = Encoder::new();
        match self.respond(message, &request) {
            Ok(_) if message.one_way => return Ok(Vec::new()),
            Ok(response) => {
                encoder.write_header(&ReplyHeader { error: false })?;
                self.write_response(&message.response, &response, &mut encoder)?;
            }
            Err(DispatchError::Handler(fault)) => {
                if message.one_way {
                    return Ok(Vec::new());
                }
                let datum = self.fault_value(message, &fault);
                encoder.write_header(&ReplyHeader { error: true })?;
                self.write_error(&message.error_schema(), &datum, &mut encoder)?;
            }
            Err(e) => return Err(e),
        }

        Ok(encoder.into_bytes().to_vec())
    }
}

/// Dispatches calls to a [`Service`] through its method table.
pub struct ServiceResponder<S: Service> {
    service: Arc<S>,
    methods: MethodTable<S>,
    resolver: TypeResolver,
    /// Signatures resolved at construction, by message name.
    signatures: HashMap<String, Signature>,
}

impl<S: Service> ServiceResponder<S> {
    pub fn new(service: Arc<S>) -> Result<Self, DispatchError> {
        Self::with_config(service, &Config::default())
    }

    pub fn with_config(service: Arc<S>, config: &Config) -> Result<Self, DispatchError> {
        let mut methods = MethodTable::new();
        S::register(&mut methods)?;

        let resolver = TypeResolver::new(config.resolver.unwrap);
        let signatures = service
            .protocol()
            .messages()
            .iter()
            .map(|m| (m.name.clone(), resolver.resolve_message(m)))
            .collect();

        let responder = Self {
            service,
            methods,
            resolver,
            signatures,
        };

        info!(
            protocol = %responder.service.protocol().fullname(),
            messages = responder.signatures.len(),
            methods = responder.methods.len(),
            unwrap = ?config.resolver.unwrap,
            "service responder ready"
        );

        if config.dispatch.eager_validation {
            responder.validate()?;
        }

        Ok(responder)
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn methods(&self) -> &MethodTable<S> {
        &self.methods
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Returns the resolved signature of `message`. Messages owned by this
    /// responder's protocol use the signature resolved at construction.
    pub fn signature(&self, message: &Message) -> Cow<'_, Signature> {
        let owned = self
            .service
            .protocol()
            .message(&message.name)
            .is_some_and(|m| std::ptr::eq(m, message));

        match self.signatures.get(&message.name) {
            Some(signature) if owned => Cow::Borrowed(signature),
            _ => Cow::Owned(self.resolver.resolve_message(message)),
        }
    }

    /// Checks that every protocol message has a matching method.
    pub fn validate(&self) -> Result<(), DispatchError> {
        for message in self.service.protocol().messages() {
            let signature = self.signature(message);
            if !self.methods.contains(&signature) {
                warn!(%signature, "no method matches protocol message");
                return Err(DispatchError::MethodResolution {
                    signature: signature.into_owned(),
                });
            }
        }
        Ok(())
    }
}

impl<S: Service> Responder for ServiceResponder<S> {
    fn protocol(&self) -> &Protocol {
        self.service.protocol()
    }

    fn respond(&self, message: &Message, request: &Record) -> Result<Value, DispatchError> {
        let signature = self.signature(message);

        let mut args = Vec::with_capacity(message.request.len());
        for field in &message.request {
            let value = request
                .get(&field.name)
                .ok_or_else(|| DispatchError::MissingArgument {
                    message: message.name.clone(),
                    field: field.name.clone(),
                })?;
            args.push(value.clone());
        }

        let Some(method) = self.methods.lookup(&signature) else {
            warn!(%signature, "no method matches message");
            return Err(DispatchError::MethodResolution {
                signature: signature.into_owned(),
            });
        };

        debug!(message = %message.name, %signature, "dispatching");

        match method(self.service.as_ref(), args) {
            Ok(value) => Ok(value),
            Err(InvokeError::Argument { index, reason }) => Err(DispatchError::InvalidArgument {
                message: message.name.clone(),
                field: message
                    .request
                    .get(index)
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
                reason,
            }),
            Err(InvokeError::Fault(fault)) => {
                warn!(message = %message.name, error = %fault, "handler fault");
                Err(DispatchError::Handler(fault))
            }
        }
    }

    fn read_request(
        &self,
        actual: &Schema,
        expected: &Schema,
        decoder: &mut Decoder,
    ) -> Result<Value, DispatchError> {
        Ok(DatumReader::new(actual.clone(), expected.clone()).read(decoder)?)
    }

    fn write_response(
        &self,
        schema: &Schema,
        response: &Value,
        encoder: &mut Encoder,
    ) -> Result<(), DispatchError> {
        Ok(DatumWriter::new(schema.clone()).write(response, encoder)?)
    }

    fn write_error(
        &self,
        schema: &Schema,
        error: &Value,
        encoder: &mut Encoder,
    ) -> Result<(), DispatchError> {
        Ok(DatumWriter::new(schema.clone()).write(error, encoder)?)
    }

    /// Declared fault types are sent as their datum when the message lists
    /// them among its errors, and as their display string otherwise.
    fn fault_value(&self, message: &Message, fault: &HandlerFault) -> Value {
        if let Some((type_id, value)) = self.methods.encode_fault(&**fault) {
            let declared = message
                .errors
                .iter()
                .any(|e| e.fullname().as_deref() == Some(type_id.as_str()));
            if declared {
                return value;
            }
            debug!(message = %message.name, fault = %type_id, "fault type not declared by message");
        }
        Value::String(fault.to_string())
    }
}
