//! Protocol and message declarations.
//!
//! A protocol is declared in JSON:
//!
//! ```json
//! {
//!   "protocol": "Calculator",
//!   "namespace": "math",
//!   "types": [{"type": "error", "name": "DivideByZero", "fields": []}],
//!   "messages": {
//!     "divide": {
//!       "request": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
//!       "response": "int",
//!       "errors": ["DivideByZero"]
//!     }
//!   }
//! }
//! ```

use crate::error::ProtocolError;
use crate::schema::{Field, Name, Parser, Primitive, RecordSchema, Schema};
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use std::sync::Arc;

/// A single remote call declared by a protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub doc: Option<String>,
    /// Declared parameters, in declaration order.
    pub request: Vec<Field>,
    /// `null` when the message declares no response.
    pub response: Schema,
    /// Declared error types. Always error records.
    pub errors: Vec<Schema>,
    pub one_way: bool,
}

impl Message {
    pub fn new(name: impl Into<String>, request: Vec<Field>, response: impl Into<Schema>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            request,
            response: response.into(),
            errors: Vec::new(),
            one_way: false,
        }
    }

    pub fn with_errors(mut self, errors: Vec<Schema>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_one_way(mut self) -> Self {
        self.one_way = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.request.iter().find(|f| f.name == name)
    }

    /// Anonymous record over the parameter fields.
    pub fn request_schema(&self) -> Schema {
        Schema::Record(Arc::new(RecordSchema {
            name: Name::new(&self.name),
            fields: self.request.clone(),
            is_error: false,
            doc: None,
        }))
    }

    /// Union of `string` (for undeclared faults) and each declared error.
    pub fn error_schema(&self) -> Schema {
        let mut branches = Vec::with_capacity(self.errors.len() + 1);
        branches.push(Schema::Primitive(Primitive::String));
        branches.extend(self.errors.iter().cloned());
        Schema::Union(branches)
    }

    fn parse(
        name: &str,
        json: &Json,
        parser: &mut Parser,
        namespace: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        let obj = json.as_object().ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("message '{}' must be an object", name))
        })?;

        let mut request = Vec::new();
        let mut seen = HashSet::new();
        let params = obj.get("request").and_then(Json::as_array).ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("message '{}' has no request list", name))
        })?;
        for param in params {
            let field = parser.parse_field(param, namespace)?;
            if !seen.insert(field.name.clone()) {
                return Err(ProtocolError::InvalidSchema(format!(
                    "duplicate parameter '{}' in message '{}'",
                    field.name, name
                )));
            }
            request.push(field);
        }

        let response = match obj.get("response") {
            Some(json) => parser.parse(json, namespace)?,
            None => Schema::Primitive(Primitive::Null),
        };

        let mut errors = Vec::new();
        for err in obj
            .get("errors")
            .and_then(Json::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let schema = parser.parse(err, namespace)?;
            match &schema {
                Schema::Record(r) if r.is_error => errors.push(schema),
                other => {
                    return Err(ProtocolError::InvalidSchema(format!(
                        "message '{}' declares {} as an error, but it is not an error type",
                        name, other
                    )))
                }
            }
        }

        let one_way = obj.get("one-way").and_then(Json::as_bool).unwrap_or(false);
        if one_way && (response != Schema::Primitive(Primitive::Null) || !errors.is_empty()) {
            return Err(ProtocolError::InvalidSchema(format!(
                "one-way message '{}' must have a null response and no errors",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
            doc: obj.get("doc").and_then(Json::as_str).map(str::to_string),
            request,
            response,
            errors,
            one_way,
        })
    }
}

/// A named collection of types and messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub name: String,
    pub namespace: Option<String>,
    pub doc: Option<String>,
    pub types: Vec<Schema>,
    messages: Vec<Message>,
}

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            doc: None,
            types: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Adds a message, replacing any earlier message with the same name.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.retain(|m| m.name != message.name);
        self.messages.push(message);
        self
    }

    pub fn fullname(&self) -> String {
        Name::qualified(&self.name, self.namespace.as_deref()).fullname()
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn parse(json: &Json) -> Result<Self, ProtocolError> {
        let obj = json.as_object().ok_or_else(|| {
            ProtocolError::InvalidSchema("protocol must be a JSON object".to_string())
        })?;
        let name = obj
            .get("protocol")
            .and_then(Json::as_str)
            .ok_or_else(|| ProtocolError::InvalidSchema("missing protocol name".to_string()))?;
        let namespace = obj.get("namespace").and_then(Json::as_str);

        let mut parser = Parser::default();
        let mut types = Vec::new();
        for decl in obj
            .get("types")
            .and_then(Json::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            types.push(parser.parse(decl, namespace)?);
        }

        let empty = Map::new();
        let declared = match obj.get("messages") {
            Some(Json::Object(m)) => m,
            Some(_) => {
                return Err(ProtocolError::InvalidSchema(
                    "messages must be an object".to_string(),
                ))
            }
            None => &empty,
        };
        let mut messages = Vec::with_capacity(declared.len());
        for (msg_name, msg_json) in declared {
            messages.push(Message::parse(msg_name, msg_json, &mut parser, namespace)?);
        }

        Ok(Self {
            name: name.to_string(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            doc: obj.get("doc").and_then(Json::as_str).map(str::to_string),
            types,
            messages,
        })
    }

    pub fn parse_str(s: &str) -> Result<Self, ProtocolError> {
        let json: Json = serde_json::from_str(s)?;
        Self::parse(&json)
    }
}
