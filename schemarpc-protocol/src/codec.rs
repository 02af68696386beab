//! Schema-typed datum codec over line-delimited JSON buffers.
//!
//! Every datum or header occupies one line. Datums follow the usual JSON
//! encoding conventions:
//! - `bytes` and `fixed` are strings whose code points are the byte values
//! - unions are `null` or a single-key object `{"<branch name>": value}`
//! - enums are their symbol, records are objects keyed by field name

use crate::error::ProtocolError;
use crate::schema::{Primitive, Schema};
use crate::value::{Record, Value};
use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value as Json};
use std::collections::HashMap;

/// Accumulates encoded lines.
pub struct Encoder {
    buffer: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Writes one JSON document as a line.
    pub fn write_json(&mut self, json: &Json) -> Result<(), ProtocolError> {
        let bytes = serde_json::to_vec(json)?;
        self.buffer.extend_from_slice(&bytes);
        self.buffer.extend_from_slice(b"\n");
        Ok(())
    }

    /// Writes any serializable envelope header as a line.
    pub fn write_header<T: Serialize>(&mut self, header: &T) -> Result<(), ProtocolError> {
        let bytes = serde_json::to_vec(header)?;
        self.buffer.extend_from_slice(&bytes);
        self.buffer.extend_from_slice(b"\n");
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffers input and yields complete lines.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next JSON line. Returns `None` until a full
    /// line is buffered.
    pub fn read_json(&mut self) -> Result<Option<Json>, ProtocolError> {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let line = self.buffer.split_to(pos + 1);
                let text =
                    std::str::from_utf8(&line[..pos]).map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Some(serde_json::from_str(text)?))
            }
            None => Ok(None),
        }
    }

    /// Reads the next line as an envelope header.
    pub fn read_header<T: DeserializeOwned>(&mut self) -> Result<T, ProtocolError> {
        let json = self.read_json()?.ok_or(ProtocolError::UnexpectedEof)?;
        Ok(serde_json::from_value(json)?)
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes values against a fixed schema.
pub struct DatumWriter {
    schema: Schema,
    names: HashMap<String, Schema>,
}

impl DatumWriter {
    pub fn new(schema: Schema) -> Self {
        let names = schema.named_types();
        Self { schema, names }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn write(&self, value: &Value, encoder: &mut Encoder) -> Result<(), ProtocolError> {
        let json = self.to_json(value, &self.schema)?;
        encoder.write_json(&json)
    }

    /// Converts a value to its JSON encoding under `schema`.
    pub fn to_json(&self, value: &Value, schema: &Schema) -> Result<Json, ProtocolError> {
        let schema = deref(&self.names, schema)?;
        match (schema, value) {
            (Schema::Primitive(Primitive::Null), Value::Null) => Ok(Json::Null),
            (Schema::Primitive(Primitive::Boolean), Value::Boolean(b)) => Ok(Json::Bool(*b)),
            (Schema::Primitive(Primitive::Int), Value::Int(i)) => Ok(Json::from(*i)),
            (Schema::Primitive(Primitive::Long), Value::Long(l)) => Ok(Json::from(*l)),
            (Schema::Primitive(Primitive::Long), Value::Int(i)) => Ok(Json::from(*i)),
            (Schema::Primitive(Primitive::Float), Value::Float(f)) => float_json(f64::from(*f)),
            (Schema::Primitive(Primitive::Double), Value::Double(d)) => float_json(*d),
            (Schema::Primitive(Primitive::Double), Value::Float(f)) => float_json(f64::from(*f)),
            (Schema::Primitive(Primitive::Bytes), Value::Bytes(b)) => {
                Ok(Json::String(bytes_to_string(b)))
            }
            (Schema::Primitive(Primitive::String), Value::String(s)) => Ok(Json::String(s.clone())),
            (Schema::Array(items), Value::Array(values)) => values
                .iter()
                .map(|v| self.to_json(v, items))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            (Schema::Map(values_schema), Value::Map(entries)) => {
                let mut obj = Map::new();
                for (key, v) in entries {
                    obj.insert(key.clone(), self.to_json(v, values_schema)?);
                }
                Ok(Json::Object(obj))
            }
            (Schema::Record(r), Value::Record(record)) => {
                let mut obj = Map::new();
                for field in &r.fields {
                    let json = match record.get(&field.name) {
                        Some(v) => self.to_json(v, &field.schema)?,
                        None => field.default.clone().ok_or_else(|| {
                            ProtocolError::MissingField(format!("{}.{}", r.name, field.name))
                        })?,
                    };
                    obj.insert(field.name.clone(), json);
                }
                Ok(Json::Object(obj))
            }
            (Schema::Enum(e), Value::Enum(symbol)) => {
                if e.symbols.contains(symbol) {
                    Ok(Json::String(symbol.clone()))
                } else {
                    Err(ProtocolError::UnknownSymbol {
                        name: e.name.fullname(),
                        symbol: symbol.clone(),
                    })
                }
            }
            (Schema::Fixed(f), Value::Fixed(bytes)) => {
                if bytes.len() != f.size {
                    return Err(ProtocolError::FixedSize {
                        name: f.name.fullname(),
                        expected: f.size,
                        actual: bytes.len(),
                    });
                }
                Ok(Json::String(bytes_to_string(bytes)))
            }
            (Schema::Union(branches), value) => {
                let branch = branches
                    .iter()
                    .find(|b| self.matches(value, b))
                    .or_else(|| branches.iter().find(|b| self.promotes(value, b)))
                    .ok_or_else(|| ProtocolError::NoUnionBranch(value.kind().to_string()))?;
                if *branch == Schema::Primitive(Primitive::Null) {
                    return Ok(Json::Null);
                }
                let mut obj = Map::new();
                obj.insert(branch_key(branch), self.to_json(value, branch)?);
                Ok(Json::Object(obj))
            }
            (schema, value) => Err(ProtocolError::TypeMismatch {
                expected: branch_key(schema),
                found: value.kind().to_string(),
            }),
        }
    }

    /// Returns whether `value` belongs to the union branch `schema`.
    fn matches(&self, value: &Value, schema: &Schema) -> bool {
        let Ok(schema) = deref(&self.names, schema) else {
            return false;
        };
        match (schema, value) {
            (Schema::Primitive(p), value) => p.name() == value.kind(),
            (Schema::Array(_), Value::Array(_)) | (Schema::Map(_), Value::Map(_)) => true,
            (Schema::Record(r), Value::Record(record)) => match record.name() {
                Some(name) => name == r.name.fullname(),
                None => {
                    r.fields
                        .iter()
                        .all(|f| record.contains(&f.name) || f.default.is_some())
                        && record.iter().all(|(name, _)| r.field(name).is_some())
                }
            },
            (Schema::Enum(e), Value::Enum(symbol)) => e.symbols.contains(symbol),
            (Schema::Fixed(f), Value::Fixed(bytes)) => bytes.len() == f.size,
            _ => false,
        }
    }

    /// Returns whether `value` can be widened into the union branch `schema`.
    /// Checked only after no branch matches exactly.
    fn promotes(&self, value: &Value, schema: &Schema) -> bool {
        matches!(
            (deref(&self.names, schema), value),
            (Ok(Schema::Primitive(Primitive::Long)), Value::Int(_))
                | (Ok(Schema::Primitive(Primitive::Double)), Value::Float(_))
        )
    }
}

/// Reads values written with the `actual` schema as the `expected` schema.
///
/// Only numeric widening and string/bytes interchange are resolved; any other
/// difference between the two schemas is reported as incompatible.
pub struct DatumReader {
    actual: Schema,
    expected: Schema,
    names: HashMap<String, Schema>,
}

impl DatumReader {
    pub fn new(actual: Schema, expected: Schema) -> Self {
        let names = actual.named_types();
        Self {
            actual,
            expected,
            names,
        }
    }

    pub fn read(&self, decoder: &mut Decoder) -> Result<Value, ProtocolError> {
        let json = decoder.read_json()?.ok_or(ProtocolError::UnexpectedEof)?;
        let value = self.from_json(&json, &self.actual)?;
        self.resolve(value)
    }

    /// Converts a JSON encoding under `schema` back to a value.
    pub fn from_json(&self, json: &Json, schema: &Schema) -> Result<Value, ProtocolError> {
        let schema = deref(&self.names, schema)?;
        let mismatch = || ProtocolError::TypeMismatch {
            expected: branch_key(schema),
            found: json_kind(json).to_string(),
        };

        match schema {
            Schema::Primitive(Primitive::Null) => {
                json.is_null().then_some(Value::Null).ok_or_else(mismatch)
            }
            Schema::Primitive(Primitive::Boolean) => {
                json.as_bool().map(Value::Boolean).ok_or_else(mismatch)
            }
            Schema::Primitive(Primitive::Int) => json
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int)
                .ok_or_else(mismatch),
            Schema::Primitive(Primitive::Long) => json.as_i64().map(Value::Long).ok_or_else(mismatch),
            Schema::Primitive(Primitive::Float) => json
                .as_f64()
                .map(|f| Value::Float(f as f32))
                .ok_or_else(mismatch),
            Schema::Primitive(Primitive::Double) => {
                json.as_f64().map(Value::Double).ok_or_else(mismatch)
            }
            Schema::Primitive(Primitive::Bytes) => {
                let s = json.as_str().ok_or_else(mismatch)?;
                Ok(Value::Bytes(string_to_bytes(s)?))
            }
            Schema::Primitive(Primitive::String) => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(mismatch),
            Schema::Array(items) => json
                .as_array()
                .ok_or_else(mismatch)?
                .iter()
                .map(|j| self.from_json(j, items))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Schema::Map(values) => {
                let obj = json.as_object().ok_or_else(mismatch)?;
                let mut entries = HashMap::with_capacity(obj.len());
                for (key, j) in obj {
                    entries.insert(key.clone(), self.from_json(j, values)?);
                }
                Ok(Value::Map(entries))
            }
            Schema::Record(r) => {
                let obj = json.as_object().ok_or_else(mismatch)?;
                let mut record = Record::named(r.name.fullname());
                for field in &r.fields {
                    let value = match (obj.get(&field.name), &field.default) {
                        (Some(j), _) => self.from_json(j, &field.schema)?,
                        (None, Some(default)) => self.default_value(default, &field.schema)?,
                        (None, None) => {
                            return Err(ProtocolError::MissingField(format!(
                                "{}.{}",
                                r.name, field.name
                            )))
                        }
                    };
                    record.put(field.name.clone(), value);
                }
                Ok(Value::Record(record))
            }
            Schema::Enum(e) => {
                let symbol = json.as_str().ok_or_else(mismatch)?;
                if !e.symbols.iter().any(|s| s == symbol) {
                    return Err(ProtocolError::UnknownSymbol {
                        name: e.name.fullname(),
                        symbol: symbol.to_string(),
                    });
                }
                Ok(Value::Enum(symbol.to_string()))
            }
            Schema::Fixed(f) => {
                let bytes = string_to_bytes(json.as_str().ok_or_else(mismatch)?)?;
                if bytes.len() != f.size {
                    return Err(ProtocolError::FixedSize {
                        name: f.name.fullname(),
                        expected: f.size,
                        actual: bytes.len(),
                    });
                }
                Ok(Value::Fixed(bytes))
            }
            Schema::Union(branches) => {
                if json.is_null() && branches.contains(&Schema::Primitive(Primitive::Null)) {
                    return Ok(Value::Null);
                }
                let obj = json.as_object().filter(|o| o.len() == 1).ok_or_else(mismatch)?;
                let (key, inner) = obj.iter().next().ok_or_else(mismatch)?;
                let branch = branches
                    .iter()
                    .find(|b| branch_key(b) == *key)
                    .ok_or_else(|| ProtocolError::NoUnionBranch(key.clone()))?;
                self.from_json(inner, branch)
            }
            Schema::Ref(name) => Err(ProtocolError::UnknownType(name.fullname())),
        }
    }

    /// Field defaults for unions are encoded against the first branch.
    fn default_value(&self, default: &Json, schema: &Schema) -> Result<Value, ProtocolError> {
        match schema {
            Schema::Union(branches) => match branches.first() {
                Some(first) => self.from_json(default, first),
                None => Err(ProtocolError::NoUnionBranch("empty union".to_string())),
            },
            other => self.from_json(default, other),
        }
    }

    fn resolve(&self, value: Value) -> Result<Value, ProtocolError> {
        if self.actual == self.expected {
            return Ok(value);
        }

        let resolved = match (&self.expected, value) {
            (Schema::Primitive(Primitive::Long), Value::Int(i)) => Value::Long(i64::from(i)),
            (Schema::Primitive(Primitive::Float), Value::Int(i)) => Value::Float(i as f32),
            (Schema::Primitive(Primitive::Float), Value::Long(l)) => Value::Float(l as f32),
            (Schema::Primitive(Primitive::Double), Value::Int(i)) => Value::Double(f64::from(i)),
            (Schema::Primitive(Primitive::Double), Value::Long(l)) => Value::Double(l as f64),
            (Schema::Primitive(Primitive::Double), Value::Float(f)) => Value::Double(f64::from(f)),
            (Schema::Primitive(Primitive::String), Value::Bytes(b)) => {
                Value::String(String::from_utf8(b).map_err(|_| ProtocolError::InvalidUtf8)?)
            }
            (Schema::Primitive(Primitive::Bytes), Value::String(s)) => Value::Bytes(s.into_bytes()),
            _ => {
                return Err(ProtocolError::IncompatibleSchema {
                    actual: self.actual.to_string(),
                    expected: self.expected.to_string(),
                })
            }
        };
        Ok(resolved)
    }
}

fn deref<'a>(
    names: &'a HashMap<String, Schema>,
    schema: &'a Schema,
) -> Result<&'a Schema, ProtocolError> {
    match schema {
        Schema::Ref(name) => {
            let fullname = name.fullname();
            names
                .get(&fullname)
                .ok_or(ProtocolError::UnknownType(fullname))
        }
        other => Ok(other),
    }
}

/// Key used for a union branch: the full name of a named type, otherwise the
/// type name.
fn branch_key(schema: &Schema) -> String {
    schema
        .fullname()
        .unwrap_or_else(|| schema.type_name().to_string())
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn float_json(f: f64) -> Result<Json, ProtocolError> {
    Number::from_f64(f)
        .map(Json::Number)
        .ok_or_else(|| ProtocolError::NotRepresentable(f.to_string()))
}

fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn string_to_bytes(s: &str) -> Result<Vec<u8>, ProtocolError> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| ProtocolError::TypeMismatch {
                expected: "bytes".to_string(),
                found: format!("code point U+{:04X}", u32::from(c)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn point_schema() -> Schema {
        Schema::record(
            "geo.Point",
            vec![
                Field::new("x", Primitive::Int),
                Field::new("y", Primitive::Int).with_default(json!(0)),
            ],
        )
    }

    fn write_line(schema: &Schema, value: &Value) -> Json {
        let writer = DatumWriter::new(schema.clone());
        let mut encoder = Encoder::new();
        writer.write(value, &mut encoder).unwrap();
        let mut decoder = Decoder::new();
        decoder.extend(encoder.as_bytes());
        decoder.read_json().unwrap().unwrap()
    }

    #[test]
    fn test_union_encoding() {
        let schema = Schema::Union(vec![Primitive::Null.into(), point_schema()]);

        assert_eq!(write_line(&schema, &Value::Null), Json::Null);

        let point = Record::named("geo.Point")
            .with("x", Value::Int(3))
            .with("y", Value::Int(4));
        assert_eq!(
            write_line(&schema, &Value::Record(point)),
            json!({"geo.Point": {"x": 3, "y": 4}})
        );

        let err = DatumWriter::new(schema)
            .to_json(&Value::Int(1), &Schema::Union(vec![Primitive::Null.into()]))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NoUnionBranch(kind) if kind == "int"));
    }

    #[test]
    fn test_union_widens_numeric_values() {
        let schema = Schema::Union(vec![Primitive::Null.into(), Primitive::Long.into()]);
        assert_eq!(write_line(&schema, &Value::Int(1)), json!({"long": 1}));

        let schema = Schema::Union(vec![Primitive::Null.into(), Primitive::Double.into()]);
        assert_eq!(write_line(&schema, &Value::Float(0.5)), json!({"double": 0.5}));

        // An exact branch wins over a wider one.
        let schema = Schema::Union(vec![Primitive::Long.into(), Primitive::Int.into()]);
        assert_eq!(write_line(&schema, &Value::Int(7)), json!({"int": 7}));
    }

    #[test]
    fn test_union_matches_unnamed_record_by_fields() {
        let schema = Schema::Union(vec![Primitive::String.into(), point_schema()]);
        let point = Record::new().with("x", Value::Int(1));

        assert_eq!(
            write_line(&schema, &Value::Record(point)),
            json!({"geo.Point": {"x": 1, "y": 0}})
        );
    }

    #[test]
    fn test_bytes_encoded_as_code_points() {
        let json = write_line(
            &Primitive::Bytes.into(),
            &Value::Bytes(vec![0x00, 0x41, 0xFF]),
        );
        assert_eq!(json, json!("\u{0000}A\u{00FF}"));

        let reader = DatumReader::new(Primitive::Bytes.into(), Primitive::Bytes.into());
        assert_eq!(
            reader.from_json(&json, &Primitive::Bytes.into()).unwrap(),
            Value::Bytes(vec![0x00, 0x41, 0xFF])
        );

        let err = reader
            .from_json(&json!("\u{0100}"), &Primitive::Bytes.into())
            .unwrap_err();
        assert!(err.to_string().contains("U+0100"));
    }

    #[test]
    fn test_reader_fills_defaults() {
        let mut decoder = Decoder::new();
        decoder.extend(b"{\"x\": 7}\n");

        let reader = DatumReader::new(point_schema(), point_schema());
        let value = reader.read(&mut decoder).unwrap();
        let record = value.as_record().unwrap();

        assert_eq!(record.name(), Some("geo.Point"));
        assert_eq!(record.get("x"), Some(&Value::Int(7)));
        assert_eq!(record.get("y"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_reader_missing_field() {
        let mut decoder = Decoder::new();
        decoder.extend(b"{\"y\": 1}\n");

        let err = DatumReader::new(point_schema(), point_schema())
            .read(&mut decoder)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField(f) if f == "geo.Point.x"));
    }

    #[test]
    fn test_int_out_of_range() {
        let reader = DatumReader::new(Primitive::Int.into(), Primitive::Int.into());
        let err = reader
            .from_json(&json!(1_i64 << 40), &Primitive::Int.into())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::TypeMismatch { .. }));
    }

    #[test]
    fn test_enum_symbols_enforced() {
        let suit = Schema::enumeration("cards.Suit", &["HEARTS", "SPADES"]);

        let err = DatumWriter::new(suit.clone())
            .to_json(&Value::Enum("STARS".to_string()), &suit)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownSymbol { .. }));

        let reader = DatumReader::new(suit.clone(), suit.clone());
        assert_eq!(
            reader.from_json(&json!("SPADES"), &suit).unwrap(),
            Value::Enum("SPADES".to_string())
        );
    }

    #[test]
    fn test_fixed_size_enforced() {
        let md5 = Schema::fixed("md5", 4);
        let err = DatumWriter::new(md5.clone())
            .to_json(&Value::Fixed(vec![1, 2]), &md5)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FixedSize {
                expected: 4,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_numeric_promotion() {
        let mut decoder = Decoder::new();
        decoder.extend(b"42\n42\n");

        let reader = DatumReader::new(Primitive::Int.into(), Primitive::Long.into());
        assert_eq!(reader.read(&mut decoder).unwrap(), Value::Long(42));

        let reader = DatumReader::new(Primitive::Int.into(), Primitive::Double.into());
        assert_eq!(reader.read(&mut decoder).unwrap(), Value::Double(42.0));
    }

    #[test]
    fn test_incompatible_schemas() {
        let mut decoder = Decoder::new();
        decoder.extend(b"42\n");

        let reader = DatumReader::new(Primitive::Long.into(), Primitive::Int.into());
        let err = reader.read(&mut decoder).unwrap_err();
        assert!(matches!(err, ProtocolError::IncompatibleSchema { .. }));
    }

    #[test]
    fn test_recursive_record() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "Node", "fields": [
                {"name": "value", "type": "long"},
                {"name": "next", "type": ["null", "Node"], "default": null}
            ]}"#,
        )
        .unwrap();

        let list = Record::named("Node").with("value", Value::Long(1)).with(
            "next",
            Record::named("Node")
                .with("value", Value::Long(2))
                .with("next", Value::Null),
        );

        let json = write_line(&schema, &Value::Record(list.clone()));
        assert_eq!(
            json,
            json!({"value": 1, "next": {"Node": {"value": 2, "next": null}}})
        );

        let reader = DatumReader::new(schema.clone(), schema.clone());
        assert_eq!(reader.from_json(&json, &schema).unwrap(), Value::Record(list));
    }

    #[test]
    fn test_decoder_partial_line() {
        let mut decoder = Decoder::new();
        decoder.extend(b"{\"message\":");
        assert!(decoder.read_json().unwrap().is_none());
        assert_eq!(decoder.buffered(), 11);

        decoder.extend(b"\"ping\"}\n");
        let json = decoder.read_json().unwrap().unwrap();
        assert_eq!(json, json!({"message": "ping"}));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_read_past_end() {
        let mut decoder = Decoder::new();
        let err = DatumReader::new(Primitive::Int.into(), Primitive::Int.into())
            .read(&mut decoder)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof));
    }
}
