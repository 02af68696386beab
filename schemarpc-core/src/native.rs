//! Native type identifiers and conversions between datums and Rust values.

use bytes::Bytes;
use schemarpc_protocol::{Record, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a native parameter type, used as the overload key during
/// method lookup.
///
/// Primitives are identified by their Rust type name, named schema types by
/// their schema full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeTypeId(Cow<'static, str>);

impl NativeTypeId {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// Identifier of the Rust type `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NativeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for NativeTypeId {
    fn from(id: &'static str) -> Self {
        Self::from_static(id)
    }
}

impl From<String> for NativeTypeId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Errors converting a datum into a handler argument.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing record field '{0}'")]
    MissingField(String),

    #[error("expected {expected} arguments, got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("{0}")]
    Invalid(String),
}

impl ConversionError {
    pub fn mismatch(expected: &'static str, found: &Value) -> Self {
        ConversionError::TypeMismatch {
            expected,
            found: found.kind(),
        }
    }
}

/// A Rust type that may appear as a handler parameter.
pub trait NativeType {
    fn native_type() -> NativeTypeId;
}

/// Conversion from a decoded datum.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

/// Conversion into a datum for encoding.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_native_type {
    ($($ty:ty),*) => {
        $(
            impl NativeType for $ty {
                fn native_type() -> NativeTypeId {
                    NativeTypeId::of::<$ty>()
                }
            }
        )*
    };
}

impl_native_type!(bool, i32, i64, f32, f64, String, Bytes);

/// Arrays are looked up by their element type.
impl<T: NativeType> NativeType for Vec<T> {
    fn native_type() -> NativeTypeId {
        T::native_type()
    }
}

/// Maps are looked up by their value type.
impl<T: NativeType> NativeType for HashMap<String, T> {
    fn native_type() -> NativeTypeId {
        T::native_type()
    }
}

impl<T: NativeType> NativeType for Option<T> {
    fn native_type() -> NativeTypeId {
        NativeTypeId::from_static("union")
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(ConversionError::mismatch("boolean", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(ConversionError::mismatch("int", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Long(l) => Ok(l),
            Value::Int(i) => Ok(i64::from(i)),
            other => Err(ConversionError::mismatch("long", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f32),
            Value::Long(l) => Ok(l as f32),
            other => Err(ConversionError::mismatch("float", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Double(d) => Ok(d),
            Value::Float(f) => Ok(f64::from(f)),
            Value::Int(i) => Ok(f64::from(i)),
            Value::Long(l) => Ok(l as f64),
            other => Err(ConversionError::mismatch("double", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(ConversionError::mismatch("string", &other)),
        }
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) | Value::Fixed(b) => Ok(Bytes::from(b)),
            other => Err(ConversionError::mismatch("bytes", &other)),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Record(r) => Ok(r),
            other => Err(ConversionError::mismatch("record", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ConversionError::mismatch("array", &other)),
        }
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(ConversionError::mismatch("map", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Long(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for Bytes {
    fn into_value(self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl IntoValue for Record {
    fn into_value(self) -> Value {
        Value::Record(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for HashMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k, v.into_value()))
                .collect(),
        )
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Takes a field out of a record and converts it, for use in hand-written
/// [`FromValue`] impls of record types.
pub fn take_field<T: FromValue>(record: &mut Record, name: &str) -> Result<T, ConversionError> {
    let value = record
        .take(name)
        .ok_or_else(|| ConversionError::MissingField(name.to_string()))?;
    T::from_value(value)
}
