//! Schema type resolution.
//!
//! Maps the schema of a message parameter to the [`NativeTypeId`] a handler
//! must declare for that parameter:
//! - named types resolve to their full name
//! - primitives resolve through a fixed table of Rust types
//! - arrays resolve to their item type and maps to their value type
//!
//! Only one level of array/map is unwrapped unless the resolver is built with
//! [`UnwrapMode::Recursive`].

use crate::config::UnwrapMode;
use crate::method::Signature;
use crate::native::NativeTypeId;
use bytes::Bytes;
use schemarpc_protocol::{Field, Message, Primitive, Schema};

/// Returns the native identifier of a schema primitive, or `None` for `null`.
pub fn primitive_type_id(primitive: Primitive) -> Option<NativeTypeId> {
    match primitive {
        Primitive::String => Some(NativeTypeId::of::<String>()),
        Primitive::Int => Some(NativeTypeId::of::<i32>()),
        Primitive::Long => Some(NativeTypeId::of::<i64>()),
        Primitive::Float => Some(NativeTypeId::of::<f32>()),
        Primitive::Double => Some(NativeTypeId::of::<f64>()),
        Primitive::Boolean => Some(NativeTypeId::of::<bool>()),
        Primitive::Bytes => Some(NativeTypeId::of::<Bytes>()),
        Primitive::Null => None,
    }
}

/// Resolves schemas to native type identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeResolver {
    unwrap: UnwrapMode,
}

impl TypeResolver {
    pub fn new(unwrap: UnwrapMode) -> Self {
        Self { unwrap }
    }

    pub fn recursive() -> Self {
        Self::new(UnwrapMode::Recursive)
    }

    pub fn unwrap_mode(&self) -> UnwrapMode {
        self.unwrap
    }

    pub fn resolve(&self, schema: &Schema) -> NativeTypeId {
        let target = match (schema, self.unwrap) {
            (Schema::Array(inner) | Schema::Map(inner), UnwrapMode::SingleLevel) => inner.as_ref(),
            (_, UnwrapMode::Recursive) => innermost(schema),
            _ => schema,
        };

        match target {
            Schema::Primitive(p) => {
                primitive_type_id(*p).unwrap_or(NativeTypeId::from_static("null"))
            }
            Schema::Array(_) => NativeTypeId::from_static("array"),
            Schema::Map(_) => NativeTypeId::from_static("map"),
            Schema::Union(_) => NativeTypeId::from_static("union"),
            named => match named.fullname() {
                Some(fullname) => NativeTypeId::new(fullname),
                None => NativeTypeId::new(named.type_name()),
            },
        }
    }

    pub fn resolve_field(&self, field: &Field) -> NativeTypeId {
        self.resolve(&field.schema)
    }

    /// Resolves every parameter of `message`, in declaration order.
    pub fn resolve_message(&self, message: &Message) -> Signature {
        Signature::new(
            message.name.clone(),
            message.request.iter().map(|f| self.resolve_field(f)).collect(),
        )
    }
}

fn innermost(mut schema: &Schema) -> &Schema {
    while let Schema::Array(inner) | Schema::Map(inner) = schema {
        schema = inner.as_ref();
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use schemarpc_protocol::Protocol;

    const NON_NULL: [Primitive; 7] = [
        Primitive::Boolean,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Bytes,
        Primitive::String,
    ];

    #[test]
    fn test_primitive_table() {
        let resolver = TypeResolver::default();
        let expected = [
            (Primitive::Boolean, "bool"),
            (Primitive::Int, "i32"),
            (Primitive::Long, "i64"),
            (Primitive::Float, "f32"),
            (Primitive::Double, "f64"),
            (Primitive::Bytes, std::any::type_name::<Bytes>()),
            (Primitive::String, std::any::type_name::<String>()),
        ];

        for (primitive, id) in expected {
            let field = Field::new("p", primitive);
            assert_eq!(resolver.resolve_field(&field).as_str(), id);
        }
        assert_eq!(resolver.resolve(&Primitive::Null.into()).as_str(), "null");
    }

    #[test]
    fn test_array_resolves_to_item() {
        let resolver = TypeResolver::default();
        assert_eq!(
            resolver.resolve(&Schema::array(Primitive::Int)),
            resolver.resolve(&Primitive::Int.into())
        );
    }

    #[test]
    fn test_map_resolves_to_value() {
        let resolver = TypeResolver::default();
        assert_eq!(
            resolver.resolve(&Schema::map(Primitive::String)),
            resolver.resolve(&Primitive::String.into())
        );
    }

    #[test]
    fn test_named_types_use_fullname() {
        let resolver = TypeResolver::default();
        assert_eq!(
            resolver.resolve(&Schema::record("Foo.Bar", vec![])).as_str(),
            "Foo.Bar"
        );
        assert_eq!(
            resolver
                .resolve(&Schema::enumeration("cards.Suit", &["HEARTS"]))
                .as_str(),
            "cards.Suit"
        );
        assert_eq!(resolver.resolve(&Schema::fixed("md5", 16)).as_str(), "md5");
        assert_eq!(
            resolver
                .resolve(&Schema::array(Schema::record("geo.Point", vec![])))
                .as_str(),
            "geo.Point"
        );
    }

    #[test]
    fn test_union_is_not_unwrapped() {
        let resolver = TypeResolver::default();
        let schema = Schema::Union(vec![Primitive::Null.into(), Primitive::Int.into()]);
        assert_eq!(resolver.resolve(&schema).as_str(), "union");
    }

    #[test]
    fn test_single_level_unwrap() {
        let resolver = TypeResolver::default();
        assert_eq!(
            resolver
                .resolve(&Schema::array(Schema::array(Primitive::Int)))
                .as_str(),
            "array"
        );
        assert_eq!(
            resolver
                .resolve(&Schema::map(Schema::array(Primitive::Long)))
                .as_str(),
            "array"
        );
    }

    #[test]
    fn test_recursive_unwrap() {
        let resolver = TypeResolver::recursive();
        assert_eq!(
            resolver.resolve(&Schema::array(Schema::array(Primitive::Int))),
            NativeTypeId::of::<i32>()
        );
        assert_eq!(
            resolver.resolve(&Schema::map(Schema::array(Primitive::Long))),
            NativeTypeId::of::<i64>()
        );
    }

    #[test]
    fn test_resolve_message() {
        let protocol = Protocol::parse_str(
            r#"{"protocol": "Geo", "namespace": "geo",
                "types": [{"type": "record", "name": "Point", "fields": [
                    {"name": "x", "type": "double"}, {"name": "y", "type": "double"}
                ]}],
                "messages": {
                    "nearest": {
                        "request": [
                            {"name": "origin", "type": "Point"},
                            {"name": "candidates", "type": {"type": "array", "items": "Point"}},
                            {"name": "limit", "type": "int"}
                        ],
                        "response": {"type": "array", "items": "Point"}
                    },
                    "origin": {"request": [], "response": "Point"}
                }}"#,
        )
        .unwrap();
        let resolver = TypeResolver::default();

        let signature = resolver.resolve_message(protocol.message("nearest").unwrap());
        assert_eq!(signature.to_string(), "nearest(geo.Point, geo.Point, i32)");

        let signature = resolver.resolve_message(protocol.message("origin").unwrap());
        assert_eq!(signature.to_string(), "origin()");
    }

    fn nested(primitive: Primitive, layers: &[bool]) -> Schema {
        layers.iter().fold(Schema::from(primitive), |inner, &is_array| {
            if is_array {
                Schema::array(inner)
            } else {
                Schema::map(inner)
            }
        })
    }

    proptest! {
        #[test]
        fn prop_recursive_reaches_primitive(
            primitive in prop::sample::select(NON_NULL.to_vec()),
            layers in prop::collection::vec(any::<bool>(), 0..8),
        ) {
            let schema = nested(primitive, &layers);
            let bare = TypeResolver::recursive().resolve(&primitive.into());
            prop_assert_eq!(TypeResolver::recursive().resolve(&schema), bare);
        }

        #[test]
        fn prop_single_level_stops_after_one_layer(
            primitive in prop::sample::select(NON_NULL.to_vec()),
            layers in prop::collection::vec(any::<bool>(), 0..8),
        ) {
            let schema = nested(primitive, &layers);
            let resolved = TypeResolver::default().resolve(&schema);

            let expected = match layers.len() {
                0 | 1 => TypeResolver::default().resolve(&primitive.into()),
                n if layers[n - 2] => NativeTypeId::from_static("array"),
                _ => NativeTypeId::from_static("map"),
            };
            prop_assert_eq!(resolved, expected);
        }
    }
}
