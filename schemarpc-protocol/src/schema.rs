//! Schema nodes and the JSON schema parser.
//!
//! Schemas use the usual JSON declaration form:
//!
//! ```json
//! {
//!   "type": "record",
//!   "name": "Point",
//!   "namespace": "geo",
//!   "fields": [
//!     {"name": "x", "type": "int"},
//!     {"name": "tags", "type": {"type": "array", "items": "string"}}
//!   ]
//! }
//! ```
//!
//! A named type may be referenced by name once it has been declared. A record
//! may refer to itself while it is being declared, which produces a
//! [`Schema::Ref`] node.

use crate::error::ProtocolError;
use serde_json::{json, Map, Value as Json};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Primitive schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Null,
        Primitive::Boolean,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Bytes,
        Primitive::String,
    ];

    /// Returns the schema tag of this primitive.
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Name of a record, enum or fixed type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    /// Creates a name from a simple or dotted full name.
    pub fn new(name: &str) -> Self {
        Self::qualified(name, None)
    }

    /// Creates a name, using `namespace` unless `name` is already dotted.
    pub fn qualified(name: &str, namespace: Option<&str>) -> Self {
        match name.rsplit_once('.') {
            Some((ns, simple)) => Self {
                name: simple.to_string(),
                namespace: Some(ns.to_string()),
            },
            None => Self {
                name: name.to_string(),
                namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            },
        }
    }

    /// Returns `namespace.name`, or just `name` in the null namespace.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

/// A named, schema-typed slot: a record field or a message parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// JSON-encoded default, used when a reader finds the field missing.
    pub default: Option<Json>,
    pub doc: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            default: None,
            doc: None,
        }
    }

    pub fn with_default(mut self, default: Json) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub fields: Vec<Field>,
    /// Declared with `"type": "error"`.
    pub is_error: bool,
    pub doc: Option<String>,
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    pub symbols: Vec<String>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    pub size: usize,
}

/// A schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive(Primitive),
    Record(Arc<RecordSchema>),
    Enum(Arc<EnumSchema>),
    Fixed(Arc<FixedSchema>),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(Vec<Schema>),
    /// Reference to a named type that was still being declared.
    Ref(Name),
}

impl From<Primitive> for Schema {
    fn from(p: Primitive) -> Self {
        Schema::Primitive(p)
    }
}

impl Schema {
    pub fn array(items: impl Into<Schema>) -> Self {
        Schema::Array(Box::new(items.into()))
    }

    pub fn map(values: impl Into<Schema>) -> Self {
        Schema::Map(Box::new(values.into()))
    }

    pub fn record(name: &str, fields: Vec<Field>) -> Self {
        Schema::Record(Arc::new(RecordSchema {
            name: Name::new(name),
            fields,
            is_error: false,
            doc: None,
        }))
    }

    pub fn error(name: &str, fields: Vec<Field>) -> Self {
        Schema::Record(Arc::new(RecordSchema {
            name: Name::new(name),
            fields,
            is_error: true,
            doc: None,
        }))
    }

    pub fn enumeration(name: &str, symbols: &[&str]) -> Self {
        Schema::Enum(Arc::new(EnumSchema {
            name: Name::new(name),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            doc: None,
        }))
    }

    pub fn fixed(name: &str, size: usize) -> Self {
        Schema::Fixed(Arc::new(FixedSchema {
            name: Name::new(name),
            size,
        }))
    }

    /// Returns the simple type name: the primitive tag, `array`, `map`,
    /// `union`, or the simple (unqualified) name of a named type.
    pub fn type_name(&self) -> &str {
        match self {
            Schema::Primitive(p) => p.name(),
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Union(_) => "union",
            Schema::Record(r) => &r.name.name,
            Schema::Enum(e) => &e.name.name,
            Schema::Fixed(f) => &f.name.name,
            Schema::Ref(name) => &name.name,
        }
    }

    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed(f) => Some(&f.name),
            Schema::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the fully-qualified name of a named type.
    pub fn fullname(&self) -> Option<String> {
        self.name().map(Name::fullname)
    }

    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Parses a schema from its JSON declaration.
    pub fn parse(json: &Json) -> Result<Self, ProtocolError> {
        Parser::default().parse(json, None)
    }

    pub fn parse_str(s: &str) -> Result<Self, ProtocolError> {
        let json: Json = serde_json::from_str(s)?;
        Self::parse(&json)
    }

    /// Renders the schema as JSON. Named types are declared once and
    /// referenced by full name afterwards.
    pub fn to_json(&self) -> Json {
        let mut seen = HashSet::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(&self, seen: &mut HashSet<String>) -> Json {
        match self {
            Schema::Primitive(p) => json!(p.name()),
            Schema::Record(r) => {
                let fullname = r.name.fullname();
                if !seen.insert(fullname.clone()) {
                    return json!(fullname);
                }
                let fields: Vec<Json> = r
                    .fields
                    .iter()
                    .map(|f| {
                        let mut obj = Map::new();
                        obj.insert("name".to_string(), json!(f.name));
                        obj.insert("type".to_string(), f.schema.to_json_inner(seen));
                        if let Some(default) = &f.default {
                            obj.insert("default".to_string(), default.clone());
                        }
                        Json::Object(obj)
                    })
                    .collect();
                let kind = if r.is_error { "error" } else { "record" };
                json!({"type": kind, "name": fullname, "fields": fields})
            }
            Schema::Enum(e) => {
                let fullname = e.name.fullname();
                if !seen.insert(fullname.clone()) {
                    return json!(fullname);
                }
                json!({"type": "enum", "name": fullname, "symbols": e.symbols})
            }
            Schema::Fixed(f) => {
                let fullname = f.name.fullname();
                if !seen.insert(fullname.clone()) {
                    return json!(fullname);
                }
                json!({"type": "fixed", "name": fullname, "size": f.size})
            }
            Schema::Array(items) => json!({"type": "array", "items": items.to_json_inner(seen)}),
            Schema::Map(values) => json!({"type": "map", "values": values.to_json_inner(seen)}),
            Schema::Union(branches) => {
                Json::Array(branches.iter().map(|b| b.to_json_inner(seen)).collect())
            }
            Schema::Ref(name) => json!(name.fullname()),
        }
    }

    /// Collects every named type reachable from this schema, keyed by full
    /// name. Used to resolve [`Schema::Ref`] nodes.
    pub fn named_types(&self) -> HashMap<String, Schema> {
        let mut names = HashMap::new();
        self.collect_named(&mut names);
        names
    }

    fn collect_named(&self, names: &mut HashMap<String, Schema>) {
        match self {
            Schema::Record(r) => {
                let fullname = r.name.fullname();
                if names.contains_key(&fullname) {
                    return;
                }
                names.insert(fullname, self.clone());
                for field in &r.fields {
                    field.schema.collect_named(names);
                }
            }
            Schema::Enum(e) => {
                names.entry(e.name.fullname()).or_insert_with(|| self.clone());
            }
            Schema::Fixed(f) => {
                names.entry(f.name.fullname()).or_insert_with(|| self.clone());
            }
            Schema::Array(inner) | Schema::Map(inner) => inner.collect_named(names),
            Schema::Union(branches) => {
                for branch in branches {
                    branch.collect_named(names);
                }
            }
            Schema::Primitive(_) | Schema::Ref(_) => {}
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Stateful schema parser. Keeps the named types declared so far so later
/// schemas may reference them.
#[derive(Debug, Default)]
pub(crate) struct Parser {
    names: HashMap<String, Schema>,
    defining: HashSet<String>,
}

impl Parser {
    pub(crate) fn parse(
        &mut self,
        json: &Json,
        namespace: Option<&str>,
    ) -> Result<Schema, ProtocolError> {
        match json {
            Json::String(name) => self.parse_name(name, namespace),
            Json::Array(branches) => self.parse_union(branches, namespace),
            Json::Object(obj) => self.parse_object(obj, namespace),
            other => Err(ProtocolError::InvalidSchema(format!(
                "unexpected schema declaration: {}",
                other
            ))),
        }
    }

    pub(crate) fn parse_field(
        &mut self,
        json: &Json,
        namespace: Option<&str>,
    ) -> Result<Field, ProtocolError> {
        let obj = json.as_object().ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("field must be an object: {}", json))
        })?;
        let name = str_attr(obj, "name")?;
        let type_json = obj.get("type").ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("field '{}' has no type", name))
        })?;
        let schema = self.parse(type_json, namespace)?;

        Ok(Field {
            name: name.to_string(),
            schema,
            default: obj.get("default").cloned(),
            doc: obj.get("doc").and_then(Json::as_str).map(str::to_string),
        })
    }

    /// Resolves a type reference by name.
    pub(crate) fn parse_name(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Schema, ProtocolError> {
        if let Some(p) = Primitive::from_name(name) {
            return Ok(Schema::Primitive(p));
        }

        let mut candidates = vec![Name::qualified(name, namespace).fullname()];
        // Unqualified names may also refer to the null namespace.
        if namespace.is_some() && !name.contains('.') {
            candidates.push(name.to_string());
        }

        for fullname in &candidates {
            if let Some(schema) = self.names.get(fullname) {
                return Ok(schema.clone());
            }
            if self.defining.contains(fullname) {
                return Ok(Schema::Ref(Name::new(fullname)));
            }
        }

        Err(ProtocolError::UnknownType(candidates.swap_remove(0)))
    }

    fn parse_union(
        &mut self,
        branches: &[Json],
        namespace: Option<&str>,
    ) -> Result<Schema, ProtocolError> {
        let mut schemas = Vec::with_capacity(branches.len());
        let mut seen = HashSet::new();

        for branch in branches {
            let schema = self.parse(branch, namespace)?;
            if matches!(schema, Schema::Union(_)) {
                return Err(ProtocolError::InvalidSchema(
                    "unions may not immediately contain other unions".to_string(),
                ));
            }
            let key = schema
                .fullname()
                .unwrap_or_else(|| schema.type_name().to_string());
            if !seen.insert(key.clone()) {
                return Err(ProtocolError::InvalidSchema(format!(
                    "duplicate union branch: {}",
                    key
                )));
            }
            schemas.push(schema);
        }

        Ok(Schema::Union(schemas))
    }

    fn parse_object(
        &mut self,
        obj: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> Result<Schema, ProtocolError> {
        let type_json = obj.get("type").ok_or_else(|| {
            ProtocolError::InvalidSchema("schema object has no 'type'".to_string())
        })?;
        let type_name = match type_json {
            Json::String(s) => s.as_str(),
            // {"type": {...}} or {"type": [...]} wraps another declaration
            other => return self.parse(other, namespace),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, namespace, type_name == "error"),
            "enum" => self.parse_enum(obj, namespace),
            "fixed" => self.parse_fixed(obj, namespace),
            "array" => {
                let items = obj.get("items").ok_or_else(|| {
                    ProtocolError::InvalidSchema("array schema has no 'items'".to_string())
                })?;
                Ok(Schema::Array(Box::new(self.parse(items, namespace)?)))
            }
            "map" => {
                let values = obj.get("values").ok_or_else(|| {
                    ProtocolError::InvalidSchema("map schema has no 'values'".to_string())
                })?;
                Ok(Schema::Map(Box::new(self.parse(values, namespace)?)))
            }
            other => self.parse_name(other, namespace),
        }
    }

    fn declared_name(
        &self,
        obj: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> Result<Name, ProtocolError> {
        let name = str_attr(obj, "name")?;
        if name.is_empty() || name.ends_with('.') {
            return Err(ProtocolError::InvalidSchema(format!(
                "invalid type name '{}'",
                name
            )));
        }
        let namespace = obj.get("namespace").and_then(Json::as_str).or(namespace);
        let name = Name::qualified(name, namespace);

        let fullname = name.fullname();
        if Primitive::from_name(&fullname).is_some() {
            return Err(ProtocolError::InvalidSchema(format!(
                "type name '{}' shadows a primitive",
                fullname
            )));
        }
        if self.names.contains_key(&fullname) || self.defining.contains(&fullname) {
            return Err(ProtocolError::InvalidSchema(format!(
                "duplicate type definition: {}",
                fullname
            )));
        }
        Ok(name)
    }

    fn parse_record(
        &mut self,
        obj: &Map<String, Json>,
        namespace: Option<&str>,
        is_error: bool,
    ) -> Result<Schema, ProtocolError> {
        let name = self.declared_name(obj, namespace)?;
        let fullname = name.fullname();
        let fields_json = obj.get("fields").and_then(Json::as_array).ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("record {} has no 'fields' array", fullname))
        })?;

        self.defining.insert(fullname.clone());

        let mut fields = Vec::with_capacity(fields_json.len());
        let mut seen = HashSet::new();
        for field_json in fields_json {
            let field = self.parse_field(field_json, name.namespace.as_deref())?;
            if !seen.insert(field.name.clone()) {
                return Err(ProtocolError::InvalidSchema(format!(
                    "duplicate field '{}' in {}",
                    field.name, fullname
                )));
            }
            fields.push(field);
        }

        self.defining.remove(&fullname);

        let schema = Schema::Record(Arc::new(RecordSchema {
            name,
            fields,
            is_error,
            doc: obj.get("doc").and_then(Json::as_str).map(str::to_string),
        }));
        self.names.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_enum(
        &mut self,
        obj: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> Result<Schema, ProtocolError> {
        let name = self.declared_name(obj, namespace)?;
        let fullname = name.fullname();
        let symbols_json = obj.get("symbols").and_then(Json::as_array).ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("enum {} has no 'symbols' array", fullname))
        })?;

        let mut symbols = Vec::with_capacity(symbols_json.len());
        for symbol in symbols_json {
            let symbol = symbol.as_str().ok_or_else(|| {
                ProtocolError::InvalidSchema(format!("enum {} has a non-string symbol", fullname))
            })?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(ProtocolError::InvalidSchema(format!(
                    "duplicate symbol '{}' in {}",
                    symbol, fullname
                )));
            }
            symbols.push(symbol.to_string());
        }

        let schema = Schema::Enum(Arc::new(EnumSchema {
            name,
            symbols,
            doc: obj.get("doc").and_then(Json::as_str).map(str::to_string),
        }));
        self.names.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_fixed(
        &mut self,
        obj: &Map<String, Json>,
        namespace: Option<&str>,
    ) -> Result<Schema, ProtocolError> {
        let name = self.declared_name(obj, namespace)?;
        let fullname = name.fullname();
        let size = obj.get("size").and_then(Json::as_u64).ok_or_else(|| {
            ProtocolError::InvalidSchema(format!("fixed {} has no integer 'size'", fullname))
        })?;

        let schema = Schema::Fixed(Arc::new(FixedSchema {
            name,
            size: size as usize,
        }));
        self.names.insert(fullname, schema.clone());
        Ok(schema)
    }
}

fn str_attr<'a>(obj: &'a Map<String, Json>, key: &str) -> Result<&'a str, ProtocolError> {
    obj.get(key).and_then(Json::as_str).ok_or_else(|| {
        ProtocolError::InvalidSchema(format!("missing string attribute '{}'", key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_primitives() {
        for p in Primitive::ALL {
            let schema = Schema::parse(&json!(p.name())).unwrap();
            assert_eq!(schema, Schema::Primitive(p));
            assert_eq!(schema.type_name(), p.name());
            assert!(!schema.is_named());

            let wrapped = Schema::parse(&json!({"type": p.name()})).unwrap();
            assert_eq!(wrapped, Schema::Primitive(p));
        }
    }

    #[test]
    fn test_name_qualification() {
        let name = Name::qualified("Point", Some("geo"));
        assert_eq!(name.fullname(), "geo.Point");

        let name = Name::qualified("other.Point", Some("geo"));
        assert_eq!(name.namespace.as_deref(), Some("other"));
        assert_eq!(name.name, "Point");

        let name = Name::qualified("Point", Some(""));
        assert_eq!(name.fullname(), "Point");
    }

    #[test]
    fn test_parse_record_with_namespace() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Point",
                "namespace": "geo",
                "fields": [
                    {"name": "x", "type": "int"},
                    {"name": "y", "type": "int", "default": 0}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.fullname().as_deref(), Some("geo.Point"));
        assert_eq!(schema.type_name(), "Point");
        match &schema {
            Schema::Record(r) => {
                assert_eq!(r.fields.len(), 2);
                assert_eq!(r.field("y").unwrap().default, Some(json!(0)));
                assert!(!r.is_error);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_named_types_inherit_namespace() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Line",
                "namespace": "geo",
                "fields": [
                    {"name": "start", "type": {"type": "record", "name": "Point", "fields": [{"name": "x", "type": "int"}]}},
                    {"name": "end", "type": "Point"}
                ]
            }"#,
        )
        .unwrap();

        let Schema::Record(line) = &schema else {
            panic!("expected record");
        };
        assert_eq!(line.fields[0].schema.fullname().as_deref(), Some("geo.Point"));
        assert_eq!(line.fields[0].schema, line.fields[1].schema);
    }

    #[test]
    fn test_recursive_record_produces_ref() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "Node"]}
                ]
            }"#,
        )
        .unwrap();

        let Schema::Record(node) = &schema else {
            panic!("expected record");
        };
        assert_eq!(
            node.fields[1].schema,
            Schema::Union(vec![
                Schema::Primitive(Primitive::Null),
                Schema::Ref(Name::new("Node"))
            ])
        );
        assert!(schema.named_types().contains_key("Node"));
    }

    #[test]
    fn test_parse_array_map_enum_fixed() {
        let schema = Schema::parse(&json!({"type": "array", "items": "string"})).unwrap();
        assert_eq!(schema, Schema::array(Primitive::String));
        assert_eq!(schema.type_name(), "array");

        let schema = Schema::parse(&json!({"type": "map", "values": "long"})).unwrap();
        assert_eq!(schema, Schema::map(Primitive::Long));
        assert_eq!(schema.type_name(), "map");

        let schema = Schema::parse(
            &json!({"type": "enum", "name": "cards.Suit", "symbols": ["HEARTS", "SPADES"]}),
        )
        .unwrap();
        assert_eq!(schema.fullname().as_deref(), Some("cards.Suit"));

        let schema = Schema::parse(&json!({"type": "fixed", "name": "md5", "size": 16})).unwrap();
        assert_eq!(schema, Schema::fixed("md5", 16));
    }

    #[test]
    fn test_unknown_type_reference() {
        let err = Schema::parse(&json!("geo.Missing")).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(name) if name == "geo.Missing"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::parse_str(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "a", "type": "int"},
                {"name": "a", "type": "string"}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate field 'a'"));
    }

    #[test]
    fn test_invalid_unions() {
        let err = Schema::parse(&json!(["int", "int"])).unwrap_err();
        assert!(err.to_string().contains("duplicate union branch"));

        let err = Schema::parse(&json!(["int", ["null", "string"]])).unwrap_err();
        assert!(err.to_string().contains("unions may not"));
    }

    #[test]
    fn test_duplicate_enum_symbol() {
        let err = Schema::parse(&json!({"type": "enum", "name": "E", "symbols": ["A", "A"]}))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate symbol"));
    }

    #[test]
    fn test_to_json_reparses_to_same_schema() {
        let original = Schema::parse_str(
            r#"{
                "type": "error",
                "name": "bank.Overdrawn",
                "fields": [
                    {"name": "amount", "type": "double"},
                    {"name": "accounts", "type": {"type": "map", "values": {"type": "fixed", "name": "Iban", "size": 4}}},
                    {"name": "primary", "type": ["null", "Iban"], "default": null}
                ]
            }"#,
        )
        .unwrap();

        let rendered = original.to_json();
        assert_eq!(rendered["type"], json!("error"));
        // The second use of Iban is rendered by name only.
        assert_eq!(rendered["fields"][2]["type"][1], json!("bank.Iban"));

        let reparsed = Schema::parse(&rendered).unwrap();
        assert_eq!(reparsed, original);
    }

    fn container_schema() -> impl Strategy<Value = Schema> {
        let leaf = prop::sample::select(Primitive::ALL[1..].to_vec()).prop_map(Schema::from);
        leaf.prop_recursive(4, 32, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(Schema::array),
                inner.clone().prop_map(Schema::map),
                // Unions may not directly contain unions.
                inner.prop_map(|s| match s {
                    Schema::Union(_) => {
                        Schema::Union(vec![Primitive::Null.into(), Schema::array(s)])
                    }
                    s => Schema::Union(vec![Primitive::Null.into(), s]),
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_to_json_parses_back(schema in container_schema()) {
            let reparsed = Schema::parse(&schema.to_json()).unwrap();
            prop_assert_eq!(reparsed, schema);
        }
    }
}
