//! This crate provides the runtime schema used by the ebml-decoder crate.
//!
//! A schema is an ordered list of [`SchemaEntry`] values (id, name, type and placement) that is compiled once into a [`Schema`]: an id keyed lookup of immutable [`SchemaDefinition`]s.  Element placement is described with the EBML path grammar (see [`PathContext`]) and compiled up front so that the decoder never deals with path strings while parsing.
//!

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

///
/// Contains the bootstrap EBML header schema that is merged into every decoder schema by default.
///
pub mod header;
mod path;

pub use path::{Occurrence, PathContext, PathSegment};

///
/// Path of the definition synthesized for ids that aren't in the schema.
///
pub const UNKNOWN_ELEMENT_PATH: &str = r"*((1*\)\Unknown)";

///
/// Different data types defined in the EBML specification.
///
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ElementType {
    Master,
    String,
    Utf8,
    UnsignedInteger,
    Integer,
    Float,
    Date,
    Binary,
}

impl ElementType {

    ///
    /// The type name used in schema tables, e.g. `"uinteger"`.
    ///
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Master => "master",
            ElementType::String => "string",
            ElementType::Utf8 => "utf-8",
            ElementType::UnsignedInteger => "uinteger",
            ElementType::Integer => "integer",
            ElementType::Float => "float",
            ElementType::Date => "date",
            ElementType::Binary => "binary",
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, ElementType::Master)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = SchemaError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "master" => Ok(ElementType::Master),
            "string" => Ok(ElementType::String),
            "utf-8" => Ok(ElementType::Utf8),
            "uinteger" => Ok(ElementType::UnsignedInteger),
            "integer" => Ok(ElementType::Integer),
            "float" => Ok(ElementType::Float),
            "date" => Ok(ElementType::Date),
            "binary" => Ok(ElementType::Binary),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid element id: {0:?}")]
    InvalidId(String),

    #[error("Unknown element type: {0:?}")]
    UnknownType(String),

    #[error("Element {name} ({id}) declares neither a valid path nor a level")]
    MissingPlacement {
        id: String,
        name: String,
    },
}

///
/// An element id as written by a schema author - either numeric or a hex string with or without a `0x` prefix.
///
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum RawId {
    Number(u64),
    Hex(String),
}

impl From<u64> for RawId {
    fn from(id: u64) -> Self {
        RawId::Number(id)
    }
}

impl From<u32> for RawId {
    fn from(id: u32) -> Self {
        RawId::Number(id.into())
    }
}

impl From<&str> for RawId {
    fn from(id: &str) -> Self {
        RawId::Hex(id.to_string())
    }
}

impl From<String> for RawId {
    fn from(id: String) -> Self {
        RawId::Hex(id)
    }
}

///
/// Canonical form of an element id: lowercase hex without prefix or leading zeros.
///
/// Ids read from a stream keep their vint marker bits, so `0x1A45DFA3`, `"0x1a45dfa3"` and `"1A45DFA3"` all canonicalize to `"1a45dfa3"`.
///
pub fn canonical_id(id: &RawId) -> Result<String, SchemaError> {
    match id {
        RawId::Number(value) => Ok(format!("{:x}", value)),
        RawId::Hex(text) => {
            let digits = text.strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .unwrap_or(text);
            u64::from_str_radix(digits, 16)
                .map(|value| format!("{:x}", value))
                .map_err(|_| SchemaError::InvalidId(text.clone()))
        },
    }
}

///
/// One element of a caller supplied schema table.
///
/// Placement is given as an EBML path, a raw nesting level, or both - the level is used when the path doesn't follow the path grammar.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchemaEntry {
    pub id: RawId,
    pub name: String,
    pub element_type: String,
    pub path: Option<String>,
    pub level: Option<i64>,
}

impl SchemaEntry {
    pub fn path(id: impl Into<RawId>, name: &str, element_type: &str, path: &str) -> Self {
        SchemaEntry {
            id: id.into(),
            name: name.to_string(),
            element_type: element_type.to_string(),
            path: Some(path.to_string()),
            level: None,
        }
    }

    pub fn level(id: impl Into<RawId>, name: &str, element_type: &str, level: i64) -> Self {
        SchemaEntry {
            id: id.into(),
            name: name.to_string(),
            element_type: element_type.to_string(),
            path: None,
            level: Some(level),
        }
    }

    ///
    /// Sets the raw nesting level used if the path can't be parsed.
    ///
    pub fn with_level(mut self, level: i64) -> Self {
        self.level = Some(level);
        self
    }
}

///
/// A compiled, immutable element definition.
///
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaDefinition {
    pub key: String,
    pub id: String,
    pub name: String,
    pub element_type: ElementType,
    pub context: PathContext,
}

impl SchemaDefinition {

    ///
    /// Definition used for ids missing from the schema when strict decoding is disabled.
    ///
    /// The element is typed as binary and placed as a global element so that it never closes an unknown-sized parent.
    ///
    pub fn unknown(key: &str) -> Self {
        SchemaDefinition {
            key: key.to_string(),
            id: format!("0x{}", key),
            name: String::from("Unknown"),
            element_type: ElementType::Binary,
            context: PathContext::global("Unknown", 1),
        }
    }

    fn compile(entry: &SchemaEntry) -> Result<Self, SchemaError> {
        let key = canonical_id(&entry.id)?;
        let element_type = entry.element_type.parse()?;
        let context = entry.path.as_deref()
            .and_then(PathContext::parse)
            .or_else(|| entry.level.map(PathContext::from_level))
            .ok_or_else(|| SchemaError::MissingPlacement { id: format!("0x{}", key), name: entry.name.clone() })?;

        Ok(SchemaDefinition {
            id: format!("0x{}", key),
            key,
            name: entry.name.clone(),
            element_type,
            context,
        })
    }
}

///
/// Lookup of compiled definitions by canonical id.
///
#[derive(Clone, Debug, Default)]
pub struct Schema {
    definitions: HashMap<String, Arc<SchemaDefinition>>,
}

impl Schema {

    ///
    /// Compiles `entries`, optionally preceded by the EBML [`header`] schema.
    ///
    /// Later entries replace earlier ones with the same id, so a caller can override header definitions.
    ///
    /// # Errors
    ///
    /// Fails if an id isn't a valid number, a type name is not one of the EBML types, or a path doesn't follow the path grammar.
    ///
    pub fn compile(entries: &[SchemaEntry], header: bool) -> Result<Self, SchemaError> {
        let bootstrap = if header { header::entries() } else { Vec::new() };

        let mut definitions = HashMap::with_capacity(bootstrap.len() + entries.len());
        for entry in bootstrap.iter().chain(entries) {
            let definition = SchemaDefinition::compile(entry)?;
            definitions.insert(definition.key.clone(), Arc::new(definition));
        }

        Ok(Schema { definitions })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<SchemaDefinition>> {
        self.definitions.get(key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<SchemaDefinition>> {
        self.definitions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_ids() {
        assert_eq!("a1", canonical_id(&RawId::from(0xa1u64)).unwrap());
        assert_eq!("1a45dfa3", canonical_id(&RawId::from("0x1A45DFA3")).unwrap());
        assert_eq!("1a45dfa3", canonical_id(&RawId::from("1a45dfa3")).unwrap());
        assert_eq!("42f2", canonical_id(&RawId::from(0x42f2u32)).unwrap());
        assert!(matches!(canonical_id(&RawId::from("0xzz")), Err(SchemaError::InvalidId(_))));
    }

    #[test]
    fn compiles_paths_and_levels() {
        let schema = Schema::compile(&[
            SchemaEntry::path("0xA1", "StringElement", "string", r"*(\MasterElement\StringElement)"),
            SchemaEntry::level(0xa2u64, "MasterElement", "master", 0),
        ], false).unwrap();

        assert_eq!(2, schema.len());

        let string = schema.get("a1").expect("string definition");
        assert_eq!("0xa1", string.id);
        assert_eq!(ElementType::String, string.element_type);
        assert_eq!(1, string.context.level);

        let master = schema.get("a2").expect("master definition");
        assert_eq!(PathContext::from_level(0), master.context);
        assert!(master.element_type.is_master());
    }

    #[test]
    fn merges_header() {
        let schema = Schema::compile(&[], true).unwrap();
        let max_id_length = schema.get(header::MAX_ID_LENGTH_ID).expect("header definition");

        assert_eq!("EBMLMaxIDLength", max_id_length.name);
        assert_eq!(ElementType::UnsignedInteger, max_id_length.element_type);
        assert!(schema.get("1a45dfa3").is_some());
        assert!(Schema::compile(&[], false).unwrap().is_empty());
    }

    #[test]
    fn caller_entries_override_header() {
        let schema = Schema::compile(&[
            SchemaEntry::level(0x4282u64, "CustomDocType", "utf-8", 1),
        ], true).unwrap();

        assert_eq!("CustomDocType", schema.get("4282").unwrap().name);
    }

    #[test]
    fn rejects_bad_entries() {
        let bad_type = Schema::compile(&[SchemaEntry::level(0xa1u64, "A", "bool", 0)], false);
        assert!(matches!(bad_type, Err(SchemaError::UnknownType(name)) if name == "bool"));

        let bad_path = Schema::compile(&[SchemaEntry::path(0xa1u64, "A", "binary", "A/B")], false);
        assert!(matches!(bad_path, Err(SchemaError::MissingPlacement { .. })));
    }

    #[test]
    fn unparsable_path_falls_back_to_level() {
        let schema = Schema::compile(&[
            SchemaEntry::path(0xa1u64, "A", "binary", "A/B").with_level(2),
        ], false).unwrap();

        assert_eq!(PathContext::from_level(2), schema.get("a1").unwrap().context);
    }

    #[test]
    fn unknown_definition() {
        let definition = SchemaDefinition::unknown("ec");

        assert_eq!("0xec", definition.id);
        assert_eq!("Unknown", definition.name);
        assert_eq!(ElementType::Binary, definition.element_type);
        assert_eq!(PathContext::parse(UNKNOWN_ELEMENT_PATH), Some(definition.context));
    }

    #[test]
    fn element_type_names_round_trip() {
        for name in ["master", "string", "utf-8", "uinteger", "integer", "float", "date", "binary"] {
            assert_eq!(name, name.parse::<ElementType>().unwrap().name());
        }
    }
}
