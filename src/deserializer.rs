use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of `GET /api/definitions`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Definition {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    /// Path of the definition's schema document, e.g. `/api/definitions/pop3`
    #[serde(default, alias = "Link")]
    pub link: String,
}

/// `GET /api/status/version`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Version {
    pub restd: String,
}

/// The swagger-like document behind a definition link.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SchemaDocument {
    /// path -> method -> metadata
    #[serde(default)]
    pub paths: BTreeMap<String, BTreeMap<String, MethodMeta>>,
    /// Object type name (`pop3.account`) -> declared properties
    #[serde(default)]
    pub definitions: BTreeMap<String, TypeDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct MethodMeta {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Keyed by status code
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseMeta>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "in")]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ResponseMeta {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct TypeDef {
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PropertyDef {
    #[serde(default, rename = "type")]
    pub kind: PropertyKind,
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    #[serde(default)]
    pub items: Option<serde_json::Value>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub description: String,
}

/// The declared `type` of a property. Anything the generator has no mapping for
/// is kept verbatim so it can be reported.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(from = "Option<String>", into = "String")]
pub enum PropertyKind {
    String,
    Integer,
    Boolean,
    Array,
    #[default]
    Missing,
    Unknown(String),
}

impl From<Option<String>> for PropertyKind {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("string") => PropertyKind::String,
            Some("integer") => PropertyKind::Integer,
            Some("boolean") => PropertyKind::Boolean,
            Some("array") => PropertyKind::Array,
            Some(other) => PropertyKind::Unknown(other.to_string()),
            None => PropertyKind::Missing,
        }
    }
}

impl From<PropertyKind> for String {
    fn from(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::String => "string".into(),
            PropertyKind::Integer => "integer".into(),
            PropertyKind::Boolean => "boolean".into(),
            PropertyKind::Array => "array".into(),
            PropertyKind::Missing => String::new(),
            PropertyKind::Unknown(raw) => raw,
        }
    }
}
