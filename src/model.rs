//! The language independent code model every emitter renders from.
//!
//! The assembler fills an [`Endpoint`] per definition; emitters never look at
//! the schema document or the samples again.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::deserializer::TypeDef;

/// A type for a field in a struct
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldType {
    /// A primitive of the target language
    Simple(Primitive),
    /// A list of another type, or of untyped elements when the sample gave no
    /// consistent element shape
    Array(Option<Box<FieldType>>),
    /// An untyped string keyed map
    Map,
    /// Anything, used for `null` samples and conflicting shapes
    Any,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum Primitive {
    /// Platform sized integer, only produced from declared `integer` properties
    Int,
    /// 64-bit integer, produced from integral samples
    Long,
    Double,
    String,
    Bool,
}

/// A field of a generated struct
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// CamelCase member name
    pub name: String,
    /// Key in the JSON payload
    pub json_tag: String,
    pub field_type: FieldType,
    /// Doc comment lines
    pub docs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDef {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
}

impl StructDef {
    pub fn field_by_tag(&self, json_tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.json_tag == json_tag)
    }

    /// The field for `json_tag` if it holds a plain string
    pub fn string_field(&self, json_tag: &str) -> Option<&Field> {
        self.field_by_tag(json_tag)
            .filter(|f| f.field_type == FieldType::Simple(Primitive::String))
    }
}

/// What a sample payload looks like once inferred.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeShape {
    /// A single JSON object
    Record(StructDef),
    /// A list of records: renders `<Name>s` as a list of `<Name>`
    RecordList(StructDef),
    /// Anything that is not an object or a list of objects
    Alias(FieldType),
    /// No sample was available
    Opaque,
}

impl TypeShape {
    pub fn record(&self) -> Option<&StructDef> {
        match self {
            TypeShape::Record(def) | TypeShape::RecordList(def) => Some(def),
            TypeShape::Alias(_) | TypeShape::Opaque => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, TypeShape::RecordList(_))
    }
}

/// One generated struct representing a sub-resource, e.g. `Pop3Account`.
///
/// The same subtype is visited once per HTTP method of every path it appears
/// under; [`Subtype::merge`] folds those partial records together.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Subtype {
    pub name: String,
    pub json_tag: String,
    /// The path without a reference parameter, if one exists
    pub get_path: String,
    pub get_paths: BTreeSet<String>,
    pub put_path: String,
    pub post_path: String,
    pub delete_path: String,
    pub patch_path: String,
    pub has_ref: bool,
    pub is_plural: bool,
    pub is_plural_interface: bool,
    /// The struct carries the `_type` discriminator as `ObjectType`
    pub is_type: bool,
    #[serde(skip)]
    pub declared: Option<TypeDef>,
    pub body: Option<TypeShape>,
}

impl Subtype {
    pub fn new(name: impl Into<String>, json_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            json_tag: json_tag.into(),
            ..Default::default()
        }
    }

    /// Non-empty paths overwrite, GET paths are unioned, bodies overwrite when
    /// supplied and flags stay set once set. A declared type is only replaced
    /// by a record that carries a plain GET path.
    pub fn merge(&mut self, other: Subtype) {
        fn take(into: &mut String, from: String) {
            if !from.is_empty() {
                *into = from;
            }
        }
        if !other.get_path.is_empty() && other.declared.is_some() {
            self.declared = other.declared;
        }
        take(&mut self.get_path, other.get_path);
        take(&mut self.put_path, other.put_path);
        take(&mut self.post_path, other.post_path);
        take(&mut self.delete_path, other.delete_path);
        take(&mut self.patch_path, other.patch_path);
        self.get_paths.extend(other.get_paths);
        if other.body.is_some() {
            self.body = other.body;
        }
        self.has_ref |= other.has_ref;
        self.is_plural |= other.is_plural;
        self.is_plural_interface |= other.is_plural_interface;
        self.is_type |= other.is_type;
    }

    /// The shape emitters render; subtypes that were never sampled stay opaque.
    pub fn shape(&self) -> &TypeShape {
        self.body.as_ref().unwrap_or(&TypeShape::Opaque)
    }

    /// The list struct name for plural subtypes
    pub fn plural_name(&self) -> String {
        format!("{}s", self.name)
    }
}

/// The generator's picture of one resource grouping (one definition).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Endpoint {
    pub title: String,
    pub name: String,
    pub description: String,
    pub link: String,
    /// The endpoint's own GET path, e.g. `/api/nodes/pop3`
    pub path: String,
    pub routes: Vec<String>,
    pub methods: Vec<String>,
    pub references: Vec<String>,
    pub subtypes: Vec<Subtype>,
    pub body: Option<TypeShape>,
    /// `(path, method)` -> schema description
    #[serde(skip)]
    pub descriptions: BTreeMap<(String, String), String>,
}

impl Endpoint {
    pub fn describe(&self, path: &str, method: &str) -> Option<&str> {
        self.descriptions
            .get(&(path.to_string(), method.to_string()))
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
    }

    /// Whether any emitted path has to be formatted with a reference
    pub fn uses_references(&self) -> bool {
        self.subtypes.iter().any(|s| {
            [&s.delete_path, &s.patch_path, &s.put_path]
                .iter()
                .any(|p| p.contains("{ref}"))
        })
    }
}
