//! Infers struct shapes from live sample payloads.
//!
//! Samples are first reduced to a [`Shape`] so that every element of a list
//! contributes to the element type, then turned into the code model.

use std::collections::{BTreeMap, HashSet};

use log::warn;
use serde_json::Value;

use crate::deserializer::{PropertyDef, PropertyKind, TypeDef};
use crate::model::{Field, FieldType, Primitive, StructDef, TypeShape};
use crate::naming::Namer;

pub const LOCKED_KEY: &str = "_locked";
pub const DISCRIMINATOR_KEY: &str = "_type";
pub const REFERENCE_KEY: &str = "_ref";

/// `_type` would collide with the `type` keyword in most targets
pub const DISCRIMINATOR_FIELD: &str = "ObjectType";
pub const REFERENCE_FIELD: &str = "Reference";

/// The inferred shape of a sample and the subtype flags it implies
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub shape: TypeShape,
    pub is_plural: bool,
    pub is_plural_interface: bool,
    pub is_type: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    /// `null`, or a list without elements
    Unknown,
    /// Samples disagree about the kind
    Conflict,
    Bool,
    Int,
    Float,
    Str,
    Object(BTreeMap<String, Shape>),
    Array(Box<Shape>),
}

fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Null => Shape::Unknown,
        Value::Bool(_) => Shape::Bool,
        // Integers and fractions are told apart by how the API wrote them
        Value::Number(n) if n.is_f64() => Shape::Float,
        Value::Number(_) => Shape::Int,
        Value::String(_) => Shape::Str,
        Value::Object(map) => Shape::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), shape_of(value)))
                .collect(),
        ),
        Value::Array(items) => Shape::Array(Box::new(merge_elements(items))),
    }
}

fn merge_elements(items: &[Value]) -> Shape {
    items
        .iter()
        .map(shape_of)
        .fold(Shape::Unknown, unify)
}

fn unify(a: Shape, b: Shape) -> Shape {
    match (a, b) {
        (Shape::Unknown, other) | (other, Shape::Unknown) => other,
        (Shape::Int, Shape::Float) | (Shape::Float, Shape::Int) => Shape::Float,
        (Shape::Object(mut a), Shape::Object(b)) => {
            for (key, shape) in b {
                let merged = match a.remove(&key) {
                    Some(existing) => unify(existing, shape),
                    None => shape,
                };
                a.insert(key, merged);
            }
            Shape::Object(a)
        }
        (Shape::Array(a), Shape::Array(b)) => Shape::Array(Box::new(unify(*a, *b))),
        (a, b) if a == b => a,
        _ => Shape::Conflict,
    }
}

fn field_type(shape: &Shape) -> FieldType {
    match shape {
        Shape::Unknown | Shape::Conflict => FieldType::Any,
        Shape::Bool => FieldType::Simple(Primitive::Bool),
        Shape::Int => FieldType::Simple(Primitive::Long),
        Shape::Float => FieldType::Simple(Primitive::Double),
        Shape::Str => FieldType::Simple(Primitive::String),
        Shape::Object(_) => FieldType::Map,
        Shape::Array(element) => match element.as_ref() {
            Shape::Unknown | Shape::Conflict => FieldType::Array(None),
            element => FieldType::Array(Some(Box::new(field_type(element)))),
        },
    }
}

/// The field type of a single JSON value, as used for node values.
pub fn field_type_for(value: &Value) -> FieldType {
    field_type(&shape_of(value))
}

/// Hands out member names that are valid identifiers and never repeat.
struct FieldNames<'a> {
    namer: &'a Namer,
    taken: HashSet<String>,
}

impl<'a> FieldNames<'a> {
    fn new(namer: &'a Namer) -> Self {
        Self {
            namer,
            taken: HashSet::new(),
        }
    }

    fn claim(&mut self, json_key: &str) -> String {
        let base = match json_key {
            DISCRIMINATOR_KEY => DISCRIMINATOR_FIELD.to_string(),
            REFERENCE_KEY => REFERENCE_FIELD.to_string(),
            _ => {
                let name = self.namer.key_name(json_key);
                if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("Field{name}")
                } else {
                    name
                }
            }
        };
        let mut name = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&name) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        self.taken.insert(name.clone());
        name
    }
}

fn record(namer: &Namer, name: &str, doc: Option<String>, fields: &BTreeMap<String, Shape>) -> StructDef {
    let mut names = FieldNames::new(namer);
    let fields = fields
        .iter()
        .map(|(key, shape)| Field {
            name: names.claim(key),
            json_tag: key.clone(),
            field_type: field_type(shape),
            docs: vec![],
        })
        .collect();
    StructDef {
        name: name.to_string(),
        doc,
        fields,
    }
}

fn declared_field(name: String, json_key: &str, property: &PropertyDef) -> Field {
    let mut docs = vec![];
    if !property.description.trim().is_empty() {
        docs.push(format!("{name} description: {}", property.description.trim()));
    }
    if !property.enum_values.is_empty() {
        let values = Value::Array(property.enum_values.clone());
        docs.push(format!("{name} can be one of: {values}"));
    }
    let default_matches = match (&property.kind, &property.default) {
        (PropertyKind::String, Some(v @ Value::String(_)))
        | (PropertyKind::Integer, Some(v @ Value::Number(_)))
        | (PropertyKind::Boolean, Some(v @ Value::Bool(_))) => Some(v),
        _ => None,
    };
    if let Some(default) = default_matches {
        docs.push(format!("{name} default value is {default}"));
    }
    let field_type = match &property.kind {
        PropertyKind::String => FieldType::Simple(Primitive::String),
        PropertyKind::Integer => FieldType::Simple(Primitive::Int),
        PropertyKind::Boolean => FieldType::Simple(Primitive::Bool),
        PropertyKind::Array => FieldType::Array(None),
        PropertyKind::Missing => {
            warn!("No declared type for {json_key}: {}", property.description);
            FieldType::Any
        }
        PropertyKind::Unknown(kind) => {
            warn!("Do not know type \"{kind}\" for {json_key}: {}", property.description);
            FieldType::Any
        }
    };
    Field {
        name,
        json_tag: json_key.to_string(),
        field_type,
        docs,
    }
}

/// Element struct of a list whose sample had nothing to infer from: the
/// bookkeeping keys every object carries plus the schema's declared properties.
fn declared_record(namer: &Namer, name: &str, declared: Option<&TypeDef>) -> StructDef {
    let mut names = FieldNames::new(namer);
    let mut fields = vec![];
    for key in [LOCKED_KEY, DISCRIMINATOR_KEY, REFERENCE_KEY] {
        fields.push(Field {
            name: names.claim(key),
            json_tag: key.to_string(),
            field_type: FieldType::Simple(Primitive::String),
            docs: vec![],
        });
    }
    let description = declared.map(|d| d.description.trim()).unwrap_or_default();
    if let Some(declared) = declared {
        for (key, property) in &declared.properties {
            if fields.iter().any(|f| &f.json_tag == key) {
                continue;
            }
            let member = names.claim(key);
            fields.push(declared_field(member, key, property));
        }
    }
    let doc = if description.is_empty() {
        format!("{name} is a generated object")
    } else {
        format!("{name} represents a {description}")
    };
    StructDef {
        name: name.to_string(),
        doc: Some(doc),
        fields,
    }
}

/// Infers the struct for `name` from a live `sample`.
///
/// `declared` is the schema's type definition for the subtype; it is only
/// consulted when the sample is a list without usable elements.
pub fn synthesize(namer: &Namer, sample: &Value, name: &str, declared: Option<&TypeDef>) -> Synthesized {
    let shape = shape_of(sample);
    let (shape, is_plural, is_plural_interface) = match shape {
        Shape::Object(fields) => (TypeShape::Record(record(namer, name, None, &fields)), false, false),
        Shape::Array(element) => match *element {
            Shape::Object(fields) => {
                let doc = Some(format!("{name} is a generated object"));
                (TypeShape::RecordList(record(namer, name, doc, &fields)), true, false)
            }
            Shape::Unknown | Shape::Conflict => (
                TypeShape::RecordList(declared_record(namer, name, declared)),
                true,
                true,
            ),
            scalar => (
                TypeShape::Alias(FieldType::Array(Some(Box::new(field_type(&scalar))))),
                false,
                false,
            ),
        },
        scalar => (TypeShape::Alias(field_type(&scalar)), false, false),
    };
    let is_type = shape
        .record()
        .is_some_and(|def| def.field_by_tag(DISCRIMINATOR_KEY).is_some());
    Synthesized {
        shape,
        is_plural,
        is_plural_interface,
        is_type,
    }
}
