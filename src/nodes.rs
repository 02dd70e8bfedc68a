//! Typed accessors for the single values listed under `/api/nodes`.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::FieldType;
use crate::naming::Namer;
use crate::synthesizer::field_type_for;

/// One node key, e.g. `smtp.status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeEntry {
    pub key: String,
    pub name: String,
    pub field_type: FieldType,
}

impl NodeEntry {
    pub fn path(&self) -> String {
        format!("/api/nodes/{}", self.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeSet {
    pub entries: Vec<NodeEntry>,
}

impl NodeSet {
    /// Builds the set from the `/api/nodes` listing, ordered by key.
    pub fn from_listing(namer: &Namer, listing: &Map<String, Value>) -> Self {
        let mut keys = listing.keys().collect::<Vec<_>>();
        keys.sort();

        let mut taken = HashSet::new();
        let entries = keys
            .into_iter()
            .map(|key| {
                let base = namer.key_name(key);
                let mut name = base.clone();
                let mut suffix = 2;
                while !taken.insert(name.clone()) {
                    name = format!("{base}{suffix}");
                    suffix += 1;
                }
                NodeEntry {
                    key: key.clone(),
                    name,
                    field_type: field_type_for(&listing[key.as_str()]),
                }
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
