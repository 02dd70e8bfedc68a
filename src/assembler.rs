//! Builds an [`Endpoint`] from a definition's schema document.

use log::debug;

use crate::deserializer::{Definition, MethodMeta, SchemaDocument, TypeDef};
use crate::model::{Endpoint, Subtype};
use crate::naming::Namer;
use crate::synthesizer::Synthesized;

const NODES_DEFINITION: &str = "Nodes";
const USED_BY: &str = "usedby";

/// Every path is stored and requested in its `/api/...` form.
pub fn api_path(path: &str) -> String {
    if path.starts_with("/api/") || path == "/api" {
        path.to_string()
    } else if path.starts_with('/') {
        format!("/api{path}")
    } else {
        format!("/api/{path}")
    }
}

pub fn is_nodes_definition(definition: &Definition) -> bool {
    definition.name.eq_ignore_ascii_case(NODES_DEFINITION)
}

/// The path segment a subtype is named after and whether the path is a
/// `.../{ref}/usedby` lookup.
///
/// `/api/objects/pop3/account/` and `/api/objects/pop3/account/{ref}` both
/// name `account`; so does `/api/objects/pop3/account/{ref}/usedby`.
pub fn name_segment(path: &str) -> (&str, bool) {
    let parts = path.split('/').collect::<Vec<_>>();
    let used_by = parts.last() == Some(&USED_BY) && parts.len() >= 3;
    let back = if used_by { 3 } else { 2 };
    let segment = parts.len().checked_sub(back).map(|i| parts[i]).unwrap_or("");
    (segment, used_by)
}

impl Endpoint {
    pub fn for_definition(namer: &Namer, definition: &Definition) -> Self {
        let lower = definition.name.to_lowercase();
        let path = if is_nodes_definition(definition) {
            format!("/api/{lower}")
        } else {
            format!("/api/nodes/{lower}")
        };
        Self {
            title: namer.type_name(&definition.name),
            name: definition.name.clone(),
            description: definition.description.clone(),
            link: definition.link.clone(),
            path,
            ..Default::default()
        }
    }

    pub fn add_route(&mut self, path: &str) {
        if !self.routes.iter().any(|r| r == path) {
            self.routes.push(path.to_string());
        }
    }

    pub fn add_method(&mut self, method: &str) {
        if !self.methods.iter().any(|m| m == method) {
            self.methods.push(method.to_string());
        }
    }

    pub fn add_reference(&mut self, reference: &str) {
        if !self.references.iter().any(|r| r == reference) {
            self.references.push(reference.to_string());
        }
    }

    /// Adds `subtype`, merging it into an existing subtype of the same name.
    pub fn add_subtype(&mut self, subtype: Subtype) {
        match self.subtypes.iter_mut().find(|s| s.name == subtype.name) {
            Some(existing) => existing.merge(subtype),
            None => self.subtypes.push(subtype),
        }
    }

    /// Sorts everything the emitters iterate so output is stable between runs.
    pub fn finalize(&mut self) {
        self.routes.sort();
        self.routes.dedup();
        self.methods.sort();
        self.methods.dedup();
        self.references.sort();
        self.references.dedup();
        self.subtypes.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// The subtype record for one `(path, method)` pair and whether its body
/// should be synthesized from a sample of `path`.
pub fn visit(
    namer: &Namer,
    definition: &str,
    path: &str,
    method: &str,
    meta: &MethodMeta,
    doc: &SchemaDocument,
) -> (Subtype, bool) {
    let (segment, used_by) = name_segment(path);
    let mut subtype = Subtype::new(
        namer.subtype_name(definition, segment),
        format!("{definition}_{segment}"),
    );
    if path.contains("{ref}") {
        subtype.has_ref = true;
    } else {
        subtype.get_path = path.to_string();
    }

    let mut wants_sample = false;
    match method {
        "get" => {
            subtype.declared = declared_type(meta, doc).cloned();
            subtype.get_paths.insert(path.to_string());
            wants_sample = !subtype.has_ref && !used_by;
        }
        "put" => subtype.put_path = path.to_string(),
        "post" => subtype.post_path = path.to_string(),
        "delete" => subtype.delete_path = path.to_string(),
        "patch" => subtype.patch_path = path.to_string(),
        _ => {}
    }
    (subtype, wants_sample)
}

/// The declared object type of a GET, found through its first tag
/// (`pop3/account` -> `pop3.account`).
fn declared_type<'a>(meta: &MethodMeta, doc: &'a SchemaDocument) -> Option<&'a TypeDef> {
    let tag = meta.tags.first()?;
    doc.definitions.get(&tag.replace('/', "."))
}

/// Walks every path and method of `doc` and assembles the endpoint.
///
/// `synthesize` is asked for a body whenever a GET path carries no reference;
/// returning `None` leaves the subtype without one.
pub fn assemble<F>(namer: &Namer, definition: &Definition, doc: &SchemaDocument, mut synthesize: F) -> Endpoint
where
    F: FnMut(&Subtype, &str) -> Option<Synthesized>,
{
    let mut endpoint = Endpoint::for_definition(namer, definition);
    for (raw_path, methods) in &doc.paths {
        let path = api_path(raw_path);
        endpoint.add_route(&path);
        for (method, meta) in methods {
            let method = method.to_lowercase();
            endpoint.add_method(&method);
            endpoint
                .descriptions
                .insert((path.clone(), method.clone()), meta.description.clone());

            let (mut subtype, wants_sample) = visit(namer, &definition.name, &path, &method, meta, doc);
            if subtype.has_ref {
                endpoint.add_reference(&subtype.name);
            }
            if wants_sample {
                if let Some(synthesized) = synthesize(&subtype, &path) {
                    subtype.body = Some(synthesized.shape);
                    subtype.is_plural = synthesized.is_plural;
                    subtype.is_plural_interface = synthesized.is_plural_interface;
                    subtype.is_type = synthesized.is_type;
                }
            }
            debug!("{} {} -> {}", method, path, subtype.name);
            endpoint.add_subtype(subtype);
        }
    }
    endpoint.finalize();
    endpoint
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{FieldType, TypeShape};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_log::test;

    fn pop3() -> Definition {
        Definition {
            name: "pop3".into(),
            description: "pop3".into(),
            link: "/api/definitions/pop3".into(),
        }
    }

    fn doc(value: serde_json::Value) -> SchemaDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_api_path() {
        assert_eq!(api_path("/objects/pop3/account/"), "/api/objects/pop3/account/");
        assert_eq!(api_path("/api/objects/pop3/account/"), "/api/objects/pop3/account/");
        assert_eq!(api_path("objects/x"), "/api/objects/x");
        assert_eq!(api_path("/apiary/x"), "/api/apiary/x");
    }

    #[test]
    fn test_name_segment() {
        assert_eq!(name_segment("/api/objects/pop3/account/"), ("account", false));
        assert_eq!(name_segment("/api/objects/pop3/account/{ref}"), ("account", false));
        assert_eq!(
            name_segment("/api/objects/user_preferences/webadmin/{ref}/usedby"),
            ("webadmin", true)
        );
        assert_eq!(name_segment("/usedby"), ("", false));
        assert_eq!(name_segment(""), ("", false));
    }

    #[test]
    fn test_endpoint_paths() {
        let namer = Namer::new();
        let endpoint = Endpoint::for_definition(&namer, &pop3());
        assert_eq!(endpoint.title, "Pop3");
        assert_eq!(endpoint.path, "/api/nodes/pop3");

        let nodes = Definition {
            name: "Nodes".into(),
            ..pop3()
        };
        assert_eq!(Endpoint::for_definition(&namer, &nodes).path, "/api/nodes");
    }

    #[test]
    fn test_pop3_account_is_assembled_once() {
        let schema = doc(json!({"paths": {
            "/api/objects/pop3/account/": {"get": {"tags": ["pop3/account"]}},
            "/api/objects/pop3/account/{ref}": {"get": {"tags": ["pop3/account"]}}
        }}));
        let mut requested = vec![];
        let endpoint = assemble(&Namer::new(), &pop3(), &schema, |_, path| {
            requested.push(path.to_string());
            None
        });

        assert_eq!(requested, vec!["/api/objects/pop3/account/".to_string()]);
        assert_eq!(endpoint.subtypes.len(), 1);
        let account = &endpoint.subtypes[0];
        assert_eq!(account.name, "Pop3Account");
        assert_eq!(account.json_tag, "pop3_account");
        assert!(account.has_ref);
        assert_eq!(account.get_path, "/api/objects/pop3/account/");
        assert_eq!(
            account.get_paths.iter().cloned().collect::<Vec<_>>(),
            vec![
                "/api/objects/pop3/account/".to_string(),
                "/api/objects/pop3/account/{ref}".to_string()
            ]
        );
        assert_eq!(endpoint.references, vec!["Pop3Account".to_string()]);
        assert_eq!(endpoint.methods, vec!["get".to_string()]);
    }

    #[test]
    fn test_crud_paths_are_merged_across_methods() {
        let schema = doc(json!({
            "paths": {
                "/objects/pop3/account/": {
                    "get": {"tags": ["pop3/account"], "description": "Returns all"},
                    "post": {"tags": ["pop3/account"]}
                },
                "/objects/pop3/account/{ref}": {
                    "DELETE": {"tags": ["pop3/account"]},
                    "patch": {"tags": ["pop3/account"]},
                    "put": {"tags": ["pop3/account"]}
                },
                "/objects/pop3/account/{ref}/usedby": {"get": {"tags": ["pop3/account"]}},
                "/objects/pop3/group/": {"get": {"tags": ["pop3/group"]}}
            },
            "definitions": {"pop3.account": {"description": "POP3 account"}}
        }));
        let namer = Namer::new();
        let endpoint = assemble(&namer, &pop3(), &schema, |subtype, _| {
            Some(crate::synthesizer::synthesize(
                &namer,
                &json!([]),
                &subtype.name,
                subtype.declared.as_ref(),
            ))
        });

        assert_eq!(
            endpoint.methods,
            vec!["delete", "get", "patch", "post", "put"]
        );
        assert_eq!(
            endpoint.routes,
            vec![
                "/api/objects/pop3/account/",
                "/api/objects/pop3/account/{ref}",
                "/api/objects/pop3/account/{ref}/usedby",
                "/api/objects/pop3/group/"
            ]
        );
        let names = endpoint.subtypes.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Pop3Account", "Pop3Group"]);

        let account = &endpoint.subtypes[0];
        assert_eq!(account.post_path, "/api/objects/pop3/account/");
        assert_eq!(account.delete_path, "/api/objects/pop3/account/{ref}");
        assert_eq!(account.patch_path, "/api/objects/pop3/account/{ref}");
        assert_eq!(account.put_path, "/api/objects/pop3/account/{ref}");
        assert!(account.is_plural && account.is_plural_interface && account.is_type);
        assert_eq!(account.declared.as_ref().unwrap().description, "POP3 account");
        assert!(matches!(account.shape(), TypeShape::RecordList(_)));
        assert_eq!(
            endpoint.describe("/api/objects/pop3/account/", "get"),
            Some("Returns all")
        );
        assert_eq!(endpoint.describe("/api/objects/pop3/account/", "post"), None);

        let group = &endpoint.subtypes[1];
        assert!(!group.has_ref);
        assert!(group.declared.is_none());
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let schema = doc(json!({"paths": {
            "/objects/aws/b/": {"get": {}, "put": {}},
            "/objects/aws/a/{ref}": {"delete": {}},
            "/objects/aws/a/": {"get": {}}
        }}));
        let namer = Namer::new();
        let def = Definition {
            name: "aws".into(),
            description: String::new(),
            link: String::new(),
        };
        let sample = |_: &Subtype, _: &str| {
            Some(crate::synthesizer::synthesize(&namer, &json!({"a": 1}), "X", None))
        };
        let first = assemble(&namer, &def, &schema, sample);
        let second = assemble(&namer, &def, &schema, sample);
        assert_eq!(first.routes, second.routes);
        assert_eq!(first.subtypes, second.subtypes);
        assert_eq!(first.references, vec!["AwsA".to_string()]);
        assert!(matches!(
            first.subtypes[1].shape(),
            TypeShape::Record(def) if def.fields[0].field_type == FieldType::Simple(crate::model::Primitive::Long)
        ));
    }

    #[test]
    fn test_finalize_sorts_and_dedups_any_insertion_order() {
        fn subtype(name: &str, get_path: &str) -> Subtype {
            let mut subtype = Subtype::new(name, name.to_lowercase());
            subtype.get_path = get_path.to_string();
            subtype.get_paths.insert(get_path.to_string());
            subtype
        }
        fn build(
            routes: &[&str],
            methods: &[&str],
            references: &[&str],
            subtypes: &[(&str, &str)],
        ) -> Endpoint {
            let mut endpoint = Endpoint::default();
            for route in routes {
                endpoint.add_route(route);
            }
            for method in methods {
                endpoint.add_method(method);
            }
            for reference in references {
                endpoint.add_reference(reference);
            }
            for (name, path) in subtypes {
                endpoint.add_subtype(subtype(name, path));
            }
            endpoint.finalize();
            endpoint
        }

        let forward = build(
            &["/api/objects/aws/a/", "/api/objects/aws/b/", "/api/objects/aws/c/"],
            &["delete", "get", "put"],
            &["AwsA", "AwsB"],
            &[("AwsA", "/api/objects/aws/a/"), ("AwsB", "/api/objects/aws/b/")],
        );
        let shuffled = build(
            &[
                "/api/objects/aws/c/",
                "/api/objects/aws/a/",
                "/api/objects/aws/c/",
                "/api/objects/aws/b/",
            ],
            &["put", "get", "delete", "get"],
            &["AwsB", "AwsA", "AwsB"],
            &[
                ("AwsB", "/api/objects/aws/b/"),
                ("AwsA", "/api/objects/aws/a/"),
                ("AwsB", "/api/objects/aws/b/"),
            ],
        );

        assert_eq!(
            shuffled.routes,
            vec!["/api/objects/aws/a/", "/api/objects/aws/b/", "/api/objects/aws/c/"]
        );
        assert_eq!(shuffled.methods, vec!["delete", "get", "put"]);
        assert_eq!(shuffled.references, vec!["AwsA", "AwsB"]);
        let names = shuffled.subtypes.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["AwsA", "AwsB"]);
        assert_eq!(forward, shuffled);
    }
}
