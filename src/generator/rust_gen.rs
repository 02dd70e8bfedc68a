use std::collections::HashSet;

use lazy_static::lazy_static;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

use crate::errors::{GenError, Result};
use crate::model::{Endpoint, FieldType, Primitive, StructDef, Subtype, TypeShape};
use crate::naming::snake_case;
use crate::nodes::NodeSet;
use crate::synthesizer::{DISCRIMINATOR_KEY, REFERENCE_KEY};

const GENERATED_NOTICE: &str = "// Code generated by utm2code. Do not edit.";

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
        "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
        "where", "while", "abstract", "become", "box", "do", "final", "gen", "macro", "override",
        "priv", "try", "typeof", "unsized", "virtual", "yield",
    ]
    .into_iter()
    .collect();
    /// Names the nodes module uses unqualified
    static ref NODE_MODULE_NAMES: HashSet<&'static str> =
        ["Node", "Box", "Option", "String", "Vec"].into_iter().collect();
}

/// An identifier for `name`, raw when it is a keyword.
fn ident(name: &str, resource: &str) -> Result<Ident> {
    let valid = !name.is_empty()
        && name != "_"
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(GenError::Render {
            resource: resource.to_string(),
            reason: format!("`{name}` is not a valid identifier"),
        });
    }
    let ident = match name {
        "self" | "Self" | "super" | "crate" => Ident::new(&format!("{name}_"), Span::call_site()),
        name if KEYWORDS.contains(name) => Ident::new_raw(name, Span::call_site()),
        name => Ident::new(name, Span::call_site()),
    };
    Ok(ident)
}

/// Module name for a definition, also the file stem of its source file
pub fn module_name(definition: &str) -> String {
    let name = definition
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("v{name}")
    } else {
        name
    }
}

fn expand_field_type(field_type: &FieldType) -> TokenStream {
    match field_type {
        FieldType::Simple(primitive) => match primitive {
            Primitive::Int => quote!(i32),
            Primitive::Long => quote!(i64),
            Primitive::Double => quote!(f64),
            Primitive::String => quote!(String),
            Primitive::Bool => quote!(bool),
        },
        FieldType::Array(Some(item_type)) => {
            let item_type = expand_field_type(item_type);
            quote!(Vec<#item_type>)
        }
        FieldType::Array(None) => quote!(Vec<serde_json::Value>),
        FieldType::Map => quote!(serde_json::Map<String, serde_json::Value>),
        FieldType::Any => quote!(serde_json::Value),
    }
}

fn doc_attrs<'a>(lines: impl IntoIterator<Item = &'a str>) -> TokenStream {
    let attrs = lines.into_iter().flat_map(str::lines).map(|line| {
        let line = format!(" {}", line.trim_end());
        quote!(#[doc = #line])
    });
    quote!(#(#attrs)*)
}

/// A path as a `String` expression, formatting `reference` in place of `{ref}`.
fn path_expr(path: &str, reference: TokenStream) -> TokenStream {
    if path.contains("{ref}") {
        let pattern = path
            .split("{ref}")
            .map(|part| part.replace('{', "{{").replace('}', "}}"))
            .collect::<Vec<_>>()
            .join("{reference}");
        quote!(format!(#pattern, reference = #reference))
    } else {
        quote!(#path.to_string())
    }
}

/// Snake case member names of `def`, in field order and never repeating
fn field_idents(def: &StructDef, resource: &str) -> Result<Vec<Ident>> {
    let mut taken = HashSet::new();
    def.fields
        .iter()
        .map(|field| {
            let base = snake_case(&field.name);
            let mut name = base.clone();
            let mut suffix = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            ident(&name, resource)
        })
        .collect()
}

/// The member holding the plain string value of `json_tag`
fn string_member(def: &StructDef, json_tag: &str, resource: &str) -> Result<Option<Ident>> {
    if def.string_field(json_tag).is_none() {
        return Ok(None);
    }
    let idents = field_idents(def, resource)?;
    Ok(def
        .fields
        .iter()
        .position(|f| f.json_tag == json_tag)
        .map(|i| idents[i].clone()))
}

fn generate_struct(name: &Ident, def: &StructDef, resource: &str) -> Result<TokenStream> {
    let doc = doc_attrs(def.doc.as_deref());
    let fields = def
        .fields
        .iter()
        .zip(field_idents(def, resource)?)
        .map(|(field, field_name)| {
            let docs = doc_attrs(field.docs.iter().map(String::as_str));
            let field_type = expand_field_type(&field.field_type);
            let json_tag = &field.json_tag;
            quote! {
                #docs
                #[serde(rename = #json_tag)]
                pub #field_name: #field_type
            }
        });
    Ok(quote! {
        #doc
        #[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
        #[serde(default)]
        pub struct #name {
            #(#fields),*
        }
    })
}

fn generate_newtype(name: &Ident, inner: TokenStream) -> TokenStream {
    quote! {
        #[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
        #[serde(transparent)]
        pub struct #name(pub #inner);
    }
}

fn generate_type(name: &str, shape: &TypeShape, resource: &str) -> Result<TokenStream> {
    let identifier = ident(name, resource)?;
    let code = match shape {
        TypeShape::Record(def) => generate_struct(&identifier, def, resource)?,
        TypeShape::RecordList(def) => {
            let list = ident(&format!("{name}s"), resource)?;
            let list = generate_newtype(&list, quote!(Vec<#identifier>));
            let element = generate_struct(&identifier, def, resource)?;
            quote! {
                #list
                #element
            }
        }
        TypeShape::Alias(field_type) => generate_newtype(&identifier, expand_field_type(field_type)),
        TypeShape::Opaque => generate_newtype(&identifier, expand_field_type(&FieldType::Map)),
    };
    Ok(code)
}

fn generate_endpoint_type(endpoint: &Endpoint) -> Result<TokenStream> {
    let resource = endpoint.name.as_str();
    match &endpoint.body {
        Some(shape @ (TypeShape::Record(_) | TypeShape::RecordList(_) | TypeShape::Alias(_))) => {
            generate_type(&endpoint.title, shape, resource)
        }
        _ => {
            let title = ident(&endpoint.title, resource)?;
            let fields = endpoint
                .subtypes
                .iter()
                .map(|subtype| {
                    let field_name = ident(&snake_case(&subtype.name), resource)?;
                    let field_type = ident(&subtype.name, resource)?;
                    let json_tag = &subtype.json_tag;
                    Ok(quote! {
                        #[serde(rename = #json_tag)]
                        pub #field_name: #field_type
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(quote! {
                #[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
                #[serde(default)]
                pub struct #title {
                    #(#fields),*
                }
            })
        }
    }
}

fn generate_endpoint_impls(endpoint: &Endpoint) -> Result<TokenStream> {
    let resource = endpoint.name.as_str();
    let title = ident(&endpoint.title, resource)?;
    let path = &endpoint.path;
    let objects = endpoint
        .subtypes
        .iter()
        .map(|subtype| {
            let name = &subtype.name;
            let object = ident(name, resource)?;
            Ok(quote! {
                (#name, Box::new(#object::default()) as Box<dyn super::RestObject>)
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let description = &endpoint.description;
    let name = &endpoint.name;
    let link = &endpoint.link;
    let routes = &endpoint.routes;
    let references = endpoint.references.iter().map(|r| format!("REF_{r}"));
    Ok(quote! {
        impl super::RestGetter for #title {
            fn get_path(&self) -> String {
                #path.to_string()
            }

            fn ref_required(&self) -> Option<String> {
                None
            }
        }

        impl super::Endpoint for #title {
            fn rest_objects(&self) -> Vec<(&'static str, Box<dyn super::RestObject>)> {
                vec![#(#objects),*]
            }

            fn definition(&self) -> super::Definition {
                super::Definition {
                    description: #description,
                    name: #name,
                    link: #link,
                }
            }

            fn api_routes(&self) -> &'static [&'static str] {
                &[#(#routes),*]
            }

            fn references(&self) -> &'static [&'static str] {
                &[#(#references),*]
            }
        }
    })
}

fn generate_subtype(endpoint: &Endpoint, subtype: &Subtype) -> Result<TokenStream> {
    let resource = endpoint.name.as_str();
    let name = ident(&subtype.name, resource)?;
    let shape = subtype.shape();
    let record = shape.record();
    let describe = |path: &str, method: &str| doc_attrs(endpoint.describe(path, method));

    let get_path = &subtype.get_path;
    let get_doc = describe(get_path, "get");
    let getters = if subtype.is_plural && shape.is_list() {
        let list = ident(&subtype.plural_name(), resource)?;
        let reference = match record {
            Some(def) if subtype.patch_path.contains("{ref}") => {
                string_member(def, REFERENCE_KEY, resource)?
            }
            _ => None,
        };
        let element = match reference {
            Some(member) => {
                let doc = describe(&subtype.patch_path, "get");
                let path = path_expr(&subtype.patch_path, quote!(self.#member));
                quote! {
                    impl super::RestGetter for #name {
                        #doc
                        fn get_path(&self) -> String {
                            #path
                        }

                        fn ref_required(&self) -> Option<String> {
                            Some(self.#member.clone())
                        }
                    }
                }
            }
            None => quote! {
                impl super::RestGetter for #name {
                    #get_doc
                    fn get_path(&self) -> String {
                        #get_path.to_string()
                    }

                    fn ref_required(&self) -> Option<String> {
                        None
                    }
                }
            },
        };
        quote! {
            impl super::RestGetter for #list {
                #get_doc
                fn get_path(&self) -> String {
                    #get_path.to_string()
                }

                fn ref_required(&self) -> Option<String> {
                    None
                }
            }

            #element
        }
    } else {
        quote! {
            impl super::RestGetter for #name {
                #get_doc
                fn get_path(&self) -> String {
                    #get_path.to_string()
                }

                fn ref_required(&self) -> Option<String> {
                    None
                }
            }
        }
    };

    let delete_doc = describe(&subtype.delete_path, "delete");
    let delete_path = path_expr(&subtype.delete_path, quote!(reference));
    let patch_doc = describe(&subtype.patch_path, "patch");
    let patch_path = path_expr(&subtype.patch_path, quote!(reference));
    let post_doc = describe(&subtype.post_path, "post");
    let post_path = &subtype.post_path;
    let put_doc = describe(&subtype.put_path, "put");
    let put_path = path_expr(&subtype.put_path, quote!(reference));
    let used_by_doc = describe(&format!("{}/usedby", subtype.patch_path), "get");
    let used_by_path = if subtype.put_path.is_empty() {
        quote!(String::new())
    } else {
        path_expr(&format!("{}/usedby", subtype.put_path), quote!(reference))
    };

    let typed = match record {
        Some(def) if subtype.is_type => match string_member(def, DISCRIMINATOR_KEY, resource)? {
            Some(member) => quote! {
                impl super::TypedObject for #name {
                    fn object_type(&self) -> &str {
                        &self.#member
                    }
                }
            },
            None => quote!(),
        },
        _ => quote!(),
    };

    let body = generate_type(&subtype.name, shape, resource)?;
    Ok(quote! {
        #body

        #getters

        #[allow(unused_variables)]
        impl super::RestObject for #name {
            #delete_doc
            fn delete_path(&self, reference: &str) -> String {
                #delete_path
            }

            #patch_doc
            fn patch_path(&self, reference: &str) -> String {
                #patch_path
            }

            #post_doc
            fn post_path(&self) -> String {
                #post_path.to_string()
            }

            #put_doc
            fn put_path(&self, reference: &str) -> String {
                #put_path
            }

            #used_by_doc
            fn used_by_path(&self, reference: &str) -> String {
                #used_by_path
            }
        }

        #typed
    })
}

/// Parses the emitted tokens as a source file and pretty prints them.
fn render(resource: &str, tokens: TokenStream) -> Result<String> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|e| GenError::Render {
        resource: resource.to_string(),
        reason: format!("generated code is invalid: {e}"),
    })?;
    Ok(format!("{GENERATED_NOTICE}\n\n{}", prettyplease::unparse(&file)))
}

/// Renders the module of one endpoint.
pub fn generate_endpoint(endpoint: &Endpoint) -> Result<String> {
    let module_doc = format!(
        " {} is a generated module representing the Sophos {} endpoint, `GET {}`",
        endpoint.title, endpoint.title, endpoint.path
    );
    let body = generate_endpoint_type(endpoint)?;
    let impls = generate_endpoint_impls(endpoint)?;
    let subtypes = endpoint
        .subtypes
        .iter()
        .map(|subtype| generate_subtype(endpoint, subtype))
        .collect::<Result<Vec<_>>>()?;
    let code = quote! {
        #![doc = #module_doc]

        #body

        #impls

        #(#subtypes)*
    };
    render(&endpoint.name, code)
}

/// Renders `objects/mod.rs`: the shared traits and one module per endpoint.
pub fn generate_objects_index(modules: &[String]) -> Result<String> {
    let modules = modules
        .iter()
        .map(|m| ident(m, "objects"))
        .collect::<Result<Vec<_>>>()?;
    let code = quote! {
        //! Generated Sophos object types

        #(pub mod #modules;)*

        /// An entry of `/api/definitions`
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Definition {
            pub description: &'static str,
            pub name: &'static str,
            pub link: &'static str,
        }

        /// Anything that can be fetched with a GET
        pub trait RestGetter {
            fn get_path(&self) -> String;

            /// The reference the GET path was built with, if it needs one
            fn ref_required(&self) -> Option<String>;
        }

        /// A sub-resource with CRUD paths
        pub trait RestObject: RestGetter {
            fn delete_path(&self, reference: &str) -> String;

            fn patch_path(&self, reference: &str) -> String;

            fn post_path(&self) -> String;

            fn put_path(&self, reference: &str) -> String;

            fn used_by_path(&self, reference: &str) -> String;
        }

        /// A resource grouping listed in `/api/definitions`
        pub trait Endpoint: RestGetter {
            fn rest_objects(&self) -> Vec<(&'static str, Box<dyn RestObject>)>;

            fn definition(&self) -> Definition;

            fn api_routes(&self) -> &'static [&'static str];

            fn references(&self) -> &'static [&'static str];
        }

        /// Objects carrying a `_type` discriminator
        pub trait TypedObject {
            fn object_type(&self) -> &str;
        }
    };
    render("objects", code)
}

/// Struct names for `entries`, moving any that would shadow a name the
/// module refers to.
fn node_type_names(nodes: &NodeSet) -> Vec<String> {
    let mut taken = nodes
        .entries
        .iter()
        .map(|node| node.name.clone())
        .collect::<HashSet<_>>();
    nodes
        .entries
        .iter()
        .map(|node| {
            if !NODE_MODULE_NAMES.contains(node.name.as_str()) {
                return node.name.clone();
            }
            let mut name = format!("{}Value", node.name);
            while taken.contains(&name) {
                name.push_str("Value");
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Renders `nodes/mod.rs`.
pub fn generate_nodes(nodes: &NodeSet) -> Result<String> {
    let entries = nodes
        .entries
        .iter()
        .zip(node_type_names(nodes))
        .map(|(node, name)| Ok((node, ident(&name, "nodes")?)))
        .collect::<Result<Vec<_>>>()?;
    let types = entries.iter().map(|(node, name)| {
        let doc = format!(" {} represents the `{}` node", name, node.key);
        let key = &node.key;
        let path = node.path();
        let value = expand_field_type(&node.field_type);
        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
            #[serde(transparent)]
            pub struct #name {
                pub value: #value,
            }

            impl Node for #name {
                fn key(&self) -> &'static str {
                    #key
                }

                fn path(&self) -> &'static str {
                    #path
                }
            }
        }
    });
    let arms = entries.iter().map(|(node, name)| {
        let key = &node.key;
        quote!(#key => Some(Box::new(#name::default())),)
    });
    let code = quote! {
        //! Generated types for the single values under `/api/nodes`

        /// A single configuration value
        pub trait Node {
            fn key(&self) -> &'static str;

            fn path(&self) -> &'static str;
        }

        #(#types)*

        /// Retrieves a node by its key
        pub fn lookup(key: &str) -> Option<Box<dyn Node>> {
            match key {
                #(#arms)*
                _ => None,
            }
        }
    };
    render("nodes", code)
}

/// Renders the `mod.rs` of the version directory.
pub fn generate_version_index(with_nodes: bool) -> Result<String> {
    let nodes = with_nodes.then(|| quote!(pub mod nodes;));
    render(
        "api",
        quote! {
            pub mod objects;
            #nodes
        },
    )
}
