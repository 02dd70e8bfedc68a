use crate::model::{Endpoint, FieldType, Primitive, StructDef, Subtype, TypeShape};
use crate::nodes::{NodeEntry, NodeSet};
use crate::synthesizer::{DISCRIMINATOR_KEY, REFERENCE_KEY};

const CLIENT_IMPORT: &str = "github.com/esurdam/go-sophos";
const GENERATED_NOTICE: &str = "// Code generated by utm2code. DO NOT EDIT.";

fn go_type(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Simple(primitive) => match primitive {
            Primitive::Int => "int".into(),
            Primitive::Long => "int64".into(),
            Primitive::Double => "float64".into(),
            Primitive::String => "string".into(),
            Primitive::Bool => "bool".into(),
        },
        FieldType::Array(Some(item)) => format!("[]{}", go_type(item)),
        FieldType::Array(None) => "[]interface{}".into(),
        FieldType::Map => "map[string]interface{}".into(),
        FieldType::Any => "interface{}".into(),
    }
}

/// Go interpreted string literal. JSON string escapes are a subset of Go's.
fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// A path as a Go expression, formatting `arg` in place of `{ref}`.
fn path_expr(path: &str, arg: &str) -> String {
    if path.contains("{ref}") {
        let pattern = path.replace('%', "%%").replace("{ref}", "%s");
        format!("fmt.Sprintf({}, {arg})", quote(&pattern))
    } else {
        quote(path)
    }
}

fn comment_lines(text: &str) -> String {
    text.lines()
        .map(|line| format!("// {}", line.trim_end()).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `summary` followed by the schema description when there is one
fn doc(summary: &str, description: Option<&str>) -> String {
    match description {
        Some(description) => format!("{}\n{}", comment_lines(summary), comment_lines(description)),
        None => comment_lines(summary),
    }
}

fn receiver(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_ascii_lowercase().to_string())
        .unwrap_or_else(|| "o".into())
}

fn struct_decl(name: &str, def: &StructDef) -> String {
    let types = def.fields.iter().map(|f| go_type(&f.field_type)).collect::<Vec<_>>();
    let name_width = def.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let type_width = types.iter().map(|t| t.len()).max().unwrap_or(0);
    let mut body = String::new();
    for (field, ty) in def.fields.iter().zip(&types) {
        for line in &field.docs {
            body.push_str(&format!("\t{}\n", comment_lines(line)));
        }
        body.push_str(&format!(
            "\t{:name_width$} {:type_width$} `json:{}`\n",
            field.name,
            ty,
            quote(&field.json_tag)
        ));
    }
    let doc = def
        .doc
        .as_deref()
        .map(|d| format!("{}\n", comment_lines(d)))
        .unwrap_or_default();
    format!("{doc}type {name} struct {{\n{body}}}\n")
}

fn type_decl(name: &str, shape: &TypeShape) -> String {
    match shape {
        TypeShape::Record(def) => struct_decl(name, def),
        TypeShape::RecordList(def) => format!("type {name}s []{name}\n\n{}", struct_decl(name, def)),
        TypeShape::Alias(field_type) => format!("type {name} {}\n", go_type(field_type)),
        TypeShape::Opaque => format!("type {name} map[string]interface{{}}\n"),
    }
}

fn endpoint_body(endpoint: &Endpoint) -> String {
    match &endpoint.body {
        Some(shape @ (TypeShape::Record(_) | TypeShape::RecordList(_) | TypeShape::Alias(_))) => {
            type_decl(&endpoint.title, shape)
        }
        // Without a sample the endpoint is composed of its subtypes
        _ => {
            let width = endpoint.subtypes.iter().map(|s| s.name.len()).max().unwrap_or(0);
            let body = endpoint
                .subtypes
                .iter()
                .map(|s| {
                    format!(
                        "\t{:width$} {:width$} `json:{}`\n",
                        s.name,
                        s.name,
                        quote(&s.json_tag)
                    )
                })
                .collect::<String>();
            format!("type {} struct {{\n{body}}}\n", endpoint.title)
        }
    }
}

fn string_list(items: impl Iterator<Item = String>) -> String {
    items.map(|item| format!("\t\t{},\n", quote(&item))).collect()
}

fn generate_header(endpoint: &Endpoint) -> String {
    let title = &endpoint.title;
    let registry = endpoint
        .subtypes
        .iter()
        .map(|s| format!("\t{}: &{}{{}},\n", quote(&s.name), s.name))
        .collect::<String>();
    let routes = string_list(endpoint.routes.iter().cloned());
    let references = string_list(endpoint.references.iter().map(|r| format!("REF_{r}")));
    format!(
        r#"// {title} is a generated struct representing the Sophos {title} Endpoint
// GET {path}
{body}
var _ sophos.Endpoint = &{title}{{}}

var defs{title} = map[string]sophos.RestObject{{
{registry}}}

// RestObjects implements the sophos.Node interface and returns a map of {title}'s Objects
func ({title}) RestObjects() map[string]sophos.RestObject {{ return defs{title} }}

// GetPath implements sophos.RestGetter
func (*{title}) GetPath() string {{ return {quoted_path} }}

// RefRequired implements sophos.RestGetter
func (*{title}) RefRequired() (string, bool) {{ return "", false }}

var def{title} = &sophos.Definition{{Description: {description}, Name: {name}, Link: {link}}}

// Definition returns the /api/definitions struct of {title}
func ({title}) Definition() sophos.Definition {{ return *def{title} }}

// ApiRoutes returns all known {title} Paths
func ({title}) ApiRoutes() []string {{
	return []string{{
{routes}	}}
}}

// References returns the {title}'s references. These strings serve no purpose other than to demonstrate which
// Reference keys are used for this Endpoint
func ({title}) References() []string {{
	return []string{{
{references}	}}
}}
"#,
        path = endpoint.path,
        body = endpoint_body(endpoint),
        quoted_path = quote(&endpoint.path),
        description = quote(&endpoint.description),
        name = quote(&endpoint.name),
        link = quote(&endpoint.link),
    )
}

fn generate_getters(endpoint: &Endpoint, subtype: &Subtype) -> String {
    let name = &subtype.name;
    let r = receiver(name);
    let reference = subtype
        .shape()
        .record()
        .and_then(|def| def.string_field(REFERENCE_KEY))
        .map(|f| f.name.as_str())
        .filter(|_| subtype.patch_path.contains("{ref}"));

    if subtype.is_plural && subtype.shape().is_list() {
        let element = if let Some(reference) = reference {
            format!(
                r#"{doc}
func ({r} *{name}) GetPath() string {{ return {path} }}

// RefRequired implements sophos.RestObject
func ({r} *{name}) RefRequired() (string, bool) {{ return {r}.{reference}, true }}"#,
                doc = doc(
                    &format!("GetPath implements sophos.RestObject and returns the {name}s GET path"),
                    endpoint.describe(&subtype.patch_path, "get"),
                ),
                path = path_expr(&subtype.patch_path, &format!("{r}.{reference}")),
            )
        } else {
            format!(
                r#"{doc}
func (*{name}) GetPath() string {{ return {path} }}

// RefRequired implements sophos.RestObject
func (*{name}) RefRequired() (string, bool) {{ return "", false }}"#,
                doc = doc(
                    &format!("GetPath implements sophos.RestObject and returns the {name} GET path"),
                    endpoint.describe(&subtype.get_path, "get"),
                ),
                path = quote(&subtype.get_path),
            )
        };
        format!(
            r#"var _ sophos.RestGetter = &{name}{{}}

{doc}
func (*{name}s) GetPath() string {{ return {path} }}

// RefRequired implements sophos.RestObject
func (*{name}s) RefRequired() (string, bool) {{ return "", false }}

{element}
"#,
            doc = doc(
                &format!("GetPath implements sophos.RestObject and returns the {name}s GET path"),
                endpoint.describe(&subtype.get_path, "get"),
            ),
            path = quote(&subtype.get_path),
        )
    } else {
        format!(
            r#"var _ sophos.RestObject = &{name}{{}}

{doc}
func (*{name}) GetPath() string {{ return {path} }}

// RefRequired implements sophos.RestObject
func (*{name}) RefRequired() (string, bool) {{ return "", false }}
"#,
            doc = doc(
                &format!("GetPath implements sophos.RestObject and returns the {name} GET path"),
                endpoint.describe(&subtype.get_path, "get"),
            ),
            path = quote(&subtype.get_path),
        )
    }
}

fn generate_subtype(endpoint: &Endpoint, subtype: &Subtype) -> String {
    let name = &subtype.name;
    let plural = if subtype.is_plural && subtype.shape().is_list() {
        "s"
    } else {
        ""
    };
    let used_by_path = if subtype.put_path.is_empty() {
        quote("")
    } else {
        path_expr(&format!("{}/usedby", subtype.put_path), "ref")
    };
    let discriminator = subtype
        .shape()
        .record()
        .and_then(|def| def.string_field(DISCRIMINATOR_KEY))
        .filter(|_| subtype.is_type);
    let get_type = match discriminator {
        Some(field) => {
            let r = receiver(name);
            format!(
                "\n// GetType implements sophos.Object\nfunc ({r} *{name}) GetType() string {{ return {r}.{} }}\n",
                field.name
            )
        }
        None => String::new(),
    };
    let method_doc = |summary: String, path: &str, method: &str| {
        doc(&summary, endpoint.describe(path, method))
    };
    format!(
        r#"
// {name}{plural} is an Sophos Endpoint subType and implements sophos.RestObject
{decl}
{getters}
{delete_doc}
func (*{name}) DeletePath(ref string) string {{
	return {delete}
}}

{patch_doc}
func (*{name}) PatchPath(ref string) string {{
	return {patch}
}}

{post_doc}
func (*{name}) PostPath() string {{
	return {post}
}}

{put_doc}
func (*{name}) PutPath(ref string) string {{
	return {put}
}}

{used_by_doc}
func (*{name}) UsedByPath(ref string) string {{
	return {used_by_path}
}}
{get_type}"#,
        decl = type_decl(name, subtype.shape()),
        getters = generate_getters(endpoint, subtype),
        delete_doc = method_doc(
            format!("DeletePath implements sophos.RestObject and returns the {name} DELETE path"),
            &subtype.delete_path,
            "delete"
        ),
        delete = path_expr(&subtype.delete_path, "ref"),
        patch_doc = method_doc(
            format!("PatchPath implements sophos.RestObject and returns the {name} PATCH path"),
            &subtype.patch_path,
            "patch"
        ),
        patch = path_expr(&subtype.patch_path, "ref"),
        post_doc = method_doc(
            format!("PostPath implements sophos.RestObject and returns the {name} POST path"),
            &subtype.post_path,
            "post"
        ),
        post = quote(&subtype.post_path),
        put_doc = method_doc(
            format!("PutPath implements sophos.RestObject and returns the {name} PUT path"),
            &subtype.put_path,
            "put"
        ),
        put = path_expr(&subtype.put_path, "ref"),
        used_by_doc = method_doc(
            "UsedByPath implements sophos.RestObject".to_string(),
            &format!("{}/usedby", subtype.patch_path),
            "get"
        ),
    )
}

/// Renders the `objects` source file of one endpoint.
pub fn generate_endpoint(endpoint: &Endpoint) -> String {
    let imports = if endpoint.uses_references() {
        format!("import (\n\t\"fmt\"\n\n\t\"{CLIENT_IMPORT}\"\n)")
    } else {
        format!("import \"{CLIENT_IMPORT}\"")
    };
    let subtypes = endpoint
        .subtypes
        .iter()
        .map(|s| generate_subtype(endpoint, s))
        .collect::<String>();
    format!(
        "{GENERATED_NOTICE}\n\npackage objects\n\n{imports}\n\n{}{subtypes}",
        generate_header(endpoint)
    )
}

/// Package documentation of the `objects` package
pub fn generate_objects_doc() -> String {
    format!("{GENERATED_NOTICE}\n\n// Package objects contains the generated Sophos object types\npackage objects\n")
}

fn node_type(node: &NodeEntry) -> String {
    let name = &node.name;
    let r = receiver(name);
    format!(
        r#"
// {name} represents the {key} node and implements sophos.Node
type {name} struct{{ Value {ty} }}

// Get gets the {key} value from the UTM
func ({r} *{name}) Get(client sophos.ClientInterface, options ...sophos.Option) (err error) {{
	return get(client, {path}, &{r}.Value, options...)
}}

// Update is syntactic sugar for Update{name}
func ({r} *{name}) Update(client sophos.ClientInterface, options ...sophos.Option) (err error) {{
	return put(client, {path}, {r}.Value, options...)
}}
"#,
        key = node.key,
        ty = go_type(&node.field_type),
        path = quote(&node.path()),
    )
}

fn node_functions(node: &NodeEntry) -> String {
    let name = &node.name;
    format!(
        r#"
// Get{name} gets the {key} value from the UTM
func Get{name}(client sophos.ClientInterface, options ...sophos.Option) (val {ty}, err error) {{
	err = get(client, {path}, &val, options...)
	return
}}

// Update{name} PUTs the {key} value to the UTM
func Update{name}(client sophos.ClientInterface, val {ty}, options ...sophos.Option) (err error) {{
	return put(client, {path}, val, options...)
}}
"#,
        key = node.key,
        ty = go_type(&node.field_type),
        path = quote(&node.path()),
    )
}

const NODE_HANDLERS: &str = r#"
func get(c sophos.ClientInterface, path string, val interface{}, options ...sophos.Option) (err error) {
	res, err := c.Get(path, options...)
	if err != nil {
		return err
	}
	err = res.MarshalTo(val)
	return
}

func put(c sophos.ClientInterface, path string, val interface{}, options ...sophos.Option) (err error) {
	byt, err := json.Marshal(val)
	if err != nil {
		return err
	}
	_, err = c.Put(path, bytes.NewReader(byt), options...)
	return
}
"#;

/// Renders `nodes.go`, `handlers.go` and `directory.go` as `(file name, contents)`.
pub fn generate_nodes(nodes: &NodeSet) -> Vec<(&'static str, String)> {
    let client_import = format!("import \"{CLIENT_IMPORT}\"\n");
    let types = nodes.entries.iter().map(node_type).collect::<String>();
    let nodes_file = format!(
        "{GENERATED_NOTICE}\n\n// Package nodes contains generated types and Get/Update functions for sophos.Node(s)\npackage nodes\n\n{}{types}",
        if nodes.is_empty() { "" } else { client_import.as_str() }
    );

    let functions = nodes.entries.iter().map(node_functions).collect::<String>();
    let handlers_file = format!(
        "{GENERATED_NOTICE}\n\npackage nodes\n\nimport (\n\t\"bytes\"\n\t\"encoding/json\"\n\n\t\"{CLIENT_IMPORT}\"\n)\n{NODE_HANDLERS}{functions}"
    );

    let directory = nodes
        .entries
        .iter()
        .map(|node| format!("\t{}: &{}{{}},\n", quote(&node.key), node.name))
        .collect::<String>();
    let directory_file = format!(
        r#"{GENERATED_NOTICE}

package nodes

{client_import}
// Lookup will retrieve a sophos.Node by its name
func Lookup(name string) sophos.Node {{ return nodeDirectory[name] }}

var nodeDirectory = map[string]sophos.Node{{
{directory}}}
"#
    );

    vec![
        ("nodes.go", nodes_file),
        ("handlers.go", handlers_file),
        ("directory.go", directory_file),
    ]
}
