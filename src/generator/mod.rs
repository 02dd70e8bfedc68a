mod go_gen;
mod rust_gen;

use std::path::PathBuf;

use clap::ValueEnum;

use crate::errors::Result;
use crate::model::Endpoint;
use crate::nodes::NodeSet;

pub const OBJECTS_DIR: &str = "objects";
pub const NODES_DIR: &str = "nodes";

/// Language of the emitted client sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Target {
    #[default]
    Go,
    Rust,
}

impl Target {
    pub fn extension(&self) -> &'static str {
        match self {
            Target::Go => "go",
            Target::Rust => "rs",
        }
    }

    /// File stem of the source file of definition `name`
    pub fn file_stem(&self, name: &str) -> String {
        match self {
            Target::Go => name.to_lowercase(),
            Target::Rust => rust_gen::module_name(name),
        }
    }
}

/// A rendered file, its path relative to the version directory
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    fn new(path: PathBuf, contents: String) -> Self {
        Self { path, contents }
    }
}

pub fn generate_endpoint(target: Target, endpoint: &Endpoint) -> Result<GeneratedFile> {
    let path = PathBuf::from(OBJECTS_DIR).join(format!(
        "{}.{}",
        target.file_stem(&endpoint.name),
        target.extension()
    ));
    let contents = match target {
        Target::Go => go_gen::generate_endpoint(endpoint),
        Target::Rust => rust_gen::generate_endpoint(endpoint)?,
    };
    Ok(GeneratedFile::new(path, contents))
}

pub fn generate_nodes(target: Target, nodes: &NodeSet) -> Result<Vec<GeneratedFile>> {
    let dir = PathBuf::from(NODES_DIR);
    let files = match target {
        Target::Go => go_gen::generate_nodes(nodes)
            .into_iter()
            .map(|(name, contents)| GeneratedFile::new(dir.join(name), contents))
            .collect(),
        Target::Rust => vec![GeneratedFile::new(
            dir.join("mod.rs"),
            rust_gen::generate_nodes(nodes)?,
        )],
    };
    Ok(files)
}

/// Files that tie the per-endpoint sources together, written after every
/// endpoint. `stems` are the file stems of the written endpoints.
pub fn generate_index(target: Target, stems: &[String], with_nodes: bool) -> Result<Vec<GeneratedFile>> {
    let objects = PathBuf::from(OBJECTS_DIR);
    let files = match target {
        Target::Go => vec![GeneratedFile::new(
            objects.join("doc.go"),
            go_gen::generate_objects_doc(),
        )],
        Target::Rust => vec![
            GeneratedFile::new(objects.join("mod.rs"), rust_gen::generate_objects_index(stems)?),
            GeneratedFile::new(
                PathBuf::from("mod.rs"),
                rust_gen::generate_version_index(with_nodes)?,
            ),
        ],
    };
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_file_paths() {
        let endpoint = Endpoint {
            title: "Pop3".into(),
            name: "Pop3".into(),
            path: "/api/nodes/pop3".into(),
            ..Default::default()
        };
        let go = generate_endpoint(Target::Go, &endpoint).unwrap();
        assert_eq!(go.path, PathBuf::from("objects/pop3.go"));
        let rust = generate_endpoint(Target::Rust, &endpoint).unwrap();
        assert_eq!(rust.path, PathBuf::from("objects/pop3.rs"));
    }

    #[test]
    fn test_index_files() {
        let go = generate_index(Target::Go, &["pop3".into()], true).unwrap();
        assert_eq!(go.len(), 1);
        assert_eq!(go[0].path, PathBuf::from("objects/doc.go"));

        let rust = generate_index(Target::Rust, &["pop3".into()], false).unwrap();
        let paths = rust.iter().map(|f| f.path.clone()).collect::<Vec<_>>();
        assert_eq!(paths, vec![PathBuf::from("objects/mod.rs"), PathBuf::from("mod.rs")]);
    }

    #[test]
    fn test_nodes_files() {
        let go = generate_nodes(Target::Go, &NodeSet::default()).unwrap();
        let paths = go.iter().map(|f| f.path.clone()).collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("nodes/nodes.go"),
                PathBuf::from("nodes/handlers.go"),
                PathBuf::from("nodes/directory.go")
            ]
        );
        let rust = generate_nodes(Target::Rust, &NodeSet::default()).unwrap();
        assert_eq!(rust[0].path, PathBuf::from("nodes/mod.rs"));
    }
}
