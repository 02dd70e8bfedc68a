//! One generator run: fetch, assemble, render and write every definition.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::assembler::{assemble, is_nodes_definition};
use crate::deserializer::Definition;
use crate::errors::{GenError, Result};
use crate::fetcher::SchemaSource;
use crate::generator::{self, GeneratedFile, Target};
use crate::model::{Endpoint, Subtype};
use crate::naming::Namer;
use crate::nodes::NodeSet;
use crate::synthesizer::{synthesize, Synthesized};

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// `restd` version the output is stamped with
    pub version: String,
    /// The version directory, `<output>/api/v<version>`
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Owns everything a run needs: where schemas come from, how names are
/// normalized and where the output goes.
pub struct Generator<S> {
    source: S,
    namer: Namer,
    target: Target,
    output: PathBuf,
    debug: bool,
}

impl<S: SchemaSource> Generator<S> {
    pub fn new(source: S, target: Target, output: impl Into<PathBuf>) -> Self {
        Self {
            source,
            namer: Namer::new(),
            target,
            output: output.into(),
            debug: false,
        }
    }

    /// Print every assembled endpoint as JSON before it is rendered.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn run(&self) -> Result<RunReport> {
        let version = self.source.version()?;
        info!("UTM restd version {}", version.restd);
        check_version(&version.restd)?;
        let root = self.output.join("api").join(format!("v{}", version.restd));
        prepare_dir(&root)?;

        let definitions = self.source.definitions()?;
        let mut files = vec![];
        let mut stems = vec![];
        let mut with_nodes = false;
        for definition in &definitions {
            let endpoint = self.process(definition)?;

            if is_nodes_definition(definition) {
                let nodes = NodeSet::from_listing(&self.namer, &self.source.nodes()?);
                for file in generator::generate_nodes(self.target, &nodes)? {
                    files.push(write(&root, &file)?);
                }
                with_nodes = true;
            }

            if self.debug {
                let json = serde_json::to_string_pretty(&endpoint).map_err(|e| GenError::Render {
                    resource: definition.name.clone(),
                    reason: e.to_string(),
                })?;
                println!("{json}");
            }

            info!("writing {}", definition.name);
            let file = generator::generate_endpoint(self.target, &endpoint)?;
            files.push(write(&root, &file)?);
            stems.push(self.target.file_stem(&definition.name));
        }

        for file in generator::generate_index(self.target, &stems, with_nodes)? {
            files.push(write(&root, &file)?);
        }
        Ok(RunReport {
            version: version.restd,
            root,
            files,
        })
    }

    /// Fetches the schema of `definition` and assembles its endpoint.
    ///
    /// The schema document is required; every sample is optional.
    pub fn process(&self, definition: &Definition) -> Result<Endpoint> {
        let doc = self.source.schema(&definition.link)?;
        let mut endpoint = if is_nodes_definition(definition) {
            Endpoint::for_definition(&self.namer, definition)
        } else {
            assemble(&self.namer, definition, &doc, |subtype, path| {
                self.synthesize_subtype(subtype, path)
            })
        };
        endpoint.body = match self.source.sample(&endpoint.path) {
            Ok(sample) => Some(synthesize(&self.namer, &sample, &endpoint.title, None).shape),
            Err(e) => {
                debug!("No sample for endpoint {}: {}", endpoint.title, e);
                None
            }
        };
        Ok(endpoint)
    }

    fn synthesize_subtype(&self, subtype: &Subtype, path: &str) -> Option<Synthesized> {
        match self.source.sample(path) {
            Ok(sample) => Some(synthesize(
                &self.namer,
                &sample,
                &subtype.name,
                subtype.declared.as_ref(),
            )),
            Err(e) => {
                warn!("could not get path {}: {}", path, e);
                None
            }
        }
    }
}

/// The version becomes a directory name under the output, so it must stay one.
fn check_version(restd: &str) -> Result<()> {
    if restd.is_empty() || restd.contains(['/', '\\']) || restd.contains("..") {
        return Err(GenError::Config(format!(
            "refusing to write output for restd version {restd:?}"
        )));
    }
    Ok(())
}

/// Removes what a previous run left in `dir` and recreates it.
fn prepare_dir(dir: &Path) -> Result<()> {
    let write_error = |source| GenError::Write {
        path: dir.display().to_string(),
        source,
    };
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(write_error)?;
    }
    fs::create_dir_all(dir).map_err(write_error)
}

fn write(root: &Path, file: &GeneratedFile) -> Result<PathBuf> {
    let path = root.join(&file.path);
    let write_error = |source| GenError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(&path, &file.contents).map_err(write_error)?;
    debug!("wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use test_log::test;

    /// Answers from a fixed table and remembers every requested path.
    #[derive(Default)]
    struct FakeSource {
        responses: HashMap<String, Value>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, path: &str, value: Value) -> Self {
            self.responses.insert(path.to_string(), value);
            self
        }

        fn requested(&self, path: &str) -> bool {
            self.requests.borrow().iter().any(|p| p == path)
        }
    }

    impl SchemaSource for FakeSource {
        fn get_json(&self, path: &str) -> Result<Value> {
            self.requests.borrow_mut().push(path.to_string());
            self.responses.get(path).cloned().ok_or_else(|| GenError::Status {
                path: path.to_string(),
                status: 404,
            })
        }
    }

    fn pop3_source() -> FakeSource {
        FakeSource::default()
            .with("/api/status/version", json!({"restd": "1.3.0"}))
            .with(
                "/api/definitions",
                json!([{"name": "pop3", "description": "pop3", "link": "/api/definitions/pop3"}]),
            )
            .with(
                "/api/definitions/pop3",
                json!({"paths": {
                    "/objects/pop3/account/": {"get": {"tags": ["pop3/account"], "description": "All accounts"}},
                    "/objects/pop3/account/{ref}": {
                        "get": {"tags": ["pop3/account"]},
                        "delete": {"tags": ["pop3/account"]}
                    }
                }}),
            )
            .with(
                "/api/objects/pop3/account/",
                json!([
                    {"_locked": "", "_ref": "REF_Pop3Acc1", "_type": "pop3/account", "server": "mail", "port": 110},
                    {"_locked": "", "_ref": "REF_Pop3Acc2", "_type": "pop3/account", "server": "mx", "tls": true}
                ]),
            )
    }

    fn pop3() -> Definition {
        Definition {
            name: "pop3".into(),
            description: "pop3".into(),
            link: "/api/definitions/pop3".into(),
        }
    }

    #[test]
    fn test_process_pop3() {
        let source = pop3_source();
        let generator = Generator::new(&source, Target::Go, ".");
        let endpoint = generator.process(&pop3()).unwrap();

        assert_eq!(endpoint.subtypes.len(), 1);
        let account = &endpoint.subtypes[0];
        assert_eq!(account.name, "Pop3Account");
        assert!(account.has_ref);
        assert!(account.is_plural);
        assert!(account.is_type);
        assert_eq!(
            account.get_paths.iter().cloned().collect::<Vec<_>>(),
            vec![
                "/api/objects/pop3/account/".to_string(),
                "/api/objects/pop3/account/{ref}".to_string()
            ]
        );
        let def = account.shape().record().unwrap();
        let tags = def.fields.iter().map(|f| f.json_tag.as_str()).collect::<Vec<_>>();
        assert_eq!(tags, vec!["_locked", "_ref", "_type", "port", "server", "tls"]);

        assert!(source.requested("/api/objects/pop3/account/"));
        assert!(source.requested("/api/nodes/pop3"));
        assert!(!source.requested("/api/objects/pop3/account/{ref}"));
        assert!(endpoint.body.is_none());
    }

    #[test]
    fn test_run_writes_version_stamped_files() {
        let output = tempfile::tempdir().unwrap();
        let stale = output.path().join("api/v1.3.0/objects/gone.go");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "package objects").unwrap();

        let source = pop3_source();
        let report = Generator::new(&source, Target::Go, output.path()).run().unwrap();

        assert_eq!(report.version, "1.3.0");
        assert_eq!(report.root, output.path().join("api/v1.3.0"));
        assert_eq!(
            report.files,
            vec![
                report.root.join("objects/pop3.go"),
                report.root.join("objects/doc.go")
            ]
        );
        assert!(!stale.exists());

        let code = fs::read_to_string(report.root.join("objects/pop3.go")).unwrap();
        assert!(code.contains("package objects"));
        assert!(code.contains("type Pop3Accounts []Pop3Account"));
        assert!(code.contains("// GetPath implements sophos.RestObject and returns the Pop3Accounts GET path\n// All accounts"));
        assert!(code.contains("fmt.Sprintf(\"/api/objects/pop3/account/%s\", ref)"));
    }

    #[test]
    fn test_schema_fetch_is_fatal() {
        let output = tempfile::tempdir().unwrap();
        let source = FakeSource::default()
            .with("/api/status/version", json!({"restd": "1.3.0"}))
            .with(
                "/api/definitions",
                json!([{"name": "pop3", "description": "", "link": "/api/definitions/pop3"}]),
            );
        let err = Generator::new(&source, Target::Go, output.path()).run().unwrap_err();
        assert!(matches!(err, GenError::Status { ref path, status: 404 } if path == "/api/definitions/pop3"));
        assert!(!output.path().join("api/v1.3.0/objects/pop3.go").exists());
    }

    #[test]
    fn test_missing_version_is_fatal() {
        let output = tempfile::tempdir().unwrap();
        let err = Generator::new(FakeSource::default(), Target::Go, output.path())
            .run()
            .unwrap_err();
        assert!(matches!(err, GenError::Status { ref path, .. } if path == "/api/status/version"));
        assert!(!output.path().join("api").exists());
    }

    #[test]
    fn test_version_cannot_leave_output_dir() {
        let output = tempfile::tempdir().unwrap();
        let outside = output.path().join("keep");
        fs::create_dir_all(&outside).unwrap();
        let nested = output.path().join("out");

        for restd in ["/../../keep", "..", "1.0\\..\\x", ""] {
            let source = FakeSource::default().with("/api/status/version", json!({"restd": restd}));
            let err = Generator::new(&source, Target::Go, &nested).run().unwrap_err();
            assert!(matches!(err, GenError::Config(_)), "{restd:?} accepted");
            assert!(!source.requested("/api/definitions"));
        }
        assert!(outside.exists());
        assert!(!nested.exists());
    }

    #[test]
    fn test_failed_sample_leaves_subtype_opaque() {
        let output = tempfile::tempdir().unwrap();
        let mut source = pop3_source();
        source.responses.remove("/api/objects/pop3/account/");
        let report = Generator::new(&source, Target::Go, output.path()).run().unwrap();

        let code = fs::read_to_string(report.root.join("objects/pop3.go")).unwrap();
        assert!(code.contains("type Pop3Account map[string]interface{}"));
        assert!(code.contains("var _ sophos.RestObject = &Pop3Account{}"));
    }

    #[test]
    fn test_nodes_definition() {
        let output = tempfile::tempdir().unwrap();
        let listing = json!({"smtp.status": true, "auth.api_tokens": {"abc": "secret"}});
        let source = FakeSource::default()
            .with("/api/status/version", json!({"restd": "1.3.0"}))
            .with(
                "/api/definitions",
                json!([{"Name": "Nodes", "Description": "nodes", "Link": "/api/definitions/nodes"}]),
            )
            .with(
                "/api/definitions/nodes",
                json!({"paths": {"/nodes/": {"get": {"tags": ["nodes"]}}}}),
            )
            .with("/api/nodes", listing);
        let report = Generator::new(&source, Target::Go, output.path()).run().unwrap();

        for name in ["nodes.go", "handlers.go", "directory.go"] {
            assert!(report.root.join("nodes").join(name).exists(), "{name} missing");
        }
        let objects = fs::read_to_string(report.root.join("objects/nodes.go")).unwrap();
        assert!(objects.contains("AuthApiTokens map[string]interface{} `json:\"auth.api_tokens\"`"));
        assert!(objects.contains("func (*Nodes) GetPath() string { return \"/api/nodes\" }"));
        let directory = fs::read_to_string(report.root.join("nodes/directory.go")).unwrap();
        assert!(directory.contains("\"smtp.status\": &SmtpStatus{},"));
    }

    #[test]
    fn test_rust_target_writes_modules() {
        let output = tempfile::tempdir().unwrap();
        let source = pop3_source();
        let report = Generator::new(&source, Target::Rust, output.path())
            .with_debug(true)
            .run()
            .unwrap();

        assert_eq!(
            report.files,
            vec![
                report.root.join("objects/pop3.rs"),
                report.root.join("objects/mod.rs"),
                report.root.join("mod.rs")
            ]
        );
        for file in &report.files {
            let code = fs::read_to_string(file).unwrap();
            syn::parse_file(&code).unwrap();
        }
    }
}
