use std::fmt;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::deserializer::{Definition, SchemaDocument, Version};
use crate::errors::{GenError, Result};

pub const VERSION_PATH: &str = "/api/status/version";
pub const DEFINITIONS_PATH: &str = "/api/definitions";
pub const NODES_PATH: &str = "/api/nodes";

/// Anything that can answer a GET for a path of the management API with JSON.
///
/// The generator only ever needs `get_json`; the typed helpers decode the
/// well-known documents on top of it.
pub trait SchemaSource {
    fn get_json(&self, path: &str) -> Result<Value>;

    fn version(&self) -> Result<Version> {
        decode(VERSION_PATH, self.get_json(VERSION_PATH)?)
    }

    fn definitions(&self) -> Result<Vec<Definition>> {
        decode(DEFINITIONS_PATH, self.get_json(DEFINITIONS_PATH)?)
    }

    fn schema(&self, link: &str) -> Result<SchemaDocument> {
        decode(link, self.get_json(link)?)
    }

    /// Every node key with its current value
    fn nodes(&self) -> Result<Map<String, Value>> {
        decode(NODES_PATH, self.get_json(NODES_PATH)?)
    }

    /// A live payload used to infer the shape of a resource
    fn sample(&self, path: &str) -> Result<Value> {
        self.get_json(path)
    }
}

impl<S: SchemaSource + ?Sized> SchemaSource for &S {
    fn get_json(&self, path: &str) -> Result<Value> {
        (**self).get_json(path)
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| GenError::Decode {
        path: path.to_string(),
        source,
    })
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API token, sent as basic auth for the user `token`
    Token(String),
    Basic { user: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Basic { user, .. } => write!(f, "Basic({user}:***)"),
        }
    }
}

/// Blocking HTTP implementation of [`SchemaSource`].
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpSource {
    /// `insecure` accepts self-signed certificates, which is what most appliances ship with.
    pub fn new(base_url: &str, credentials: Credentials, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|source| GenError::Transport {
                path: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl SchemaSource for HttpSource {
    fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url_for(path);
        debug!("GET {}", url);
        let request = self.client.get(&url).header(ACCEPT, "application/json");
        let request = match &self.credentials {
            Credentials::Token(token) => request.basic_auth("token", Some(token)),
            Credentials::Basic { user, password } => request.basic_auth(user, Some(password)),
        };
        let transport = |source| GenError::Transport {
            path: path.to_string(),
            source,
        };
        let response = request.send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().map_err(transport)?;
        serde_json::from_str(&body).map_err(|source| GenError::Decode {
            path: path.to_string(),
            source,
        })
    }
}
