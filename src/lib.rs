//! Generates typed REST client sources for a Sophos UTM from the schema the
//! appliance describes itself with.
//!
//! A run reads `/api/definitions`, assembles one [`model::Endpoint`] per
//! definition from its schema document and live samples, and renders it for a
//! [`generator::Target`]. See [`pipeline::Generator`].

pub mod assembler;
pub mod config;
pub mod deserializer;
pub mod errors;
pub mod fetcher;
pub mod generator;
pub mod model;
pub mod naming;
pub mod nodes;
pub mod pipeline;
pub mod synthesizer;

pub use errors::{GenError, Result};
pub use fetcher::{Credentials, HttpSource, SchemaSource};
pub use generator::Target;
pub use pipeline::{Generator, RunReport};
