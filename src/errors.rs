//! Error types for the generator.

use thiserror::Error;

/// Errors that can occur while fetching, assembling, rendering or writing.
///
/// Whether an error aborts the run is decided by the call site: the same
/// `Transport` error is fatal for a schema document but only skips struct
/// synthesis when it comes from a sample request.
#[derive(Debug, Error)]
pub enum GenError {
    /// Missing or unusable endpoint, credentials or options
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The request never produced a response
    #[error("GET {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("GET {path} returned status {status}")]
    Status { path: String, status: u16 },

    /// The response body was not the JSON we expected
    #[error("Could not decode response of {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The emitted source text is not valid for the target language
    #[error("Rendering {resource} failed: {reason}")]
    Render { resource: String, reason: String },

    /// Failed to create or write an output file or directory
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;
