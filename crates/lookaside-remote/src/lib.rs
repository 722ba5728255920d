//! Remote lookaside storage for artifacts listed in a manifest.
//!
//! This crate retrieves artifacts that a manifest tracks but that are absent on
//! disk. A `RemoteBackend` streams an artifact body given its `FileRecord`;
//! `HttpBackend` implements it over plain HTTP. `fetch_record` and
//! `fetch_missing` download into a temp file, check size and digest against
//! the record, and only then move the file into place.

pub mod config;
pub mod fetch;
pub mod http;

pub use config::RemoteConfig;
pub use fetch::{check_missing, fetch_missing, fetch_record, Availability, FetchResult};
pub use http::HttpBackend;

/// Protocol version sent as `X-Lookaside-Protocol` header on all HTTP requests.
pub const PROTOCOL_VERSION: u32 = 1;

use lookaside_core::{AsideError, FileRecord};
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("cannot fetch '{0}': record has no file name")]
    InvalidRecord(String),
    #[error(transparent)]
    Aside(#[from] AsideError),
    #[error("integrity failure for '{key}': expected {expected}, got {actual}")]
    IntegrityFailure {
        key: String,
        expected: String,
        actual: String,
    },
}

/// Trait for remote lookaside stores.
pub trait RemoteBackend: Send + Sync {
    /// Stream the artifact described by `record` into `dest`. Returns the number of bytes written.
    fn fetch(&self, record: &FileRecord, dest: &mut dyn Write) -> Result<u64, RemoteError>;

    /// Check whether the store holds the artifact described by `record`.
    fn has(&self, record: &FileRecord) -> Result<bool, RemoteError>;
}
