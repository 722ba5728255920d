//! File records, manifest codec, and integrity validation for lookaside artifacts.
//!
//! This crate provides the core of the lookaside tooling: streaming digest
//! computation (`hash_file`), the `FileRecord` describing one tracked artifact
//! and its checks against the filesystem, the JSON codec that round-trips a
//! single record or an ordered list of records (`codec`), and the `AsideFile`
//! manifest that loads, dumps, and validates a whole document.

pub mod codec;
pub mod digest;
pub mod manifest;
pub mod record;

pub use codec::{CodecError, Decoded, Encodable};
pub use digest::{hash_bytes, hash_file, hash_path, DigestAlgorithm, CHUNK_SIZE};
pub use manifest::{AsideFile, ManifestFormat, RecordFailure, VerifyReport};
pub use record::{FileRecord, RecordCheck};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsideError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("unsupported digest algorithm: '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("unsupported manifest format: '{0}'")]
    UnsupportedFormat(String),
    #[error("manifest error: {0}")]
    Codec(#[from] CodecError),
}

impl AsideError {
    /// Map an I/O error from opening `path` to `MissingFile` when the file is absent.
    pub(crate) fn from_open(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            AsideError::MissingFile(path.to_path_buf())
        } else {
            AsideError::Io(err)
        }
    }
}
