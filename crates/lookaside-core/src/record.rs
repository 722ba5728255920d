use crate::digest::{hash_path, DigestAlgorithm};
use crate::AsideError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// One artifact tracked by a manifest: where it lives and what its bytes must hash to.
///
/// `algorithm` is kept as the opaque tag found in the manifest. It is only
/// resolved to a [`DigestAlgorithm`] when the digest is actually checked, so
/// records with unknown tags still load, compare, and round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRecord {
    pub filename: PathBuf,
    pub size: u64,
    pub digest: String,
    pub algorithm: String,
}

/// Outcome of checking a present file against its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordCheck {
    Valid,
    SizeMismatch { expected: u64, actual: u64 },
    DigestMismatch { expected: String, actual: String },
}

impl RecordCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, RecordCheck::Valid)
    }
}

impl FileRecord {
    pub fn new(
        filename: impl Into<PathBuf>,
        size: u64,
        digest: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            size,
            digest: digest.into(),
            algorithm: algorithm.into(),
        }
    }

    /// Describe an existing file: measure it and hash it under `algorithm`.
    pub fn from_path(
        path: impl Into<PathBuf>,
        algorithm: DigestAlgorithm,
    ) -> Result<Self, AsideError> {
        let filename = path.into();
        let size = std::fs::metadata(&filename)
            .map_err(|e| AsideError::from_open(e, &filename))?
            .len();
        let digest = hash_path(&filename, algorithm.name())?;
        Ok(Self {
            filename,
            size,
            digest,
            algorithm: algorithm.name().to_owned(),
        })
    }

    /// Whether `filename` exists as a regular file and can be opened for reading.
    pub fn present(&self) -> bool {
        File::open(&self.filename)
            .and_then(|f| f.metadata())
            .is_ok_and(|m| m.is_file())
    }

    /// Compare the on-disk length with `size`. An absent file is an error, not `false`.
    pub fn validate_size(&self) -> Result<bool, AsideError> {
        let actual = self.actual_size()?;
        if actual != self.size {
            tracing::debug!(
                "size mismatch for {}: expected {}, found {actual}",
                self.filename.display(),
                self.size
            );
        }
        Ok(actual == self.size)
    }

    /// Recompute the digest of the file and compare it with `digest`, ignoring hex case.
    pub fn validate_digest(&self) -> Result<bool, AsideError> {
        let actual = self.actual_digest()?;
        let ok = actual.eq_ignore_ascii_case(&self.digest);
        if !ok {
            tracing::debug!(
                "digest mismatch for {}: expected {}, computed {actual}",
                self.filename.display(),
                self.digest
            );
        }
        Ok(ok)
    }

    /// Size and digest checks together.
    pub fn validate(&self) -> Result<bool, AsideError> {
        Ok(self.check()?.is_valid())
    }

    /// Run the size check, then the digest check, and report the first that fails.
    ///
    /// The file is not hashed when its length is already wrong.
    pub fn check(&self) -> Result<RecordCheck, AsideError> {
        let file = open_tracked(&self.filename)?;
        let actual_size = file.metadata()?.len();
        if actual_size != self.size {
            return Ok(RecordCheck::SizeMismatch {
                expected: self.size,
                actual: actual_size,
            });
        }
        let algorithm: DigestAlgorithm = self.algorithm.parse()?;
        let actual_digest = algorithm.hash_reader(file)?;
        if !actual_digest.eq_ignore_ascii_case(&self.digest) {
            return Ok(RecordCheck::DigestMismatch {
                expected: self.digest.clone(),
                actual: actual_digest,
            });
        }
        Ok(RecordCheck::Valid)
    }

    fn actual_size(&self) -> Result<u64, AsideError> {
        let file = open_tracked(&self.filename)?;
        Ok(file.metadata()?.len())
    }

    fn actual_digest(&self) -> Result<String, AsideError> {
        let file = open_tracked(&self.filename)?;
        let algorithm: DigestAlgorithm = self.algorithm.parse()?;
        Ok(algorithm.hash_reader(file)?)
    }
}

fn open_tracked(path: &Path) -> Result<File, AsideError> {
    File::open(path).map_err(|e| AsideError::from_open(e, path))
}
