use crate::codec;
use crate::record::{FileRecord, RecordCheck};
use crate::AsideError;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Serialization formats understood by [`AsideFile::load`] and [`AsideFile::dump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestFormat {
    #[default]
    Json,
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ManifestFormat {
    type Err = AsideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ManifestFormat::Json),
            _ => Err(AsideError::UnsupportedFormat(s.to_owned())),
        }
    }
}

/// A manifest document: the ordered list of artifacts kept in lookaside storage.
///
/// Record order is part of equality and of the serialized form, but not of
/// validation. `Clone` (and [`AsideFile::copy`]) copy every record by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsideFile {
    pub file_records: Vec<FileRecord>,
}

/// A record that failed a check, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub index: usize,
    pub filename: PathBuf,
    pub check: RecordCheck,
}

#[derive(Debug, Default, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<RecordFailure>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl AsideFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(file_records: Vec<FileRecord>) -> Self {
        Self { file_records }
    }

    /// Read and decode a manifest file.
    pub fn open(path: impl AsRef<Path>, format: ManifestFormat) -> Result<Self, AsideError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AsideError::from_open(e, path))?;
        let mut aside = Self::new();
        aside.load(BufReader::new(file), format)?;
        tracing::debug!(
            "loaded {} record(s) from {}",
            aside.file_records.len(),
            path.display()
        );
        Ok(aside)
    }

    /// Write the manifest to `path` atomically: a temp file in the same
    /// directory is written, synced, and renamed over the destination.
    pub fn save(&self, path: impl AsRef<Path>, format: ManifestFormat) -> Result<(), AsideError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir)?;
        self.dump(&mut tmp, format)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| AsideError::Io(e.error))?;
        tracing::debug!(
            "saved {} record(s) to {}",
            self.file_records.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the records with those decoded from `reader`.
    ///
    /// The document must be a list of records. On error the manifest is left unchanged.
    pub fn load<R: Read>(&mut self, reader: R, format: ManifestFormat) -> Result<(), AsideError> {
        let records = match format {
            ManifestFormat::Json => codec::decode_reader(reader)?.into_records()?,
        };
        self.file_records = records;
        Ok(())
    }

    /// Encode the records as a list and write them to `writer`.
    pub fn dump<W: Write>(&self, mut writer: W, format: ManifestFormat) -> Result<(), AsideError> {
        let text = match format {
            ManifestFormat::Json => {
                codec::to_string_pretty(&codec::encode_records(&self.file_records)?)?
            }
        };
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Independent deep copy.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Every record's file exists. Never errors.
    pub fn present(&self) -> bool {
        self.file_records.iter().all(FileRecord::present)
    }

    pub fn missing(&self) -> Vec<&FileRecord> {
        self.file_records.iter().filter(|r| !r.present()).collect()
    }

    pub fn validate_sizes(&self) -> Result<bool, AsideError> {
        for record in &self.file_records {
            if !record.validate_size()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn validate_digests(&self) -> Result<bool, AsideError> {
        for record in &self.file_records {
            if !record.validate_digest()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn validate(&self) -> Result<bool, AsideError> {
        Ok(self.verify()?.is_clean())
    }

    /// Check every record and collect the ones that do not match.
    ///
    /// Mismatches are collected; a missing file (or any other error) aborts the
    /// scan and is returned as-is.
    pub fn verify(&self) -> Result<VerifyReport, AsideError> {
        let mut report = VerifyReport {
            checked: self.file_records.len(),
            ..Default::default()
        };
        for (index, record) in self.file_records.iter().enumerate() {
            match record.check()? {
                RecordCheck::Valid => report.passed += 1,
                check => {
                    tracing::warn!(
                        "{} failed verification: {check:?}",
                        record.filename.display()
                    );
                    report.failed.push(RecordFailure {
                        index,
                        filename: record.filename.clone(),
                        check,
                    });
                }
            }
        }
        Ok(report)
    }

    pub fn push(&mut self, record: FileRecord) {
        self.file_records.push(record);
    }

    /// Replace the record with the same filename in place, or append a new one.
    /// Returns the record that was replaced.
    pub fn upsert(&mut self, record: FileRecord) -> Option<FileRecord> {
        match self
            .file_records
            .iter_mut()
            .find(|r| r.filename == record.filename)
        {
            Some(existing) => Some(std::mem::replace(existing, record)),
            None => {
                self.file_records.push(record);
                None
            }
        }
    }

    /// Remove the first record tracking `filename`.
    pub fn remove(&mut self, filename: impl AsRef<Path>) -> Option<FileRecord> {
        let filename = filename.as_ref();
        let pos = self
            .file_records
            .iter()
            .position(|r| r.filename == filename)?;
        Some(self.file_records.remove(pos))
    }

    pub fn get(&self, filename: impl AsRef<Path>) -> Option<&FileRecord> {
        let filename = filename.as_ref();
        self.file_records.iter().find(|r| r.filename == filename)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.file_records.iter()
    }

    pub fn len(&self) -> usize {
        self.file_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_records.is_empty()
    }
}

impl From<Vec<FileRecord>> for AsideFile {
    fn from(file_records: Vec<FileRecord>) -> Self {
        Self::from_records(file_records)
    }
}

impl FromIterator<FileRecord> for AsideFile {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AsideFile {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.file_records.iter()
    }
}
