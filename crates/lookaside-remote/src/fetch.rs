use crate::{RemoteBackend, RemoteError};
use lookaside_core::{AsideFile, DigestAlgorithm, FileRecord};
use std::path::Path;
use tempfile::NamedTempFile;

/// Result of fetching the missing artifacts of a manifest.
#[derive(Debug, Default)]
pub struct FetchResult {
    pub fetched: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Download the artifact for `record` and place it at `record.filename`.
///
/// The body lands in a temp file next to the destination and is only moved
/// into place once its size and digest match the record. Returns the number
/// of bytes placed.
pub fn fetch_record(record: &FileRecord, backend: &dyn RemoteBackend) -> Result<u64, RemoteError> {
    let algorithm: DigestAlgorithm = record.algorithm.parse()?;
    let key = record.filename.display().to_string();
    let dir = match record.filename.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    backend.fetch(record, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;

    let actual_size = tmp.as_file().metadata()?.len();
    if actual_size != record.size {
        tracing::warn!("{key}: remote body is {actual_size} bytes, expected {}", record.size);
        return Err(RemoteError::IntegrityFailure {
            key,
            expected: format!("{} bytes", record.size),
            actual: format!("{actual_size} bytes"),
        });
    }

    let actual_digest = algorithm.hash_reader(tmp.reopen()?)?;
    if !actual_digest.eq_ignore_ascii_case(&record.digest) {
        tracing::warn!("{key}: remote body digest {actual_digest} does not match manifest");
        return Err(RemoteError::IntegrityFailure {
            key,
            expected: record.digest.clone(),
            actual: actual_digest,
        });
    }

    tmp.persist(&record.filename)
        .map_err(|e| RemoteError::Io(e.error))?;
    tracing::info!("fetched {key} ({actual_size} bytes)");
    Ok(actual_size)
}

/// Fetch every artifact of `aside` that is not present on disk.
///
/// Present files are left alone and not re-validated. Stops at the first error.
pub fn fetch_missing(
    aside: &AsideFile,
    backend: &dyn RemoteBackend,
) -> Result<FetchResult, RemoteError> {
    let mut result = FetchResult::default();
    for record in aside {
        if record.present() {
            tracing::debug!("{} already present", record.filename.display());
            result.skipped += 1;
            continue;
        }
        result.bytes += fetch_record(record, backend)?;
        result.fetched += 1;
    }
    Ok(result)
}

/// A missing artifact and whether the remote store holds it.
#[derive(Debug)]
pub struct Availability<'a> {
    pub record: &'a FileRecord,
    pub on_remote: bool,
}

/// Ask the remote which of the missing artifacts of `aside` it can serve.
///
/// Nothing is downloaded and nothing is written. Stops at the first error.
pub fn check_missing<'a>(
    aside: &'a AsideFile,
    backend: &dyn RemoteBackend,
) -> Result<Vec<Availability<'a>>, RemoteError> {
    aside
        .missing()
        .into_iter()
        .map(|record| {
            let on_remote = backend.has(record)?;
            tracing::debug!(
                "{}: {}",
                record.filename.display(),
                if on_remote { "available" } else { "not on remote" }
            );
            Ok(Availability { record, on_remote })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookaside_core::{hash_bytes, AsideError};
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    /// In-memory lookaside store keyed by `<algorithm>/<digest>`.
    struct MockRemote {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
        fetches: Mutex<usize>,
    }

    impl MockRemote {
        fn new() -> Self {
            Self {
                blobs: Mutex::new(HashMap::new()),
                fetches: Mutex::new(0),
            }
        }

        fn blob_key(record: &FileRecord) -> String {
            format!("{}/{}", record.algorithm, record.digest)
        }

        fn insert(&self, record: &FileRecord, data: &[u8]) {
            self.blobs
                .lock()
                .unwrap()
                .insert(Self::blob_key(record), data.to_vec());
        }

        fn fetch_count(&self) -> usize {
            *self.fetches.lock().unwrap()
        }
    }

    impl RemoteBackend for MockRemote {
        fn fetch(&self, record: &FileRecord, dest: &mut dyn Write) -> Result<u64, RemoteError> {
            *self.fetches.lock().unwrap() += 1;
            let blobs = self.blobs.lock().unwrap();
            let data = blobs
                .get(&Self::blob_key(record))
                .ok_or_else(|| RemoteError::NotFound(Self::blob_key(record)))?;
            dest.write_all(data)?;
            Ok(data.len() as u64)
        }

        fn has(&self, record: &FileRecord) -> Result<bool, RemoteError> {
            Ok(self
                .blobs
                .lock()
                .unwrap()
                .contains_key(&Self::blob_key(record)))
        }
    }

    fn record_for(path: &Path, data: &[u8]) -> FileRecord {
        FileRecord::new(
            path,
            data.len() as u64,
            hash_bytes(data, "sha1").unwrap(),
            "sha1",
        )
    }

    #[test]
    fn fetch_places_verified_file() {
        let dir = tempfile::tempdir().unwrap();
        let data = b"artifact bytes";
        let record = record_for(&dir.path().join("a.bin"), data);
        let remote = MockRemote::new();
        remote.insert(&record, data);

        assert!(!record.present());
        let n = fetch_record(&record, &remote).unwrap();
        assert_eq!(n, data.len() as u64);
        assert!(record.present());
        assert!(record.validate().unwrap());
    }

    #[test]
    fn fetch_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let data = b"nested";
        let record = record_for(&dir.path().join("deep/er/nested.bin"), data);
        let remote = MockRemote::new();
        remote.insert(&record, data);

        fetch_record(&record, &remote).unwrap();
        assert!(record.validate().unwrap());
    }

    #[test]
    fn fetch_rejects_corrupted_body() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_for(&dir.path().join("a.bin"), b"expected data!");
        let remote = MockRemote::new();
        remote.insert(&record, b"tampered data!");

        let err = fetch_record(&record, &remote).unwrap_err();
        match err {
            RemoteError::IntegrityFailure { expected, .. } => assert_eq!(expected, record.digest),
            other => panic!("expected IntegrityFailure, got {other:?}"),
        }
        assert!(!record.present(), "corrupt body must not be placed");
    }

    #[test]
    fn fetch_rejects_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_for(&dir.path().join("a.bin"), b"the whole thing");
        let remote = MockRemote::new();
        remote.insert(&record, b"the whole");

        assert!(matches!(
            fetch_record(&record, &remote),
            Err(RemoteError::IntegrityFailure { .. })
        ));
        assert!(!record.present());
    }

    #[test]
    fn fetch_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_for(&dir.path().join("a.bin"), b"never uploaded");
        let remote = MockRemote::new();
        assert!(matches!(
            fetch_record(&record, &remote),
            Err(RemoteError::NotFound(_))
        ));
        assert!(!record.present());
    }

    #[test]
    fn fetch_unknown_algorithm_is_rejected_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = record_for(&dir.path().join("a.bin"), b"x");
        record.algorithm = "0".to_owned();
        let remote = MockRemote::new();
        assert!(matches!(
            fetch_record(&record, &remote),
            Err(RemoteError::Aside(AsideError::UnsupportedAlgorithm(_)))
        ));
        assert_eq!(remote.fetch_count(), 0);
    }

    #[test]
    fn fetch_missing_skips_present_files() {
        let dir = tempfile::tempdir().unwrap();
        let present_data = b"already here";
        let missing_data = b"fetch me";
        let present_path = dir.path().join("present.bin");
        std::fs::write(&present_path, present_data).unwrap();
        let present = record_for(&present_path, present_data);
        let missing = record_for(&dir.path().join("missing.bin"), missing_data);

        let remote = MockRemote::new();
        remote.insert(&present, present_data);
        remote.insert(&missing, missing_data);

        let aside = AsideFile::from_records(vec![present, missing]);
        let result = fetch_missing(&aside, &remote).unwrap();
        assert_eq!(result.fetched, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.bytes, missing_data.len() as u64);
        assert_eq!(remote.fetch_count(), 1);
        assert!(aside.present());
        assert!(aside.validate().unwrap());
    }

    #[test]
    fn fetch_missing_stops_at_first_error() {
        let dir = tempfile::tempdir().unwrap();
        let first = record_for(&dir.path().join("first.bin"), b"not on remote");
        let second = record_for(&dir.path().join("second.bin"), b"on remote");
        let remote = MockRemote::new();
        remote.insert(&second, b"on remote");

        let aside = AsideFile::from_records(vec![first, second.clone()]);
        assert!(fetch_missing(&aside, &remote).is_err());
        assert!(!second.present());
    }

    #[test]
    fn fetch_missing_on_complete_manifest_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("done.bin");
        std::fs::write(&path, b"done").unwrap();
        let aside = AsideFile::from_records(vec![record_for(&path, b"done")]);
        let remote = MockRemote::new();
        let result = fetch_missing(&aside, &remote).unwrap();
        assert_eq!(result.fetched, 0);
        assert_eq!(result.skipped, 1);
        assert_eq!(remote.fetch_count(), 0);
    }

    #[test]
    fn check_missing_reports_remote_availability() {
        let dir = tempfile::tempdir().unwrap();
        let present_path = dir.path().join("present.bin");
        std::fs::write(&present_path, b"here").unwrap();
        let present = record_for(&present_path, b"here");
        let stored = record_for(&dir.path().join("stored.bin"), b"on remote");
        let lost = record_for(&dir.path().join("lost.bin"), b"nowhere");

        let remote = MockRemote::new();
        remote.insert(&stored, b"on remote");

        let aside = AsideFile::from_records(vec![present, stored.clone(), lost.clone()]);
        let report = check_missing(&aside, &remote).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].record, &stored);
        assert!(report[0].on_remote);
        assert_eq!(report[1].record, &lost);
        assert!(!report[1].on_remote);

        assert_eq!(remote.fetch_count(), 0);
        assert!(!stored.present());
    }

    #[test]
    fn check_missing_on_complete_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("done.bin");
        std::fs::write(&path, b"done").unwrap();
        let aside = AsideFile::from_records(vec![record_for(&path, b"done")]);
        assert!(check_missing(&aside, &MockRemote::new()).unwrap().is_empty());
    }
}
