use super::{json_pretty, open_or_create_manifest, save_manifest, EXIT_SUCCESS};
use lookaside_core::{AsideError, DigestAlgorithm, FileRecord};
use std::path::{Path, PathBuf};

pub fn run(manifest: &Path, files: &[PathBuf], algorithm: &str, json: bool) -> Result<u8, String> {
    let algorithm: DigestAlgorithm = algorithm.parse().map_err(|e: AsideError| e.to_string())?;
    let mut aside = open_or_create_manifest(manifest)?;

    let mut added = Vec::new();
    for file in files {
        let record = FileRecord::from_path(file, algorithm).map_err(|e| match e {
            AsideError::MissingFile(p) => format!("cannot add {}: no such file", p.display()),
            other => other.to_string(),
        })?;
        let action = if aside.upsert(record.clone()).is_some() {
            "updated"
        } else {
            "added"
        };
        tracing::debug!("{action} {} in {}", file.display(), manifest.display());
        added.push((action, record));
    }
    save_manifest(&aside, manifest)?;

    if json {
        let payload: Vec<_> = added
            .iter()
            .map(|(action, r)| {
                serde_json::json!({
                    "action": action,
                    "filename": r.filename,
                    "size": r.size,
                    "digest": r.digest,
                    "algorithm": r.algorithm,
                })
            })
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else {
        for (action, r) in &added {
            println!(
                "{action} {} ({} bytes, {} {})",
                r.filename.display(),
                r.size,
                r.algorithm,
                r.digest
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
