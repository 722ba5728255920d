use super::{json_pretty, open_manifest, save_manifest, EXIT_FAILURE, EXIT_SUCCESS};
use std::path::{Path, PathBuf};

pub fn run(manifest: &Path, files: &[PathBuf], json: bool) -> Result<u8, String> {
    let mut aside = open_manifest(manifest)?;

    let mut removed = Vec::new();
    let mut untracked = Vec::new();
    for file in files {
        match aside.remove(file) {
            Some(record) => removed.push(record.filename),
            None => untracked.push(file.clone()),
        }
    }
    if !removed.is_empty() {
        save_manifest(&aside, manifest)?;
    }

    if json {
        let payload = serde_json::json!({
            "removed": removed,
            "untracked": untracked,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for f in &removed {
            println!("removed {}", f.display());
        }
        for f in &untracked {
            eprintln!("warning: {} is not tracked", f.display());
        }
    }

    if untracked.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
