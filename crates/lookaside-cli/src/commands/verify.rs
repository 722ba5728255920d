use super::{
    artifact_error, colorize_status, json_pretty, open_manifest, EXIT_SUCCESS, EXIT_VERIFY_FAILED,
};
use lookaside_core::RecordCheck;
use std::path::Path;

pub fn run(manifest: &Path, json: bool) -> Result<u8, String> {
    let aside = open_manifest(manifest)?;
    let report = aside.verify().map_err(|e| artifact_error(&e))?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!(
            "verify: {}/{} files passed",
            report.passed, report.checked
        );
        for f in &report.failed {
            let (status, detail) = match &f.check {
                RecordCheck::SizeMismatch { expected, actual } => (
                    "size mismatch",
                    format!("expected {expected} bytes, found {actual}"),
                ),
                RecordCheck::DigestMismatch { expected, actual } => (
                    "digest mismatch",
                    format!("expected {expected}, computed {actual}"),
                ),
                RecordCheck::Valid => continue,
            };
            println!(
                "  {} {}: {detail}",
                colorize_status(status),
                f.filename.display()
            );
        }
    }

    if report.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_VERIFY_FAILED)
    }
}
