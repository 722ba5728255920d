use super::{colorize_status, json_pretty, open_manifest, EXIT_MISSING, EXIT_SUCCESS};
use std::path::Path;

pub fn run(manifest: &Path, json: bool) -> Result<u8, String> {
    let aside = open_manifest(manifest)?;
    let statuses: Vec<_> = aside
        .iter()
        .map(|r| (r, if r.present() { "present" } else { "missing" }))
        .collect();
    let missing = statuses.iter().filter(|(_, s)| *s == "missing").count();

    if json {
        let payload = serde_json::json!({
            "tracked": statuses.len(),
            "missing": missing,
            "files": statuses
                .iter()
                .map(|(r, s)| serde_json::json!({"filename": r.filename, "status": s}))
                .collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for (r, s) in &statuses {
            println!("{:<10} {}", colorize_status(s), r.filename.display());
        }
        if missing > 0 {
            println!("{missing} of {} file(s) missing; run `lookaside fetch`", statuses.len());
        }
    }

    if missing == 0 {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_MISSING)
    }
}
