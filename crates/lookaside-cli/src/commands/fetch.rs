use super::{
    colorize_status, json_pretty, make_remote_backend, open_manifest, spin_fail, spin_ok, spinner,
    EXIT_MISSING, EXIT_SUCCESS,
};
use lookaside_core::AsideFile;
use lookaside_remote::{check_missing, fetch_missing, RemoteBackend};
use std::path::Path;

pub fn run(
    manifest: &Path,
    remote_url: Option<&str>,
    dry_run: bool,
    json: bool,
) -> Result<u8, String> {
    let aside = open_manifest(manifest)?;
    if aside.present() {
        if json {
            let payload = serde_json::json!({"fetched": 0, "skipped": aside.len(), "bytes": 0});
            println!("{}", json_pretty(&payload)?);
        } else {
            println!("all {} file(s) present, nothing to fetch", aside.len());
        }
        return Ok(EXIT_SUCCESS);
    }

    let backend = make_remote_backend(remote_url)?;
    if dry_run {
        return report_availability(&aside, &backend, json);
    }
    let pb = spinner("fetching missing files…");
    let result = fetch_missing(&aside, &backend).map_err(|e| {
        spin_fail(&pb, "fetch failed");
        format!("fetch error: {e}")
    })?;
    spin_ok(&pb, "fetch complete");

    if json {
        let payload = serde_json::json!({
            "fetched": result.fetched,
            "skipped": result.skipped,
            "bytes": result.bytes,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "fetched {} file(s), {} bytes; {} already present",
            result.fetched, result.bytes, result.skipped
        );
    }
    Ok(EXIT_SUCCESS)
}

/// Ask the remote about each missing file without downloading anything.
fn report_availability(
    aside: &AsideFile,
    backend: &dyn RemoteBackend,
    json: bool,
) -> Result<u8, String> {
    let report = check_missing(aside, backend).map_err(|e| format!("fetch error: {e}"))?;
    let unavailable = report.iter().filter(|a| !a.on_remote).count();

    if json {
        let files: Vec<_> = report
            .iter()
            .map(|a| {
                serde_json::json!({
                    "filename": a.record.filename,
                    "available": a.on_remote,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "missing": report.len(),
            "unavailable": unavailable,
            "files": files,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for a in &report {
            let status = if a.on_remote { "available" } else { "not on remote" };
            println!("{:<14} {}", colorize_status(status), a.record.filename.display());
        }
    }

    if unavailable == 0 {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_MISSING)
    }
}
