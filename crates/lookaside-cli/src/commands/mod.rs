pub mod add;
pub mod completions;
pub mod fetch;
pub mod list;
pub mod remote;
pub mod remove;
pub mod status;
pub mod verify;

use indicatif::{ProgressBar, ProgressStyle};
use lookaside_core::{AsideError, AsideFile, ManifestFormat};
use lookaside_remote::{HttpBackend, RemoteConfig, RemoteError};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_VERIFY_FAILED: u8 = 3;
pub const EXIT_MISSING: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "ok" | "present" | "available" => Style::new().green().apply_to(status).to_string(),
        "missing" => Style::new().yellow().bold().apply_to(status).to_string(),
        "size mismatch" | "digest mismatch" | "not on remote" => {
            Style::new().red().apply_to(status).to_string()
        }
        other => other.to_owned(),
    }
}

/// Open the manifest, reporting every failure as a manifest error.
pub fn open_manifest(path: &Path) -> Result<AsideFile, String> {
    AsideFile::open(path, ManifestFormat::Json).map_err(|e| manifest_error(path, &e))
}

/// Open the manifest, or start an empty one if the file does not exist yet.
pub fn open_or_create_manifest(path: &Path) -> Result<AsideFile, String> {
    if path.exists() {
        open_manifest(path)
    } else {
        Ok(AsideFile::new())
    }
}

pub fn save_manifest(aside: &AsideFile, path: &Path) -> Result<(), String> {
    aside
        .save(path, ManifestFormat::Json)
        .map_err(|e| manifest_error(path, &e))
}

fn manifest_error(path: &Path, e: &AsideError) -> String {
    match e {
        AsideError::Codec(_) => format!("{e} ({})", path.display()),
        AsideError::MissingFile(_) => {
            format!("manifest error: {} does not exist", path.display())
        }
        other => format!("manifest error: {}: {other}", path.display()),
    }
}

/// Render a core error raised while checking artifacts.
pub fn artifact_error(e: &AsideError) -> String {
    match e {
        AsideError::MissingFile(path) => format!(
            "missing file: {} (run `lookaside fetch` to retrieve it)",
            path.display()
        ),
        other => other.to_string(),
    }
}

/// Build the HTTP backend from `--remote`, `LOOKASIDE_REMOTE`, or the saved remote config.
pub fn make_remote_backend(remote_url: Option<&str>) -> Result<HttpBackend, String> {
    let config = RemoteConfig::resolve(remote_url).map_err(|e| match e {
        RemoteError::Config(msg) if remote_url.is_none() => {
            format!("{msg}; pass --remote or run `lookaside remote set <url>`")
        }
        other => other.to_string(),
    })?;
    tracing::debug!("using remote {}", config.url);
    Ok(HttpBackend::new(config))
}
