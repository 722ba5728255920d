use super::{json_pretty, EXIT_SUCCESS};
use lookaside_remote::RemoteConfig;
use std::path::Path;

/// Save `url` (and optionally a token) as the default remote.
pub fn set(config_path: &Path, url: &str, token: Option<&str>, json: bool) -> Result<u8, String> {
    let mut config = RemoteConfig::parse(url).map_err(|e| e.to_string())?;
    if let Some(token) = token {
        config = config.with_token(token);
    }
    config
        .save(config_path)
        .map_err(|e| format!("cannot save remote config {}: {e}", config_path.display()))?;

    if json {
        let payload = serde_json::json!({
            "url": config.url,
            "token": config.masked_token(),
            "config": config_path,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("remote set to {} ({})", config.url, config_path.display());
    }
    Ok(EXIT_SUCCESS)
}

/// Print the remote `fetch` would use without `--remote`.
pub fn show(config_path: &Path, json: bool) -> Result<u8, String> {
    let config = RemoteConfig::resolve_with(
        None,
        |key| std::env::var(key).ok(),
        Some(config_path),
    )
    .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "url": config.url,
            "token": config.masked_token(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("url:   {}", config.url);
        println!(
            "token: {}",
            config.masked_token().as_deref().unwrap_or("(none)")
        );
    }
    Ok(EXIT_SUCCESS)
}

/// Delete the saved remote config. Not an error if there is none.
pub fn unset(config_path: &Path, json: bool) -> Result<u8, String> {
    let removed = match std::fs::remove_file(config_path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(format!(
                "cannot remove remote config {}: {e}",
                config_path.display()
            ))
        }
    };

    if json {
        println!("{}", json_pretty(&serde_json::json!({ "removed": removed }))?);
    } else if removed {
        println!("removed {}", config_path.display());
    } else {
        println!("no saved remote");
    }
    Ok(EXIT_SUCCESS)
}

pub fn config_path() -> Result<std::path::PathBuf, String> {
    RemoteConfig::default_path().map_err(|e| e.to_string())
}
