//! Location of the remote lookaside store and the credentials for it.
//!
//! The effective remote comes from, in order: an explicit URL, the
//! `LOOKASIDE_REMOTE` environment variable, then the saved config file at
//! `$XDG_CONFIG_HOME/lookaside/remote.json` (or `~/.config/lookaside/remote.json`).
//! `LOOKASIDE_TOKEN` overrides whatever token that source carries.

use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const URL_ENV: &str = "LOOKASIDE_REMOTE";
pub const TOKEN_ENV: &str = "LOOKASIDE_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl RemoteConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            auth_token: None,
        }
    }

    /// Like [`RemoteConfig::new`], but only accepts `http://` and `https://` URLs with a host.
    pub fn parse(url: &str) -> Result<Self, RemoteError> {
        let url = url.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| {
                RemoteError::Config(format!(
                    "remote URL must start with http:// or https://: {url}"
                ))
            })?;
        if rest.trim_start_matches('/').is_empty() || rest.starts_with('/') {
            return Err(RemoteError::Config(format!("remote URL has no host: {url}")));
        }
        Ok(Self::new(url))
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    /// The token with all but its last four characters masked, for display.
    pub fn masked_token(&self) -> Option<String> {
        self.auth_token.as_deref().map(|token| {
            let chars: Vec<char> = token.chars().collect();
            let keep = chars.len().saturating_sub(4).max(chars.len().min(4) / 2);
            let tail: String = chars[keep..].iter().collect();
            format!("{}{tail}", "*".repeat(keep))
        })
    }

    /// Path of the saved config, from `XDG_CONFIG_HOME` or `HOME`.
    pub fn default_path() -> Result<PathBuf, RemoteError> {
        config_path_from(|key| std::env::var(key).ok())
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            RemoteError::Config(format!("invalid remote config {}: {e}", path.display()))
        })?;
        config.url = config.url.trim_end_matches('/').to_owned();
        Ok(config)
    }

    /// Write the config atomically, creating parent directories.
    ///
    /// On Unix the file ends up readable by the owner only, since it may hold a token.
    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        content.push('\n');

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RemoteError::Io(e.error))?;
        tracing::debug!("saved remote config to {}", path.display());
        Ok(())
    }

    /// The remote to use when `url` may or may not have been given explicitly.
    pub fn resolve(url: Option<&str>) -> Result<Self, RemoteError> {
        let path = Self::default_path().ok();
        Self::resolve_with(url, |key| std::env::var(key).ok(), path.as_deref())
    }

    /// [`RemoteConfig::resolve`] with the environment and config path supplied by the caller.
    pub fn resolve_with(
        url: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
        config_path: Option<&Path>,
    ) -> Result<Self, RemoteError> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let mut config = if let Some(url) = url {
            Self::parse(url)?
        } else if let Some(url) = env(URL_ENV) {
            tracing::debug!("remote from {URL_ENV}");
            Self::parse(&url)?
        } else {
            match config_path {
                Some(path) if path.is_file() => {
                    tracing::debug!("remote from {}", path.display());
                    Self::load(path)?
                }
                _ => {
                    return Err(RemoteError::Config(format!(
                        "no remote configured (set {URL_ENV} or save a remote config)"
                    )))
                }
            }
        };
        if let Some(token) = env(TOKEN_ENV) {
            config.auth_token = Some(token);
        }
        Ok(config)
    }
}

fn config_path_from(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf, RemoteError> {
    let base = match env("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => env("HOME")
            .filter(|v| !v.is_empty())
            .map(|home| PathBuf::from(home).join(".config"))
            .ok_or_else(|| {
                RemoteError::Config("neither XDG_CONFIG_HOME nor HOME is set".to_owned())
            })?,
    };
    Ok(base.join("lookaside").join("remote.json"))
}
