//! Registry credentials from a Docker `config.json`.
//!
//! Reads the `auths` section written by `docker login`. Credential helpers
//! (`credsStore`, `credHelpers`) are not consulted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use bp_rename_core::error::{RenameError, Result};
use serde::Deserialize;

use super::registry::RegistryAuth;

/// One `auths` entry.
#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// The parts of `config.json` we read.
#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

/// Resolves credentials per registry.
///
/// Lookup order: the Docker config file, then `REGISTRY_USERNAME` /
/// `REGISTRY_PASSWORD`, then anonymous.
#[derive(Debug, Clone, Default)]
pub struct DockerKeychain {
    path: Option<PathBuf>,
}

impl DockerKeychain {
    /// Keychain reading the given `config.json`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Keychain without a config file (environment or anonymous only).
    pub fn without_file() -> Self {
        Self { path: None }
    }

    /// Default Docker config location: `$DOCKER_CONFIG/config.json`, else
    /// `~/.docker/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("DOCKER_CONFIG") {
            return Some(PathBuf::from(dir).join("config.json"));
        }
        dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Credentials to use for `registry`.
    pub fn resolve(&self, registry: &str) -> Result<RegistryAuth> {
        if let Some((username, password)) = self.lookup(registry)? {
            tracing::debug!(registry, "Using credentials from Docker config");
            return Ok(RegistryAuth::basic(username, password));
        }
        Ok(RegistryAuth::from_env())
    }

    /// Look up `(username, password)` for a registry in the config file.
    pub fn lookup(&self, registry: &str) -> Result<Option<(String, String)>> {
        let file = self.load()?;
        let wanted = normalize_registry(registry);

        let Some(entry) = file
            .auths
            .iter()
            .find(|(key, _)| normalize_registry(key) == wanted)
            .map(|(_, entry)| entry)
        else {
            return Ok(None);
        };

        if let Some(encoded) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
            return decode_auth(encoded).map(Some);
        }

        match (&entry.username, &entry.password) {
            (Some(u), Some(p)) => Ok(Some((u.clone(), p.clone()))),
            _ => Ok(None),
        }
    }

    /// Load the config file. Returns empty if unset or not found.
    fn load(&self) -> Result<DockerConfigFile> {
        let Some(path) = &self.path else {
            return Ok(DockerConfigFile::default());
        };
        if !path.exists() {
            return Ok(DockerConfigFile::default());
        }

        let data = std::fs::read_to_string(path).map_err(|e| {
            RenameError::ConfigError(format!(
                "Failed to read Docker config {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            RenameError::ConfigError(format!(
                "Failed to parse Docker config {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Decode a base64 `user:password` auth string.
fn decode_auth(encoded: &str) -> Result<(String, String)> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| RenameError::ConfigError(format!("Invalid auth entry: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| RenameError::ConfigError(format!("Invalid auth entry: {}", e)))?;

    text.split_once(':')
        .map(|(u, p)| (u.to_string(), p.to_string()))
        .ok_or_else(|| RenameError::ConfigError("Auth entry is not user:password".to_string()))
}

/// Normalize registry keys: drop scheme and path, lowercase, and fold the
/// Docker Hub aliases into "index.docker.io".
fn normalize_registry(registry: &str) -> String {
    let r = registry.trim().to_lowercase();
    let r = r
        .strip_prefix("https://")
        .or_else(|| r.strip_prefix("http://"))
        .unwrap_or(&r);
    let host = r.split('/').next().unwrap_or(r);

    match host {
        "docker.io" | "registry-1.docker.io" | "index.docker.io" => "index.docker.io".to_string(),
        other => other.to_string(),
    }
}
