//! Configuration for the asset manager.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use splat_codec::CompressionLevel;

use crate::error::ConfigError;

/// Default prefix for relative asset URLs.
const DEFAULT_BASE_URL: &str = "/assets";

/// Asset loaded by viewers when nothing else is requested.
const DEFAULT_ASSET: &str = "splats/banana.ply";

/// How long to wait for the compression service before giving up.
const DEFAULT_COMPRESSION_TIMEOUT_MS: u64 = 30_000;

/// Settings for [`AssetManager`](crate::AssetManager).
///
/// Every field has a default, so a config file only needs the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Prefix for URLs that do not start with `http`.
    pub base_url: String,
    /// The asset a viewer loads on startup.
    pub default_asset: String,
    /// Whether [`preload_assets`](crate::AssetManager::preload_assets) does anything.
    pub preload: bool,
    /// Cap on loads running at once. `None` means unbounded.
    pub max_concurrent_loads: Option<usize>,
    /// Background compression settings.
    pub compression: CompressionConfig,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_asset: DEFAULT_ASSET.to_string(),
            preload: true,
            max_concurrent_loads: None,
            compression: CompressionConfig::default(),
        }
    }
}

/// Settings for the background compression service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Whether to start the service at all.
    pub enabled: bool,
    /// Level used when a load does not specify one.
    pub level: CompressionLevel,
    /// How long a job may take before the caller stops waiting.
    pub timeout_ms: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: CompressionLevel::Medium,
            timeout_ms: DEFAULT_COMPRESSION_TIMEOUT_MS,
        }
    }
}

impl CompressionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AssetConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Turn a requested URL into the URL handed to the source.
    ///
    /// URLs starting with `http` are used as-is; anything else is joined
    /// onto [`base_url`](Self::base_url).
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http") || self.base_url.is_empty() {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}
