//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use splat_assets::{
    AssetConfig, CompressionLevel, ConfigError, Format, LoadOptions, Scale, TransformConfig,
};

/// Origin used for root-relative URLs when fetching over HTTP.
const DEFAULT_ORIGIN: &str = "http://localhost:8080";

#[derive(Parser, Debug)]
#[command(about = "Load splat assets and report what was loaded")]
pub struct Cli {
    /// Asset URLs. Defaults to the configured default asset.
    pub urls: Vec<String>,

    /// JSON config file; flags override its fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Prefix for relative asset URLs.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Read assets from this directory instead of over HTTP.
    #[arg(long, conflicts_with = "origin")]
    pub root: Option<PathBuf>,

    /// Scheme and host for root-relative URLs.
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// Compress loaded assets on the background worker.
    #[arg(long)]
    pub compress: bool,

    /// Compression level (low, medium, high).
    #[arg(long)]
    pub level: Option<CompressionLevel>,

    /// Compression format (geometry, lz, gzip, deflate). Chosen per asset if unset.
    #[arg(long)]
    pub format: Option<Format>,

    /// Cap on loads running at once.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Load one asset at a time, in order.
    #[arg(long)]
    pub sequential: bool,

    /// Preload: report failures instead of stopping at the first one.
    #[arg(long)]
    pub preload: bool,

    /// Uniform scale applied to geometry.
    #[arg(long)]
    pub scale: Option<f32>,

    /// Recompute bounds after loading.
    #[arg(long)]
    pub optimize: bool,
}

impl Cli {
    /// The config file (or defaults) with flag overrides applied.
    pub fn config(&self) -> Result<AssetConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AssetConfig::from_file(path)?,
            None => AssetConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(level) = self.level {
            config.compression.level = level;
        }
        if self.max_concurrent.is_some() {
            config.max_concurrent_loads = self.max_concurrent;
        }
        if self.preload {
            config.preload = true;
        }
        if !self.compress {
            config.compression.enabled = false;
        }
        Ok(config)
    }

    pub fn load_options(&self) -> LoadOptions {
        let transform = TransformConfig {
            scale: self.scale.map(Scale::Uniform),
            optimize: self.optimize,
            ..TransformConfig::default()
        };

        LoadOptions {
            compress: self.compress,
            compression_level: self.level,
            compression_format: self.format,
            transform: (!transform.is_identity()).then_some(transform),
            ..LoadOptions::default()
        }
    }

    /// The requested URLs, or the default asset if none were given.
    pub fn urls(&self, config: &AssetConfig) -> Vec<String> {
        if self.urls.is_empty() {
            vec![config.default_asset.clone()]
        } else {
            self.urls.clone()
        }
    }
}
