//! Async loading, caching, and background compression of splat assets.
//!
//! This crate fetches point-cloud, mesh, texture, and data assets, caches
//! them per URL and load options, and optionally shrinks them on a
//! background compression worker.
//!
//! # Design principles
//!
//! - **Coalesced**: concurrent loads of the same asset share one fetch and
//!   one `Arc<Asset>`
//! - **Best-effort compression**: a failed or missing compression service
//!   never fails a load
//! - **Message passing**: the compression worker shares no memory with the
//!   manager; jobs are correlated by id
//!
//! # Example
//!
//! ```ignore
//! use splat_assets::{AssetManager, FileSource, LoadOptions, TransformConfig};
//!
//! let manager = AssetManager::builder(FileSource::new("public")).build();
//!
//! let options = LoadOptions::compressed().with_transform(TransformConfig {
//!     optimize: true,
//!     ..TransformConfig::default()
//! });
//! let banana = manager.load_asset("splats/banana.ply", &options).await?;
//! println!("{:?}", banana.attribute_names());
//! ```

mod asset;
mod cancel;
pub mod compress;
mod config;
mod error;
mod events;
pub mod loader;
mod manager;
pub mod service;
pub mod source;
mod transform;

pub use asset::{Asset, Bounds, CompressedBytes, CompressionReport, Payload, Texture};
pub use cancel::CancellationToken;
pub use compress::{Compressor, Compressors, Format, select_format};
pub use config::{AssetConfig, CompressionConfig};
pub use error::{CompressionError, ConfigError, Error, LoadError, Result};
pub use events::{AssetEvent, EventBus, ProgressReporter};
pub use loader::{Loader, LoaderKind, LoaderRegistry, StandardLoader};
pub use manager::{
    AssetManager, AssetManagerBuilder, AssetState, CacheStats, LoadMode, LoadOptions,
    PreloadRequest, PreloadSummary, cache_key,
};
pub use service::{CompressOutcome, CompressionService, JobHandler, Optimizer, Reply};
#[cfg(not(target_family = "wasm"))]
pub use source::{FileSource, HttpSource};
pub use source::{MemorySource, Source};
pub use transform::{Scale, TransformConfig};

// Re-export codec types for convenience.
pub use splat_codec::{CompressionLevel, GeometryBuffer};
