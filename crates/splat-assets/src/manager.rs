//! The asset manager: cache, request coalescing, and the load pipeline.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use splat_codec::CompressionLevel;
use tokio::{
    sync::{Semaphore, broadcast, watch},
    task::JoinSet,
};

use crate::{
    asset::{Asset, CompressionReport},
    cancel::CancellationToken,
    compress::Format,
    config::AssetConfig,
    error::{CompressionError, Error, LoadError, Result},
    events::{AssetEvent, EventBus, ProgressReporter},
    loader::{Loader, LoaderRegistry},
    service::CompressionService,
    source::Source,
    transform::TransformConfig,
};

/// Options for a single load.
///
/// Every serialized field is part of the cache key, so two loads of the
/// same URL with different options are cached separately. `force_reload`
/// and `priority` only control how a load runs and are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Route the loaded payload through the compression service.
    pub compress: bool,
    /// Overrides the configured compression level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<CompressionLevel>,
    /// `None` selects the format from the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformConfig>,
    /// Ignore any cached result.
    #[serde(skip)]
    pub force_reload: bool,
    /// Scheduling hint. Carried through to logs; does not affect ordering.
    #[serde(skip)]
    pub priority: i32,
}

impl LoadOptions {
    #[must_use]
    pub fn compressed() -> Self {
        Self {
            compress: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: TransformConfig) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn force_reload(mut self) -> Self {
        self.force_reload = true;
        self
    }
}

/// The cache key for a resolved URL and its options.
#[must_use]
pub fn cache_key(url: &str, options: &LoadOptions) -> String {
    let options = serde_json::to_string(options).unwrap_or_default();
    format!("{url}_{options}")
}

/// How [`AssetManager::load_multiple`] schedules its loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// All loads at once.
    #[default]
    Concurrent,
    /// One after another, in input order.
    Sequential,
}

/// Lifecycle of one cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Cache occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub asset_count: usize,
    /// Sum of [`Asset::byte_size`] over cached assets.
    pub total_size: usize,
    /// `total_size / asset_count`, or 0 when empty.
    pub average_size: f64,
}

/// One entry for [`AssetManager::preload_assets`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreloadRequest {
    pub url: String,
    pub options: LoadOptions,
}

impl From<&str> for PreloadRequest {
    fn from(url: &str) -> Self {
        Self {
            url: url.to_string(),
            options: LoadOptions::default(),
        }
    }
}

/// What a preload achieved.
#[derive(Debug, Clone, Default)]
pub struct PreloadSummary {
    pub loaded: usize,
    pub failed: Vec<Error>,
}

/// Outcome shared between the leader of a load and every caller that joined it.
type Shared = Option<Result<Arc<Asset>>>;

#[derive(Default)]
struct State {
    cache: HashMap<String, Arc<Asset>>,
    in_flight: HashMap<String, watch::Receiver<Shared>>,
    failed: HashSet<String>,
    /// Bumped by `shutdown`; loads started before it never land in the cache.
    generation: u64,
}

struct Inner {
    config: AssetConfig,
    source: Arc<dyn Source>,
    loaders: LoaderRegistry,
    compression: Option<CompressionService>,
    events: EventBus,
    limiter: Option<Semaphore>,
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Loads, caches, and optionally compresses assets.
///
/// Cloning is cheap; clones share the cache. Concurrent loads of the same
/// URL and options share one fetch and receive the same `Arc<Asset>`.
///
/// # Example
///
/// ```ignore
/// let manager = AssetManager::builder(FileSource::new("public")).build();
/// let options = LoadOptions::default().with_transform(TransformConfig {
///     optimize: true,
///     ..TransformConfig::default()
/// });
/// let banana = manager.load_asset("splats/banana.ply", &options).await?;
/// ```
#[derive(Clone)]
pub struct AssetManager {
    inner: Arc<Inner>,
}

/// How the builder obtains a compression service.
enum CompressionSetup {
    FromConfig,
    Disabled,
    Service(CompressionService),
}

/// Builder for [`AssetManager`].
pub struct AssetManagerBuilder {
    config: AssetConfig,
    source: Arc<dyn Source>,
    loaders: LoaderRegistry,
    compression: CompressionSetup,
}

impl AssetManagerBuilder {
    #[must_use]
    pub fn config(mut self, config: AssetConfig) -> Self {
        self.config = config;
        self
    }

    /// Never start a compression service.
    #[must_use]
    pub fn without_compression(mut self) -> Self {
        self.compression = CompressionSetup::Disabled;
        self
    }

    /// Use an already running service instead of spawning one.
    #[must_use]
    pub fn compression_service(mut self, service: CompressionService) -> Self {
        self.compression = CompressionSetup::Service(service);
        self
    }

    /// Replace the loader registry.
    #[must_use]
    pub fn loaders(mut self, loaders: LoaderRegistry) -> Self {
        self.loaders = loaders;
        self
    }

    /// Add a loader on top of the current registry.
    #[must_use]
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.register(loader);
        self
    }

    /// Build the manager.
    ///
    /// If the compression service cannot be started the manager still
    /// works; compression is skipped.
    #[must_use]
    pub fn build(self) -> AssetManager {
        self.build_with(CompressionService::spawn)
    }

    fn build_with(
        self,
        spawn: impl FnOnce(Duration) -> std::result::Result<CompressionService, CompressionError>,
    ) -> AssetManager {
        let compression = match self.compression {
            CompressionSetup::Disabled => None,
            CompressionSetup::Service(service) => Some(service),
            CompressionSetup::FromConfig if !self.config.compression.enabled => None,
            CompressionSetup::FromConfig => {
                match spawn(self.config.compression.timeout()) {
                    Ok(service) => Some(service),
                    Err(e) => {
                        tracing::warn!(error = %e, "continuing without compression");
                        None
                    }
                }
            }
        };

        let limiter = self
            .config
            .max_concurrent_loads
            .map(|n| Semaphore::new(n.max(1)));

        AssetManager {
            inner: Arc::new(Inner {
                config: self.config,
                source: self.source,
                loaders: self.loaders,
                compression,
                events: EventBus::new(),
                limiter,
                state: Mutex::new(State::default()),
            }),
        }
    }
}

impl AssetManager {
    /// Start building a manager that fetches from `source`.
    #[must_use]
    pub fn builder(source: impl Source + 'static) -> AssetManagerBuilder {
        AssetManagerBuilder {
            config: AssetConfig::default(),
            source: Arc::new(source),
            loaders: LoaderRegistry::standard(),
            compression: CompressionSetup::FromConfig,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AssetConfig {
        &self.inner.config
    }

    /// Whether a compression service is attached.
    #[must_use]
    pub fn has_compression(&self) -> bool {
        self.inner.compression.is_some()
    }

    /// Receive lifecycle events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.inner.events.subscribe()
    }

    /// Load an asset, or return it from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if no loader handles the URL's
    /// extension and [`Error::LoadFailure`] if fetching or decoding fails.
    /// Compression problems never fail a load.
    pub async fn load_asset(&self, url: &str, options: &LoadOptions) -> Result<Arc<Asset>> {
        self.load(url, options, None).await
    }

    /// Like [`load_asset`](Self::load_asset), giving up when `cancel` fires.
    ///
    /// Cancelling the caller that started a load cancels it for every caller
    /// that joined it. Cancelling a caller that joined only stops that
    /// caller from waiting.
    ///
    /// # Errors
    ///
    /// As [`load_asset`](Self::load_asset), plus [`Error::Cancelled`].
    pub async fn load_asset_cancellable(
        &self,
        url: &str,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<Arc<Asset>> {
        self.load(url, options, Some(cancel)).await
    }

    async fn load(
        &self,
        url: &str,
        options: &LoadOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<Arc<Asset>> {
        let inner: &Inner = &self.inner;
        let resolved = inner.config.resolve_url(url);
        let key = cache_key(&resolved, options);

        let loader = inner.loaders.resolve(&resolved).map_err(|extension| {
            let error = Error::UnsupportedFormat {
                url: url.to_string(),
                extension,
            };
            inner.events.emit(AssetEvent::LoadFailed {
                url: url.to_string(),
                error: error.clone(),
            });
            error
        })?;

        let role = {
            let mut state = inner.state();
            if !options.force_reload {
                if let Some(asset) = state.cache.get(&key) {
                    tracing::debug!(url, "cache hit");
                    return Ok(Arc::clone(asset));
                }
            }

            if let Some(rx) = state.in_flight.get(&key) {
                Role::Follower(rx.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                state.in_flight.insert(key.clone(), rx.clone());
                Role::Leader(InFlight {
                    inner,
                    generation: state.generation,
                    key,
                    tx,
                    rx,
                })
            }
        };

        match role {
            Role::Follower(rx) => {
                tracing::debug!(url, "joining in-flight load");
                tokio::select! {
                    biased;
                    () = cancelled(cancel) => Err(Error::Cancelled { url: url.to_string() }),
                    result = wait_for_leader(rx, url) => result,
                }
            }
            Role::Leader(in_flight) => {
                let result = tokio::select! {
                    biased;
                    () = cancelled(cancel) => Err(Error::Cancelled { url: url.to_string() }),
                    result = self.run_pipeline(loader.as_ref(), url, &resolved, options) => result,
                };
                let result = result.map(Arc::new);

                if let Err(error) = &result {
                    tracing::warn!(url, %error, "load failed");
                    inner.events.emit(AssetEvent::LoadFailed {
                        url: url.to_string(),
                        error: error.clone(),
                    });
                }

                in_flight.settle(result.clone());
                result
            }
        }
    }

    /// Fetch, decode, compress, and transform one asset.
    async fn run_pipeline(
        &self,
        loader: &dyn Loader,
        url: &str,
        resolved: &str,
        options: &LoadOptions,
    ) -> Result<Asset> {
        let inner = &self.inner;

        let _permit = match &inner.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        tracing::debug!(url, resolved, priority = options.priority, "loading");
        inner.events.emit(AssetEvent::LoadStarted {
            url: url.to_string(),
        });

        let progress = ProgressReporter::new(inner.events.clone(), url);
        let mut asset = loader
            .load(inner.source.as_ref(), resolved, options, &progress)
            .await
            .map_err(|cause| Error::LoadFailure {
                url: url.to_string(),
                cause,
            })?;
        asset.url = url.to_string();

        if options.compress {
            self.compress_asset(&mut asset, options).await;
        }

        if let Some(transform) = &options.transform {
            transform.apply(&mut asset);
        }

        let size = asset.byte_size();
        tracing::debug!(url, size, "loaded");
        inner.events.emit(AssetEvent::LoadCompleted {
            url: url.to_string(),
            size,
        });

        Ok(asset)
    }

    /// Replace the payload with its compressed form, if the service allows.
    async fn compress_asset(&self, asset: &mut Asset, options: &LoadOptions) {
        let Some(service) = &self.inner.compression else {
            tracing::debug!(url = %asset.url, "compression unavailable, skipping");
            return;
        };

        let level = options
            .compression_level
            .unwrap_or(self.inner.config.compression.level);

        match service
            .compress(asset.payload.clone(), level, options.compression_format)
            .await
        {
            Ok(outcome) => {
                tracing::debug!(
                    url = %asset.url,
                    format = %outcome.format,
                    ratio = outcome.compression_ratio,
                    "compressed"
                );
                asset.compression = Some(CompressionReport {
                    format: outcome.format,
                    original_size: outcome.original_size,
                    compressed_size: outcome.compressed_size,
                    compression_ratio: outcome.compression_ratio,
                    compression_time_ms: outcome.compression_time_ms,
                });
                asset.payload = outcome.data;
            }
            Err(e) => {
                tracing::warn!(url = %asset.url, error = %e, "compression failed, keeping uncompressed asset");
            }
        }
    }

    /// Load several assets. Results are in input order.
    ///
    /// Emits [`AssetEvent::BatchProgress`] as each load finishes.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. In concurrent mode the remaining
    /// loads keep running and still populate the cache.
    pub async fn load_multiple<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: &LoadOptions,
        mode: LoadMode,
    ) -> Result<Vec<Arc<Asset>>> {
        let total = urls.len();
        let mut loaded = 0;
        let report = |loaded: usize| {
            #[allow(clippy::cast_precision_loss)]
            let percentage = loaded as f64 / total as f64 * 100.0;
            self.inner.events.emit(AssetEvent::BatchProgress {
                loaded,
                total,
                percentage,
            });
        };

        match mode {
            LoadMode::Sequential => {
                let mut assets = Vec::with_capacity(total);
                for url in urls {
                    assets.push(self.load_asset(url.as_ref(), options).await?);
                    loaded += 1;
                    report(loaded);
                }
                Ok(assets)
            }
            LoadMode::Concurrent => {
                let mut set = JoinSet::new();
                let mut task_urls = HashMap::new();
                for (i, url) in urls.iter().enumerate() {
                    let manager = self.clone();
                    let url = url.as_ref().to_string();
                    let options = options.clone();
                    let task_url = url.clone();
                    let handle =
                        set.spawn(async move { (i, manager.load_asset(&url, &options).await) });
                    task_urls.insert(handle.id(), task_url);
                }

                let mut slots: Vec<Option<Arc<Asset>>> = vec![None; total];
                while let Some(joined) = set.join_next().await {
                    let (i, result) = match joined {
                        Ok(pair) => pair,
                        Err(e) => {
                            let url = task_urls.remove(&e.id()).unwrap_or_default();
                            tracing::error!(url = %url, error = %e, "load task panicked");
                            set.detach_all();
                            return Err(Error::LoadFailure {
                                url,
                                cause: LoadError::Abandoned,
                            });
                        }
                    };
                    match result {
                        Ok(asset) => slots[i] = Some(asset),
                        Err(e) => {
                            set.detach_all();
                            return Err(e);
                        }
                    }
                    loaded += 1;
                    report(loaded);
                }

                Ok(slots.into_iter().flatten().collect())
            }
        }
    }

    /// Load a list of assets in the background of startup.
    ///
    /// Failures are logged and collected, never returned as errors. Does
    /// nothing when [`AssetConfig::preload`] is off.
    pub async fn preload_assets(&self, requests: &[PreloadRequest]) -> PreloadSummary {
        let mut summary = PreloadSummary::default();

        if !self.inner.config.preload {
            tracing::info!(count = requests.len(), "preloading disabled, skipping");
            return summary;
        }

        let mut set = JoinSet::new();
        for request in requests {
            let manager = self.clone();
            let request = request.clone();
            set.spawn(async move { manager.load_asset(&request.url, &request.options).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(_)) => summary.loaded += 1,
                Ok(Err(error)) => {
                    tracing::warn!(url = error.url(), %error, "preload failed");
                    summary.failed.push(error);
                }
                Err(e) => tracing::error!(error = %e, "preload task panicked"),
            }
        }

        tracing::info!(
            loaded = summary.loaded,
            failed = summary.failed.len(),
            "preload finished"
        );
        summary
    }

    /// Lifecycle state of a URL and options pair.
    #[must_use]
    pub fn asset_state(&self, url: &str, options: &LoadOptions) -> AssetState {
        let key = cache_key(&self.inner.config.resolve_url(url), options);
        let state = self.inner.state();
        if state.in_flight.contains_key(&key) {
            AssetState::Loading
        } else if state.cache.contains_key(&key) {
            AssetState::Loaded
        } else if state.failed.contains(&key) {
            AssetState::Failed
        } else {
            AssetState::Unloaded
        }
    }

    /// The cached asset for a URL and options pair, without loading.
    #[must_use]
    pub fn cached(&self, url: &str, options: &LoadOptions) -> Option<Arc<Asset>> {
        let key = cache_key(&self.inner.config.resolve_url(url), options);
        self.inner.state().cache.get(&key).cloned()
    }

    /// Drop every cached asset. In-flight loads are unaffected.
    pub fn clear_cache(&self) {
        {
            let mut state = self.inner.state();
            state.cache.clear();
            state.failed.clear();
        }
        tracing::debug!("cache cleared");
        self.inner.events.emit(AssetEvent::CacheCleared);
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        let state = self.inner.state();
        let asset_count = state.cache.len();
        let total_size = state.cache.values().map(|a| a.byte_size()).sum();
        #[allow(clippy::cast_precision_loss)]
        let average_size = if asset_count == 0 {
            0.0
        } else {
            total_size as f64 / asset_count as f64
        };
        CacheStats {
            asset_count,
            total_size,
            average_size,
        }
    }

    /// Stop the compression service and forget all cached and in-flight
    /// loads.
    ///
    /// Loads already running still finish for their callers, but their
    /// results are not cached. Later loads run without compression.
    pub fn shutdown(&self) {
        if let Some(service) = &self.inner.compression {
            service.shutdown();
        }
        let mut state = self.inner.state();
        state.cache.clear();
        state.in_flight.clear();
        state.failed.clear();
        state.generation += 1;
        tracing::debug!("asset manager shut down");
    }
}

impl std::fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("config", &self.inner.config)
            .field("loaders", &self.inner.loaders)
            .field("compression", &self.inner.compression)
            .finish_non_exhaustive()
    }
}

enum Role<'a> {
    Leader(InFlight<'a>),
    Follower(watch::Receiver<Shared>),
}

/// The leader's claim on an in-flight entry.
///
/// Dropping it without settling (the leader's future was dropped) removes
/// the entry, and joined callers see the load as abandoned.
struct InFlight<'a> {
    inner: &'a Inner,
    generation: u64,
    key: String,
    tx: watch::Sender<Shared>,
    rx: watch::Receiver<Shared>,
}

impl InFlight<'_> {
    fn settle(self, result: Result<Arc<Asset>>) {
        {
            let mut state = self.inner.state();
            self.release(&mut state);
            match &result {
                // Started before a shutdown; callers still get the result.
                _ if state.generation != self.generation => {}
                Ok(asset) => {
                    state.failed.remove(&self.key);
                    state.cache.insert(self.key.clone(), Arc::clone(asset));
                }
                Err(_) => {
                    state.failed.insert(self.key.clone());
                }
            }
        }
        self.tx.send_replace(Some(result));
    }

    /// Remove our entry, unless it has since been replaced.
    fn release(&self, state: &mut State) {
        if state
            .in_flight
            .get(&self.key)
            .is_some_and(|rx| rx.same_channel(&self.rx))
        {
            state.in_flight.remove(&self.key);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        self.release(&mut state);
    }
}

async fn wait_for_leader(mut rx: watch::Receiver<Shared>, url: &str) -> Result<Arc<Asset>> {
    let shared = match rx.wait_for(Option::is_some).await {
        Ok(value) => value.clone(),
        Err(_) => None,
    };
    shared.unwrap_or_else(|| {
        Err(Error::LoadFailure {
            url: url.to_string(),
            cause: LoadError::Abandoned,
        })
    })
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn manager() -> (AssetManager, MemorySource) {
        let source = MemorySource::new();
        let manager = AssetManager::builder(source.clone())
            .without_compression()
            .build();
        (manager, source)
    }

    #[test]
    fn test_cache_key_ignores_controls() {
        let plain = LoadOptions::default();
        let forced = LoadOptions {
            force_reload: true,
            priority: 7,
            ..LoadOptions::default()
        };
        assert_eq!(cache_key("/a.ply", &plain), cache_key("/a.ply", &forced));
        assert_ne!(
            cache_key("/a.ply", &plain),
            cache_key("/a.ply", &LoadOptions::compressed())
        );
        assert_ne!(cache_key("/a.ply", &plain), cache_key("/b.ply", &plain));
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (manager, source) = manager();
        let options = LoadOptions::default();
        source.insert("/assets/a.bin", vec![1, 2, 3]);

        assert_eq!(manager.asset_state("a.bin", &options), AssetState::Unloaded);
        manager.load_asset("a.bin", &options).await.unwrap();
        assert_eq!(manager.asset_state("a.bin", &options), AssetState::Loaded);

        assert!(manager.load_asset("missing.bin", &options).await.is_err());
        assert_eq!(
            manager.asset_state("missing.bin", &options),
            AssetState::Failed
        );

        manager.clear_cache();
        assert_eq!(manager.asset_state("a.bin", &options), AssetState::Unloaded);
    }

    #[tokio::test]
    async fn test_cache_stats() {
        let (manager, source) = manager();
        source.insert("/assets/a.bin", vec![0; 10]);
        source.insert("/assets/b.bin", vec![0; 30]);

        assert_eq!(manager.cache_stats(), CacheStats::default());

        let options = LoadOptions::default();
        manager.load_asset("a.bin", &options).await.unwrap();
        manager.load_asset("b.bin", &options).await.unwrap();

        let stats = manager.cache_stats();
        assert_eq!(stats.asset_count, 2);
        assert_eq!(stats.total_size, 40);
        assert!((stats.average_size - 20.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unsupported_format_leaves_state_clean() {
        let (manager, source) = manager();
        source.insert("/assets/model.fbx", vec![1]);
        let options = LoadOptions::default();

        let err = manager.load_asset("model.fbx", &options).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedFormat { ref extension, .. } if extension == "fbx"
        ));
        assert_eq!(
            manager.asset_state("model.fbx", &options),
            AssetState::Unloaded
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_disables_compression() {
        let source = MemorySource::new();
        source.insert("/assets/a.bin", vec![3; 64]);
        let manager = AssetManager::builder(source).build_with(|_| {
            Err(CompressionError::Unavailable {
                reason: "no threads".to_string(),
            })
        });
        assert!(!manager.has_compression());

        let asset = manager
            .load_asset("a.bin", &LoadOptions::compressed())
            .await
            .unwrap();
        assert_eq!(asset.payload, crate::asset::Payload::Bytes(vec![3; 64]));
        assert!(asset.compression.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_clears_everything() {
        let (manager, source) = manager();
        source.insert("/assets/a.bin", vec![1]);
        let options = LoadOptions::default();
        manager.load_asset("a.bin", &options).await.unwrap();

        manager.shutdown();
        assert_eq!(manager.cache_stats().asset_count, 0);

        // Still usable afterwards.
        manager.load_asset("a.bin", &options).await.unwrap();
    }
}
