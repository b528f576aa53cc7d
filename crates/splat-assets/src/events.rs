//! Lifecycle notifications for UI and telemetry consumers.

use tokio::sync::broadcast;

use crate::error::Error;

/// Events buffered per subscriber before old ones are dropped.
const EVENT_CAPACITY: usize = 256;

/// Something that happened while loading assets.
#[derive(Debug, Clone)]
pub enum AssetEvent {
    /// A loader was invoked for this URL.
    LoadStarted { url: String },
    /// Bytes arrived from the source.
    LoadProgress {
        url: String,
        loaded: u64,
        /// Total size, if the source knows it.
        total: Option<u64>,
        /// `loaded / total * 100`, if the total is known and non-zero.
        percentage: Option<f64>,
    },
    /// The asset was loaded (and compressed/transformed if requested).
    LoadCompleted { url: String, size: usize },
    /// The loader failed.
    LoadFailed { url: String, error: Error },
    /// One more asset of a [`load_multiple`](crate::AssetManager::load_multiple)
    /// batch has finished.
    BatchProgress {
        loaded: usize,
        total: usize,
        percentage: f64,
    },
    /// The cache was cleared.
    CacheCleared,
}

/// Fan-out channel for [`AssetEvent`]s.
///
/// Emitting never blocks and never fails; events are simply dropped when no
/// one is subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AssetEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Receive every event emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AssetEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports byte progress for one URL.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    bus: Option<EventBus>,
    url: String,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(bus: EventBus, url: impl Into<String>) -> Self {
        Self {
            bus: Some(bus),
            url: url.into(),
        }
    }

    /// A reporter that discards progress.
    #[must_use]
    pub fn silent(url: impl Into<String>) -> Self {
        Self {
            bus: None,
            url: url.into(),
        }
    }

    pub fn report(&self, loaded: u64, total: Option<u64>) {
        let Some(bus) = &self.bus else {
            return;
        };

        #[allow(clippy::cast_precision_loss)]
        let percentage = total
            .filter(|&total| total > 0)
            .map(|total| loaded as f64 / total as f64 * 100.0);

        bus.emit(AssetEvent::LoadProgress {
            url: self.url.clone(),
            loaded,
            total,
            percentage,
        });
    }
}
