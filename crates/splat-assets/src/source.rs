//! Byte sources that loaders fetch from.
//!
//! # Implementations
//!
//! - [`HttpSource`]: streams over HTTP with progress (native only)
//! - [`FileSource`]: reads from a local directory (native only)
//! - [`MemorySource`]: serves bytes from an in-memory map

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{error::LoadError, events::ProgressReporter};

/// Future type for source fetches.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, LoadError>> + Send + 'a>>;

/// Somewhere asset bytes come from.
///
/// URLs are passed after base URL resolution. Implementations report
/// progress through the given reporter as bytes arrive.
pub trait Source: Send + Sync {
    /// Fetch the full contents behind `url`.
    fn fetch<'a>(&'a self, url: &'a str, progress: &'a ProgressReporter) -> FetchFuture<'a>;
}

/// Strip any query string or fragment from a URL.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

#[cfg(not(target_family = "wasm"))]
pub use native::{FileSource, HttpSource};

#[cfg(not(target_family = "wasm"))]
mod native {
    use std::path::{Component, Path, PathBuf};

    use super::{FetchFuture, Source, strip_query};
    use crate::{error::LoadError, events::ProgressReporter};

    /// Fetches assets over HTTP.
    #[derive(Debug, Clone, Default)]
    pub struct HttpSource {
        http: reqwest::Client,
        origin: Option<String>,
    }

    impl HttpSource {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a custom HTTP client.
        #[must_use]
        pub fn with_client(http: reqwest::Client) -> Self {
            Self { http, origin: None }
        }

        /// Prefix for root-relative URLs such as `/assets/a.ply`.
        #[must_use]
        pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
            self.origin = Some(origin.into().trim_end_matches('/').to_string());
            self
        }

        fn absolute_url(&self, url: &str) -> Result<String, LoadError> {
            if url.starts_with("http://") || url.starts_with("https://") {
                return Ok(url.to_string());
            }
            match &self.origin {
                Some(origin) => Ok(format!("{origin}/{}", url.trim_start_matches('/'))),
                None => Err(LoadError::InvalidUrl {
                    url: url.to_string(),
                    reason: "relative url with no origin configured",
                }),
            }
        }

        async fn fetch_bytes(&self, url: &str, progress: &ProgressReporter) -> Result<Vec<u8>, LoadError> {
            let url = self.absolute_url(url)?;
            tracing::debug!(url, "fetching");

            let mut response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| LoadError::Http {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LoadError::NotFound { url });
            }
            if !status.is_success() {
                return Err(LoadError::HttpStatus {
                    url,
                    status: status.as_u16(),
                });
            }

            let total = response.content_length();
            let mut data = Vec::with_capacity(
                total.and_then(|t| usize::try_from(t).ok()).unwrap_or_default(),
            );

            while let Some(chunk) = response.chunk().await.map_err(|e| LoadError::Http {
                url: url.clone(),
                message: e.to_string(),
            })? {
                data.extend_from_slice(&chunk);
                progress.report(data.len() as u64, total);
            }

            Ok(data)
        }
    }

    impl Source for HttpSource {
        fn fetch<'a>(&'a self, url: &'a str, progress: &'a ProgressReporter) -> FetchFuture<'a> {
            Box::pin(self.fetch_bytes(url, progress))
        }
    }

    /// Reads assets from a directory on disk.
    ///
    /// URLs map onto paths below the root; `..` components are rejected.
    #[derive(Debug, Clone)]
    pub struct FileSource {
        root: PathBuf,
    }

    impl FileSource {
        #[must_use]
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        #[must_use]
        pub fn root(&self) -> &Path {
            &self.root
        }

        fn path_for(&self, url: &str) -> Result<PathBuf, LoadError> {
            let relative = Path::new(strip_query(url).trim_start_matches('/'));
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(LoadError::InvalidUrl {
                    url: url.to_string(),
                    reason: "path escapes the source root",
                });
            }
            Ok(self.root.join(relative))
        }

        async fn read(&self, url: &str, progress: &ProgressReporter) -> Result<Vec<u8>, LoadError> {
            let path = self.path_for(url)?;
            tracing::debug!(path = %path.display(), "reading");

            let data = tokio::fs::read(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LoadError::NotFound {
                        url: url.to_string(),
                    }
                } else {
                    LoadError::Io {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

            let len = data.len() as u64;
            progress.report(len, Some(len));
            Ok(data)
        }
    }

    impl Source for FileSource {
        fn fetch<'a>(&'a self, url: &'a str, progress: &'a ProgressReporter) -> FetchFuture<'a> {
            Box::pin(self.read(url, progress))
        }
    }

}

/// Serves bytes from memory.
///
/// Clones share the same map, so a test can keep a handle and add entries
/// after handing the source to a manager.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the bytes served for `url`.
    pub fn insert(&self, url: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), data.into());
    }

    pub fn remove(&self, url: &str) -> Option<Vec<u8>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Source for MemorySource {
    fn fetch<'a>(&'a self, url: &'a str, progress: &'a ProgressReporter) -> FetchFuture<'a> {
        let data = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(strip_query(url))
            .cloned();

        Box::pin(async move {
            let data = data.ok_or_else(|| LoadError::NotFound {
                url: url.to_string(),
            })?;
            let len = data.len() as u64;
            progress.report(len, Some(len));
            Ok(data)
        })
    }
}
