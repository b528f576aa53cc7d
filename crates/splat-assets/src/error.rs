//! Error types for the splat-assets crate.

use std::{fmt, time::Duration};

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by [`AssetManager`](crate::AssetManager) loads.
///
/// Errors are `Clone` because every caller joined to a coalesced load
/// receives the same outcome.
#[derive(Debug, Clone)]
pub enum Error {
    /// No loader is registered for the asset's file extension.
    UnsupportedFormat {
        /// The requested URL.
        url: String,
        /// The extension that was looked up.
        extension: String,
    },
    /// The loader failed to fetch or decode the asset.
    LoadFailure {
        /// The requested URL.
        url: String,
        /// What went wrong.
        cause: LoadError,
    },
    /// The load was cancelled through its cancellation token.
    Cancelled {
        /// The requested URL.
        url: String,
    },
}

impl Error {
    /// The URL of the load that failed.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Error::UnsupportedFormat { url, .. }
            | Error::LoadFailure { url, .. }
            | Error::Cancelled { url } => url,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedFormat { url, extension } => {
                write!(f, "no loader available for extension '{extension}' ({url})")
            }
            Error::LoadFailure { url, cause } => write!(f, "failed to load {url}: {cause}"),
            Error::Cancelled { url } => write!(f, "load of {url} was cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::LoadFailure { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Errors raised by sources and loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// HTTP request failed.
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The source has no data for this URL.
    NotFound {
        /// The URL that was looked up.
        url: String,
    },
    /// The URL cannot be mapped onto the source.
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Reading from the local filesystem failed.
    Io {
        /// The path that was read.
        path: String,
        /// The error message.
        message: String,
    },
    /// The fetched data could not be parsed.
    Parse {
        /// Context for where the error occurred.
        context: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// The load that this caller joined went away without a result.
    Abandoned,
}

impl LoadError {
    pub(crate) fn parse(context: &'static str, detail: impl Into<String>) -> Self {
        LoadError::Parse {
            context,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            LoadError::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            LoadError::NotFound { url } => write!(f, "no data for {url}"),
            LoadError::InvalidUrl { url, reason } => write!(f, "invalid url {url}: {reason}"),
            LoadError::Io { path, message } => write!(f, "failed to read {path}: {message}"),
            LoadError::Parse { context, detail } => {
                write!(f, "failed to parse {context}: {detail}")
            }
            LoadError::Abandoned => write!(f, "load was abandoned before completing"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Errors from the background compression service.
///
/// These never surface from a load: compression is best-effort and a
/// failure leaves the asset uncompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// The service's worker could not be started.
    Unavailable {
        /// Why the worker could not be started.
        reason: String,
    },
    /// The worker reported an error for the job.
    Job {
        /// Correlation id of the job.
        id: String,
        /// The worker's error message.
        message: String,
    },
    /// No response arrived within the configured timeout.
    Timeout {
        /// Correlation id of the job.
        id: String,
        /// How long the caller waited.
        after: Duration,
    },
    /// The worker shut down before answering.
    Disconnected,
    /// The worker answered with a result of the wrong shape.
    UnexpectedResult {
        /// Correlation id of the job.
        id: String,
    },
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::Unavailable { reason } => {
                write!(f, "compression service unavailable: {reason}")
            }
            CompressionError::Job { id, message } => {
                write!(f, "compression job {id} failed: {message}")
            }
            CompressionError::Timeout { id, after } => {
                write!(f, "compression job {id} timed out after {after:?}")
            }
            CompressionError::Disconnected => write!(f, "compression service disconnected"),
            CompressionError::UnexpectedResult { id } => {
                write!(f, "compression job {id} returned an unexpected result")
            }
        }
    }
}

impl std::error::Error for CompressionError {}

/// Errors loading an [`AssetConfig`](crate::AssetConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io {
        /// The path that was read.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The config file is not valid JSON for the config schema.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {path}: {source}")
            }
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
