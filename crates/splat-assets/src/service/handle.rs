//! Caller side of the compression service.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

use splat_codec::CompressionLevel;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{
    protocol::{CompressOutcome, JobKind, JobResult, ServiceRequest, ServiceResponse},
    worker::{CompressionWorker, JobHandler, Reply, run_worker},
};
use crate::{asset::Payload, compress::Format, error::CompressionError};

type Continuation = oneshot::Sender<Result<JobResult, String>>;

/// Jobs awaiting a response, keyed by correlation id.
type PendingJobs = Arc<Mutex<HashMap<String, Continuation>>>;

fn lock(pending: &PendingJobs) -> MutexGuard<'_, HashMap<String, Continuation>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a compression worker running on its own thread.
///
/// Each job gets a fresh correlation id and a one-shot continuation in the
/// pending table. A router thread matches responses to continuations by id,
/// so jobs may complete in any order. Callers stop waiting after the
/// configured timeout; a response that arrives later is dropped.
pub struct CompressionService {
    requests: async_channel::Sender<ServiceRequest>,
    pending: PendingJobs,
    timeout: Duration,
}

impl CompressionService {
    /// Start a service running the standard [`CompressionWorker`].
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::Unavailable`] if the worker thread cannot
    /// be started.
    pub fn spawn(timeout: Duration) -> Result<Self, CompressionError> {
        Self::spawn_with(CompressionWorker::default(), timeout)
    }

    /// Start a service running a custom handler.
    ///
    /// # Errors
    ///
    /// Returns [`CompressionError::Unavailable`] if the worker thread cannot
    /// be started.
    pub fn spawn_with(
        handler: impl JobHandler,
        timeout: Duration,
    ) -> Result<Self, CompressionError> {
        let (request_tx, request_rx) = async_channel::unbounded::<ServiceRequest>();
        let (response_tx, response_rx) = async_channel::unbounded::<ServiceResponse>();
        let pending = PendingJobs::default();

        let unavailable = |e: std::io::Error| CompressionError::Unavailable {
            reason: e.to_string(),
        };

        let handler: Box<dyn JobHandler> = Box::new(handler);
        thread::Builder::new()
            .name("splat-compress".to_string())
            .spawn(move || run_worker(handler, &request_rx, &Reply::new(response_tx)))
            .map_err(unavailable)?;

        let router_pending = Arc::clone(&pending);
        let router = thread::Builder::new()
            .name("splat-compress-router".to_string())
            .spawn(move || route_responses(&response_rx, &router_pending));
        if let Err(e) = router {
            // Stops the worker we just started.
            request_tx.close();
            return Err(unavailable(e));
        }

        tracing::debug!(?timeout, "compression service started");
        Ok(Self {
            requests: request_tx,
            pending,
            timeout,
        })
    }

    /// Compress a payload.
    ///
    /// `format` of `None` selects the format from the payload's shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the job fails, times out, or the worker is gone.
    pub async fn compress(
        &self,
        payload: Payload,
        level: CompressionLevel,
        format: Option<Format>,
    ) -> Result<CompressOutcome, CompressionError> {
        let (id, result) = self
            .submit(JobKind::Compress, payload, Some(level), format)
            .await?;
        match result {
            JobResult::Compressed(outcome) => Ok(outcome),
            JobResult::Payload(_) => Err(CompressionError::UnexpectedResult { id }),
        }
    }

    /// Reverse a compression.
    ///
    /// # Errors
    ///
    /// Returns an error if the job fails, times out, or the worker is gone.
    pub async fn decompress(
        &self,
        payload: Payload,
        format: Option<Format>,
    ) -> Result<Payload, CompressionError> {
        let (id, result) = self
            .submit(JobKind::Decompress, payload, None, format)
            .await?;
        match result {
            JobResult::Payload(payload) => Ok(payload),
            JobResult::Compressed(_) => Err(CompressionError::UnexpectedResult { id }),
        }
    }

    /// Run the worker's optimizer over a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the job fails, times out, or the worker is gone.
    pub async fn optimize(&self, payload: Payload) -> Result<Payload, CompressionError> {
        let (id, result) = self.submit(JobKind::Optimize, payload, None, None).await?;
        match result {
            JobResult::Payload(payload) => Ok(payload),
            JobResult::Compressed(_) => Err(CompressionError::UnexpectedResult { id }),
        }
    }

    /// Number of jobs awaiting a response.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        lock(&self.pending).len()
    }

    /// How long callers wait for a response.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stop accepting jobs. Queued jobs still run; the worker then exits.
    pub fn shutdown(&self) {
        if self.requests.close() {
            tracing::debug!("compression service shutting down");
        }
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.requests.is_closed()
    }

    async fn submit(
        &self,
        kind: JobKind,
        data: Payload,
        level: Option<CompressionLevel>,
        format: Option<Format>,
    ) -> Result<(String, JobResult), CompressionError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id: id.clone(),
        };

        let request = ServiceRequest {
            id: id.clone(),
            kind,
            data,
            level,
            format,
        };
        self.requests
            .send(request)
            .await
            .map_err(|_| CompressionError::Disconnected)?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok((id, result)),
            Ok(Ok(Err(message))) => Err(CompressionError::Job { id, message }),
            Ok(Err(_)) => Err(CompressionError::Disconnected),
            Err(_) => Err(CompressionError::Timeout {
                id,
                after: self.timeout,
            }),
        }
    }
}

impl Drop for CompressionService {
    fn drop(&mut self) {
        self.requests.close();
    }
}

impl std::fmt::Debug for CompressionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionService")
            .field("pending_jobs", &self.pending_jobs())
            .field("timeout", &self.timeout)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Removes a job from the pending table when its caller stops waiting.
struct PendingGuard<'a> {
    pending: &'a PendingJobs,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.id);
    }
}

fn route_responses(responses: &async_channel::Receiver<ServiceResponse>, pending: &PendingJobs) {
    while let Ok(response) = responses.recv_blocking() {
        let continuation = lock(pending).remove(&response.id);
        match continuation {
            Some(tx) => {
                let _ = tx.send(response.into_outcome());
            }
            None => tracing::debug!(id = %response.id, "dropping response for unknown job"),
        }
    }

    // The worker is gone; wake everyone still waiting.
    lock(pending).clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compress_and_decompress() {
        let service = CompressionService::spawn(Duration::from_secs(5)).unwrap();
        let data = Payload::Bytes(b"banana banana banana banana".to_vec());

        let outcome = service
            .compress(data.clone(), CompressionLevel::Medium, None)
            .await
            .unwrap();
        assert_eq!(outcome.format, Format::Lz);

        let restored = service.decompress(outcome.data, None).await.unwrap();
        assert_eq!(restored, data);
        assert_eq!(service.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn test_job_error() {
        let service = CompressionService::spawn(Duration::from_secs(5)).unwrap();
        let err = service
            .decompress(Payload::Bytes(vec![0x80]), Some(Format::Lz))
            .await
            .unwrap_err();
        assert!(matches!(err, CompressionError::Job { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_shutdown_rejects_jobs() {
        let service = CompressionService::spawn(Duration::from_secs(5)).unwrap();
        service.shutdown();
        assert!(service.is_shut_down());
        let err = service.optimize(Payload::Bytes(vec![])).await.unwrap_err();
        assert_eq!(err, CompressionError::Disconnected);
        assert_eq!(service.pending_jobs(), 0);
    }
}
