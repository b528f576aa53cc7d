//! The compression worker: runs jobs on its own thread.

use std::time::Instant;

use splat_codec::CompressionLevel;

use super::protocol::{CompressOutcome, JobKind, JobResult, ServiceRequest, ServiceResponse};
use crate::{
    asset::Payload,
    compress::{Compressors, Format, select_format},
};

/// Post-processing hook for `optimize` jobs.
pub trait Optimizer: Send {
    /// Optimize a payload.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the payload could not be optimized.
    fn optimize(&mut self, payload: Payload) -> Result<Payload, String>;
}

/// Returns payloads unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughOptimizer;

impl Optimizer for PassthroughOptimizer {
    fn optimize(&mut self, payload: Payload) -> Result<Payload, String> {
        Ok(payload)
    }
}

/// Where a handler sends its responses.
#[derive(Debug, Clone)]
pub struct Reply {
    tx: async_channel::Sender<ServiceResponse>,
}

impl Reply {
    pub(crate) fn new(tx: async_channel::Sender<ServiceResponse>) -> Self {
        Self { tx }
    }

    /// Send a response. Returns `false` if the service side has gone away.
    pub fn send(&self, response: ServiceResponse) -> bool {
        self.tx.send_blocking(response).is_ok()
    }
}

/// Handles requests on the worker thread.
///
/// Handlers may answer immediately, later, or in any order; responses are
/// matched to callers by id.
pub trait JobHandler: Send + 'static {
    fn handle(&mut self, request: ServiceRequest, reply: &Reply);

    /// Called once the request channel closes.
    fn finish(&mut self, _reply: &Reply) {}
}

/// The standard handler: compressors plus an optimizer.
pub struct CompressionWorker {
    compressors: Compressors,
    optimizer: Box<dyn Optimizer>,
}

impl CompressionWorker {
    #[must_use]
    pub fn new(compressors: Compressors) -> Self {
        Self {
            compressors,
            optimizer: Box::new(PassthroughOptimizer),
        }
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: impl Optimizer + 'static) -> Self {
        self.optimizer = Box::new(optimizer);
        self
    }

    /// Run one request to completion.
    ///
    /// # Errors
    ///
    /// Returns a message if no compressor matches or the codec fails.
    pub fn run(&mut self, request: ServiceRequest) -> Result<JobResult, String> {
        match request.kind {
            JobKind::Compress => self
                .compress(
                    &request.data,
                    request.level.unwrap_or_default(),
                    request.format,
                )
                .map(JobResult::Compressed),
            JobKind::Decompress => self
                .decompress(&request.data, request.format)
                .map(JobResult::Payload),
            JobKind::Optimize => self.optimizer.optimize(request.data).map(JobResult::Payload),
        }
    }

    fn compress(
        &self,
        payload: &Payload,
        level: CompressionLevel,
        format: Option<Format>,
    ) -> Result<CompressOutcome, String> {
        let format = select_format(payload, format)
            .ok_or_else(|| "no compression format available for payload".to_string())?;
        let compressor = self
            .compressors
            .get(format)
            .ok_or_else(|| format!("unsupported compression format: {format}"))?;

        let start = Instant::now();
        let data = compressor
            .compress(payload, level)
            .map_err(|e| e.to_string())?;
        let elapsed = start.elapsed();

        let original_size = payload.byte_size();
        let compressed_size = data.byte_size();
        #[allow(clippy::cast_precision_loss)]
        let compression_ratio = if original_size == 0 {
            1.0
        } else {
            compressed_size as f64 / original_size as f64
        };

        Ok(CompressOutcome {
            data,
            original_size,
            compressed_size,
            compression_ratio,
            compression_time_ms: elapsed.as_secs_f64() * 1000.0,
            format,
        })
    }

    fn decompress(&self, payload: &Payload, format: Option<Format>) -> Result<Payload, String> {
        let format = match (format, payload) {
            (Some(format), _) => format,
            (None, Payload::Compressed(compressed)) => compressed.format,
            (None, Payload::CompressedGeometry(_)) => Format::Geometry,
            (None, _) => return Err("cannot infer format of uncompressed payload".to_string()),
        };
        let compressor = self
            .compressors
            .get(format)
            .ok_or_else(|| format!("unsupported compression format: {format}"))?;
        compressor.decompress(payload).map_err(|e| e.to_string())
    }
}

impl Default for CompressionWorker {
    fn default() -> Self {
        Self::new(Compressors::standard())
    }
}

impl JobHandler for CompressionWorker {
    fn handle(&mut self, request: ServiceRequest, reply: &Reply) {
        let id = request.id.clone();
        let kind = request.kind;

        let response = match self.run(request) {
            Ok(result) => ServiceResponse::success(id, result),
            Err(message) => {
                tracing::debug!(id = %id, ?kind, message = %message, "job failed");
                ServiceResponse::failure(id, message)
            }
        };
        reply.send(response);
    }
}

/// Drain requests until the channel closes.
pub(crate) fn run_worker(
    mut handler: Box<dyn JobHandler>,
    requests: &async_channel::Receiver<ServiceRequest>,
    reply: &Reply,
) {
    while let Ok(request) = requests.recv_blocking() {
        handler.handle(request, reply);
    }
    handler.finish(reply);
    tracing::debug!("compression worker stopped");
}
