//! Background compression service.
//!
//! Compressors run on a dedicated worker thread and are reached only by
//! message exchange: the caller sends a [`ServiceRequest`] tagged with a
//! correlation id and awaits the matching [`ServiceResponse`].

mod handle;
pub mod protocol;
mod worker;

pub use handle::CompressionService;
pub use protocol::{CompressOutcome, JobKind, JobResult, ServiceRequest, ServiceResponse};
pub use worker::{CompressionWorker, JobHandler, Optimizer, PassthroughOptimizer, Reply};
