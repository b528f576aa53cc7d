//! Messages exchanged with the compression worker.
//!
//! Every message is JSON-serializable:
//!
//! - request: `{ "id", "type": "compress" | "decompress" | "optimize", "data", "level"?, "format"? }`
//! - response: `{ "id", "result" }` or `{ "id", "error" }`

use serde::{Deserialize, Serialize};
use splat_codec::CompressionLevel;

use crate::{asset::Payload, compress::Format};

/// What the worker should do with a request's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Compress,
    Decompress,
    Optimize,
}

/// A job for the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Correlation id, echoed back in the response.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub data: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CompressionLevel>,
    /// `None` selects the format from the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}

/// Result of a `compress` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressOutcome {
    pub data: Payload,
    pub original_size: usize,
    pub compressed_size: usize,
    /// `compressed_size / original_size`, or 1 for empty input.
    pub compression_ratio: f64,
    pub compression_time_ms: f64,
    pub format: Format,
}

/// The success value of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    /// `compress` jobs.
    Compressed(CompressOutcome),
    /// `decompress` and `optimize` jobs.
    Payload(Payload),
}

/// The worker's answer to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceResponse {
    #[must_use]
    pub fn success(id: impl Into<String>, result: JobResult) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Collapse into a `Result`.
    ///
    /// A response carrying neither field is reported as an error.
    pub fn into_outcome(self) -> Result<JobResult, String> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err("response carried no result".to_string()),
        }
    }
}
