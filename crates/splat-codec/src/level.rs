//! Compression levels.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// How aggressively to trade fidelity for size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Smallest output: 8-bit attributes and delta-encoded indices.
    Low,
    /// 12-bit attributes, indices stored as-is.
    #[default]
    Medium,
    /// Attributes and indices are passed through unquantized.
    High,
}

impl CompressionLevel {
    /// Bit depth used for attribute quantization, or `None` for passthrough.
    #[must_use]
    pub fn quantization_bits(self) -> Option<u32> {
        match self {
            Self::Low => Some(8),
            Self::Medium => Some(12),
            Self::High => None,
        }
    }

    /// Whether index buffers are delta-encoded at this level.
    #[must_use]
    pub fn delta_encodes_indices(self) -> bool {
        matches!(self, Self::Low)
    }

    /// The lowercase name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown compression level '{other}'")),
        }
    }
}
