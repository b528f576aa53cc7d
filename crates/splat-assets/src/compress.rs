//! Compression dispatch.
//!
//! Picks a [`Compressor`] by explicit [`Format`] or by the shape of the
//! payload. The actual work runs on the background
//! [`CompressionService`](crate::CompressionService); everything here is
//! synchronous.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use splat_codec::{CodecError, CodecResult, CompressionLevel, compress_geometry, decompress_geometry, lz};

use crate::asset::{CompressedBytes, Payload};

/// A compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Attribute quantization and index delta encoding.
    Geometry,
    /// Sliding-window match compression.
    #[serde(alias = "lz4")]
    Lz,
    /// gzip stream.
    Gzip,
    /// zlib-wrapped deflate stream. `brotli` is accepted for older clients.
    #[serde(alias = "brotli")]
    Deflate,
}

impl Format {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Geometry => "geometry",
            Format::Lz => "lz",
            Format::Gzip => "gzip",
            Format::Deflate => "deflate",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geometry" => Ok(Format::Geometry),
            "lz" | "lz4" => Ok(Format::Lz),
            "gzip" => Ok(Format::Gzip),
            "deflate" | "brotli" => Ok(Format::Deflate),
            other => Err(format!("unknown compression format '{other}'")),
        }
    }
}

/// Pick the format for a payload.
///
/// An explicit format always wins. Otherwise geometry goes to the geometry
/// compressor, raw bytes and pixels to the byte compressor, and anything
/// else to gzip when stream compression is compiled in.
#[must_use]
pub fn select_format(payload: &Payload, explicit: Option<Format>) -> Option<Format> {
    if explicit.is_some() {
        return explicit;
    }

    match payload {
        Payload::Geometry(_) | Payload::CompressedGeometry(_) => Some(Format::Geometry),
        Payload::Bytes(_) | Payload::Texture(_) => Some(Format::Lz),
        Payload::Compressed(_) | Payload::Structured(_) => {
            if cfg!(feature = "stream-compression") {
                Some(Format::Gzip)
            } else {
                None
            }
        }
    }
}

/// A compressor for one [`Format`].
pub trait Compressor: Send + Sync {
    /// The format this compressor produces.
    fn format(&self) -> Format;

    /// Compress a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    fn compress(&self, payload: &Payload, level: CompressionLevel) -> CodecResult<Payload>;

    /// Reverse [`compress`](Self::compress).
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid output of this
    /// compressor.
    fn decompress(&self, payload: &Payload) -> CodecResult<Payload>;
}

/// Byte compressor backed by [`splat_codec::lz`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LzCompressor;

impl Compressor for LzCompressor {
    fn format(&self) -> Format {
        Format::Lz
    }

    fn compress(&self, payload: &Payload, _level: CompressionLevel) -> CodecResult<Payload> {
        Ok(Payload::Compressed(CompressedBytes {
            format: Format::Lz,
            data: lz::compress(&payload.to_bytes()),
        }))
    }

    fn decompress(&self, payload: &Payload) -> CodecResult<Payload> {
        let data = compressed_bytes(payload, Format::Lz)?;
        Ok(Payload::Bytes(lz::decompress(data)?))
    }
}

/// Geometry compressor backed by [`splat_codec::compress_geometry`].
///
/// Payloads that are not geometry pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryCompressor;

impl Compressor for GeometryCompressor {
    fn format(&self) -> Format {
        Format::Geometry
    }

    fn compress(&self, payload: &Payload, level: CompressionLevel) -> CodecResult<Payload> {
        match payload {
            Payload::Geometry(geometry) => Ok(Payload::CompressedGeometry(compress_geometry(
                geometry, level,
            ))),
            other => Ok(other.clone()),
        }
    }

    fn decompress(&self, payload: &Payload) -> CodecResult<Payload> {
        match payload {
            Payload::CompressedGeometry(compressed) => {
                Ok(Payload::Geometry(decompress_geometry(compressed)?))
            }
            other => Ok(other.clone()),
        }
    }
}

/// The bytes of a compressed payload, checked against the expected format.
///
/// Plain bytes are accepted as-is, so callers can hand over data that came
/// from elsewhere.
fn compressed_bytes(payload: &Payload, expected: Format) -> CodecResult<&[u8]> {
    match payload {
        Payload::Compressed(CompressedBytes { format, data }) if *format == expected => Ok(data),
        Payload::Compressed(CompressedBytes { format, .. }) => Err(CodecError::InvalidFormat {
            context: "compressed payload",
            detail: format!("expected {expected} data, found {format}"),
        }),
        Payload::Bytes(data) => Ok(data),
        _ => Err(CodecError::InvalidFormat {
            context: "compressed payload",
            detail: format!("{expected} decompression needs byte data"),
        }),
    }
}

#[cfg(feature = "stream-compression")]
mod stream {
    use std::io::{Read, Write};

    use flate2::{
        Compression,
        read::{GzDecoder, ZlibDecoder},
        write::{GzEncoder, ZlibEncoder},
    };
    use splat_codec::{CodecError, CodecResult, CompressionLevel};

    use super::{Compressor, Format, compressed_bytes};
    use crate::asset::{CompressedBytes, Payload};

    fn flate_level(level: CompressionLevel) -> Compression {
        match level {
            CompressionLevel::Low => Compression::fast(),
            CompressionLevel::Medium => Compression::default(),
            CompressionLevel::High => Compression::best(),
        }
    }

    fn stream_error(context: &'static str, e: &std::io::Error) -> CodecError {
        CodecError::InvalidFormat {
            context,
            detail: e.to_string(),
        }
    }

    /// gzip via `flate2`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct GzipCompressor;

    impl Compressor for GzipCompressor {
        fn format(&self) -> Format {
            Format::Gzip
        }

        fn compress(&self, payload: &Payload, level: CompressionLevel) -> CodecResult<Payload> {
            let mut encoder = GzEncoder::new(Vec::new(), flate_level(level));
            encoder
                .write_all(&payload.to_bytes())
                .map_err(|e| stream_error("gzip stream", &e))?;
            let data = encoder
                .finish()
                .map_err(|e| stream_error("gzip stream", &e))?;
            Ok(Payload::Compressed(CompressedBytes {
                format: Format::Gzip,
                data,
            }))
        }

        fn decompress(&self, payload: &Payload) -> CodecResult<Payload> {
            let mut out = Vec::new();
            GzDecoder::new(compressed_bytes(payload, Format::Gzip)?)
                .read_to_end(&mut out)
                .map_err(|e| stream_error("gzip stream", &e))?;
            Ok(Payload::Bytes(out))
        }
    }

    /// zlib-framed deflate via `flate2`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct DeflateCompressor;

    impl Compressor for DeflateCompressor {
        fn format(&self) -> Format {
            Format::Deflate
        }

        fn compress(&self, payload: &Payload, level: CompressionLevel) -> CodecResult<Payload> {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate_level(level));
            encoder
                .write_all(&payload.to_bytes())
                .map_err(|e| stream_error("deflate stream", &e))?;
            let data = encoder
                .finish()
                .map_err(|e| stream_error("deflate stream", &e))?;
            Ok(Payload::Compressed(CompressedBytes {
                format: Format::Deflate,
                data,
            }))
        }

        fn decompress(&self, payload: &Payload) -> CodecResult<Payload> {
            let mut out = Vec::new();
            ZlibDecoder::new(compressed_bytes(payload, Format::Deflate)?)
                .read_to_end(&mut out)
                .map_err(|e| stream_error("deflate stream", &e))?;
            Ok(Payload::Bytes(out))
        }
    }
}

#[cfg(feature = "stream-compression")]
pub use stream::{DeflateCompressor, GzipCompressor};

/// The set of compressors available to the service, keyed by format.
pub struct Compressors {
    by_format: HashMap<Format, Box<dyn Compressor>>,
}

impl Compressors {
    /// An empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_format: HashMap::new(),
        }
    }

    /// Every compressor compiled into this build.
    #[must_use]
    pub fn standard() -> Self {
        let mut compressors = Self::empty();
        compressors.register(GeometryCompressor);
        compressors.register(LzCompressor);

        #[cfg(feature = "stream-compression")]
        {
            compressors.register(GzipCompressor);
            compressors.register(DeflateCompressor);
        }

        compressors
    }

    /// Add or replace the compressor for its format.
    pub fn register(&mut self, compressor: impl Compressor + 'static) {
        self.by_format.insert(compressor.format(), Box::new(compressor));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, compressor: impl Compressor + 'static) -> Self {
        self.register(compressor);
        self
    }

    #[must_use]
    pub fn get(&self, format: Format) -> Option<&dyn Compressor> {
        self.by_format.get(&format).map(AsRef::as_ref)
    }
}

impl Default for Compressors {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Compressors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.by_format.keys().map(|f| f.as_str()).collect();
        formats.sort_unstable();
        f.debug_struct("Compressors")
            .field("formats", &formats)
            .finish()
    }
}
