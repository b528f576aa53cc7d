//! Byte and geometry compression codecs for splat assets.
//!
//! This crate provides pure synchronous encode/decode functions. It has no
//! async code and no threading primitives; callers decide where the work
//! runs.
//!
//! # Codecs
//!
//! - [`lz`]: lossless greedy sliding-window match compression for bytes
//! - [`quantize`]: lossy linear quantization of numeric attributes
//! - [`delta`]: lossless delta encoding of index buffers
//! - [`geometry`]: attribute quantization and index encoding for whole
//!   geometry buffers, selected by [`CompressionLevel`]

pub mod delta;
mod error;
pub mod geometry;
mod level;
pub mod lz;
pub mod quantize;

pub use error::{CodecError, CodecResult};
pub use geometry::{
    ArrayKind, Attribute, AttributeArray, CompressedAttribute, CompressedGeometry,
    CompressedIndex, GeometryBuffer, GeometryMetadata, compress_geometry, decompress_geometry,
};
pub use level::CompressionLevel;
