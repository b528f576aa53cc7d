//! Loaded assets and their payloads.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use splat_codec::{CompressedGeometry, GeometryBuffer, geometry::POSITION};

use crate::compress::Format;

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA pixels, 4 bytes each.
    pub pixels: Vec<u8>,
}

/// Bytes produced by a byte-level compressor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedBytes {
    pub format: Format,
    pub data: Vec<u8>,
}

/// The data carried by an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Point-cloud or mesh attributes.
    Geometry(GeometryBuffer),
    /// Geometry after quantization; still directly usable.
    CompressedGeometry(CompressedGeometry),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Output of a byte-level compressor.
    Compressed(CompressedBytes),
    /// Parsed JSON.
    Structured(serde_json::Value),
    /// Decoded image.
    Texture(Texture),
}

impl Payload {
    /// Size of the payload in bytes.
    ///
    /// Structured data is measured by its serialized length.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Payload::Geometry(geometry) => geometry.byte_size(),
            Payload::CompressedGeometry(geometry) => geometry.byte_size(),
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Compressed(compressed) => compressed.data.len(),
            Payload::Structured(value) => serde_json::to_vec(value).map_or(0, |v| v.len()),
            Payload::Texture(texture) => texture.pixels.len(),
        }
    }

    /// Whether the payload exposes named attribute arrays.
    #[must_use]
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Payload::Geometry(_) | Payload::CompressedGeometry(_)
        )
    }

    /// Names of the geometry attributes, in sorted order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        match self {
            Payload::Geometry(geometry) => geometry.attributes.keys().map(String::as_str).collect(),
            Payload::CompressedGeometry(geometry) => {
                geometry.attributes.keys().map(String::as_str).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The values of a 3-component float attribute.
    #[must_use]
    pub fn vec3_attribute(&self, name: &str) -> Option<&[f32]> {
        match self {
            Payload::Geometry(geometry) => geometry
                .attributes
                .get(name)
                .filter(|a| a.item_size == 3)
                .and_then(|a| a.array.as_f32()),
            Payload::CompressedGeometry(geometry) => geometry
                .attributes
                .get(name)
                .filter(|a| a.item_size == 3)
                .and_then(|a| a.values.as_f32()),
            _ => None,
        }
    }

    /// Mutable values of a 3-component float attribute.
    pub fn vec3_attribute_mut(&mut self, name: &str) -> Option<&mut [f32]> {
        match self {
            Payload::Geometry(geometry) => geometry
                .attributes
                .get_mut(name)
                .filter(|a| a.item_size == 3)
                .and_then(|a| a.array.as_f32_mut()),
            Payload::CompressedGeometry(geometry) => geometry
                .attributes
                .get_mut(name)
                .filter(|a| a.item_size == 3)
                .and_then(|a| a.values.as_f32_mut()),
            _ => None,
        }
    }

    /// Serialize to bytes for byte-level compressors.
    ///
    /// Raw and already-compressed bytes are returned as-is; everything else
    /// is encoded as JSON.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Bytes(bytes) => bytes.clone(),
            Payload::Compressed(compressed) => compressed.data.clone(),
            Payload::Texture(texture) => texture.pixels.clone(),
            Payload::Structured(value) => serde_json::to_vec(value).unwrap_or_default(),
            other => serde_json::to_vec(other).unwrap_or_default(),
        }
    }
}

/// Axis-aligned box and bounding sphere of an asset's positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    /// Center of the box, used as the sphere center.
    pub center: Vec3,
    pub radius: f32,
}

impl Bounds {
    /// Compute bounds from packed `xyz` triples.
    ///
    /// Returns `None` if there are no complete triples.
    #[must_use]
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        let points = || positions.chunks_exact(3).map(Vec3::from_slice);

        let (min, max) = points().fold(None, |acc: Option<(Vec3, Vec3)>, p| {
            Some(acc.map_or((p, p), |(min, max)| (min.min(p), max.max(p))))
        })?;

        let center = (min + max) * 0.5;
        let radius = points()
            .map(|p| p.distance_squared(center))
            .fold(0.0f32, f32::max)
            .sqrt();

        Some(Self {
            min,
            max,
            center,
            radius,
        })
    }
}

/// Summary of a compression job applied to an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionReport {
    pub format: Format,
    pub original_size: usize,
    pub compressed_size: usize,
    /// `compressed_size / original_size`.
    pub compression_ratio: f64,
    pub compression_time_ms: f64,
}

/// A loaded asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    /// The URL the asset was requested with.
    pub url: String,
    pub payload: Payload,
    /// Set by the `optimize` transform step.
    pub bounds: Option<Bounds>,
    /// Set when the asset went through the compression service.
    pub compression: Option<CompressionReport>,
}

impl Asset {
    #[must_use]
    pub fn new(url: impl Into<String>, payload: Payload) -> Self {
        Self {
            url: url.into(),
            payload,
            bounds: None,
            compression: None,
        }
    }

    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.payload.byte_size()
    }

    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.payload.attribute_names()
    }

    /// Packed `xyz` positions, if the asset is geometry.
    #[must_use]
    pub fn positions(&self) -> Option<&[f32]> {
        self.payload.vec3_attribute(POSITION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use splat_codec::{Attribute, AttributeArray};

    #[test]
    fn test_bounds() {
        let bounds = Bounds::from_positions(&[0.0, 0.0, 0.0, 2.0, 4.0, -2.0]).unwrap();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(bounds.max, Vec3::new(2.0, 4.0, 0.0));
        assert_eq!(bounds.center, Vec3::new(1.0, 2.0, -1.0));
        assert!((bounds.radius - 6.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::from_positions(&[]).is_none());
        assert!(Bounds::from_positions(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_byte_size() {
        let geometry = GeometryBuffer::new()
            .with_attribute(
                POSITION,
                Attribute::new(AttributeArray::F32(vec![0.0; 6]), 3),
            )
            .with_index(vec![0, 1]);
        assert_eq!(Payload::Geometry(geometry).byte_size(), 24 + 8);
        assert_eq!(Payload::Bytes(vec![1, 2, 3]).byte_size(), 3);
        assert_eq!(
            Payload::Structured(serde_json::json!({"a": 1})).byte_size(),
            7
        );
    }

    #[test]
    fn test_attribute_names() {
        let geometry = GeometryBuffer::new()
            .with_attribute(POSITION, Attribute::new(AttributeArray::F32(vec![]), 3))
            .with_attribute("color", Attribute::new(AttributeArray::U8(vec![]), 3));
        let asset = Asset::new("a.ply", Payload::Geometry(geometry));
        assert_eq!(asset.attribute_names(), ["color", "position"]);
        assert!(Asset::new("a.bin", Payload::Bytes(vec![])).attribute_names().is_empty());
    }

    proptest! {
        #[test]
        fn prop_bounds_contain_every_point(
            positions in proptest::collection::vec(-1.0e3f32..1.0e3, 3..96),
        ) {
            let bounds = Bounds::from_positions(&positions).unwrap();
            for p in positions.chunks_exact(3).map(Vec3::from_slice) {
                prop_assert!(p.cmpge(bounds.min).all() && p.cmple(bounds.max).all());
                prop_assert!(p.distance(bounds.center) <= bounds.radius * (1.0 + 1e-5) + 1e-3);
            }
        }
    }
}
