//! Geometry buffers and the geometry compressor.
//!
//! Attributes are quantized according to the [`CompressionLevel`] and
//! reconstructed in place, so a [`CompressedGeometry`] can be rendered
//! without decoding. Index buffers are optionally delta-encoded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    delta::{decode_indices, encode_indices},
    error::{CodecError, CodecResult},
    level::CompressionLevel,
    quantize::quantize,
};

/// Name of the attribute holding vertex positions.
pub const POSITION: &str = "position";

/// Name of the attribute holding vertex normals.
pub const NORMAL: &str = "normal";

/// Name of the attribute holding vertex colors.
pub const COLOR: &str = "color";

/// Element type of an attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayKind {
    F32,
    U8,
    U16,
    U32,
}

/// A typed numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum AttributeArray {
    F32(Vec<f32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeArray {
    /// Number of scalar values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> ArrayKind {
        match self {
            Self::F32(_) => ArrayKind::F32,
            Self::U8(_) => ArrayKind::U8,
            Self::U16(_) => ArrayKind::U16,
            Self::U32(_) => ArrayKind::U32,
        }
    }

    /// Size of the array data in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Self::F32(v) => v.len() * 4,
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len() * 2,
            Self::U32(v) => v.len() * 4,
        }
    }

    /// Widen every value to `f64`.
    #[must_use]
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::U32(v) => v.iter().map(|&x| f64::from(x)).collect(),
        }
    }

    /// Build an array of `kind` from `f64` values.
    ///
    /// Integer kinds round to the nearest value and saturate at the type's
    /// bounds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_f64(kind: ArrayKind, values: &[f64]) -> Self {
        match kind {
            ArrayKind::F32 => Self::F32(values.iter().map(|&x| x as f32).collect()),
            ArrayKind::U8 => Self::U8(values.iter().map(|&x| x.round() as u8).collect()),
            ArrayKind::U16 => Self::U16(values.iter().map(|&x| x.round() as u16).collect()),
            ArrayKind::U32 => Self::U32(values.iter().map(|&x| x.round() as u32).collect()),
        }
    }

    /// Mutable access to the values if this is a float array.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }

    /// The values if this is a float array.
    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }
}

/// A named vertex attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub array: AttributeArray,
    /// Components per element (3 for positions).
    pub item_size: usize,
    /// Whether integer values represent the `[0, 1]` range.
    pub normalized: bool,
}

impl Attribute {
    #[must_use]
    pub fn new(array: AttributeArray, item_size: usize) -> Self {
        Self {
            array,
            item_size,
            normalized: false,
        }
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Number of elements (`len / item_size`).
    #[must_use]
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.array.len() / self.item_size
        }
    }
}

/// Vertex attributes plus an optional index buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryBuffer {
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Vec<u32>>,
}

impl GeometryBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Element count of the position attribute, or of the first attribute
    /// if there are no positions.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.attributes
            .get(POSITION)
            .or_else(|| self.attributes.values().next())
            .map_or(0, Attribute::count)
    }

    /// Attribute and index data size in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let attributes: usize = self.attributes.values().map(|a| a.array.byte_len()).sum();
        attributes + self.index.as_ref().map_or(0, |index| index.len() * 4)
    }
}

/// A quantized attribute.
///
/// Values are stored dequantized in the source element type, so they can
/// be used directly. Verbatim values are bit-for-bit the source values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedAttribute {
    pub values: AttributeArray,
    pub item_size: usize,
    pub normalized: bool,
    /// Bit depth used, or `None` if the values were copied verbatim.
    pub bits: Option<u32>,
}

impl CompressedAttribute {
    #[must_use]
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.values.len() / self.item_size
        }
    }
}

/// An index buffer, delta-encoded or as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "values", rename_all = "lowercase")]
pub enum CompressedIndex {
    Plain(Vec<u32>),
    Delta(Vec<i64>),
}

impl CompressedIndex {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Plain(v) => v.len(),
            Self::Delta(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode back to plain indices.
    pub fn decode(&self) -> CodecResult<Vec<u32>> {
        match self {
            Self::Plain(v) => Ok(v.clone()),
            Self::Delta(v) => decode_indices(v),
        }
    }
}

/// Information about the source geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryMetadata {
    /// Element count of the geometry before compression.
    pub original_vertex_count: usize,
}

/// Output of [`compress_geometry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedGeometry {
    pub attributes: BTreeMap<String, CompressedAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<CompressedIndex>,
    pub metadata: GeometryMetadata,
}

impl CompressedGeometry {
    /// Stored size in bytes (8 per delta index).
    #[must_use]
    pub fn byte_size(&self) -> usize {
        let attributes: usize = self.attributes.values().map(|a| a.values.byte_len()).sum();
        let index = match &self.index {
            Some(CompressedIndex::Plain(v)) => v.len() * 4,
            Some(CompressedIndex::Delta(v)) => v.len() * 8,
            None => 0,
        };
        attributes + index
    }
}

/// Compress a geometry buffer at the given level.
#[must_use]
pub fn compress_geometry(geometry: &GeometryBuffer, level: CompressionLevel) -> CompressedGeometry {
    let bits = level.quantization_bits();

    let attributes = geometry
        .attributes
        .iter()
        .map(|(name, attribute)| (name.clone(), compress_attribute(attribute, bits)))
        .collect();

    let index = geometry.index.as_ref().map(|index| {
        if level.delta_encodes_indices() {
            CompressedIndex::Delta(encode_indices(index))
        } else {
            CompressedIndex::Plain(index.clone())
        }
    });

    CompressedGeometry {
        attributes,
        index,
        metadata: GeometryMetadata {
            original_vertex_count: geometry.element_count(),
        },
    }
}

/// Rebuild a geometry buffer with the original array kinds.
///
/// Attribute values come back as quantized; the index is exact.
///
/// # Errors
///
/// Returns an error if the index buffer cannot be decoded or an attribute
/// length is not a multiple of its item size.
pub fn decompress_geometry(compressed: &CompressedGeometry) -> CodecResult<GeometryBuffer> {
    let mut attributes = BTreeMap::new();

    for (name, attribute) in &compressed.attributes {
        if attribute.item_size == 0 || !attribute.values.len().is_multiple_of(attribute.item_size) {
            return Err(CodecError::InvalidFormat {
                context: "geometry attribute",
                detail: format!(
                    "'{name}' has {} values for item size {}",
                    attribute.values.len(),
                    attribute.item_size
                ),
            });
        }

        attributes.insert(
            name.clone(),
            Attribute {
                array: attribute.values.clone(),
                item_size: attribute.item_size,
                normalized: attribute.normalized,
            },
        );
    }

    let index = compressed
        .index
        .as_ref()
        .map(CompressedIndex::decode)
        .transpose()?;

    Ok(GeometryBuffer { attributes, index })
}

fn compress_attribute(attribute: &Attribute, bits: Option<u32>) -> CompressedAttribute {
    let widened = attribute.array.to_f64();

    let is_constant = widened.windows(2).all(|pair| pair[0] == pair[1]);
    let bits = bits.filter(|_| !is_constant);

    // Verbatim and passthrough keep the source array untouched.
    let values = match bits {
        Some(bits) => {
            AttributeArray::from_f64(attribute.array.kind(), &quantize(&widened, bits))
        }
        None => attribute.array.clone(),
    };

    CompressedAttribute {
        values,
        item_size: attribute.item_size,
        normalized: attribute.normalized,
        bits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GeometryBuffer {
        GeometryBuffer::new()
            .with_attribute(
                POSITION,
                Attribute::new(
                    AttributeArray::F32(vec![0.0, 0.0, 0.0, 1.0, 0.5, 0.25, -1.0, 2.0, 0.1]),
                    3,
                ),
            )
            .with_attribute(
                COLOR,
                Attribute::new(AttributeArray::U8(vec![255, 0, 0, 0, 255, 0, 0, 0, 255]), 3)
                    .normalized(),
            )
            .with_index(vec![0, 1, 2, 2, 1, 0])
    }

    #[test]
    fn test_metadata_counts_positions() {
        let compressed = compress_geometry(&sample(), CompressionLevel::Medium);
        assert_eq!(compressed.metadata.original_vertex_count, 3);
    }

    #[test]
    fn test_low_level_delta_encodes_index() {
        let compressed = compress_geometry(&sample(), CompressionLevel::Low);
        assert_eq!(
            compressed.index,
            Some(CompressedIndex::Delta(vec![0, 1, 1, 0, -1, -1]))
        );
        assert_eq!(compressed.attributes[POSITION].bits, Some(8));
    }

    #[test]
    fn test_medium_level_keeps_plain_index() {
        let compressed = compress_geometry(&sample(), CompressionLevel::Medium);
        assert_eq!(
            compressed.index,
            Some(CompressedIndex::Plain(vec![0, 1, 2, 2, 1, 0]))
        );
        assert_eq!(compressed.attributes[POSITION].bits, Some(12));
    }

    #[test]
    fn test_high_level_passes_through() {
        let geometry = sample();
        let compressed = compress_geometry(&geometry, CompressionLevel::High);
        assert_eq!(compressed.attributes[POSITION].bits, None);
        assert_eq!(decompress_geometry(&compressed).unwrap(), geometry);
    }

    #[test]
    fn test_constant_attribute_verbatim() {
        let geometry = GeometryBuffer::new().with_attribute(
            "opacity",
            Attribute::new(AttributeArray::F32(vec![0.7; 5]), 1),
        );
        let compressed = compress_geometry(&geometry, CompressionLevel::Low);
        let opacity = &compressed.attributes["opacity"];
        assert_eq!(opacity.bits, None);
        assert_eq!(opacity.values, AttributeArray::F32(vec![0.7; 5]));
    }

    #[test]
    fn test_constant_u32_attribute_is_exact() {
        let geometry = GeometryBuffer::new().with_attribute(
            "id",
            Attribute::new(AttributeArray::U32(vec![16_777_217; 3]), 1),
        );
        let compressed = compress_geometry(&geometry, CompressionLevel::Low);
        assert_eq!(compressed.attributes["id"].bits, None);
        assert_eq!(decompress_geometry(&compressed).unwrap(), geometry);
    }

    #[test]
    fn test_high_level_keeps_large_u32_values() {
        let geometry = GeometryBuffer::new().with_attribute(
            "id",
            Attribute::new(AttributeArray::U32(vec![0, 16_777_217, 33_554_433]), 1),
        );
        let compressed = compress_geometry(&geometry, CompressionLevel::High);
        assert_eq!(
            compressed.attributes["id"].values,
            AttributeArray::U32(vec![0, 16_777_217, 33_554_433])
        );
        assert_eq!(decompress_geometry(&compressed).unwrap(), geometry);
    }

    #[test]
    fn test_round_trip_restores_kinds_and_index() {
        let geometry = sample();
        let compressed = compress_geometry(&geometry, CompressionLevel::Low);
        let restored = decompress_geometry(&compressed).unwrap();

        assert_eq!(restored.index, geometry.index);
        assert_eq!(restored.attributes[COLOR], geometry.attributes[COLOR]);

        let original = geometry.attributes[POSITION].array.as_f32().unwrap();
        let restored = restored.attributes[POSITION].array.as_f32().unwrap();
        // Range is 3.0 across the whole array at 8 bits.
        let bound = 3.0 / 255.0 + 1e-6;
        for (a, b) in original.iter().zip(restored) {
            assert!((a - b).abs() <= bound, "{a} vs {b}");
        }
    }

    #[test]
    fn test_bad_item_size_rejected() {
        let mut compressed = compress_geometry(&sample(), CompressionLevel::Medium);
        compressed.attributes.get_mut(POSITION).unwrap().item_size = 4;
        assert!(matches!(
            decompress_geometry(&compressed),
            Err(CodecError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_wire_shape() {
        let compressed = compress_geometry(&sample(), CompressionLevel::Low);
        let json = serde_json::to_value(&compressed).unwrap();
        assert_eq!(json["index"]["encoding"], "delta");
        assert_eq!(json["attributes"]["color"]["values"]["type"], "u8");
        assert_eq!(json["metadata"]["original_vertex_count"], 3);
    }
}
