//! PLY point-cloud parsing.
//!
//! Supports `ascii`, `binary_little_endian` and `binary_big_endian` bodies.
//! Vertex properties are grouped into the standard attributes:
//!
//! - `x`, `y`, `z` → [`POSITION`]
//! - `nx`, `ny`, `nz` → [`NORMAL`]
//! - `red`, `green`, `blue` (and `alpha`) → [`COLOR`], normalized `u8` when
//!   stored as `uchar`
//!
//! Any other scalar vertex property becomes a one-component float attribute
//! of the same name. Faces are fan-triangulated into the index buffer.

use std::collections::HashMap;

use splat_codec::{
    Attribute, AttributeArray, GeometryBuffer,
    geometry::{COLOR, NORMAL, POSITION},
};

use crate::error::LoadError;

const CONTEXT: &str = "ply";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> Result<Self, LoadError> {
        Ok(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            other => {
                return Err(LoadError::parse(
                    CONTEXT,
                    format!("unknown property type '{other}'"),
                ));
            }
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Debug)]
enum Property {
    Scalar {
        name: String,
        ty: ScalarType,
    },
    List {
        name: String,
        count: ScalarType,
        item: ScalarType,
    },
}

#[derive(Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug)]
struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
}

/// Parse a PLY file into a geometry buffer.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] if the header is malformed, the body is
/// truncated, or a face references a vertex that does not exist.
pub fn parse_ply(data: &[u8]) -> Result<GeometryBuffer, LoadError> {
    let (header, body_start) = parse_header(data)?;
    let body = &data[body_start..];
    let mut reader = Reader::new(header.encoding, body)?;

    let mut columns: Vec<(String, ScalarType, Vec<f64>)> = Vec::new();
    let mut vertex_count = 0;
    let mut index = Vec::new();
    let mut has_faces = false;

    for element in &header.elements {
        if element.count > 0 && element.properties.is_empty() {
            return Err(LoadError::parse(
                CONTEXT,
                format!("element '{}' has rows but no properties", element.name),
            ));
        }
        match element.name.as_str() {
            "vertex" => {
                vertex_count = element.count;
                columns = read_vertices(&mut reader, element, body.len())?;
            }
            "face" => {
                has_faces = true;
                read_faces(&mut reader, element, &mut index)?;
            }
            _ => skip_element(&mut reader, element)?,
        }
    }

    if let Some(&bad) = index.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(LoadError::parse(
            CONTEXT,
            format!("face references vertex {bad} of {vertex_count}"),
        ));
    }

    let mut geometry = group_attributes(columns);
    if has_faces {
        geometry.index = Some(index);
    }
    Ok(geometry)
}

fn parse_header(data: &[u8]) -> Result<(Header, usize), LoadError> {
    let mut offset = 0;
    let mut lines = Vec::new();

    loop {
        let Some(end) = data[offset..].iter().position(|&b| b == b'\n') else {
            return Err(LoadError::parse(CONTEXT, "missing end_header"));
        };
        let line = std::str::from_utf8(&data[offset..offset + end])
            .map_err(|_| LoadError::parse(CONTEXT, "header is not valid text"))?
            .trim_end_matches('\r')
            .trim();
        offset += end + 1;

        if line == "end_header" {
            break;
        }
        lines.push(line);
    }

    let mut lines = lines.into_iter();
    if lines.next() != Some("ply") {
        return Err(LoadError::parse(CONTEXT, "missing 'ply' magic"));
    }

    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();

    for line in lines {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("format") => {
                encoding = Some(match words.next() {
                    Some("ascii") => Encoding::Ascii,
                    Some("binary_little_endian") => Encoding::LittleEndian,
                    Some("binary_big_endian") => Encoding::BigEndian,
                    other => {
                        return Err(LoadError::parse(
                            CONTEXT,
                            format!("unknown format {other:?}"),
                        ));
                    }
                });
            }
            Some("element") => {
                let (Some(name), Some(count)) = (words.next(), words.next()) else {
                    return Err(LoadError::parse(CONTEXT, format!("bad element line '{line}'")));
                };
                let count = count
                    .parse()
                    .map_err(|_| LoadError::parse(CONTEXT, format!("bad element count '{count}'")))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let Some(element) = elements.last_mut() else {
                    return Err(LoadError::parse(CONTEXT, "property before any element"));
                };
                let words: Vec<&str> = words.collect();
                let property = match words.as_slice() {
                    ["list", count, item, name] => Property::List {
                        name: (*name).to_string(),
                        count: ScalarType::parse(count)?,
                        item: ScalarType::parse(item)?,
                    },
                    [ty, name] => Property::Scalar {
                        name: (*name).to_string(),
                        ty: ScalarType::parse(ty)?,
                    },
                    _ => {
                        return Err(LoadError::parse(
                            CONTEXT,
                            format!("bad property line '{line}'"),
                        ));
                    }
                };
                element.properties.push(property);
            }
            Some("comment" | "obj_info") | None => {}
            Some(other) => {
                return Err(LoadError::parse(
                    CONTEXT,
                    format!("unknown header keyword '{other}'"),
                ));
            }
        }
    }

    let encoding = encoding.ok_or_else(|| LoadError::parse(CONTEXT, "missing format line"))?;
    Ok((Header { encoding, elements }, offset))
}

/// Reads scalar values from an ascii or binary body.
enum Reader<'a> {
    Ascii(std::str::SplitAsciiWhitespace<'a>),
    Binary {
        data: &'a [u8],
        offset: usize,
        big_endian: bool,
    },
}

impl<'a> Reader<'a> {
    fn new(encoding: Encoding, body: &'a [u8]) -> Result<Self, LoadError> {
        Ok(match encoding {
            Encoding::Ascii => Reader::Ascii(
                std::str::from_utf8(body)
                    .map_err(|_| LoadError::parse(CONTEXT, "ascii body is not valid text"))?
                    .split_ascii_whitespace(),
            ),
            Encoding::LittleEndian => Reader::Binary {
                data: body,
                offset: 0,
                big_endian: false,
            },
            Encoding::BigEndian => Reader::Binary {
                data: body,
                offset: 0,
                big_endian: true,
            },
        })
    }

    fn read(&mut self, ty: ScalarType) -> Result<f64, LoadError> {
        match self {
            Reader::Ascii(tokens) => {
                let token = tokens
                    .next()
                    .ok_or_else(|| LoadError::parse(CONTEXT, "unexpected end of body"))?;
                token
                    .parse()
                    .map_err(|_| LoadError::parse(CONTEXT, format!("bad number '{token}'")))
            }
            Reader::Binary {
                data,
                offset,
                big_endian,
            } => {
                let size = ty.size();
                let bytes = data
                    .get(*offset..*offset + size)
                    .ok_or_else(|| LoadError::parse(CONTEXT, "unexpected end of body"))?;
                *offset += size;
                Ok(decode_binary(ty, bytes, *big_endian))
            }
        }
    }

    fn read_index(&mut self, ty: ScalarType) -> Result<usize, LoadError> {
        let value = self.read(ty)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(LoadError::parse(CONTEXT, format!("bad list value {value}")));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = value as usize;
        Ok(index)
    }
}

fn decode_binary(ty: ScalarType, bytes: &[u8], big_endian: bool) -> f64 {
    macro_rules! read {
        ($t:ty) => {{
            let mut buf = [0u8; std::mem::size_of::<$t>()];
            buf.copy_from_slice(bytes);
            if big_endian {
                <$t>::from_be_bytes(buf)
            } else {
                <$t>::from_le_bytes(buf)
            }
        }};
    }

    match ty {
        ScalarType::I8 => f64::from(read!(i8)),
        ScalarType::U8 => f64::from(read!(u8)),
        ScalarType::I16 => f64::from(read!(i16)),
        ScalarType::U16 => f64::from(read!(u16)),
        ScalarType::I32 => f64::from(read!(i32)),
        ScalarType::U32 => f64::from(read!(u32)),
        ScalarType::F32 => f64::from(read!(f32)),
        ScalarType::F64 => read!(f64),
    }
}

fn read_vertices(
    reader: &mut Reader<'_>,
    element: &Element,
    body_len: usize,
) -> Result<Vec<(String, ScalarType, Vec<f64>)>, LoadError> {
    // Every row takes at least one byte, so the body bounds the row count.
    let capacity = element.count.min(body_len);
    let mut columns: Vec<(String, ScalarType, Vec<f64>)> = element
        .properties
        .iter()
        .filter_map(|p| match p {
            Property::Scalar { name, ty } => {
                Some((name.clone(), *ty, Vec::with_capacity(capacity)))
            }
            Property::List { .. } => None,
        })
        .collect();

    for _ in 0..element.count {
        let mut column = 0;
        for property in &element.properties {
            match property {
                Property::Scalar { ty, .. } => {
                    let value = reader.read(*ty)?;
                    columns[column].2.push(value);
                    column += 1;
                }
                Property::List { count, item, .. } => {
                    let n = reader.read_index(*count)?;
                    for _ in 0..n {
                        reader.read(*item)?;
                    }
                }
            }
        }
    }

    Ok(columns)
}

fn read_faces(
    reader: &mut Reader<'_>,
    element: &Element,
    index: &mut Vec<u32>,
) -> Result<(), LoadError> {
    let mut polygon = Vec::new();

    for _ in 0..element.count {
        for property in &element.properties {
            match property {
                Property::List { name, count, item }
                    if name == "vertex_indices" || name == "vertex_index" =>
                {
                    let n = reader.read_index(*count)?;
                    polygon.clear();
                    for _ in 0..n {
                        let i = reader.read_index(*item)?;
                        polygon.push(u32::try_from(i).map_err(|_| {
                            LoadError::parse(CONTEXT, format!("face index {i} too large"))
                        })?);
                    }
                    triangulate_fan(&polygon, index);
                }
                Property::List { count, item, .. } => {
                    let n = reader.read_index(*count)?;
                    for _ in 0..n {
                        reader.read(*item)?;
                    }
                }
                Property::Scalar { ty, .. } => {
                    reader.read(*ty)?;
                }
            }
        }
    }

    Ok(())
}

fn skip_element(reader: &mut Reader<'_>, element: &Element) -> Result<(), LoadError> {
    for _ in 0..element.count {
        for property in &element.properties {
            match property {
                Property::Scalar { ty, .. } => {
                    reader.read(*ty)?;
                }
                Property::List { count, item, .. } => {
                    let n = reader.read_index(*count)?;
                    for _ in 0..n {
                        reader.read(*item)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Split a convex polygon into triangles sharing its first vertex.
pub(crate) fn triangulate_fan(polygon: &[u32], out: &mut Vec<u32>) {
    if let Some((&first, rest)) = polygon.split_first() {
        for pair in rest.windows(2) {
            out.extend_from_slice(&[first, pair[0], pair[1]]);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn group_attributes(columns: Vec<(String, ScalarType, Vec<f64>)>) -> GeometryBuffer {
    let mut columns: HashMap<String, (ScalarType, Vec<f64>)> = columns
        .into_iter()
        .map(|(name, ty, values)| (name, (ty, values)))
        .collect();

    let mut geometry = GeometryBuffer::new();

    let mut take = |names: &[&str]| -> Option<Vec<(ScalarType, Vec<f64>)>> {
        if !names.iter().all(|n| columns.contains_key(*n)) {
            return None;
        }
        Some(names.iter().filter_map(|n| columns.remove(*n)).collect())
    };

    if let Some(xyz) = take(&["x", "y", "z"]) {
        geometry = geometry.with_attribute(POSITION, Attribute::new(interleave_f32(&xyz), 3));
    }
    if let Some(normals) = take(&["nx", "ny", "nz"]) {
        geometry = geometry.with_attribute(NORMAL, Attribute::new(interleave_f32(&normals), 3));
    }
    let rgba = take(&["red", "green", "blue", "alpha"]).or_else(|| take(&["red", "green", "blue"]));
    if let Some(channels) = rgba {
        let item_size = channels.len();
        let attribute = if channels.iter().all(|(ty, _)| *ty == ScalarType::U8) {
            let count = channels.first().map_or(0, |(_, v)| v.len());
            let mut values = Vec::with_capacity(count * item_size);
            for i in 0..count {
                #[allow(clippy::cast_sign_loss)]
                values.extend(channels.iter().map(|(_, v)| v[i] as u8));
            }
            Attribute::new(AttributeArray::U8(values), item_size).normalized()
        } else {
            Attribute::new(interleave_f32(&channels), item_size)
        };
        geometry = geometry.with_attribute(COLOR, attribute);
    }

    for (name, (_, values)) in columns {
        let values = values.into_iter().map(|v| v as f32).collect();
        geometry = geometry.with_attribute(name, Attribute::new(AttributeArray::F32(values), 1));
    }

    geometry
}

#[allow(clippy::cast_possible_truncation)]
fn interleave_f32(channels: &[(ScalarType, Vec<f64>)]) -> AttributeArray {
    let count = channels.first().map_or(0, |(_, v)| v.len());
    let mut values = Vec::with_capacity(count * channels.len());
    for i in 0..count {
        values.extend(channels.iter().map(|(_, v)| v[i] as f32));
    }
    AttributeArray::F32(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII: &str = "ply
format ascii 1.0
comment made by hand
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
property float opacity
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255 0 0 0.5
1 0 0 0 255 0 0.5
1 1 0 0 0 255 1
0 1 0 10 20 30 1
4 0 1 2 3
";

    #[test]
    fn test_huge_element_count_is_parse_error() {
        let ply = format!(
            "ply\nformat binary_little_endian 1.0\nelement vertex {}\nproperty float x\nend_header\n",
            usize::MAX
        );
        assert!(matches!(
            parse_ply(ply.as_bytes()),
            Err(LoadError::Parse { .. })
        ));

        let ply = format!(
            "ply\nformat ascii 1.0\nelement vertex {}\nend_header\n",
            usize::MAX
        );
        assert!(matches!(
            parse_ply(ply.as_bytes()),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_ascii() {
        let geometry = parse_ply(ASCII.as_bytes()).unwrap();

        let position = geometry.attribute(POSITION).unwrap();
        assert_eq!(position.item_size, 3);
        assert_eq!(position.count(), 4);
        assert_eq!(
            position.array.as_f32().unwrap()[6..9],
            [1.0, 1.0, 0.0]
        );

        let color = geometry.attribute(COLOR).unwrap();
        assert!(color.normalized);
        assert_eq!(color.array.kind(), splat_codec::ArrayKind::U8);
        assert_eq!(color.item_size, 3);

        let opacity = geometry.attribute("opacity").unwrap();
        assert_eq!(opacity.item_size, 1);
        assert_eq!(opacity.array.as_f32().unwrap(), [0.5, 0.5, 1.0, 1.0]);

        assert_eq!(geometry.index, Some(vec![0, 1, 2, 0, 2, 3]));
    }

    fn binary(big_endian: bool) -> Vec<u8> {
        let format = if big_endian {
            "binary_big_endian"
        } else {
            "binary_little_endian"
        };
        let mut data = format!(
            "ply\nformat {format} 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nproperty float nx\nproperty float ny\nproperty float nz\nend_header\n"
        )
        .into_bytes();
        for v in [1.0f32, 2.0, 3.0, 0.0, 0.0, 1.0, -1.0, -2.0, -3.0, 0.0, 1.0, 0.0] {
            if big_endian {
                data.extend_from_slice(&v.to_be_bytes());
            } else {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn test_binary_both_endians() {
        for big_endian in [false, true] {
            let geometry = parse_ply(&binary(big_endian)).unwrap();
            assert_eq!(
                geometry.attribute(POSITION).unwrap().array.as_f32().unwrap(),
                [1.0, 2.0, 3.0, -1.0, -2.0, -3.0]
            );
            assert_eq!(
                geometry.attribute(NORMAL).unwrap().array.as_f32().unwrap(),
                [0.0, 0.0, 1.0, 0.0, 1.0, 0.0]
            );
            assert!(geometry.index.is_none());
        }
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = binary(false);
        data.truncate(data.len() - 2);
        assert!(matches!(parse_ply(&data), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_bad_header() {
        assert!(parse_ply(b"not a ply\nend_header\n").is_err());
        assert!(parse_ply(b"ply\nformat ascii 1.0\n").is_err());
        assert!(parse_ply(b"ply\nelement vertex 1\nproperty float x\nend_header\n1\n").is_err());
        assert!(parse_ply(b"ply\nformat ascii 1.0\nelement vertex 1\nproperty half x\nend_header\n1\n").is_err());
    }

    #[test]
    fn test_face_out_of_range() {
        let data = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar uint vertex_index\nend_header\n0 0 0\n3 0 1 2\n";
        assert!(matches!(
            parse_ply(data.as_bytes()),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_triangulate_fan() {
        let mut out = Vec::new();
        triangulate_fan(&[5, 6, 7, 8, 9], &mut out);
        assert_eq!(out, [5, 6, 7, 5, 7, 8, 5, 8, 9]);

        out.clear();
        triangulate_fan(&[1, 2], &mut out);
        assert!(out.is_empty());
    }
}
