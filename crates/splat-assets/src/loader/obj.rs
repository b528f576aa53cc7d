//! Wavefront OBJ mesh parsing.
//!
//! Only vertex positions (`v`) and faces (`f`) are read. Faces accept the
//! `v`, `v/vt`, `v//vn` and `v/vt/vn` forms with 1-based or negative
//! (relative) indices and are fan-triangulated.

use splat_codec::{Attribute, AttributeArray, GeometryBuffer, geometry::POSITION};

use super::ply::triangulate_fan;
use crate::error::LoadError;

const CONTEXT: &str = "obj";

/// Parse OBJ text into a geometry buffer with positions and an index.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] with the offending line number if a record
/// is malformed or a face references a missing vertex.
pub fn parse_obj(data: &[u8]) -> Result<GeometryBuffer, LoadError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| LoadError::parse(CONTEXT, "file is not valid text"))?;

    let mut positions: Vec<f32> = Vec::new();
    let mut index = Vec::new();
    let mut polygon = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line_error = |detail: String| LoadError::parse(CONTEXT, format!("line {}: {detail}", number + 1));

        let line = line.split('#').next().unwrap_or_default().trim();
        let mut words = line.split_whitespace();

        match words.next() {
            Some("v") => {
                let mut count = 0;
                for word in words.by_ref().take(3) {
                    let value: f32 = word
                        .parse()
                        .map_err(|_| line_error(format!("bad coordinate '{word}'")))?;
                    positions.push(value);
                    count += 1;
                }
                if count != 3 {
                    return Err(line_error("vertex needs three coordinates".to_string()));
                }
            }
            Some("f") => {
                let vertex_count = positions.len() / 3;
                polygon.clear();
                for word in words {
                    polygon.push(
                        resolve_index(word, vertex_count).map_err(line_error)?,
                    );
                }
                if polygon.len() < 3 {
                    return Err(line_error("face needs at least three vertices".to_string()));
                }
                triangulate_fan(&polygon, &mut index);
            }
            _ => {}
        }
    }

    let mut geometry = GeometryBuffer::new()
        .with_attribute(POSITION, Attribute::new(AttributeArray::F32(positions), 3));
    if !index.is_empty() {
        geometry.index = Some(index);
    }
    Ok(geometry)
}

/// Resolve the position part of a face vertex to a 0-based index.
fn resolve_index(word: &str, vertex_count: usize) -> Result<u32, String> {
    let position = word.split('/').next().unwrap_or_default();
    let raw: i64 = position
        .parse()
        .map_err(|_| format!("bad face vertex '{word}'"))?;

    let count = i64::try_from(vertex_count).unwrap_or(i64::MAX);
    let resolved = match raw {
        0 => return Err("face index 0 is invalid".to_string()),
        n if n > 0 => n - 1,
        n => count + n,
    };

    if resolved < 0 || resolved >= count {
        return Err(format!(
            "face vertex {raw} out of range for {vertex_count} vertices"
        ));
    }
    u32::try_from(resolved).map_err(|_| format!("face vertex {raw} too large"))
}
