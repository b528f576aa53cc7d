//! Delta encoding for index buffers.

use crate::error::{CodecError, CodecResult};

/// Delta-encode a sequence.
///
/// The first value is stored verbatim, every later value as the difference
/// from its predecessor. Arithmetic wraps, so the round trip through
/// [`delta_decode`] is exact for any input.
#[must_use]
pub fn delta_encode(values: &[i64]) -> Vec<i64> {
    let mut previous = 0i64;
    values
        .iter()
        .map(|&value| {
            let delta = value.wrapping_sub(previous);
            previous = value;
            delta
        })
        .collect()
}

/// Reverse [`delta_encode`] with a running prefix sum.
#[must_use]
pub fn delta_decode(deltas: &[i64]) -> Vec<i64> {
    let mut current = 0i64;
    deltas
        .iter()
        .map(|&delta| {
            current = current.wrapping_add(delta);
            current
        })
        .collect()
}

/// Delta-encode an index buffer.
#[must_use]
pub fn encode_indices(indices: &[u32]) -> Vec<i64> {
    let widened: Vec<i64> = indices.iter().map(|&index| i64::from(index)).collect();
    delta_encode(&widened)
}

/// Decode an index buffer produced by [`encode_indices`].
///
/// # Errors
///
/// Returns an error if a reconstructed index does not fit in a `u32`.
pub fn decode_indices(deltas: &[i64]) -> CodecResult<Vec<u32>> {
    delta_decode(deltas)
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            u32::try_from(value).map_err(|_| CodecError::ValueOutOfRange { index, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty() {
        assert!(delta_encode(&[]).is_empty());
        assert!(delta_decode(&[]).is_empty());
    }

    #[test]
    fn test_first_value_verbatim() {
        assert_eq!(delta_encode(&[5, 7, 6, 6]), [5, 2, -1, 0]);
        assert_eq!(delta_decode(&[5, 2, -1, 0]), [5, 7, 6, 6]);
    }

    #[test]
    fn test_triangle_indices() {
        let indices = [0, 1, 2, 2, 1, 3];
        let encoded = encode_indices(&indices);
        assert_eq!(encoded, [0, 1, 1, 0, -1, 2]);
        assert_eq!(decode_indices(&encoded).unwrap(), indices);
    }

    #[test]
    fn test_negative_index_rejected() {
        let result = decode_indices(&[1, -2]);
        assert_eq!(
            result,
            Err(CodecError::ValueOutOfRange {
                index: 1,
                value: -1
            })
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(values in proptest::collection::vec(any::<i64>(), 0..512)) {
            prop_assert_eq!(delta_decode(&delta_encode(&values)), values);
        }

        #[test]
        fn prop_index_round_trip(indices in proptest::collection::vec(any::<u32>(), 0..512)) {
            prop_assert_eq!(decode_indices(&encode_indices(&indices)).unwrap(), indices);
        }
    }
}
