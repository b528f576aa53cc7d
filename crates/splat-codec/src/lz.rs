//! Greedy sliding-window match compression.
//!
//! The stream is a sequence of tokens:
//!
//! - `0xxxxxxx`: a literal byte with the high bit clear.
//! - `1LLLLLLL oo oo`: a back-reference of `L + 4` bytes, starting `offset`
//!   bytes before the current output position (`offset` is little-endian).
//! - `1NNNNNNN 00 00 <N + 1 bytes>`: a run of raw literal bytes. Offset zero
//!   can never be a real back-reference, so it marks literals that have the
//!   high bit set.
//!
//! The match search is a naive scan over the whole window, so compression
//! is `O(window * n)`. Decompression is linear.

use crate::error::{CodecError, CodecResult};

/// Shortest match worth encoding as a back-reference.
pub const MIN_MATCH: usize = 4;

/// Longest match the 7-bit length field can express.
pub const MAX_MATCH: usize = 0x7F + MIN_MATCH;

/// How far back the encoder searches for a match.
pub const WINDOW_SIZE: usize = u16::MAX as usize;

/// Longest raw literal run a single escape token can carry.
const MAX_LITERAL_RUN: usize = 0x7F + 1;

const TOKEN_FLAG: u8 = 0x80;

/// Compress a byte slice.
#[must_use]
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < input.len() {
        let (length, offset) = longest_match(input, pos);

        if length >= MIN_MATCH {
            emit_literals(&mut out, &input[literal_start..pos]);

            #[allow(clippy::cast_possible_truncation)]
            out.push(TOKEN_FLAG | (length - MIN_MATCH) as u8);
            #[allow(clippy::cast_possible_truncation)]
            out.extend_from_slice(&(offset as u16).to_le_bytes());

            pos += length;
            literal_start = pos;
        } else {
            pos += 1;
        }
    }

    emit_literals(&mut out, &input[literal_start..]);
    out
}

/// Decompress a byte slice produced by [`compress`].
///
/// # Errors
///
/// Returns an error if a token is truncated or a back-reference points
/// before the start of the output.
pub fn decompress(input: &[u8]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut pos = 0;

    while pos < input.len() {
        let control = input[pos];
        pos += 1;

        if control & TOKEN_FLAG == 0 {
            out.push(control);
            continue;
        }

        let low = usize::from(control & !TOKEN_FLAG);
        let Some(&[lo, hi]) = input.get(pos..pos + 2) else {
            return Err(CodecError::UnexpectedEof {
                context: "match offset",
            });
        };
        pos += 2;
        let offset = usize::from(u16::from_le_bytes([lo, hi]));

        if offset == 0 {
            let run = low + 1;
            let Some(literals) = input.get(pos..pos + run) else {
                return Err(CodecError::UnexpectedEof {
                    context: "literal run",
                });
            };
            out.extend_from_slice(literals);
            pos += run;
            continue;
        }

        if offset > out.len() {
            return Err(CodecError::OffsetOutOfRange {
                offset,
                produced: out.len(),
            });
        }

        // Byte-at-a-time so a copy may read output it is still producing.
        let start = out.len() - offset;
        for i in 0..low + MIN_MATCH {
            let byte = out[start + i];
            out.push(byte);
        }
    }

    Ok(out)
}

/// Find the longest earlier match for `input[pos..]`.
///
/// Returns `(length, offset)`. Candidates are scanned oldest first and only
/// a strictly longer match replaces the current best.
fn longest_match(input: &[u8], pos: usize) -> (usize, usize) {
    let max_len = MAX_MATCH.min(input.len() - pos);
    if max_len < MIN_MATCH {
        return (0, 0);
    }

    let ahead = &input[pos..pos + max_len];
    let mut best = (0, 0);

    for candidate in pos.saturating_sub(WINDOW_SIZE)..pos {
        // The candidate may run into `ahead` itself; the decoder copies
        // byte by byte, so overlapping references decode correctly.
        let length = input[candidate..]
            .iter()
            .zip(ahead)
            .take_while(|(a, b)| a == b)
            .count();

        if length > best.0 {
            best = (length, pos - candidate);
            if length == max_len {
                break;
            }
        }
    }

    best
}

fn emit_literals(out: &mut Vec<u8>, literals: &[u8]) {
    if literals.iter().all(|byte| byte & TOKEN_FLAG == 0) {
        out.extend_from_slice(literals);
        return;
    }

    for chunk in literals.chunks(MAX_LITERAL_RUN) {
        #[allow(clippy::cast_possible_truncation)]
        out.push(TOKEN_FLAG | (chunk.len() - 1) as u8);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(chunk);
    }
}
