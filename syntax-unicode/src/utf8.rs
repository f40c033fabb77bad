//! Encodes a [`RangeTable`](crate::RangeTable) of Unicode scalar values into
//! the byte-range sequences their UTF-8 encodings occupy.
//!
//! A single contiguous code point range can straddle UTF-8's 1/2/3/4-byte
//! length boundaries, so the encoded form is a list of *byte sequences*, each
//! a fixed-length run of `(lo, hi)` byte ranges. `regex-syntax` already
//! implements this splitting (it needs it for the same reason: building byte
//! oriented automata for `\p{...}` classes), so we reuse
//! [`regex_syntax::utf8::Utf8Sequences`] instead of re-deriving the UTF-8
//! boundary arithmetic.

use regex_syntax::utf8::{Utf8Range, Utf8Sequence, Utf8Sequences};

use crate::tables::RangeTable;

/// One run of byte ranges that together match a contiguous slice of UTF-8
/// encoded code points, e.g. `[(0xE0,0xEF), (0x80,0xBF), (0x80,0xBF)]` for
/// some range of 3-byte sequences.
pub type ByteSequence = Vec<(u8, u8)>;

/// Every byte sequence needed to accept exactly the code points in `table`.
///
/// Byte sequences of the same length with adjacent/overlapping leading bytes
/// are not merged further here; that's the DFA minimizer's job once this is
/// embedded into a full NFA/DFA.
pub fn byte_sequences(table: &RangeTable) -> Vec<ByteSequence> {
    let mut out = Vec::new();
    for &(lo, hi) in table.ranges() {
        let lo = char::from_u32(lo);
        let hi = char::from_u32(hi);
        let (Some(lo), Some(hi)) = (lo, hi) else {
            // Surrogate-range holes in the table (not valid scalar values)
            // contribute no encodable sequence.
            continue;
        };
        for seq in Utf8Sequences::new(lo, hi) {
            out.push(sequence_to_ranges(seq));
        }
    }
    out
}

fn sequence_to_ranges(seq: Utf8Sequence) -> ByteSequence {
    seq.as_slice().iter().map(range_to_pair).collect()
}

fn range_to_pair(r: &Utf8Range) -> (u8, u8) {
    (r.start, r.end)
}
