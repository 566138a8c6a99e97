//! Sub-section boundary heuristic for section 0.
//!
//! The container records no sub-section table.  The only available signal is
//! the padding convention: each compressed sub-block is padded with zeros up
//! to the next 2048-byte offset.  A maximal zero run that ends exactly at an
//! aligned offset, longer than 16 bytes, marks that offset as a boundary.
//! A real sub-block ending within a few bytes of an aligned offset without
//! enough trailing zeros goes undetected; callers surface a warning when the
//! heuristic runs.

/// Sub-blocks start at multiples of this offset within section 0.
pub const SUB_ALIGN: usize = 2048;

/// A zero run must be strictly longer than this to count as padding.
const MIN_PAD_RUN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSection {
    pub offset: usize,
    pub length: usize,
    pub compressed: bool,
}

/// Boundary offsets within `body`, in ascending order.
pub fn boundaries(body: &[u8]) -> Vec<usize> {
    let mut bounds = Vec::new();
    let mut i = 0;
    while i < body.len() {
        if body[i] != 0 {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < body.len() && body[i] == 0 {
            i += 1;
        }
        if i < body.len() && i % SUB_ALIGN == 0 && i - run_start > MIN_PAD_RUN {
            bounds.push(i);
        }
    }
    bounds
}

/// Partition section 0 into `[0, b1), [b1, b2), …, [bn, end)`.  The first
/// partition is the uncompressed prologue; the rest are compressed.
pub fn partition(body: &[u8]) -> Vec<SubSection> {
    let mut subs = Vec::new();
    let mut start = 0;
    for bound in boundaries(body) {
        subs.push(SubSection {
            offset: start,
            length: bound - start,
            compressed: start != 0,
        });
        start = bound;
    }
    subs.push(SubSection {
        offset: start,
        length: body.len() - start,
        compressed: start != 0,
    });
    subs
}
