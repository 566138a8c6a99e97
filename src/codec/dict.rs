//! The 4096-byte ring dictionary shared by the LZSS encoder and decoder.
//!
//! The window starts with its write cursor at `DICT_SIZE - MAX_MATCH` and an
//! empty fill level; back-references carry absolute 12-bit indices into the
//! window, not distances.  Reads of indices that have not been written yet
//! are remapped into the populated suffix (see [`RingDict::read_at`]), which
//! reproduces the byte output of streams whose early back-references reach
//! into unwritten slots.

/// Window capacity in bytes.
pub const DICT_SIZE: usize = 4096;
/// Shortest back-reference the wire format can express.
pub const MIN_MATCH: usize = 3;
/// Longest back-reference the wire format can express.
pub const MAX_MATCH: usize = 18;
/// Write cursor position of a freshly initialized dictionary.
pub const INITIAL_CURSOR: usize = DICT_SIZE - MAX_MATCH;

pub struct RingDict {
    buf: [u8; DICT_SIZE],
    cursor: usize,
    fill: usize,
}

impl RingDict {
    pub fn new() -> Self {
        Self {
            buf: [0u8; DICT_SIZE],
            cursor: INITIAL_CURSOR,
            fill: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn fill(&self) -> usize {
        self.fill
    }

    /// Write one byte at the cursor, advancing it modulo the window size.
    /// The fill level saturates at the window size.
    pub fn push(&mut self, byte: u8) {
        self.buf[self.cursor] = byte;
        self.cursor = (self.cursor + 1) % DICT_SIZE;
        self.fill = (self.fill + 1).min(DICT_SIZE);
    }

    /// Read the byte at logical index `i`.
    ///
    /// Once the window is full this is a plain `i mod 4096` read.  Before
    /// that, only the suffix `[cursor - fill, cursor)` holds live bytes, and
    /// `i` is folded into it: with `shift = cursor - fill`, the effective
    /// index is `((i - shift) mod 4096 mod fill) + shift`.
    pub fn read_at(&self, i: usize) -> u8 {
        self.buf[Self::slot(i, self.cursor, self.fill)]
    }

    fn slot(i: usize, cursor: usize, fill: usize) -> usize {
        if fill == 0 || fill >= DICT_SIZE {
            return i % DICT_SIZE;
        }
        let shift = (cursor + DICT_SIZE - fill) % DICT_SIZE;
        let rel = (i % DICT_SIZE + DICT_SIZE - shift) % DICT_SIZE;
        (shift + rel % fill) % DICT_SIZE
    }

    /// Longest prefix of `lookahead` present in the window, searching from
    /// the most recently written byte backwards.  Candidate positions run
    /// from `cursor - 2` back through the byte after the oldest live one;
    /// distances 0 and 1 and the oldest byte itself are never candidates.
    /// Returns `(length, index)` for the best match of length >= 1, `None`
    /// when nothing matches.  Ties go to the most recent position.
    pub fn find_longest(&self, lookahead: &[u8], max_len: usize) -> Option<(usize, usize)> {
        let limit = max_len.min(MAX_MATCH).min(lookahead.len());
        if limit == 0 {
            return None;
        }
        let mut best: Option<(usize, usize)> = None;
        let mut best_len = 0;
        for dist in 2..self.fill {
            let start = (self.cursor + DICT_SIZE - dist) % DICT_SIZE;
            let len = self.match_length(start, lookahead, limit);
            if len > best_len {
                best_len = len;
                best = Some((len, start));
                if len == limit {
                    break;
                }
            }
        }
        best
    }

    /// Length of the match at `start` against `lookahead`, evaluated under
    /// the decoder's advancing state: byte `n` of the copy is read with the
    /// cursor and fill level `n` steps ahead, and slots the copy itself has
    /// written by then hold the already-matched lookahead bytes.  Matches may
    /// therefore run past the cursor (run-length expansion).
    fn match_length(&self, start: usize, lookahead: &[u8], limit: usize) -> usize {
        let mut n = 0;
        while n < limit {
            let cursor = (self.cursor + n) % DICT_SIZE;
            let fill = (self.fill + n).min(DICT_SIZE);
            let idx = Self::slot(start + n, cursor, fill);
            let written = (idx + DICT_SIZE - self.cursor) % DICT_SIZE;
            let byte = if written < n {
                lookahead[written]
            } else {
                self.buf[idx]
            };
            if byte != lookahead[n] {
                break;
            }
            n += 1;
        }
        n
    }
}

impl Default for RingDict {
    fn default() -> Self {
        Self::new()
    }
}
