//! LZSS codec for the compressed sub-blocks of section 0.
//!
//! The wire format is a sequence of groups: one flag byte followed by 8
//! tokens.  Bit `k` of the flag byte (LSB first) governs token `k` — set for
//! a one-byte literal, clear for a two-byte back-reference `B1 B2` with
//! `index = B1 | ((B2 & 0xF0) << 4)` and `length = (B2 & 0x0F) + 3`.
//! Back-references copy byte-by-byte through the dictionary, so a reference
//! may read bytes it has just written (run-length expansion).
//!
//! Blocks carry no explicit length; a stream ends either at EOF or at a
//! zero flag byte followed by 16 zero bytes, the padding that aligns the
//! next sub-block to a 2048-byte offset.

use thiserror::Error;

pub mod dict;

use dict::{RingDict, DICT_SIZE, MAX_MATCH, MIN_MATCH};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compressed stream ended inside a back-reference")]
    TruncatedStream,
    #[error("decoded output would exceed the {limit}-byte budget")]
    OutputOverflow { limit: usize },
    #[error("encoder produced an out-of-range match (index {index}, length {length})")]
    EncoderInvariant { index: usize, length: usize },
}

// ── Decoder ──────────────────────────────────────────────────────────────────

/// Decompress a sub-block with no output budget.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    decompress_bounded(input, usize::MAX)
}

/// Decompress a sub-block, failing with [`CodecError::OutputOverflow`] once
/// the output would exceed `limit` bytes.
pub fn decompress_bounded(input: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
    let mut dict = RingDict::new();
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let flags = input[pos];
        if flags == 0x00 && is_terminator(&input[pos + 1..]) {
            break;
        }
        pos += 1;

        for bit in 0..8 {
            // EOF at a token boundary is a clean stop.
            if pos == input.len() {
                return Ok(out);
            }
            if (flags >> bit) & 1 == 1 {
                let byte = input[pos];
                pos += 1;
                emit(&mut out, &mut dict, byte, limit)?;
            } else {
                if pos + 2 > input.len() {
                    return Err(CodecError::TruncatedStream);
                }
                let b1 = usize::from(input[pos]);
                let b2 = usize::from(input[pos + 1]);
                pos += 2;
                let index = b1 | ((b2 & 0xF0) << 4);
                let length = (b2 & 0x0F) + MIN_MATCH;
                for k in 0..length {
                    let byte = dict.read_at(index + k);
                    emit(&mut out, &mut dict, byte, limit)?;
                }
            }
        }
    }
    Ok(out)
}

/// A zero flag byte terminates the stream only when 16 more zero bytes
/// follow; 15 zeros and a non-zero byte are a legitimate all-back-reference
/// group.
fn is_terminator(rest: &[u8]) -> bool {
    rest.len() >= 16 && rest[..16].iter().all(|&b| b == 0)
}

fn emit(out: &mut Vec<u8>, dict: &mut RingDict, byte: u8, limit: usize) -> Result<(), CodecError> {
    if out.len() >= limit {
        return Err(CodecError::OutputOverflow { limit });
    }
    out.push(byte);
    dict.push(byte);
    Ok(())
}

// ── Encoder ──────────────────────────────────────────────────────────────────

/// Compress `input` into the flag-group wire format.
///
/// Greedy: the longest dictionary match wins, most recent position on ties,
/// literal when nothing of length >= 3 matches.  The final group is padded
/// with literal-zero tokens, so decoding the result may append up to 7 zero
/// bytes beyond `input`.  Two runs over the same input produce identical
/// output.
pub fn compress(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut dict = RingDict::new();
    let mut out = Vec::with_capacity(input.len() + input.len() / 8 + 16);
    let mut pos = 0;

    while pos < input.len() {
        let mut flags = 0u8;
        let mut tokens: Vec<u8> = Vec::with_capacity(16);

        for bit in 0..8 {
            if pos == input.len() {
                flags |= 1 << bit;
                tokens.push(0x00);
                continue;
            }
            let lookahead = &input[pos..input.len().min(pos + MAX_MATCH)];
            match dict.find_longest(lookahead, MAX_MATCH) {
                Some((length, index)) if length >= MIN_MATCH => {
                    if index >= DICT_SIZE || length > MAX_MATCH {
                        return Err(CodecError::EncoderInvariant { index, length });
                    }
                    tokens.push((index & 0xFF) as u8);
                    tokens.push((((index & 0xF00) >> 4) | (length - MIN_MATCH)) as u8);
                    for &byte in &input[pos..pos + length] {
                        dict.push(byte);
                    }
                    pos += length;
                }
                _ => {
                    flags |= 1 << bit;
                    let byte = input[pos];
                    tokens.push(byte);
                    dict.push(byte);
                    pos += 1;
                }
            }
        }
        out.push(flags);
        out.extend_from_slice(&tokens);
    }
    Ok(out)
}
