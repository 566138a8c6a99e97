use thiserror::Error;

use crate::header::{self, HeaderError, ParsedHeader, HEADER_SIZE};

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("input ended inside a section header at offset {offset}")]
    TruncatedHeader { offset: usize },
    #[error("section body truncated: header declares {expected} bytes, {available} remain")]
    TruncatedSection { expected: u64, available: usize },
    #[error("section checksum mismatch: header says {expected}, body sums to {actual}")]
    ChecksumMismatch { expected: u64, actual: u64 },
    #[error(transparent)]
    Header(#[from] HeaderError),
}

/// One `(header, body)` pair of the container.
#[derive(Debug, Clone)]
pub struct Section {
    /// The verbatim 256-byte header text, padding included.
    pub raw_header: String,
    pub header: ParsedHeader,
    pub body: Vec<u8>,
}

/// Sequential reader over a firmware image.
///
/// Sections are back-to-back: a 256-byte ASCII header, then exactly
/// `LENGTH` body bytes, then the next header.  A zero-length read at a
/// header position is end of file; a short one is an error.
pub struct SectionReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        // X-A10 images open with two pad spaces before the first header.
        let pos = data.iter().take_while(|&&b| b == b' ').count();
        Self { data, pos }
    }

    pub fn next_section(&mut self) -> Result<Option<Section>, SectionError> {
        if self.pos == self.data.len() {
            return Ok(None);
        }
        if self.data.len() - self.pos < HEADER_SIZE {
            return Err(SectionError::TruncatedHeader { offset: self.pos });
        }
        let raw = &self.data[self.pos..self.pos + HEADER_SIZE];
        let text = header::decode_raw(raw)?;
        let parsed = header::parse_header(text)?;
        self.pos += HEADER_SIZE;

        let available = self.data.len() - self.pos;
        if (available as u64) < parsed.section_length {
            return Err(SectionError::TruncatedSection {
                expected: parsed.section_length,
                available,
            });
        }
        let body = self.data[self.pos..self.pos + parsed.section_length as usize].to_vec();
        self.pos += body.len();

        let actual = byte_sum(&body);
        if actual != parsed.section_sum {
            return Err(SectionError::ChecksumMismatch {
                expected: parsed.section_sum,
                actual,
            });
        }

        Ok(Some(Section {
            raw_header: text.to_owned(),
            header: parsed,
            body,
        }))
    }

    pub fn read_all(data: &'a [u8]) -> Result<Vec<Section>, SectionError> {
        let mut reader = SectionReader::new(data);
        let mut sections = Vec::new();
        while let Some(section) = reader.next_section()? {
            sections.push(section);
        }
        Ok(sections)
    }
}

/// Unbounded unsigned byte sum, the container's checksum.
pub fn byte_sum(body: &[u8]) -> u64 {
    body.iter().map(|&b| u64::from(b)).sum()
}
