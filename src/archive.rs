//! High-level operations over firmware images — the primary embedding
//! surface.  Everything here works on byte buffers; path handling belongs to
//! the caller.
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! let image = std::fs::read("firmware.bin")?;
//! let unpacked = m1pack::archive::unpack(&image, "firmware.bin")?;
//!
//! let files: HashMap<String, Vec<u8>> = unpacked
//!     .files
//!     .into_iter()
//!     .map(|f| (f.name, f.data))
//!     .collect();
//! let rebuilt = m1pack::archive::repack(&unpacked.manifest, &files)?;
//! assert_eq!(rebuilt, image);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{self, FirmwareEntry};
use crate::codec::{self, CodecError};
use crate::header::{self, HeaderError, ParsedHeader};
use crate::manifest::{Manifest, ManifestSection, ManifestSubsection, MANIFEST_VERSION};
use crate::section::{byte_sum, SectionError, SectionReader};
use crate::split::{self, SUB_ALIGN};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("first header names neither M1INT nor M1CN; cannot determine region")]
    UnknownRegion,
    #[error("repack requires the manifest produced by unpack")]
    MetadataMissing,
    #[error("unsupported manifest version {0}")]
    UnsupportedManifestVersion(u32),
    #[error("manifest references `{0}` but no such file was provided")]
    MissingFile(String),
    #[error("manifest lists compressed sub-section `{0}` with no decompressed image")]
    MissingDecompressedImage(String),
}

// ── Unpack ───────────────────────────────────────────────────────────────────

/// One file produced by [`unpack`].
#[derive(Debug, Clone)]
pub struct UnpackedFile {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct Unpacked {
    pub manifest: Manifest,
    pub files: Vec<UnpackedFile>,
}

/// Split a firmware image into section files, sub-section files, and the
/// manifest that [`repack`] needs to rebuild it.
///
/// Section 0 is sub-sectioned only when the catalog recognizes the identity
/// triple of the leading header; a catalog miss is a warning, not an error,
/// and unpacking continues with the section body kept whole.  Every
/// compressed sub-section is emitted twice: the raw block and its
/// decompressed image.
pub fn unpack(input: &[u8], source_name: &str) -> Result<Unpacked, ArchiveError> {
    let stem = file_stem(source_name);
    let sections = SectionReader::read_all(input)?;

    let mut files = Vec::new();
    let mut entries = Vec::new();

    for (i, section) in sections.iter().enumerate() {
        let filename = format!("{stem}_section{i}.bin");
        files.push(UnpackedFile {
            name: filename.clone(),
            data: section.body.clone(),
        });

        let mut subsections = Vec::new();
        if i == 0 {
            if let Some(entry) = recognize(&section.header) {
                debug!(firmware = entry.name, "recognized firmware");
                let parts = split::partition(&section.body);
                if parts.len() > 1 {
                    warn!(
                        "sub-section boundaries come from the zero-padding heuristic; \
                         a block ending near a 2048-byte offset without padding is not detected"
                    );
                    for (j, part) in parts.iter().enumerate() {
                        let sub_name = format!("{stem}_section{i}_sub{j}.bin");
                        let block = section.body[part.offset..part.offset + part.length].to_vec();
                        let mut filename_decompressed = None;
                        if part.compressed {
                            let image = codec::decompress(&block)?;
                            let dec_name = format!("{stem}_section{i}_sub{j}_dec.bin");
                            files.push(UnpackedFile {
                                name: dec_name.clone(),
                                data: image,
                            });
                            filename_decompressed = Some(dec_name);
                        }
                        files.push(UnpackedFile {
                            name: sub_name.clone(),
                            data: block,
                        });
                        subsections.push(ManifestSubsection {
                            filename: sub_name,
                            compressed: part.compressed,
                            filename_decompressed,
                        });
                    }
                }
            }
        }

        entries.push(ManifestSection {
            filename,
            raw_header: section.raw_header.clone(),
            parsed_header: section.header.clone(),
            subsections,
        });
    }

    Ok(Unpacked {
        manifest: Manifest {
            version: MANIFEST_VERSION,
            filename: source_name.to_owned(),
            sections: entries,
        },
        files,
    })
}

fn recognize(header: &ParsedHeader) -> Option<&'static FirmwareEntry> {
    let (Some(device), Some(version), Some(dvr)) = (
        header.device_id.as_deref(),
        header.device_version.as_deref(),
        header.dvr.as_deref(),
    ) else {
        warn!("leading header carries no device identity; section 0 kept whole");
        return None;
    };
    match catalog::lookup(device, version, dvr) {
        Ok(entry) => Some(entry),
        Err(miss) => {
            warn!(%miss, "firmware not in the version catalog; section 0 kept whole");
            None
        }
    }
}

// ── Repack ───────────────────────────────────────────────────────────────────

/// Rebuild a firmware image from a manifest and the files it references.
///
/// Compressed sub-sections are re-encoded from their decompressed images and
/// every sub-section is zero-padded to a 2048-byte multiple.  Each raw
/// header is re-emitted with the recomputed `LENGTH=` and `SUM=` values.
pub fn repack(
    manifest: &Manifest,
    files: &HashMap<String, Vec<u8>>,
) -> Result<Vec<u8>, ArchiveError> {
    if manifest.version != MANIFEST_VERSION {
        return Err(ArchiveError::UnsupportedManifestVersion(manifest.version));
    }

    let mut out = Vec::new();
    for entry in &manifest.sections {
        let body = section_body(entry, files)?;
        let text = header::header_text(&entry.raw_header);
        let text = header::set_token(text, "LENGTH", &body.len().to_string());
        let text = header::set_token(&text, "SUM", &byte_sum(&body).to_string());
        out.extend_from_slice(&header::render_header(&text)?);
        out.extend_from_slice(&body);
    }
    Ok(out)
}

fn section_body(
    entry: &ManifestSection,
    files: &HashMap<String, Vec<u8>>,
) -> Result<Vec<u8>, ArchiveError> {
    if entry.subsections.is_empty() {
        return fetch(files, &entry.filename).map(<[u8]>::to_vec);
    }
    let mut body = Vec::new();
    for sub in &entry.subsections {
        let mut block = if sub.compressed {
            let source = sub
                .filename_decompressed
                .as_deref()
                .ok_or_else(|| ArchiveError::MissingDecompressedImage(sub.filename.clone()))?;
            codec::compress(fetch(files, source)?)?
        } else {
            fetch(files, &sub.filename)?.to_vec()
        };
        let tail = block.len() % SUB_ALIGN;
        if tail != 0 {
            block.resize(block.len() + SUB_ALIGN - tail, 0);
        }
        body.extend_from_slice(&block);
    }
    Ok(body)
}

fn fetch<'a>(
    files: &'a HashMap<String, Vec<u8>>,
    name: &str,
) -> Result<&'a [u8], ArchiveError> {
    files
        .get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| ArchiveError::MissingFile(name.to_owned()))
}

// ── Region flip ──────────────────────────────────────────────────────────────

/// Swap `M1INT` and `M1CN` in every header, leaving bodies untouched.
///
/// The direction is detected from the first header; an image naming neither
/// region is rejected.  Flipping twice restores the input byte-for-byte.
pub fn flip_region(input: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let sections = SectionReader::read_all(input)?;
    let first = sections.first().ok_or(ArchiveError::UnknownRegion)?;
    let (from, to) = if first.raw_header.contains("M1INT") {
        ("M1INT", "M1CN")
    } else if first.raw_header.contains("M1CN") {
        ("M1CN", "M1INT")
    } else {
        return Err(ArchiveError::UnknownRegion);
    };

    let mut out = Vec::with_capacity(input.len());
    for section in &sections {
        let text = header::header_text(&section.raw_header).replace(from, to);
        out.extend_from_slice(&header::render_header(&text)?);
        out.extend_from_slice(&section.body);
    }
    Ok(out)
}

// ── Self-test ────────────────────────────────────────────────────────────────

/// Verdict for one compressed sub-section.
#[derive(Debug)]
pub struct SelfTestEntry {
    pub name: String,
    pub original_len: usize,
    pub redecoded_len: usize,
    /// The recompressed stream is byte-identical to the original block
    /// (trailing alignment zeros aside).
    pub stream_identical: bool,
    /// BLAKE3 hash of the decompressed image.
    pub content_hash: [u8; 32],
    pub matches: bool,
}

impl SelfTestEntry {
    pub fn content_hash_hex(&self) -> String {
        hex::encode(self.content_hash)
    }
}

#[derive(Debug, Default)]
pub struct SelfTestReport {
    pub entries: Vec<SelfTestEntry>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.matches)
    }

    pub fn mismatches(&self) -> usize {
        self.entries.iter().filter(|e| !e.matches).count()
    }
}

/// Decompress, recompress, and re-decompress every compressed sub-section,
/// comparing the two decompressed images.  The primary codec correctness
/// gate: a recognized firmware must report zero mismatches.
pub fn self_test(input: &[u8]) -> Result<SelfTestReport, ArchiveError> {
    let sections = SectionReader::read_all(input)?;
    let mut report = SelfTestReport::default();
    let Some(first) = sections.first() else {
        return Ok(report);
    };
    if recognize(&first.header).is_none() {
        return Ok(report);
    }

    for (j, part) in split::partition(&first.body)
        .iter()
        .enumerate()
        .filter(|(_, p)| p.compressed)
    {
        let block = &first.body[part.offset..part.offset + part.length];
        let image = codec::decompress(block)?;
        let recoded = codec::compress(&image)?;
        let redecoded = codec::decompress(&recoded)?;

        let stream_identical = recoded.len() <= block.len()
            && block[..recoded.len()] == recoded[..]
            && block[recoded.len()..].iter().all(|&b| b == 0);

        report.entries.push(SelfTestEntry {
            name: format!("sub{j}"),
            original_len: image.len(),
            redecoded_len: redecoded.len(),
            stream_identical,
            content_hash: blake3::hash(&image).into(),
            matches: round_trip_equal(&image, &redecoded),
        });
    }
    Ok(report)
}

/// The re-decoded image may extend the original by the literal-zero tokens
/// that pad the encoder's final group; anything else is a mismatch.
fn round_trip_equal(original: &[u8], redecoded: &[u8]) -> bool {
    redecoded.len() >= original.len()
        && redecoded.len() - original.len() < 8
        && redecoded[..original.len()] == *original
        && redecoded[original.len()..].iter().all(|&b| b == 0)
}

fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}
