use serde::{Deserialize, Serialize};
use thiserror::Error;

/// On-disk size of every section header.
pub const HEADER_SIZE: usize = 256;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("section header is not 7-bit ASCII")]
    NotAscii,
    #[error("section header carries no {0}= token")]
    MissingToken(&'static str),
    #[error("section header token {key}= has a non-numeric value `{value}`")]
    BadNumber { key: &'static str, value: String },
    #[error("rendered header text is {0} bytes, which does not fit in 256")]
    Overflow(usize),
}

/// Record parsed out of one 256-byte ASCII header.
///
/// `section_sum` is the unbounded unsigned byte sum of the body;
/// `section_length` is the exact body byte count.  Everything else is
/// optional: section 0 has no id, and only the first header names the
/// device and the sections that follow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    pub section_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvr: Option<String>,
    pub section_sum: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub following_section_ids: Vec<String>,
}

/// Validate a raw 256-byte header and hand it back as text.
pub fn decode_raw(raw: &[u8]) -> Result<&str, HeaderError> {
    let text = std::str::from_utf8(raw).map_err(|_| HeaderError::NotAscii)?;
    if !text.is_ascii() {
        return Err(HeaderError::NotAscii);
    }
    Ok(text)
}

/// Parse header text into a [`ParsedHeader`].
///
/// Tokens are space-separated; empty fragments are dropped.  Fragments
/// containing `=` are key/value pairs (`LENGTH`, `VER`, `DVR`, `SUM`,
/// `OFFSET`; unknown keys are ignored).  Bare fragments classify by
/// position: 0 is the section id, 1 or 2 the device id, anything later a
/// following-section id.
pub fn parse_header(text: &str) -> Result<ParsedHeader, HeaderError> {
    let mut header = ParsedHeader::default();
    let mut length = None;
    let mut sum = None;

    for (i, frag) in text
        .trim_end()
        .split(' ')
        .filter(|f| !f.is_empty())
        .enumerate()
    {
        if let Some((key, value)) = frag.split_once('=') {
            match key {
                "LENGTH" => length = Some(parse_num("LENGTH", value)?),
                "VER" => header.device_version = Some(value.to_owned()),
                "DVR" => header.dvr = Some(value.to_owned()),
                "SUM" => sum = Some(parse_num("SUM", value)?),
                "OFFSET" => header.section_offset = Some(parse_num("OFFSET", value)?),
                _ => {}
            }
        } else {
            match i {
                0 => header.section_id = Some(frag.to_owned()),
                1 | 2 => header.device_id = Some(frag.to_owned()),
                _ => header.following_section_ids.push(frag.to_owned()),
            }
        }
    }

    header.section_length = length.ok_or(HeaderError::MissingToken("LENGTH"))?;
    header.section_sum = sum.ok_or(HeaderError::MissingToken("SUM"))?;
    Ok(header)
}

fn parse_num(key: &'static str, value: &str) -> Result<u64, HeaderError> {
    value.parse().map_err(|_| HeaderError::BadNumber {
        key,
        value: value.to_owned(),
    })
}

/// The token portion of a raw header, without the CR-LF and space padding.
pub fn header_text(raw: &str) -> &str {
    match raw.find("\r\n") {
        Some(end) => &raw[..end],
        None => raw.trim_end(),
    }
}

/// Re-emit header text as the on-disk form: text, CR-LF, right-padded with
/// spaces to exactly 256 bytes.
pub fn render_header(text: &str) -> Result<Vec<u8>, HeaderError> {
    if text.len() + 2 > HEADER_SIZE {
        return Err(HeaderError::Overflow(text.len() + 2));
    }
    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.resize(HEADER_SIZE, b' ');
    Ok(out)
}

/// Replace the value of the first `KEY=` token in header text, leaving every
/// other byte in place.  Text is returned unchanged when the key is absent.
pub fn set_token(text: &str, key: &str, value: &str) -> String {
    let pattern = format!("{key}=");
    let mut from = 0;
    while let Some(found) = text[from..].find(&pattern) {
        let at = from + found;
        if at == 0 || text.as_bytes()[at - 1] == b' ' {
            let value_start = at + pattern.len();
            let value_end = text[value_start..]
                .find(' ')
                .map_or(text.len(), |q| value_start + q);
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..value_start]);
            out.push_str(value);
            out.push_str(&text[value_end..]);
            return out;
        }
        from = at + pattern.len();
    }
    text.to_owned()
}
