//! Unpack manifest — required to repack.
use serde::{Deserialize, Serialize};

use crate::header::ParsedHeader;

pub const MANIFEST_VERSION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    /// Name of the firmware image this manifest was unpacked from.
    pub filename: String,
    pub sections: Vec<ManifestSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSection {
    pub filename: String,
    /// The original 256-byte header text, kept verbatim: repack edits only
    /// the LENGTH= and SUM= token values in it.
    pub raw_header: String,
    pub parsed_header: ParsedHeader,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<ManifestSubsection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSubsection {
    pub filename: String,
    pub compressed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_decompressed: Option<String>,
}

impl Manifest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
