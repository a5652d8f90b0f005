use crate::types::Result;
use serde::{Deserialize, Serialize};

/// Knobs for the record codecs. The defaults favor byte-for-byte fidelity
/// with the values read from a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Re-use a block layer's original header byte on encode when its bit
    /// width can still address the palette. When false, the canonical header
    /// for the smallest sufficient width is always written.
    pub preserve_storage_version: bool,
    /// Reject legacy sub-chunks whose light arrays are cut short. By default a
    /// partial tail is treated as absent light.
    pub strict_legacy_light: bool,
    /// Check every decoded block index against the layer palette.
    pub validate_palette_indices: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            preserve_storage_version: true,
            strict_legacy_light: false,
            validate_palette_indices: true,
        }
    }
}

impl CodecOptions {
    /// Options that always re-derive storage headers from the palette size.
    pub fn canonical() -> Self {
        CodecOptions {
            preserve_storage_version: false,
            ..CodecOptions::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
