use lodestone_nbt::NbtError;
use std::fmt::Write;
use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LodestoneError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A recognized record whose payload carries a version or storage code this
    /// crate does not know.
    #[error("unsupported {what} version {code:#04x}")]
    UnsupportedVersion { what: &'static str, code: u8 },

    /// The payload ended before the structure being decoded was complete.
    #[error("truncated {context} at byte {offset}")]
    Truncated { context: &'static str, offset: usize },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("record mismatch: expected {expected}, found {found}")]
    RecordMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0} is not a chunk-scoped content type")]
    NotChunkScoped(&'static str),

    #[error("tag tree error: {0}")]
    Nbt(#[from] NbtError),

    #[error("invalid text: {0}")]
    Text(#[from] FromUtf8Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("record {key}: {source}")]
    Record {
        key: String,
        #[source]
        source: Box<LodestoneError>,
    },
}

impl LodestoneError {
    /// Attaches the raw key of the record being processed.
    pub fn in_record(self, key: &[u8]) -> Self {
        LodestoneError::Record {
            key: render_key(key),
            source: Box::new(self),
        }
    }

    /// True for corrupt or partial data, as opposed to an unknown format.
    pub fn is_truncation(&self) -> bool {
        match self {
            LodestoneError::Truncated { .. } => true,
            LodestoneError::Nbt(err) => err.is_eof(),
            LodestoneError::Record { source, .. } => source.is_truncation(),
            _ => false,
        }
    }

    /// True when the payload uses a version or storage code this crate cannot read.
    pub fn is_unsupported_version(&self) -> bool {
        match self {
            LodestoneError::UnsupportedVersion { .. } => true,
            LodestoneError::Record { source, .. } => source.is_unsupported_version(),
            _ => false,
        }
    }
}

/// Printable keys are shown as text, everything else as hex.
fn render_key(key: &[u8]) -> String {
    if !key.is_empty() && key.iter().all(|b| b.is_ascii_graphic()) {
        return String::from_utf8_lossy(key).into_owned();
    }
    let mut rendered = String::with_capacity(key.len() * 2 + 2);
    rendered.push_str("0x");
    for byte in key {
        let _ = write!(rendered, "{:02x}", byte);
    }
    rendered
}
