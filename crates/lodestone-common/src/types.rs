use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, crate::error::LodestoneError>;

/// Cells in one 16x16x16 sub-chunk.
pub const BLOCKS_PER_SUB_CHUNK: usize = 4096;

/// Columns in one 16x16 chunk.
pub const COLUMNS_PER_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[default]
    Overworld,
    Nether,
    TheEnd,
    /// Numeric IDs outside the vanilla three, kept as-is.
    Custom(i32),
}

impl Dimension {
    pub fn from_id(id: i32) -> Self {
        match id {
            0 => Dimension::Overworld,
            1 => Dimension::Nether,
            2 => Dimension::TheEnd,
            other => Dimension::Custom(other),
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Dimension::Overworld => 0,
            Dimension::Nether => 1,
            Dimension::TheEnd => 2,
            Dimension::Custom(id) => id,
        }
    }

    /// Name used by village keys.
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "Overworld" => Some(Dimension::Overworld),
            "Nether" => Some(Dimension::Nether),
            "TheEnd" => Some(Dimension::TheEnd),
            _ => None,
        }
    }

    pub fn key_name(self) -> Option<&'static str> {
        match self {
            Dimension::Overworld => Some("Overworld"),
            Dimension::Nether => Some("Nether"),
            Dimension::TheEnd => Some("TheEnd"),
            Dimension::Custom(_) => None,
        }
    }
}

/// Position of a chunk-scoped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoords {
    pub x: i32,
    pub z: i32,
    pub dimension: Dimension,
    /// Vertical index, only present on sub-chunk keys.
    pub sub_chunk: Option<i8>,
}

impl ChunkCoords {
    pub fn new(x: i32, z: i32, dimension: Dimension) -> Self {
        ChunkCoords {
            x,
            z,
            dimension,
            sub_chunk: None,
        }
    }

    pub fn with_sub_chunk(self, index: i8) -> Self {
        ChunkCoords {
            sub_chunk: Some(index),
            ..self
        }
    }
}
