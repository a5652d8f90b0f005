//! Fixed-layout records from before palettes and 3D biomes.

use crate::height_map::{self, HeightMap};
use crate::nibble;
use lodestone_common::codec::{RecordCodec, RecordReader};
use lodestone_common::{CodecOptions, LodestoneError, Result, COLUMNS_PER_CHUNK};

/// Blocks in a full pre-sub-chunk column, 16x128x16.
pub const LEGACY_TERRAIN_BLOCKS: usize = 32_768;

/// Total `LegacyTerrain` value size with three nibble arrays.
pub const LEGACY_TERRAIN_LEN: usize =
    LEGACY_TERRAIN_BLOCKS + 3 * (LEGACY_TERRAIN_BLOCKS / 2) + COLUMNS_PER_CHUNK + 4 * COLUMNS_PER_CHUNK;

/// Total `LegacyTerrain` value size with a fourth nibble array.
pub const LEGACY_TERRAIN_EXTENDED_LEN: usize = LEGACY_TERRAIN_LEN + LEGACY_TERRAIN_BLOCKS / 2;

fn check_len(what: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(LodestoneError::Validation(format!(
            "{} holds {} entries, expected {}",
            what, actual, expected
        )));
    }
    Ok(())
}

/// Height map plus one biome ID per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data2DRecord {
    pub height_map: HeightMap,
    pub biomes: Vec<u8>,
}

impl Data2DRecord {
    pub fn biome(&self, x: usize, z: usize) -> Option<u8> {
        self.biomes.get(height_map::column_index(x, z)?).copied()
    }
}

impl RecordCodec for Data2DRecord {
    const NAME: &'static str = "Data2D";

    fn read_from(reader: &mut RecordReader<'_>, _options: &CodecOptions) -> Result<Self> {
        let height_map = height_map::read(reader)?;
        let biomes = reader.read_bytes(COLUMNS_PER_CHUNK, "biome ids")?.to_vec();
        reader.expect_end(Self::NAME)?;
        Ok(Data2DRecord { height_map, biomes })
    }

    fn write_to(&self, out: &mut Vec<u8>, _options: &CodecOptions) -> Result<()> {
        check_len("Data2D biome map", self.biomes.len(), COLUMNS_PER_CHUNK)?;
        height_map::write(out, &self.height_map)?;
        out.extend_from_slice(&self.biomes);
        Ok(())
    }
}

/// Biome ID and RGB grass tint of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnBiome {
    pub biome: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Height map plus per-column biome and tint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyData2DRecord {
    pub height_map: HeightMap,
    pub columns: Vec<ColumnBiome>,
}

impl RecordCodec for LegacyData2DRecord {
    const NAME: &'static str = "LegacyData2D";

    fn read_from(reader: &mut RecordReader<'_>, _options: &CodecOptions) -> Result<Self> {
        let height_map = height_map::read(reader)?;
        let columns = reader
            .read_bytes(4 * COLUMNS_PER_CHUNK, "column biomes")?
            .chunks_exact(4)
            .map(|c| ColumnBiome {
                biome: c[0],
                red: c[1],
                green: c[2],
                blue: c[3],
            })
            .collect();
        reader.expect_end(Self::NAME)?;
        Ok(LegacyData2DRecord {
            height_map,
            columns,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>, _options: &CodecOptions) -> Result<()> {
        check_len("LegacyData2D column map", self.columns.len(), COLUMNS_PER_CHUNK)?;
        height_map::write(out, &self.height_map)?;
        for column in &self.columns {
            out.extend_from_slice(&[column.biome, column.red, column.green, column.blue]);
        }
        Ok(())
    }
}

/// Whole-column terrain from before sub-chunks. Nibble arrays are unpacked
/// to one value per block, blocks indexed `x << 11 | z << 7 | y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTerrainRecord {
    pub block_ids: Vec<u8>,
    pub block_data: Vec<u8>,
    pub sky_light: Vec<u8>,
    pub block_light: Vec<u8>,
    /// Fourth nibble array, present only in 99584-byte values. Kept unpacked
    /// and written back after `block_light`.
    pub extra_nibbles: Option<Vec<u8>>,
    pub dirty_columns: Vec<u8>,
    /// Raw 4-byte grass color per column.
    pub grass_colors: Vec<u8>,
}

impl LegacyTerrainRecord {
    pub fn index_of(x: usize, y: usize, z: usize) -> usize {
        (x << 11) | (z << 7) | y
    }

    pub fn block_at(&self, x: usize, y: usize, z: usize) -> Option<(u8, u8)> {
        if x > 15 || y > 127 || z > 15 {
            return None;
        }
        let i = Self::index_of(x, y, z);
        Some((*self.block_ids.get(i)?, *self.block_data.get(i)?))
    }
}

impl RecordCodec for LegacyTerrainRecord {
    const NAME: &'static str = "LegacyTerrain";

    fn read_from(reader: &mut RecordReader<'_>, _options: &CodecOptions) -> Result<Self> {
        let nibbles = LEGACY_TERRAIN_BLOCKS / 2;
        let extended = reader.remaining() == LEGACY_TERRAIN_EXTENDED_LEN;
        let block_ids = reader.read_bytes(LEGACY_TERRAIN_BLOCKS, "block ids")?.to_vec();
        let block_data = nibble::unpack(reader.read_bytes(nibbles, "block data")?);
        let sky_light = nibble::unpack(reader.read_bytes(nibbles, "sky light")?);
        let block_light = nibble::unpack(reader.read_bytes(nibbles, "block light")?);
        let extra_nibbles = if extended {
            Some(nibble::unpack(reader.read_bytes(nibbles, "extra nibbles")?))
        } else {
            None
        };
        let dirty_columns = reader.read_bytes(COLUMNS_PER_CHUNK, "dirty columns")?.to_vec();
        let grass_colors = reader.read_bytes(4 * COLUMNS_PER_CHUNK, "grass colors")?.to_vec();
        reader.expect_end(Self::NAME)?;
        Ok(LegacyTerrainRecord {
            block_ids,
            block_data,
            sky_light,
            block_light,
            extra_nibbles,
            dirty_columns,
            grass_colors,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>, _options: &CodecOptions) -> Result<()> {
        check_len("LegacyTerrain block ids", self.block_ids.len(), LEGACY_TERRAIN_BLOCKS)?;
        check_len("LegacyTerrain block data", self.block_data.len(), LEGACY_TERRAIN_BLOCKS)?;
        check_len("LegacyTerrain sky light", self.sky_light.len(), LEGACY_TERRAIN_BLOCKS)?;
        check_len("LegacyTerrain block light", self.block_light.len(), LEGACY_TERRAIN_BLOCKS)?;
        if let Some(extra) = &self.extra_nibbles {
            check_len("LegacyTerrain extra nibbles", extra.len(), LEGACY_TERRAIN_BLOCKS)?;
        }
        check_len("LegacyTerrain dirty columns", self.dirty_columns.len(), COLUMNS_PER_CHUNK)?;
        check_len("LegacyTerrain grass colors", self.grass_colors.len(), 4 * COLUMNS_PER_CHUNK)?;

        out.reserve(LEGACY_TERRAIN_EXTENDED_LEN);
        out.extend_from_slice(&self.block_ids);
        nibble::pack(&self.block_data, out)?;
        nibble::pack(&self.sky_light, out)?;
        nibble::pack(&self.block_light, out)?;
        if let Some(extra) = &self.extra_nibbles {
            nibble::pack(extra, out)?;
        }
        out.extend_from_slice(&self.dirty_columns);
        out.extend_from_slice(&self.grass_colors);
        Ok(())
    }
}

/// Actor IDs living in one chunk, as stored under a `digp` key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActorDigestRecord {
    pub actor_ids: Vec<[u8; 8]>,
}

impl ActorDigestRecord {
    pub const ACTOR_KEY_PREFIX: &'static [u8] = b"actorprefix";

    /// Keys of the actor records this digest points at.
    pub fn actor_keys(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.actor_ids
            .iter()
            .map(|id| [Self::ACTOR_KEY_PREFIX, id.as_slice()].concat())
    }
}

impl RecordCodec for ActorDigestRecord {
    const NAME: &'static str = "ActorDigest";

    fn read_from(reader: &mut RecordReader<'_>, _options: &CodecOptions) -> Result<Self> {
        let mut actor_ids = Vec::with_capacity(reader.remaining() / 8);
        while !reader.is_empty() {
            let mut id = [0u8; 8];
            id.copy_from_slice(reader.read_bytes(8, "actor id")?);
            actor_ids.push(id);
        }
        Ok(ActorDigestRecord { actor_ids })
    }

    fn write_to(&self, out: &mut Vec<u8>, _options: &CodecOptions) -> Result<()> {
        for id in &self.actor_ids {
            out.extend_from_slice(id);
        }
        Ok(())
    }
}
