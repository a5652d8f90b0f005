//! Height map plus one biome palette per 16-block vertical slab.

use crate::height_map::{self, HeightMap};
use crate::packing::{self, BitsPerBlock};
use lodestone_common::codec::{write_i32_le, RecordCodec, RecordReader};
use lodestone_common::{CodecOptions, LodestoneError, Result, BLOCKS_PER_SUB_CHUNK};
use tracing::trace;

/// Slabs a decoded record is padded to.
pub const MIN_BIOME_SLABS: usize = 24;

/// Header width that marks a slab without its own data.
const INHERIT_WIDTH: u8 = 127;
const INHERIT_HEADER: u8 = 0xFF;

/// Biomes of one slab. A slab with no `values`, or an empty list of them,
/// takes its biomes from the nearest populated slab below it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BiomePalette {
    pub values: Option<Vec<u32>>,
    pub palette: Vec<i32>,
}

impl BiomePalette {
    pub fn inherit() -> Self {
        BiomePalette::default()
    }

    pub fn uniform(biome: i32) -> Self {
        BiomePalette {
            values: Some(vec![0; BLOCKS_PER_SUB_CHUNK]),
            palette: vec![biome],
        }
    }

    pub fn has_data(&self) -> bool {
        self.values.as_ref().is_some_and(|values| !values.is_empty())
    }

    /// Biome ID at a cell in XZY order, or `None` for an inheriting slab.
    pub fn biome_at(&self, x: usize, y: usize, z: usize) -> Option<i32> {
        if x > 15 || y > 15 || z > 15 {
            return None;
        }
        let index = *self.values.as_ref()?.get((x << 8) | (z << 4) | y)?;
        self.palette.get(index as usize).copied()
    }

    fn read_from(reader: &mut RecordReader<'_>) -> Result<Self> {
        let header = reader.read_u8("biome palette header")?;
        let width = header >> 1;
        if width == INHERIT_WIDTH {
            return Ok(BiomePalette::inherit());
        }
        if header & 1 == 0 {
            return Err(LodestoneError::UnsupportedFeature(format!(
                "persistent biome palette (header {:#04x})",
                header
            )));
        }
        if width == 0 {
            let biome = reader.read_i32_le("biome palette entry")?;
            return Ok(BiomePalette::uniform(biome));
        }

        let bits = BitsPerBlock::from_bits(width).ok_or(LodestoneError::UnsupportedVersion {
            what: "biome storage",
            code: header,
        })?;
        let values = packing::read_indices(reader, bits, "biome indices")?;
        let palette_size = reader.read_i32_le("biome palette size")?;
        if palette_size < 0 {
            return Err(LodestoneError::Validation(format!(
                "negative biome palette size {}",
                palette_size
            )));
        }
        let palette_size = palette_size as usize;
        if palette_size.saturating_mul(4) > reader.remaining() {
            return Err(LodestoneError::Truncated {
                context: "biome palette",
                offset: reader.position(),
            });
        }
        let palette = (0..palette_size)
            .map(|_| reader.read_i32_le("biome palette entry"))
            .collect::<Result<Vec<_>>>()?;
        Ok(BiomePalette {
            values: Some(values),
            palette,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let Some(values) = self.values.as_ref().filter(|values| !values.is_empty()) else {
            out.push(INHERIT_HEADER);
            return Ok(());
        };
        if self.palette.is_empty() {
            return Err(LodestoneError::Validation(
                "biome slab has values but an empty palette".to_string(),
            ));
        }

        if self.palette.len() == 1 && values.iter().all(|&v| v == 0) {
            if values.len() != BLOCKS_PER_SUB_CHUNK {
                return Err(LodestoneError::Validation(format!(
                    "biome slab holds {} values, expected {}",
                    values.len(),
                    BLOCKS_PER_SUB_CHUNK
                )));
            }
            out.push(0x01);
            write_i32_le(out, self.palette[0])?;
            return Ok(());
        }

        let bits = BitsPerBlock::for_palette_len(self.palette.len());
        out.push(bits.header(true));
        packing::write_indices(out, values, bits)?;
        write_i32_le(out, self.palette.len() as i32)?;
        for &biome in &self.palette {
            write_i32_le(out, biome)?;
        }
        Ok(())
    }
}

/// Decoded `Data3D` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data3DRecord {
    pub height_map: HeightMap,
    pub biomes: Vec<BiomePalette>,
}

impl Data3DRecord {
    pub fn height(&self, x: usize, z: usize) -> Option<i16> {
        height_map::column_index(x, z).map(|i| self.height_map[i])
    }

    /// Biome at a cell, following inheriting slabs downward.
    pub fn biome_at(&self, x: usize, slab: usize, y: usize, z: usize) -> Option<i32> {
        let slabs = self.biomes.get(..=slab)?;
        slabs
            .iter()
            .rev()
            .find(|palette| palette.has_data())?
            .biome_at(x, y, z)
    }

    fn ensure_first_slab(&self) -> Result<()> {
        match self.biomes.first() {
            Some(first) if first.has_data() => Ok(()),
            Some(_) => Err(LodestoneError::Validation(
                "first biome slab has no data".to_string(),
            )),
            None => Err(LodestoneError::Validation(
                "Data3D record has no biome slabs".to_string(),
            )),
        }
    }
}

impl RecordCodec for Data3DRecord {
    const NAME: &'static str = "Data3D";

    fn read_from(reader: &mut RecordReader<'_>, _options: &CodecOptions) -> Result<Self> {
        let height_map = height_map::read(reader)?;
        let mut biomes = Vec::new();
        while !reader.is_empty() {
            let slab = BiomePalette::read_from(reader)?;
            trace!(
                slab = biomes.len(),
                palette_len = slab.palette.len(),
                "decoded biome slab"
            );
            biomes.push(slab);
        }

        let mut record = Data3DRecord { height_map, biomes };
        record.ensure_first_slab()?;
        if record.biomes.len() < MIN_BIOME_SLABS {
            record.biomes.resize(MIN_BIOME_SLABS, BiomePalette::inherit());
        }
        Ok(record)
    }

    fn write_to(&self, out: &mut Vec<u8>, _options: &CodecOptions) -> Result<()> {
        self.ensure_first_slab()?;
        height_map::write(out, &self.height_map)?;
        // Inheriting slabs at the top are implied by the reader's padding.
        let populated = self
            .biomes
            .iter()
            .rposition(BiomePalette::has_data)
            .map_or(0, |last| last + 1);
        for slab in &self.biomes[..populated] {
            slab.write_to(out)?;
        }
        Ok(())
    }
}
