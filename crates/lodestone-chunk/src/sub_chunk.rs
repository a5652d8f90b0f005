use crate::nibble;
use crate::packing::{self, BitsPerBlock};
use lodestone_common::codec::{write_i32_le, write_tag, RecordCodec, RecordReader};
use lodestone_common::{CodecOptions, LodestoneError, Result, BLOCKS_PER_SUB_CHUNK};
use lodestone_nbt::{Compound, NamedTag, NbtFlavor, Tag};
use tracing::{debug, trace};

const NIBBLES_PER_SUB_CHUNK: usize = BLOCKS_PER_SUB_CHUNK / 2;

/// Leading byte of a `SubChunkPrefix` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubChunkVersion {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
}

/// The three storage layouts a version byte selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEra {
    /// Raw block IDs with nibble metadata, versions 0 and 2..=7.
    Flat,
    /// One palette layer, version 1.
    SingleLayer,
    /// Counted palette layers, versions 8 and 9.
    MultiLayer,
}

impl SubChunkVersion {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => SubChunkVersion::V0,
            1 => SubChunkVersion::V1,
            2 => SubChunkVersion::V2,
            3 => SubChunkVersion::V3,
            4 => SubChunkVersion::V4,
            5 => SubChunkVersion::V5,
            6 => SubChunkVersion::V6,
            7 => SubChunkVersion::V7,
            8 => SubChunkVersion::V8,
            9 => SubChunkVersion::V9,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn era(self) -> StorageEra {
        match self {
            SubChunkVersion::V1 => StorageEra::SingleLayer,
            SubChunkVersion::V8 | SubChunkVersion::V9 => StorageEra::MultiLayer,
            _ => StorageEra::Flat,
        }
    }

    /// Only version 9 stores the sub-chunk's own vertical index.
    pub fn has_index_byte(self) -> bool {
        self == SubChunkVersion::V9
    }
}

/// One palette entry: a little-endian tag tree, normally a compound holding
/// `name`, `states` and `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockState {
    tag: NamedTag,
}

impl BlockState {
    pub fn new(name: impl Into<String>, states: Compound, version: i32) -> Self {
        let mut compound = Compound::new();
        compound.insert("name".to_string(), Tag::String(name.into()));
        compound.insert("states".to_string(), Tag::Compound(states));
        compound.insert("version".to_string(), Tag::Int(version));
        BlockState {
            tag: NamedTag::new("", Tag::Compound(compound)),
        }
    }

    /// Wraps a decoded palette entry. Entries that are not compounds are
    /// rejected.
    pub fn from_tag(tag: NamedTag) -> Result<Self> {
        if tag.tag.as_compound().is_none() {
            return Err(LodestoneError::Validation(format!(
                "palette entry is tag type {}, expected a compound",
                tag.tag.get_type_id()
            )));
        }
        Ok(BlockState { tag })
    }

    fn compound(&self) -> Option<&Compound> {
        self.tag.tag.as_compound()
    }

    pub fn name(&self) -> Option<&str> {
        self.compound()?.get("name")?.as_string()
    }

    pub fn states(&self) -> Option<&Compound> {
        self.compound()?.get("states")?.as_compound()
    }

    pub fn version(&self) -> Option<i32> {
        self.compound()?.get("version")?.as_i32()
    }

    pub fn as_tag(&self) -> &NamedTag {
        &self.tag
    }

    pub fn into_tag(self) -> NamedTag {
        self.tag
    }
}

/// Index width selected by a block storage header, or `None` for headers
/// outside the accepted set. Width 0 stores no index words.
pub fn layer_width(header: u8) -> Option<u8> {
    match header {
        0x01 => Some(0),
        0x02 | 0x03 => Some(1),
        0x04 | 0x05 => Some(2),
        0x06 => Some(3),
        0x08 => Some(4),
        0x10 => Some(8),
        0x20 => Some(16),
        0x40 => Some(32),
        _ => None,
    }
}

/// One paletted block storage of a sub-chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayer {
    /// Header byte as read. Bits 1..=7 give the index width, bit 0 is the
    /// runtime flag. See [`layer_width`] for the accepted values.
    pub storage_version: u8,
    /// 4096 palette indices in XZY order.
    pub block_indices: Vec<u32>,
    pub palette: Vec<BlockState>,
}

impl BlockLayer {
    /// Builds a layer with the canonical header for its palette size.
    pub fn new(palette: Vec<BlockState>, block_indices: Vec<u32>) -> Result<Self> {
        let layer = BlockLayer {
            storage_version: BitsPerBlock::for_palette_len(palette.len()).header(false),
            block_indices,
            palette,
        };
        layer.validate()?;
        Ok(layer)
    }

    /// A layer filled with a single block.
    pub fn uniform(state: BlockState) -> Self {
        BlockLayer {
            storage_version: BitsPerBlock::One.header(false),
            block_indices: vec![0; BLOCKS_PER_SUB_CHUNK],
            palette: vec![state],
        }
    }

    pub fn index_of(x: usize, y: usize, z: usize) -> usize {
        (x << 8) | (z << 4) | y
    }

    pub fn block_at(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
        if x > 15 || y > 15 || z > 15 {
            return None;
        }
        let index = *self.block_indices.get(Self::index_of(x, y, z))?;
        self.palette.get(index as usize)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_indices.len() != BLOCKS_PER_SUB_CHUNK {
            return Err(LodestoneError::Validation(format!(
                "block layer holds {} indices, expected {}",
                self.block_indices.len(),
                BLOCKS_PER_SUB_CHUNK
            )));
        }
        if self.palette.is_empty() {
            return Err(LodestoneError::Validation(
                "block layer palette is empty".to_string(),
            ));
        }
        if let Some((position, &index)) = self
            .block_indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index as usize >= self.palette.len())
        {
            return Err(LodestoneError::Validation(format!(
                "block index {} at position {} exceeds palette of {}",
                index,
                position,
                self.palette.len()
            )));
        }
        Ok(())
    }

    fn read_from(reader: &mut RecordReader<'_>, options: &CodecOptions) -> Result<Self> {
        let storage_version = reader.read_u8("block storage header")?;
        let width = layer_width(storage_version).ok_or(LodestoneError::UnsupportedVersion {
            what: "block storage",
            code: storage_version,
        })?;
        let block_indices = match BitsPerBlock::from_bits(width) {
            Some(bits) => packing::read_indices(reader, bits, "block indices")?,
            None => vec![0; BLOCKS_PER_SUB_CHUNK],
        };

        let palette_size = reader.read_i32_le("block palette size")?;
        if palette_size < 0 {
            return Err(LodestoneError::Validation(format!(
                "negative block palette size {}",
                palette_size
            )));
        }
        let palette_size = palette_size as usize;
        // Every entry takes at least one byte.
        if palette_size > reader.remaining() {
            return Err(LodestoneError::Truncated {
                context: "block palette",
                offset: reader.position(),
            });
        }

        let mut palette = Vec::with_capacity(palette_size);
        for _ in 0..palette_size {
            let entry = reader.read_tag(NbtFlavor::LittleEndian, "block palette entry")?;
            palette.push(BlockState::from_tag(entry)?);
        }

        let layer = BlockLayer {
            storage_version,
            block_indices,
            palette,
        };
        if options.validate_palette_indices {
            layer.validate()?;
        }
        trace!(
            storage_version,
            palette_len = layer.palette.len(),
            "decoded block layer"
        );
        Ok(layer)
    }

    /// Header byte to write: the original one when allowed and still wide
    /// enough, the canonical one otherwise.
    pub fn encoded_header(&self, options: &CodecOptions) -> u8 {
        let canonical = BitsPerBlock::for_palette_len(self.palette.len()).header(false);
        if !options.preserve_storage_version {
            return canonical;
        }
        let fits = match layer_width(self.storage_version) {
            Some(0) => self.palette.len() <= 1,
            Some(width) => BitsPerBlock::from_bits(width)
                .is_some_and(|bits| bits.can_address(self.palette.len())),
            None => false,
        };
        if fits {
            self.storage_version
        } else {
            canonical
        }
    }

    fn write_to(&self, out: &mut Vec<u8>, options: &CodecOptions) -> Result<()> {
        self.validate()?;
        let header = self.encoded_header(options);
        out.push(header);
        if let Some(bits) = BitsPerBlock::from_bits(header >> 1) {
            packing::write_indices(out, &self.block_indices, bits)?;
        }
        write_i32_le(out, self.palette.len() as i32)?;
        for entry in &self.palette {
            write_tag(out, NbtFlavor::LittleEndian, entry.as_tag())?;
        }
        Ok(())
    }
}

/// Flat storage of versions 0 and 2..=7. Nibble arrays are kept unpacked,
/// one value per block.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBlocks {
    pub block_ids: Vec<u8>,
    pub block_data: Vec<u8>,
    pub sky_light: Option<Vec<u8>>,
    pub block_light: Option<Vec<u8>>,
}

impl FlatBlocks {
    fn read_from(reader: &mut RecordReader<'_>, options: &CodecOptions) -> Result<Self> {
        let block_ids = reader.read_bytes(BLOCKS_PER_SUB_CHUNK, "block ids")?.to_vec();
        let block_data = nibble::unpack(reader.read_bytes(NIBBLES_PER_SUB_CHUNK, "block data")?);

        let (sky_light, block_light) = match reader.remaining() {
            0 => (None, None),
            n if n >= 2 * NIBBLES_PER_SUB_CHUNK => {
                let sky = nibble::unpack(reader.read_bytes(NIBBLES_PER_SUB_CHUNK, "sky light")?);
                let block =
                    nibble::unpack(reader.read_bytes(NIBBLES_PER_SUB_CHUNK, "block light")?);
                reader.expect_end("legacy sub-chunk")?;
                (Some(sky), Some(block))
            }
            n if !options.strict_legacy_light => {
                debug!(remaining = n, "ignoring partial legacy light arrays");
                (None, None)
            }
            _ => {
                return Err(LodestoneError::Truncated {
                    context: "legacy light arrays",
                    offset: reader.position(),
                })
            }
        };

        Ok(FlatBlocks {
            block_ids,
            block_data,
            sky_light,
            block_light,
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.block_ids.len() != BLOCKS_PER_SUB_CHUNK {
            return Err(LodestoneError::Validation(format!(
                "legacy sub-chunk holds {} block ids, expected {}",
                self.block_ids.len(),
                BLOCKS_PER_SUB_CHUNK
            )));
        }
        let nibble_arrays = [
            Some(&self.block_data),
            self.sky_light.as_ref(),
            self.block_light.as_ref(),
        ];
        for array in nibble_arrays.iter().flatten() {
            if array.len() != BLOCKS_PER_SUB_CHUNK {
                return Err(LodestoneError::Validation(format!(
                    "legacy nibble array holds {} values, expected {}",
                    array.len(),
                    BLOCKS_PER_SUB_CHUNK
                )));
            }
        }
        if self.sky_light.is_some() != self.block_light.is_some() {
            return Err(LodestoneError::Validation(
                "legacy light arrays must be both present or both absent".to_string(),
            ));
        }

        out.extend_from_slice(&self.block_ids);
        for array in nibble_arrays.into_iter().flatten() {
            nibble::pack(array, out)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubChunkBody {
    Flat(FlatBlocks),
    Layered {
        layers: Vec<BlockLayer>,
        /// Stored index byte, version 9 only.
        sub_chunk_index: Option<i8>,
    },
}

/// Decoded `SubChunkPrefix` value.
#[derive(Debug, Clone, PartialEq)]
pub struct SubChunkRecord {
    pub version: SubChunkVersion,
    pub body: SubChunkBody,
}

impl SubChunkRecord {
    /// A version 9 record.
    pub fn layered(layers: Vec<BlockLayer>, sub_chunk_index: i8) -> Self {
        SubChunkRecord {
            version: SubChunkVersion::V9,
            body: SubChunkBody::Layered {
                layers,
                sub_chunk_index: Some(sub_chunk_index),
            },
        }
    }

    pub fn layers(&self) -> &[BlockLayer] {
        match &self.body {
            SubChunkBody::Layered { layers, .. } => layers,
            SubChunkBody::Flat(_) => &[],
        }
    }

    pub fn sub_chunk_index(&self) -> Option<i8> {
        match self.body {
            SubChunkBody::Layered {
                sub_chunk_index, ..
            } => sub_chunk_index,
            SubChunkBody::Flat(_) => None,
        }
    }

    fn read_layers(
        reader: &mut RecordReader<'_>,
        version: SubChunkVersion,
        options: &CodecOptions,
    ) -> Result<SubChunkBody> {
        let (count, sub_chunk_index) = match version.era() {
            StorageEra::SingleLayer => (1, None),
            _ => {
                let count = reader.read_u8("layer count")?;
                let index = if version.has_index_byte() {
                    Some(reader.read_i8("sub-chunk index")?)
                } else {
                    None
                };
                (count, index)
            }
        };

        let mut layers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            layers.push(BlockLayer::read_from(reader, options)?);
        }
        reader.expect_end("sub-chunk layers")?;
        Ok(SubChunkBody::Layered {
            layers,
            sub_chunk_index,
        })
    }
}

impl RecordCodec for SubChunkRecord {
    const NAME: &'static str = "SubChunkPrefix";

    fn read_from(reader: &mut RecordReader<'_>, options: &CodecOptions) -> Result<Self> {
        let code = reader.read_u8("sub-chunk version")?;
        let version = SubChunkVersion::from_code(code).ok_or(LodestoneError::UnsupportedVersion {
            what: "sub-chunk",
            code,
        })?;

        let body = match version.era() {
            StorageEra::Flat => SubChunkBody::Flat(FlatBlocks::read_from(reader, options)?),
            StorageEra::SingleLayer | StorageEra::MultiLayer => {
                Self::read_layers(reader, version, options)?
            }
        };
        let record = SubChunkRecord { version, body };
        debug!(version = code, layers = record.layers().len(), "decoded sub-chunk");
        Ok(record)
    }

    fn write_to(&self, out: &mut Vec<u8>, options: &CodecOptions) -> Result<()> {
        out.push(self.version.code());
        match (&self.body, self.version.era()) {
            (SubChunkBody::Flat(flat), StorageEra::Flat) => flat.write_to(out),
            (
                SubChunkBody::Layered {
                    layers,
                    sub_chunk_index,
                },
                era @ (StorageEra::SingleLayer | StorageEra::MultiLayer),
            ) => {
                if era == StorageEra::SingleLayer {
                    if layers.len() != 1 {
                        return Err(LodestoneError::Validation(format!(
                            "version 1 sub-chunk needs exactly one layer, found {}",
                            layers.len()
                        )));
                    }
                } else {
                    let count = u8::try_from(layers.len()).map_err(|_| {
                        LodestoneError::Validation(format!("{} layers exceed 255", layers.len()))
                    })?;
                    out.push(count);
                }
                match (self.version.has_index_byte(), sub_chunk_index) {
                    (true, Some(index)) => out.push(*index as u8),
                    (false, None) => {}
                    (true, None) => {
                        return Err(LodestoneError::Validation(
                            "version 9 sub-chunk is missing its index".to_string(),
                        ))
                    }
                    (false, Some(_)) => {
                        return Err(LodestoneError::Validation(format!(
                            "version {} sub-chunk cannot store an index",
                            self.version.code()
                        )))
                    }
                }
                for layer in layers {
                    layer.write_to(out, options)?;
                }
                Ok(())
            }
            _ => Err(LodestoneError::Validation(format!(
                "sub-chunk body does not match version {}",
                self.version.code()
            ))),
        }
    }
}
