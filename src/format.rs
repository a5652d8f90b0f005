//! Value format of every content type.

use crate::keys::ContentType;
use crate::record::{Record, RecordVariant};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use lodestone_chunk::{
    ActorDigestRecord, Data2DRecord, Data3DRecord, LegacyData2DRecord, LegacyTerrainRecord,
    SubChunkRecord,
};
use lodestone_common::codec::{write_tag, RecordReader};
use lodestone_common::{CodecOptions, LodestoneError, Result};
use lodestone_nbt::NbtFlavor;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
}

/// Record types with a layout of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    SubChunk,
    Data3D,
    Data2D,
    LegacyData2D,
    LegacyTerrain,
    ActorDigest,
}

pub type DecodeFn = fn(&[u8], &CodecOptions) -> Result<Record>;
pub type EncodeFn = fn(&Record, &CodecOptions) -> Result<Vec<u8>>;

#[derive(Clone, Copy)]
pub struct CustomCodec {
    pub kind: RecordKind,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl CustomCodec {
    fn of<T: RecordVariant>(kind: RecordKind) -> Self {
        CustomCodec {
            kind,
            decode: decode_variant::<T>,
            encode: encode_variant::<T>,
        }
    }
}

impl fmt::Debug for CustomCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCodec").field("kind", &self.kind).finish()
    }
}

impl PartialEq for CustomCodec {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

fn decode_variant<T: RecordVariant>(bytes: &[u8], options: &CodecOptions) -> Result<Record> {
    T::decode(bytes, options).map(T::into_record)
}

fn encode_variant<T: RecordVariant>(record: &Record, options: &CodecOptions) -> Result<Vec<u8>> {
    let value = T::from_record(record).ok_or(LodestoneError::RecordMismatch {
        expected: T::NAME,
        found: record.variant_name(),
    })?;
    value.encode(options)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatKind {
    FixedInt {
        width: u8,
        endian: Endian,
        signed: bool,
    },
    TagTree {
        flavor: NbtFlavor,
    },
    Custom(CustomCodec),
    Text {
        encoding: TextEncoding,
    },
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatDescriptor {
    pub kind: FormatKind,
    /// Value written when a new record of this type is materialized.
    pub default_value: Option<&'static [u8]>,
}

impl FormatDescriptor {
    const fn new(kind: FormatKind) -> Self {
        FormatDescriptor {
            kind,
            default_value: None,
        }
    }

    const fn with_default(self, value: &'static [u8]) -> Self {
        FormatDescriptor {
            default_value: Some(value),
            ..self
        }
    }

    pub fn decode(&self, bytes: &[u8], options: &CodecOptions) -> Result<Record> {
        match self.kind {
            FormatKind::FixedInt {
                width,
                endian,
                signed,
            } => decode_int(bytes, width, endian, signed),
            FormatKind::TagTree { flavor } => {
                let mut reader = RecordReader::new(bytes);
                let mut tags = Vec::new();
                while !reader.is_empty() {
                    tags.push(reader.read_tag(flavor, "tag tree")?);
                }
                Ok(Record::TagTrees(tags))
            }
            FormatKind::Custom(codec) => (codec.decode)(bytes, options),
            FormatKind::Text {
                encoding: TextEncoding::Utf8,
            } => Ok(Record::Text(String::from_utf8(bytes.to_vec())?)),
            FormatKind::Opaque => Ok(Record::Opaque(bytes.to_vec())),
        }
    }

    pub fn encode(&self, record: &Record, options: &CodecOptions) -> Result<Vec<u8>> {
        let mismatch = |expected| LodestoneError::RecordMismatch {
            expected,
            found: record.variant_name(),
        };
        match (self.kind, record) {
            (
                FormatKind::FixedInt {
                    width,
                    endian,
                    signed,
                },
                Record::Int(value),
            ) => encode_int(*value, width, endian, signed),
            (FormatKind::TagTree { flavor }, Record::TagTrees(tags)) => {
                let mut out = Vec::new();
                for tag in tags {
                    write_tag(&mut out, flavor, tag)?;
                }
                Ok(out)
            }
            (FormatKind::Custom(codec), _) => (codec.encode)(record, options),
            (FormatKind::Text { .. }, Record::Text(text)) => Ok(text.as_bytes().to_vec()),
            (FormatKind::Opaque, Record::Opaque(bytes)) => Ok(bytes.clone()),
            (FormatKind::FixedInt { .. }, _) => Err(mismatch("Int")),
            (FormatKind::TagTree { .. }, _) => Err(mismatch("TagTrees")),
            (FormatKind::Text { .. }, _) => Err(mismatch("Text")),
            (FormatKind::Opaque, _) => Err(mismatch("Opaque")),
        }
    }

    /// Decodes `default_value`, if there is one.
    pub fn default_record(&self, options: &CodecOptions) -> Option<Result<Record>> {
        self.default_value.map(|bytes| self.decode(bytes, options))
    }
}

fn check_int_width(width: u8) -> Result<usize> {
    if !(1..=8).contains(&width) {
        return Err(LodestoneError::Validation(format!(
            "unsupported integer width {}",
            width
        )));
    }
    Ok(width as usize)
}

fn decode_int(bytes: &[u8], width: u8, endian: Endian, signed: bool) -> Result<Record> {
    let width = check_int_width(width)?;
    if bytes.len() < width {
        return Err(LodestoneError::Truncated {
            context: "fixed-width integer",
            offset: bytes.len(),
        });
    }
    if bytes.len() > width {
        return Err(LodestoneError::Validation(format!(
            "{} bytes for a {}-byte integer",
            bytes.len(),
            width
        )));
    }

    let value = match (endian, signed) {
        (Endian::Little, true) => LittleEndian::read_int(bytes, width),
        (Endian::Little, false) => LittleEndian::read_uint(bytes, width) as i64,
        (Endian::Big, true) => BigEndian::read_int(bytes, width),
        (Endian::Big, false) => BigEndian::read_uint(bytes, width) as i64,
    };
    Ok(Record::Int(value))
}

fn encode_int(value: i64, width: u8, endian: Endian, signed: bool) -> Result<Vec<u8>> {
    let width = check_int_width(width)?;
    let bits = 8 * width as u32;
    let fits = match (signed, bits) {
        (_, 64) => true,
        (true, _) => {
            let min = -(1i64 << (bits - 1));
            (min..=-min - 1).contains(&value)
        }
        (false, _) => (0..(1i64 << bits)).contains(&value),
    };
    if !fits {
        return Err(LodestoneError::Validation(format!(
            "{} does not fit a {} {}-byte integer",
            value,
            if signed { "signed" } else { "unsigned" },
            width
        )));
    }

    let mut out = Vec::with_capacity(width);
    match (endian, signed) {
        (Endian::Little, true) => out.write_int::<LittleEndian>(value, width)?,
        (Endian::Little, false) => out.write_uint::<LittleEndian>(value as u64, width)?,
        (Endian::Big, true) => out.write_int::<BigEndian>(value, width)?,
        (Endian::Big, false) => out.write_uint::<BigEndian>(value as u64, width)?,
    }
    Ok(out)
}

const fn int(width: u8, signed: bool) -> FormatDescriptor {
    FormatDescriptor::new(FormatKind::FixedInt {
        width,
        endian: Endian::Little,
        signed,
    })
}

const TAG_TREE: FormatDescriptor = FormatDescriptor::new(FormatKind::TagTree {
    flavor: NbtFlavor::LittleEndian,
});
const TEXT: FormatDescriptor = FormatDescriptor::new(FormatKind::Text {
    encoding: TextEncoding::Utf8,
});
const OPAQUE: FormatDescriptor = FormatDescriptor::new(FormatKind::Opaque);

fn custom<T: RecordVariant>(kind: RecordKind) -> FormatDescriptor {
    FormatDescriptor::new(FormatKind::Custom(CustomCodec::of::<T>(kind)))
}

impl ContentType {
    pub fn format(self) -> FormatDescriptor {
        use ContentType::*;
        match self {
            Version => int(1, true).with_default(&[0x28]),
            LegacyVersion | ActorDigestVersion => int(1, true),
            FinalizedState => int(4, true).with_default(&[0x02, 0x00, 0x00, 0x00]),
            GenerationSeed => int(8, true),
            MetaDataHash => int(8, false),

            SubChunkPrefix => custom::<SubChunkRecord>(RecordKind::SubChunk),
            Data3D => custom::<Data3DRecord>(RecordKind::Data3D),
            Data2D => custom::<Data2DRecord>(RecordKind::Data2D),
            LegacyData2D => custom::<LegacyData2DRecord>(RecordKind::LegacyData2D),
            LegacyTerrain => custom::<LegacyTerrainRecord>(RecordKind::LegacyTerrain),
            ActorDigest => custom::<ActorDigestRecord>(RecordKind::ActorDigest),

            BlockEntity | Entity => TAG_TREE.with_default(&[]),
            PendingTicks | RandomTicks => TAG_TREE,
            Actor | LocalPlayer | Player | LegacyPlayer | ServerPlayer | Map | Portals
            | Scoreboard | WanderingTraderScheduler | BiomeData | MobEvents | LegacyOverworld
            | LegacyNether | LegacyTheEnd | AutonomousEntities | PositionTrackingDb
            | PositionTrackingLastId | IdCounts | MVillages | Villages | LegacyDimension0
            | LegacyDimension1 | LegacyDimension2 | TickingArea | StructureTemplate
            | DynamicProperties | RealmsStoriesData | VillageDwellers | VillageInfo | VillagePoi
            | VillagePlayers => TAG_TREE,

            FlatWorldLayers | LevelSpawnWasFixed => TEXT,

            LegacyBlockExtraData | BiomeState | ConversionData | BorderBlocks
            | HardcodedSpawners | Checksums | GeneratedPreCavesAndCliffsBlending
            | BlendingBiomeHeight | BlendingData | AabbVolumes | LevelChunkMetaDataDictionary
            | Unknown => OPAQUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lodestone_chunk::{BiomePalette, BlockLayer, BlockState};
    use lodestone_nbt::{Compound, NamedTag, Tag};

    #[test]
    fn test_every_content_type_has_a_descriptor() {
        let options = CodecOptions::default();
        for ty in ContentType::ALL {
            let descriptor = ty.format();
            if let Some(result) = descriptor.default_record(&options) {
                let record = result.unwrap();
                assert_eq!(
                    descriptor.encode(&record, &options).unwrap(),
                    descriptor.default_value.unwrap(),
                    "{}",
                    ty.name()
                );
            }
        }
        assert_eq!(ContentType::Unknown.format().kind, FormatKind::Opaque);
    }

    #[test]
    fn test_defaults() {
        let options = CodecOptions::default();
        assert_eq!(
            ContentType::Version.format().default_record(&options).unwrap().unwrap(),
            Record::Int(40)
        );
        assert_eq!(
            ContentType::FinalizedState
                .format()
                .default_record(&options)
                .unwrap()
                .unwrap(),
            Record::Int(2)
        );
        assert_eq!(
            ContentType::Entity.format().default_record(&options).unwrap().unwrap(),
            Record::TagTrees(vec![])
        );
        assert!(ContentType::Scoreboard.format().default_value.is_none());
    }

    #[test]
    fn test_custom_kinds() {
        let kind = |ty: ContentType| match ty.format().kind {
            FormatKind::Custom(codec) => Some(codec.kind),
            _ => None,
        };
        assert_eq!(kind(ContentType::SubChunkPrefix), Some(RecordKind::SubChunk));
        assert_eq!(kind(ContentType::Data3D), Some(RecordKind::Data3D));
        assert_eq!(kind(ContentType::LegacyTerrain), Some(RecordKind::LegacyTerrain));
        assert_eq!(kind(ContentType::ActorDigest), Some(RecordKind::ActorDigest));
        assert_eq!(kind(ContentType::Entity), None);
    }

    #[test]
    fn test_fixed_int_widths() {
        let options = CodecOptions::default();
        assert_eq!(
            ContentType::Version.format().decode(&[0x28], &options).unwrap(),
            Record::Int(40)
        );
        assert_eq!(
            ContentType::FinalizedState
                .format()
                .decode(&(-1i32).to_le_bytes(), &options)
                .unwrap(),
            Record::Int(-1)
        );

        let hash = 0xFEDC_BA98_7654_3210u64;
        let record = ContentType::MetaDataHash
            .format()
            .decode(&hash.to_le_bytes(), &options)
            .unwrap();
        assert_eq!(record, Record::Int(hash as i64));
        assert_eq!(
            ContentType::MetaDataHash.format().encode(&record, &options).unwrap(),
            hash.to_le_bytes()
        );
    }

    #[test]
    fn test_fixed_int_size_errors() {
        let options = CodecOptions::default();
        let finalized = ContentType::FinalizedState.format();
        assert!(finalized.decode(&[2, 0], &options).unwrap_err().is_truncation());
        assert_matches!(
            finalized.decode(&[2, 0, 0, 0, 0], &options),
            Err(LodestoneError::Validation(_))
        );
        assert_matches!(
            ContentType::Version.format().encode(&Record::Int(300), &options),
            Err(LodestoneError::Validation(_))
        );
    }

    #[test]
    fn test_big_endian_unsigned() {
        assert_eq!(
            decode_int(&[0x80, 0x01], 2, Endian::Big, false).unwrap(),
            Record::Int(0x8001)
        );
        assert_eq!(
            decode_int(&[0x80, 0x01], 2, Endian::Big, true).unwrap(),
            Record::Int(-32767)
        );
        assert_eq!(encode_int(0x8001, 2, Endian::Big, false).unwrap(), vec![0x80, 0x01]);
        assert!(encode_int(-1, 2, Endian::Big, false).is_err());
    }

    #[test]
    fn test_integer_width_out_of_range() {
        assert_matches!(
            decode_int(&[], 0, Endian::Little, true),
            Err(LodestoneError::Validation(_))
        );
        assert_matches!(
            encode_int(1, 9, Endian::Little, false),
            Err(LodestoneError::Validation(_))
        );
    }

    #[test]
    fn test_concatenated_tag_trees() {
        let options = CodecOptions::default();
        let tags = vec![
            NamedTag::new("", Tag::Compound(Compound::new())),
            NamedTag::new("", Tag::Int(3)),
        ];
        let record = Record::TagTrees(tags);
        let bytes = ContentType::BlockEntity.format().encode(&record, &options).unwrap();
        assert_eq!(
            ContentType::BlockEntity.format().decode(&bytes, &options).unwrap(),
            record
        );
        assert!(ContentType::BlockEntity
            .format()
            .decode(&bytes[..bytes.len() - 1], &options)
            .unwrap_err()
            .is_truncation());
    }

    #[test]
    fn test_text_and_opaque() {
        let options = CodecOptions::default();
        let text = ContentType::FlatWorldLayers.format();
        let layers = r#"{"biome_id":1,"block_layers":[]}"#;
        assert_eq!(
            text.decode(layers.as_bytes(), &options).unwrap().as_text(),
            Some(layers)
        );
        assert_matches!(
            text.decode(&[0xFF, 0xFE], &options),
            Err(LodestoneError::Text(_))
        );
        assert_eq!(
            ContentType::Unknown.format().decode(&[1, 2, 3], &options).unwrap(),
            Record::Opaque(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_custom_dispatch() {
        let options = CodecOptions::default();
        let air = BlockState::new("minecraft:air", Compound::new(), 1);
        let record: Record =
            SubChunkRecord::layered(vec![BlockLayer::uniform(air)], 3).into();
        let descriptor = ContentType::SubChunkPrefix.format();
        let bytes = descriptor.encode(&record, &options).unwrap();
        assert_eq!(descriptor.decode(&bytes, &options).unwrap(), record);

        let mut biomes = vec![BiomePalette::uniform(4)];
        biomes.resize(24, BiomePalette::inherit());
        let data3d: Record = Data3DRecord {
            height_map: [64; 256],
            biomes,
        }
        .into();
        let bytes = ContentType::Data3D.format().encode(&data3d, &options).unwrap();
        assert_eq!(bytes.len(), 512 + 5);
    }

    #[test]
    fn test_mismatched_record() {
        let options = CodecOptions::default();
        assert_matches!(
            ContentType::SubChunkPrefix
                .format()
                .encode(&Record::Int(1), &options),
            Err(LodestoneError::RecordMismatch {
                expected: "SubChunkPrefix",
                found: "Int"
            })
        );
        assert_matches!(
            ContentType::Version
                .format()
                .encode(&Record::Opaque(vec![1]), &options),
            Err(LodestoneError::RecordMismatch {
                expected: "Int",
                found: "Opaque"
            })
        );
    }
}
