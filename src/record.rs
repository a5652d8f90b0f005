use lodestone_chunk::{
    ActorDigestRecord, Data2DRecord, Data3DRecord, LegacyData2DRecord, LegacyTerrainRecord,
    SubChunkRecord,
};
use lodestone_common::RecordCodec;
use lodestone_nbt::NamedTag;

/// A decoded record value.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Fixed-width integers. Unsigned 64-bit values are stored bit-for-bit.
    Int(i64),
    /// Root tags stored back to back.
    TagTrees(Vec<NamedTag>),
    SubChunk(SubChunkRecord),
    Data3D(Box<Data3DRecord>),
    Data2D(Box<Data2DRecord>),
    LegacyData2D(Box<LegacyData2DRecord>),
    LegacyTerrain(LegacyTerrainRecord),
    ActorDigest(ActorDigestRecord),
    Text(String),
    Opaque(Vec<u8>),
}

impl Record {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Record::Int(_) => "Int",
            Record::TagTrees(_) => "TagTrees",
            Record::SubChunk(_) => SubChunkRecord::NAME,
            Record::Data3D(_) => Data3DRecord::NAME,
            Record::Data2D(_) => Data2DRecord::NAME,
            Record::LegacyData2D(_) => LegacyData2DRecord::NAME,
            Record::LegacyTerrain(_) => LegacyTerrainRecord::NAME,
            Record::ActorDigest(_) => ActorDigestRecord::NAME,
            Record::Text(_) => "Text",
            Record::Opaque(_) => "Opaque",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Record::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_tag_trees(&self) -> Option<&[NamedTag]> {
        match self {
            Record::TagTrees(tags) => Some(tags),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Record::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A custom-layout record type that has its own `Record` variant.
pub trait RecordVariant: RecordCodec {
    fn into_record(self) -> Record;
    fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! record_variant {
    ($ty:ty, $variant:ident) => {
        record_variant!($ty, $variant, |value| value);
    };
    ($ty:ty, $variant:ident, boxed) => {
        record_variant!($ty, $variant, Box::new);
    };
    ($ty:ty, $variant:ident, $wrap:expr) => {
        impl RecordVariant for $ty {
            fn into_record(self) -> Record {
                Record::$variant(($wrap)(self))
            }

            fn from_record(record: &Record) -> Option<&Self> {
                match record {
                    Record::$variant(value) => Some(std::borrow::Borrow::borrow(value)),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Record {
            fn from(value: $ty) -> Self {
                value.into_record()
            }
        }
    };
}

record_variant!(SubChunkRecord, SubChunk);
record_variant!(Data3DRecord, Data3D, boxed);
record_variant!(Data2DRecord, Data2D, boxed);
record_variant!(LegacyData2DRecord, LegacyData2D, boxed);
record_variant!(LegacyTerrainRecord, LegacyTerrain);
record_variant!(ActorDigestRecord, ActorDigest);
