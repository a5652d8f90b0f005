//! Key classification and record codecs for Bedrock Edition world databases.
//!
//! A record is routed by its key: [`ContentType::classify`] names what the
//! key holds, [`ContentType::format`] says how its value is laid out, and the
//! returned [`FormatDescriptor`] decodes the value into a [`Record`] and
//! encodes it back.

pub mod format;
pub mod keys;
pub mod record;
pub mod store;

pub use format::{CustomCodec, Endian, FormatDescriptor, FormatKind, RecordKind, TextEncoding};
pub use keys::{build_chunk_key, chunk_coordinates, ContentType};
pub use record::{Record, RecordVariant};
pub use store::{
    decode_entry, encode_entry, read_record, records_of_type, DecodedEntry, MemoryStore,
    WorldStore,
};

pub use lodestone_chunk as chunk;
pub use lodestone_common::{
    ChunkCoords, CodecOptions, Dimension, LodestoneError, RecordCodec, Result,
};
pub use lodestone_nbt as nbt;
