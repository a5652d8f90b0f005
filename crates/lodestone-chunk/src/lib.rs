//! Codecs for the chunk-scoped records with custom binary layouts.

pub mod data3d;
pub mod height_map;
pub mod legacy;
pub mod nibble;
pub mod packing;
pub mod sub_chunk;

pub use data3d::{BiomePalette, Data3DRecord, MIN_BIOME_SLABS};
pub use height_map::HeightMap;
pub use legacy::{
    ActorDigestRecord, ColumnBiome, Data2DRecord, LegacyData2DRecord, LegacyTerrainRecord,
};
pub use packing::BitsPerBlock;
pub use sub_chunk::{
    BlockLayer, BlockState, FlatBlocks, StorageEra, SubChunkBody, SubChunkRecord, SubChunkVersion,
};
