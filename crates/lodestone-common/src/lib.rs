pub mod codec;
pub mod config;
pub mod error;
pub mod types;

pub use codec::{RecordCodec, RecordReader};
pub use config::CodecOptions;
pub use error::LodestoneError;
pub use types::{ChunkCoords, Dimension, Result, BLOCKS_PER_SUB_CHUNK, COLUMNS_PER_CHUNK};
