use lodestone_common::codec::{write_i16_le, RecordReader};
use lodestone_common::{Result, COLUMNS_PER_CHUNK};

/// 256 little-endian column heights, indexed `z * 16 + x`.
pub type HeightMap = [i16; COLUMNS_PER_CHUNK];

pub fn column_index(x: usize, z: usize) -> Option<usize> {
    (x < 16 && z < 16).then_some(z * 16 + x)
}

pub fn read(reader: &mut RecordReader<'_>) -> Result<HeightMap> {
    let mut heights = [0i16; COLUMNS_PER_CHUNK];
    for height in heights.iter_mut() {
        *height = reader.read_i16_le("height map")?;
    }
    Ok(heights)
}

pub fn write(out: &mut Vec<u8>, heights: &HeightMap) -> Result<()> {
    for &height in heights {
        write_i16_le(out, height)?;
    }
    Ok(())
}
