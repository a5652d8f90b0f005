//! 4-bit arrays, low nibble first.

use lodestone_common::{LodestoneError, Result};

pub fn unpack(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().flat_map(|&b| [b & 0x0F, b >> 4]).collect()
}

pub fn pack(values: &[u8], out: &mut Vec<u8>) -> Result<()> {
    if values.len() % 2 != 0 {
        return Err(LodestoneError::Validation(format!(
            "nibble array has odd length {}",
            values.len()
        )));
    }
    if let Some(&wide) = values.iter().find(|&&v| v > 0x0F) {
        return Err(LodestoneError::Validation(format!(
            "nibble value {} exceeds 15",
            wide
        )));
    }
    out.extend(values.chunks_exact(2).map(|pair| pair[0] | (pair[1] << 4)));
    Ok(())
}
