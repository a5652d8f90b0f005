//! Palette index packing shared by block layers and biome slabs.
//!
//! Indices are packed LSB-first into little-endian 32-bit words. A value never
//! straddles two words, so widths that do not divide 32 leave the top bits of
//! every word unused.

use byteorder::{ByteOrder, LittleEndian};
use lodestone_common::codec::{write_u32_le, RecordReader};
use lodestone_common::{LodestoneError, Result, BLOCKS_PER_SUB_CHUNK};

/// Bit width of one packed palette index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BitsPerBlock {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Eight = 8,
    Sixteen = 16,
    ThirtyTwo = 32,
}

impl BitsPerBlock {
    /// Widths the encoder chooses from.
    pub const ENCODABLE: [BitsPerBlock; 6] = [
        BitsPerBlock::One,
        BitsPerBlock::Two,
        BitsPerBlock::Four,
        BitsPerBlock::Eight,
        BitsPerBlock::Sixteen,
        BitsPerBlock::ThirtyTwo,
    ];

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(BitsPerBlock::One),
            2 => Some(BitsPerBlock::Two),
            3 => Some(BitsPerBlock::Three),
            4 => Some(BitsPerBlock::Four),
            5 => Some(BitsPerBlock::Five),
            6 => Some(BitsPerBlock::Six),
            8 => Some(BitsPerBlock::Eight),
            16 => Some(BitsPerBlock::Sixteen),
            32 => Some(BitsPerBlock::ThirtyTwo),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Smallest encodable width that can address `palette_len` entries.
    pub fn for_palette_len(palette_len: usize) -> Self {
        let needed = ceil_log2(palette_len);
        Self::ENCODABLE
            .into_iter()
            .find(|width| width.bits() >= needed)
            .unwrap_or(BitsPerBlock::ThirtyTwo)
    }

    pub fn can_address(self, palette_len: usize) -> bool {
        self.bits() >= ceil_log2(palette_len)
    }

    /// Storage header byte for this width with the given flag bit.
    pub fn header(self, flag: bool) -> u8 {
        ((self.bits() as u8) << 1) | flag as u8
    }

    pub fn blocks_per_word(self) -> usize {
        32 / self.bits() as usize
    }

    pub fn word_count(self) -> usize {
        BLOCKS_PER_SUB_CHUNK.div_ceil(self.blocks_per_word())
    }

    fn mask(self) -> u32 {
        match self {
            BitsPerBlock::ThirtyTwo => u32::MAX,
            width => (1u32 << width.bits()) - 1,
        }
    }
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// Reads the packed words of one storage and expands them to 4096 indices.
pub fn read_indices(
    reader: &mut RecordReader<'_>,
    width: BitsPerBlock,
    context: &'static str,
) -> Result<Vec<u32>> {
    let words = reader.read_bytes(width.word_count() * 4, context)?;
    let per_word = width.blocks_per_word();
    let bits = width.bits();
    let mask = width.mask();

    let mut indices = Vec::with_capacity(BLOCKS_PER_SUB_CHUNK);
    for chunk in words.chunks_exact(4) {
        let word = LittleEndian::read_u32(chunk);
        for slot in 0..per_word {
            if indices.len() == BLOCKS_PER_SUB_CHUNK {
                break;
            }
            // `checked_shr` keeps the 32-bit width from overflowing the shift.
            let value = word.checked_shr(bits * slot as u32).unwrap_or(0) & mask;
            indices.push(value);
        }
    }
    Ok(indices)
}

/// Packs exactly 4096 indices at the given width.
pub fn write_indices(out: &mut Vec<u8>, indices: &[u32], width: BitsPerBlock) -> Result<()> {
    if indices.len() != BLOCKS_PER_SUB_CHUNK {
        return Err(LodestoneError::Validation(format!(
            "expected {} indices, found {}",
            BLOCKS_PER_SUB_CHUNK,
            indices.len()
        )));
    }
    let mask = width.mask();
    if let Some(&too_wide) = indices.iter().find(|&&index| index & !mask != 0) {
        return Err(LodestoneError::Validation(format!(
            "index {} does not fit in {} bits",
            too_wide,
            width.bits()
        )));
    }

    let bits = width.bits();
    out.reserve(width.word_count() * 4);
    for group in indices.chunks(width.blocks_per_word()) {
        let mut word = 0u32;
        for (slot, &index) in group.iter().enumerate() {
            word |= index.checked_shl(bits * slot as u32).unwrap_or(0);
        }
        write_u32_le(out, word)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_for_palette_len_rounds_up_to_encodable_width() {
        assert_eq!(BitsPerBlock::for_palette_len(1), BitsPerBlock::One);
        assert_eq!(BitsPerBlock::for_palette_len(2), BitsPerBlock::One);
        assert_eq!(BitsPerBlock::for_palette_len(3), BitsPerBlock::Two);
        assert_eq!(BitsPerBlock::for_palette_len(5), BitsPerBlock::Four);
        assert_eq!(BitsPerBlock::for_palette_len(16), BitsPerBlock::Four);
        assert_eq!(BitsPerBlock::for_palette_len(17), BitsPerBlock::Eight);
        assert_eq!(BitsPerBlock::for_palette_len(300), BitsPerBlock::Sixteen);
        assert_eq!(BitsPerBlock::for_palette_len(70_000), BitsPerBlock::ThirtyTwo);
    }

    #[test]
    fn test_word_geometry() {
        assert_eq!(BitsPerBlock::One.word_count(), 128);
        assert_eq!(BitsPerBlock::Three.blocks_per_word(), 10);
        assert_eq!(BitsPerBlock::Three.word_count(), 410);
        assert_eq!(BitsPerBlock::Five.word_count(), 683);
        assert_eq!(BitsPerBlock::Six.word_count(), 820);
        assert_eq!(BitsPerBlock::Sixteen.word_count(), 2048);
        assert_eq!(BitsPerBlock::ThirtyTwo.word_count(), 4096);
    }

    #[test]
    fn test_header_byte() {
        assert_eq!(BitsPerBlock::Four.header(false), 0x08);
        assert_eq!(BitsPerBlock::One.header(true), 0x03);
        assert_eq!(BitsPerBlock::ThirtyTwo.header(false), 0x40);
    }

    #[test]
    fn test_lsb_first_layout() {
        let mut indices = vec![0u32; BLOCKS_PER_SUB_CHUNK];
        indices[0] = 1;
        indices[1] = 2;
        indices[7] = 3;
        let mut out = Vec::new();
        write_indices(&mut out, &indices, BitsPerBlock::Four).unwrap();
        assert_eq!(&out[..4], &[0x21, 0x00, 0x00, 0x30]);
    }

    #[test]
    fn test_index_too_wide_rejected() {
        let mut indices = vec![0u32; BLOCKS_PER_SUB_CHUNK];
        indices[10] = 4;
        let mut out = Vec::new();
        assert!(write_indices(&mut out, &indices, BitsPerBlock::Two).is_err());
    }

    #[test]
    fn test_short_words_truncated() {
        let bytes = vec![0u8; 100];
        let mut reader = RecordReader::new(&bytes);
        let err = read_indices(&mut reader, BitsPerBlock::One, "block indices").unwrap_err();
        assert!(err.is_truncation());
    }

    fn width_strategy() -> impl Strategy<Value = BitsPerBlock> {
        prop::sample::select(vec![
            BitsPerBlock::One,
            BitsPerBlock::Two,
            BitsPerBlock::Three,
            BitsPerBlock::Four,
            BitsPerBlock::Five,
            BitsPerBlock::Six,
            BitsPerBlock::Eight,
            BitsPerBlock::Sixteen,
            BitsPerBlock::ThirtyTwo,
        ])
    }

    proptest! {
        #[test]
        fn prop_indices_survive_packing(width in width_strategy(), seed in any::<u64>()) {
            let mask = width.mask() as u64;
            let indices: Vec<u32> = (0..BLOCKS_PER_SUB_CHUNK as u64)
                .map(|i| (seed.wrapping_mul(i + 1).rotate_left(i as u32 % 64) & mask) as u32)
                .collect();

            let mut out = Vec::new();
            write_indices(&mut out, &indices, width).unwrap();
            prop_assert_eq!(out.len(), width.word_count() * 4);

            let mut reader = RecordReader::new(&out);
            prop_assert_eq!(read_indices(&mut reader, width, "indices").unwrap(), indices);
            prop_assert!(reader.is_empty());
        }

        #[test]
        fn prop_chosen_width_is_smallest_sufficient(len in 1usize..=4096) {
            let width = BitsPerBlock::for_palette_len(len);
            prop_assert!(width.can_address(len));
            for smaller in BitsPerBlock::ENCODABLE.into_iter().filter(|w| *w < width) {
                prop_assert!(!smaller.can_address(len));
            }
        }
    }
}
