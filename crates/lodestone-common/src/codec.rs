use crate::config::CodecOptions;
use crate::error::LodestoneError;
use crate::types::Result;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use lodestone_nbt::{NamedTag, NbtFlavor};

/// A record type with its own binary layout. Contains the functions to read
/// the record from a value and to write it back.
pub trait RecordCodec: Sized {
    /// Human-readable record name used in diagnostics.
    const NAME: &'static str;

    /// Reads the record from the reader. Implementations decide whether
    /// trailing bytes are an error.
    fn read_from(reader: &mut RecordReader<'_>, options: &CodecOptions) -> Result<Self>;

    /// Appends the encoded record to `out`.
    fn write_to(&self, out: &mut Vec<u8>, options: &CodecOptions) -> Result<()>;

    fn decode(bytes: &[u8], options: &CodecOptions) -> Result<Self> {
        let mut reader = RecordReader::new(bytes);
        Self::read_from(&mut reader, options)
    }

    fn encode(&self, options: &CodecOptions) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out, options)?;
        Ok(out)
    }
}

/// Slice-advancing cursor over one record value.
/// Every read names what it was reading so a short value reports where it
/// ran out.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Current offset from the start of the value.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    fn ensure(&self, needed: usize, context: &'static str) -> Result<()> {
        if self.remaining() < needed {
            return Err(LodestoneError::Truncated {
                context,
                offset: self.cursor,
            });
        }
        Ok(())
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        self.ensure(len, context)?;
        let bytes = &self.bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.read_bytes(1, context)?[0])
    }

    pub fn read_i8(&mut self, context: &'static str) -> Result<i8> {
        Ok(self.read_u8(context)? as i8)
    }

    pub fn read_i16_le(&mut self, context: &'static str) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2, context)?))
    }

    pub fn read_u32_le(&mut self, context: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4, context)?))
    }

    pub fn read_i32_le(&mut self, context: &'static str) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4, context)?))
    }

    /// Reads one self-delimiting tag tree and advances past exactly the bytes
    /// it occupied.
    pub fn read_tag(&mut self, flavor: NbtFlavor, context: &'static str) -> Result<NamedTag> {
        let (tag, consumed) =
            lodestone_nbt::from_slice(flavor, &self.bytes[self.cursor..]).map_err(|err| {
                if err.is_eof() {
                    LodestoneError::Truncated {
                        context,
                        offset: self.cursor,
                    }
                } else {
                    LodestoneError::Nbt(err)
                }
            })?;
        self.cursor += consumed;
        Ok(tag)
    }

    /// Fails if any bytes are left after a fixed-size record.
    pub fn expect_end(&self, what: &'static str) -> Result<()> {
        if !self.is_empty() {
            return Err(LodestoneError::Validation(format!(
                "{} trailing bytes after {}",
                self.remaining(),
                what
            )));
        }
        Ok(())
    }
}

pub fn write_i16_le(out: &mut Vec<u8>, value: i16) -> Result<()> {
    out.write_i16::<LittleEndian>(value)?;
    Ok(())
}

pub fn write_u32_le(out: &mut Vec<u8>, value: u32) -> Result<()> {
    out.write_u32::<LittleEndian>(value)?;
    Ok(())
}

pub fn write_i32_le(out: &mut Vec<u8>, value: i32) -> Result<()> {
    out.write_i32::<LittleEndian>(value)?;
    Ok(())
}

pub fn write_tag(out: &mut Vec<u8>, flavor: NbtFlavor, tag: &NamedTag) -> Result<()> {
    tag.write_flavor(flavor, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lodestone_nbt::Tag;

    #[test]
    fn test_reader_little_endian_reads() {
        let bytes = [0x2f, 0xfc, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = RecordReader::new(&bytes);
        assert_eq!(reader.read_u8("version").unwrap(), 0x2f);
        assert_eq!(reader.read_i8("index").unwrap(), -4);
        assert_eq!(reader.read_i16_le("height").unwrap(), 0x1234);
        assert_eq!(reader.read_u32_le("word").unwrap(), 0x1234_5678);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reader_truncation_reports_offset() {
        let bytes = [1, 2, 3];
        let mut reader = RecordReader::new(&bytes);
        reader.read_u8("version").unwrap();
        let err = reader.read_u32_le("palette size").unwrap_err();
        assert_matches!(
            err,
            LodestoneError::Truncated {
                context: "palette size",
                offset: 1
            }
        );
        // A failed read does not move the cursor.
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_read_tag_advances_by_consumed_bytes() {
        let mut out = Vec::new();
        write_tag(
            &mut out,
            NbtFlavor::LittleEndian,
            &NamedTag::new("", Tag::Int(7)),
        )
        .unwrap();
        let tag_len = out.len();
        out.push(0xAB);

        let mut reader = RecordReader::new(&out);
        let tag = reader.read_tag(NbtFlavor::LittleEndian, "palette entry").unwrap();
        assert_eq!(tag.tag, Tag::Int(7));
        assert_eq!(reader.position(), tag_len);
        assert_eq!(reader.read_u8("tail").unwrap(), 0xAB);
    }

    #[test]
    fn test_read_tag_truncated() {
        let bytes = [10, 0, 0, 8, 4, 0, b'n'];
        let mut reader = RecordReader::new(&bytes);
        let err = reader
            .read_tag(NbtFlavor::LittleEndian, "palette entry")
            .unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_expect_end() {
        let reader = RecordReader::new(&[0]);
        assert_matches!(reader.expect_end("Data2D"), Err(LodestoneError::Validation(_)));
        assert!(RecordReader::new(&[]).expect_end("Data2D").is_ok());
    }
}
