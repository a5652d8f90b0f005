//! Named binary tag trees as stored by Bedrock Edition.
//!
//! The world database stores every structured value as one or more root
//! compounds in the little-endian flavor. Compounds keep their field order and
//! lists keep their declared element type, so a parsed tree serializes back to
//! the exact bytes it came from.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use indexmap::IndexMap;
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// Maximum nesting of lists and compounds accepted by the reader.
pub const MAX_DEPTH: usize = 512;

pub type Compound = IndexMap<String, Tag>;

pub type Result<T> = std::result::Result<T, NbtError>;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid tag type: {0}")]
    InvalidTagType(u8),
    #[error("negative length: {0}")]
    NegativeLength(i32),
    #[error("invalid UTF-8 in string: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),
    #[error("string of {0} bytes does not fit a u16 length")]
    StringTooLong(usize),
    #[error("list mixes element types {expected} and {found}")]
    MixedList { expected: u8, found: u8 },
    #[error("tag nesting exceeds {MAX_DEPTH} levels")]
    DepthLimit,
}

impl NbtError {
    /// True when the input ended in the middle of a tag.
    pub fn is_eof(&self) -> bool {
        matches!(self, NbtError::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Byte order of the numeric fields in a serialized tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NbtFlavor {
    /// Bedrock disk format.
    #[default]
    LittleEndian,
    /// Java Edition and some legacy exports.
    BigEndian,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List { element_type: u8, items: Vec<Tag> },
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    /// Builds a list, taking the element type from the first item.
    pub fn list(items: Vec<Tag>) -> Tag {
        let element_type = items.first().map_or(0, Tag::get_type_id);
        Tag::List {
            element_type,
            items,
        }
    }

    pub fn get_type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List { .. } => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Reads one named tag. A lone `End` byte reads as `("", Tag::End)`.
    pub fn read<O: ByteOrder, R: Read>(reader: &mut R) -> Result<(String, Tag)> {
        Tag::read_named::<O, R>(reader, 0)
    }

    fn read_named<O: ByteOrder, R: Read>(reader: &mut R, depth: usize) -> Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }

        let name = read_string::<O, R>(reader)?;
        let tag = Tag::read_payload::<O, R>(reader, type_id, depth)?;
        Ok((name, tag))
    }

    fn read_payload<O: ByteOrder, R: Read>(
        reader: &mut R,
        type_id: u8,
        depth: usize,
    ) -> Result<Tag> {
        if depth > MAX_DEPTH {
            return Err(NbtError::DepthLimit);
        }

        match type_id {
            0 => Ok(Tag::End),
            1 => Ok(Tag::Byte(reader.read_i8()?)),
            2 => Ok(Tag::Short(reader.read_i16::<O>()?)),
            3 => Ok(Tag::Int(reader.read_i32::<O>()?)),
            4 => Ok(Tag::Long(reader.read_i64::<O>()?)),
            5 => Ok(Tag::Float(reader.read_f32::<O>()?)),
            6 => Ok(Tag::Double(reader.read_f64::<O>()?)),
            7 => {
                let length = read_length::<O, R>(reader)?;
                // A corrupt length must not turn into a huge allocation.
                let mut bytes = Vec::new();
                reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
                if bytes.len() != length {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                }
                Ok(Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect()))
            }
            8 => Ok(Tag::String(read_string::<O, R>(reader)?)),
            9 => {
                let element_type = reader.read_u8()?;
                let length = read_length::<O, R>(reader)?;
                // End elements have no payload, so nothing would bound the loop.
                if element_type == 0 && length > 0 {
                    return Err(NbtError::InvalidTagType(0));
                }
                let mut items = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    items.push(Tag::read_payload::<O, R>(reader, element_type, depth + 1)?);
                }
                Ok(Tag::List {
                    element_type,
                    items,
                })
            }
            10 => {
                let mut compound = Compound::new();
                loop {
                    let (name, tag) = Tag::read_named::<O, R>(reader, depth + 1)?;
                    if let Tag::End = tag {
                        break;
                    }
                    compound.insert(name, tag);
                }
                Ok(Tag::Compound(compound))
            }
            11 => {
                let length = read_length::<O, R>(reader)?;
                let mut ints = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    ints.push(reader.read_i32::<O>()?);
                }
                Ok(Tag::IntArray(ints))
            }
            12 => {
                let length = read_length::<O, R>(reader)?;
                let mut longs = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    longs.push(reader.read_i64::<O>()?);
                }
                Ok(Tag::LongArray(longs))
            }
            _ => Err(NbtError::InvalidTagType(type_id)),
        }
    }

    pub fn write<O: ByteOrder, W: Write>(&self, writer: &mut W, name: &str) -> Result<()> {
        writer.write_u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            write_string::<O, W>(writer, name)?;
        }

        self.write_payload::<O, W>(writer)
    }

    fn write_payload<O: ByteOrder, W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Tag::End => {}
            Tag::Byte(v) => writer.write_i8(*v)?,
            Tag::Short(v) => writer.write_i16::<O>(*v)?,
            Tag::Int(v) => writer.write_i32::<O>(*v)?,
            Tag::Long(v) => writer.write_i64::<O>(*v)?,
            Tag::Float(v) => writer.write_f32::<O>(*v)?,
            Tag::Double(v) => writer.write_f64::<O>(*v)?,
            Tag::ByteArray(v) => {
                writer.write_i32::<O>(v.len() as i32)?;
                for &b in v {
                    writer.write_i8(b)?;
                }
            }
            Tag::String(v) => write_string::<O, W>(writer, v)?,
            Tag::List {
                element_type,
                items,
            } => {
                writer.write_u8(*element_type)?;
                writer.write_i32::<O>(items.len() as i32)?;
                for tag in items {
                    let found = tag.get_type_id();
                    if found != *element_type {
                        return Err(NbtError::MixedList {
                            expected: *element_type,
                            found,
                        });
                    }
                    tag.write_payload::<O, W>(writer)?;
                }
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write::<O, W>(writer, name)?;
                }
                Tag::End.write::<O, W>(writer, "")?;
            }
            Tag::IntArray(v) => {
                writer.write_i32::<O>(v.len() as i32)?;
                for &i in v {
                    writer.write_i32::<O>(i)?;
                }
            }
            Tag::LongArray(v) => {
                writer.write_i32::<O>(v.len() as i32)?;
                for &l in v {
                    writer.write_i64::<O>(l)?;
                }
            }
        }
        Ok(())
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List { items, .. } => Some(items),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(n) => Some(*n),
            _ => None,
        }
    }
}

fn read_length<O: ByteOrder, R: Read>(reader: &mut R) -> Result<usize> {
    let length = reader.read_i32::<O>()?;
    if length < 0 {
        return Err(NbtError::NegativeLength(length));
    }
    Ok(length as usize)
}

fn read_string<O: ByteOrder, R: Read>(reader: &mut R) -> Result<String> {
    let length = reader.read_u16::<O>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

fn write_string<O: ByteOrder, W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let length = u16::try_from(value.len()).map_err(|_| NbtError::StringTooLong(value.len()))?;
    writer.write_u16::<O>(length)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

/// A root tag together with its name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
    pub name: String,
    pub tag: Tag,
}

impl NamedTag {
    pub fn new(name: impl Into<String>, tag: Tag) -> Self {
        NamedTag {
            name: name.into(),
            tag,
        }
    }

    pub fn read<O: ByteOrder, R: Read>(reader: &mut R) -> Result<Self> {
        let (name, tag) = Tag::read::<O, R>(reader)?;
        Ok(NamedTag { name, tag })
    }

    pub fn write<O: ByteOrder, W: Write>(&self, writer: &mut W) -> Result<()> {
        self.tag.write::<O, W>(writer, &self.name)
    }

    pub fn read_flavor<R: Read>(flavor: NbtFlavor, reader: &mut R) -> Result<Self> {
        match flavor {
            NbtFlavor::LittleEndian => NamedTag::read::<LittleEndian, R>(reader),
            NbtFlavor::BigEndian => NamedTag::read::<BigEndian, R>(reader),
        }
    }

    pub fn write_flavor<W: Write>(&self, flavor: NbtFlavor, writer: &mut W) -> Result<()> {
        match flavor {
            NbtFlavor::LittleEndian => self.write::<LittleEndian, W>(writer),
            NbtFlavor::BigEndian => self.write::<BigEndian, W>(writer),
        }
    }
}

/// Parses the first root tag in `bytes` and reports how many bytes it used.
pub fn from_slice(flavor: NbtFlavor, bytes: &[u8]) -> Result<(NamedTag, usize)> {
    let mut cursor = Cursor::new(bytes);
    let named = NamedTag::read_flavor(flavor, &mut cursor)?;
    Ok((named, cursor.position() as usize))
}

/// Parses back-to-back root tags until `bytes` is exhausted.
pub fn read_all(flavor: NbtFlavor, bytes: &[u8]) -> Result<Vec<NamedTag>> {
    let mut cursor = Cursor::new(bytes);
    let mut tags = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        tags.push(NamedTag::read_flavor(flavor, &mut cursor)?);
    }
    Ok(tags)
}

pub fn to_vec(flavor: NbtFlavor, tag: &NamedTag) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    tag.write_flavor(flavor, &mut buffer)?;
    Ok(buffer)
}

pub fn write_all(flavor: NbtFlavor, tags: &[NamedTag]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    for tag in tags {
        tag.write_flavor(flavor, &mut buffer)?;
    }
    Ok(buffer)
}
