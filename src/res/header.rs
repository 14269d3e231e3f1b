//! Fixed-size header prefixed to every serialized asset.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::*;

use super::asset::TypeTag;

/// Identifies a stream as a serialized asset.
pub const MAGIC: u32 = 0x4B52_5453;

// Schema versions. Bump `VERSION_CURRENT` whenever a body gains fields, and
// gate the reads of those fields on `AssetReader::version`.
pub const VERSION_BASE: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_BASE;

/// Size in bytes of a serialized `AssetHeader`.
pub const HEADER_SIZE: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetHeader {
    pub magic: u32,
    pub version: u32,
    pub type_tag: TypeTag,
    pub embedded: bool,
}

impl AssetHeader {
    /// Creates a header of the current schema version.
    pub fn new(type_tag: TypeTag, embedded: bool) -> Self {
        AssetHeader {
            magic: MAGIC,
            version: VERSION_CURRENT,
            type_tag,
            embedded,
        }
    }

    /// Reads and validates a header. The stream is rejected if the magic number
    /// does not match, or if it was written by a newer schema.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let magic = r.read_u32::<LittleEndian>().map_err(truncated)?;
        if magic != MAGIC {
            return Err(Error::MalformedHeader(format!(
                "magic number {:#010x} does not match.",
                magic
            )));
        }

        let version = r.read_u32::<LittleEndian>().map_err(truncated)?;
        if version > VERSION_CURRENT {
            return Err(Error::MalformedHeader(format!(
                "schema version {} is newer than {}.",
                version, VERSION_CURRENT
            )));
        }

        let type_tag = TypeTag(r.read_u32::<LittleEndian>().map_err(truncated)?);
        let embedded = r.read_u8().map_err(truncated)? != 0;

        Ok(AssetHeader {
            magic,
            version,
            type_tag,
            embedded,
        })
    }

    /// Reads a header from the start of `bytes`.
    #[inline]
    pub fn peek(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::MalformedHeader(format!(
                "expected {} bytes, found {}.",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        AssetHeader::read(&mut bytes)
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.magic)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.type_tag.0)?;
        w.write_u8(self.embedded as u8)?;
        Ok(())
    }
}

fn truncated(err: std::io::Error) -> Error {
    Error::MalformedHeader(format!("truncated ({}).", err))
}
