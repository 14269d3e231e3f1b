//! Where the bytes of an asset live.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::*;

use super::header::AssetHeader;

/// An asset compiled into the executable.
#[derive(Debug)]
pub struct EmbeddedFile {
    pub name: &'static str,
    pub data: &'static [u8],
    /// Embedded engine assets are never swept.
    pub engine: bool,
}

#[derive(Debug, Clone)]
pub enum AssetLocation {
    File(PathBuf),
    Embedded(&'static EmbeddedFile),
}

impl AssetLocation {
    /// Reads the whole serialized asset.
    pub fn read(&self) -> Result<Cow<'static, [u8]>> {
        match *self {
            AssetLocation::File(ref path) => fs::read(path)
                .map(Cow::Owned)
                .map_err(|err| not_found(err, path)),
            AssetLocation::Embedded(file) => Ok(Cow::Borrowed(file.data)),
        }
    }

    /// Reads only the header of the serialized asset.
    pub fn read_header(&self) -> Result<AssetHeader> {
        match *self {
            AssetLocation::File(ref path) => {
                let mut file = fs::File::open(path).map_err(|err| not_found(err, path))?;
                AssetHeader::read(&mut file)
            }
            AssetLocation::Embedded(file) => AssetHeader::peek(file.data),
        }
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        match *self {
            AssetLocation::File(ref path) => Some(path.as_path()),
            AssetLocation::Embedded(_) => None,
        }
    }

    #[inline]
    pub fn is_embedded(&self) -> bool {
        match *self {
            AssetLocation::Embedded(_) => true,
            _ => false,
        }
    }
}

fn not_found(err: std::io::Error, path: &Path) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound(path.to_owned())
    } else {
        Error::IO(err)
    }
}

impl PartialEq for AssetLocation {
    fn eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (AssetLocation::File(lhs), AssetLocation::File(rhs)) => lhs == rhs,
            (AssetLocation::Embedded(lhs), AssetLocation::Embedded(rhs)) => {
                std::ptr::eq(*lhs, *rhs)
            }
            _ => false,
        }
    }
}

impl Eq for AssetLocation {}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AssetLocation::File(ref path) => write!(f, "{}", path.display()),
            AssetLocation::Embedded(file) => write!(f, "embedded:{}", file.name),
        }
    }
}
