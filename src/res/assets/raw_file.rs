use std::fs;
use std::path::Path;

use crate::errors::*;
use crate::res::asset::{AssetObject, AssetType, ImportOptions, TypeTag};
use crate::res::stream::{AssetReader, AssetWriter};

/// An opaque blob of bytes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawFile {
    pub data: Vec<u8>,
}

impl AssetType for RawFile {
    const TYPE_TAG: TypeTag = TypeTag(1);
    const TYPE_NAME: &'static str = "RawFile";
}

impl AssetObject for RawFile {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn load_stream(&mut self, reader: &mut AssetReader) -> Result<()> {
        self.data = reader.read_bytes()?;
        Ok(())
    }

    fn save_stream(&self, writer: &mut AssetWriter) -> Result<()> {
        writer.write_bytes(&self.data);
        Ok(())
    }

    fn import(&mut self, path: &Path, _: &ImportOptions) -> Result<()> {
        self.data = fs::read(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_owned())
            } else {
                Error::IO(err)
            }
        })?;

        Ok(())
    }
}
