use std::sync::Weak;

use parking_lot::RwLock;

use super::asset::{Asset, TypeTag};
use super::dir::{AssetDir, DirRef};
use super::location::AssetLocation;

/// A registry entry, which describes where and how to load an asset whether it
/// is loaded or not.
pub struct AssetStub {
    name: String,
    type_tag: TypeTag,
    location: AssetLocation,
    asset: Option<Asset>,
    engine: bool,
    directory: Option<Weak<RwLock<AssetDir>>>,
}

impl AssetStub {
    pub(crate) fn new(
        name: String,
        type_tag: TypeTag,
        location: AssetLocation,
        engine: bool,
        directory: Option<&DirRef>,
    ) -> Self {
        AssetStub {
            name,
            type_tag,
            location,
            asset: None,
            engine,
            directory: directory.map(std::sync::Arc::downgrade),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    #[inline]
    pub fn location(&self) -> &AssetLocation {
        &self.location
    }

    /// The object currently installed in this stub.
    #[inline]
    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.asset.is_some()
    }

    /// Engine assets are never swept, and survive non-engine purges.
    #[inline]
    pub fn is_engine(&self) -> bool {
        self.engine
    }

    pub fn directory(&self) -> Option<DirRef> {
        self.directory.as_ref().and_then(|v| v.upgrade())
    }

    /// Installs `asset`, and returns the previous one.
    pub(crate) fn set_asset(&mut self, asset: Option<Asset>) -> Option<Asset> {
        std::mem::replace(&mut self.asset, asset)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_location(&mut self, location: AssetLocation) {
        self.location = location;
    }
}
