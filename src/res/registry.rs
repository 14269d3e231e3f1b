//! The `Registry` maps asset names to their stubs.

use std::collections::hash_map::Entry;

use crate::errors::*;
use crate::utils::FastHashMap;

use super::asset::TypeTag;
use super::dir::{AssetDir, DirRef};
use super::location::AssetLocation;
use super::stub::AssetStub;

/// Maps the unique name of an asset to its `AssetStub`, and keeps the folder
/// tree the stubs are listed in. The registry never loads anything by itself.
pub struct Registry {
    stubs: FastHashMap<String, AssetStub>,
    root: DirRef,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            stubs: FastHashMap::default(),
            root: AssetDir::new_root(),
        }
    }

    /// Registers an asset. Registering the same name with the same location again
    /// returns the existing stub, while a different location is rejected and the
    /// existing stub is left untouched.
    pub fn register(
        &mut self,
        name: &str,
        type_tag: TypeTag,
        location: AssetLocation,
        engine: bool,
        directory: Option<&DirRef>,
    ) -> Result<&mut AssetStub> {
        match self.stubs.entry(name.to_owned()) {
            Entry::Occupied(entry) => {
                if *entry.get().location() != location {
                    warn!(
                        "Asset {} has been registered at {}, ignores {}.",
                        name,
                        entry.get().location(),
                        location
                    );

                    return Err(Error::DuplicateRegistration(name.to_owned()));
                }

                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                if let Some(dir) = directory {
                    dir.write().add_asset(name);
                }

                let stub = AssetStub::new(name.to_owned(), type_tag, location, engine, directory);
                Ok(entry.insert(stub))
            }
        }
    }

    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&AssetStub> {
        self.stubs.get(name)
    }

    #[inline]
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut AssetStub> {
        self.stubs.get_mut(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.stubs.contains_key(name)
    }

    /// Moves the stub `name` to `new_name`. The loaded object and the listing
    /// in its folder are renamed as well.
    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
        if self.stubs.contains_key(new_name) {
            return Err(Error::DuplicateRegistration(new_name.to_owned()));
        }

        let mut stub = self
            .stubs
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;

        stub.set_name(new_name.to_owned());

        if let Some(asset) = stub.asset() {
            asset.set_name(new_name);
        }

        if let Some(dir) = stub.directory() {
            dir.write().rename_asset(name, new_name);
        }

        self.stubs.insert(new_name.to_owned(), stub);
        Ok(())
    }

    /// Removes the stub `name` and detaches it from its folder.
    pub fn deregister(&mut self, name: &str) -> Option<AssetStub> {
        let stub = self.stubs.remove(name)?;

        if let Some(dir) = stub.directory() {
            dir.write().remove_asset(name);
        }

        Some(stub)
    }

    /// The stubs listed in `dir`.
    pub fn list(&self, dir: &DirRef) -> Vec<&AssetStub> {
        dir.read()
            .assets()
            .iter()
            .filter_map(|v| self.stubs.get(v))
            .collect()
    }

    /// The stubs of `type_tag`, sorted by name.
    pub fn list_type(&self, type_tag: TypeTag) -> Vec<&AssetStub> {
        let mut stubs: Vec<_> = self
            .stubs
            .values()
            .filter(|v| v.type_tag() == type_tag)
            .collect();

        stubs.sort_by(|lhs, rhs| lhs.name().cmp(rhs.name()));
        stubs
    }

    /// The names of every stub, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.stubs.keys().cloned().collect();
        names.sort();
        names
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AssetStub> {
        self.stubs.values()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AssetStub> {
        self.stubs.values_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// The root of the folder tree.
    #[inline]
    pub fn root(&self) -> &DirRef {
        &self.root
    }
}
