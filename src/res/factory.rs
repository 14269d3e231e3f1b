//! Constructs empty asset objects from their type tags.

use crate::errors::*;
use crate::utils::FastHashMap;

use super::asset::{AssetObject, AssetType, TypeTag};
use super::assets::RawFile;

type Constructor = Box<dyn Fn() -> Box<dyn AssetObject> + Send + Sync>;

struct Entry {
    name: String,
    constructor: Constructor,
}

/// Maps type tags to constructors of default-initialized objects. The factory is
/// shared with the loader thread once the `AssetManager` is created.
#[derive(Default)]
pub struct TypeFactory {
    entries: FastHashMap<TypeTag, Entry>,
    names: FastHashMap<String, TypeTag>,
}

impl TypeFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        TypeFactory::default()
    }

    /// Creates a factory with the built-in asset types registered.
    pub fn with_builtins() -> Self {
        let mut factory = TypeFactory::new();
        factory.insert(RawFile::TYPE_TAG, RawFile::TYPE_NAME, || {
            Box::new(RawFile::default())
        });
        factory
    }

    pub fn register<T: AssetType>(&mut self) -> Result<()> {
        self.register_with(T::TYPE_TAG, T::TYPE_NAME, || Box::new(T::default()))
    }

    /// Registers a custom constructor for `type_tag`.
    pub fn register_with<F>(&mut self, type_tag: TypeTag, name: &str, constructor: F) -> Result<()>
    where
        F: Fn() -> Box<dyn AssetObject> + Send + Sync + 'static,
    {
        if !type_tag.is_valid() {
            return Err(Error::UnknownType(type_tag));
        }

        if self.entries.contains_key(&type_tag) || self.names.contains_key(name) {
            return Err(Error::DuplicateRegistration(name.to_owned()));
        }

        self.insert(type_tag, name, constructor);
        Ok(())
    }

    fn insert<F>(&mut self, type_tag: TypeTag, name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn AssetObject> + Send + Sync + 'static,
    {
        let entry = Entry {
            name: name.to_owned(),
            constructor: Box::new(constructor),
        };

        self.entries.insert(type_tag, entry);
        self.names.insert(name.to_owned(), type_tag);
    }

    /// Default-constructs an object of `type_tag`.
    pub fn create(&self, type_tag: TypeTag) -> Result<Box<dyn AssetObject>> {
        self.entries
            .get(&type_tag)
            .map(|v| (v.constructor)())
            .ok_or(Error::UnknownType(type_tag))
    }

    #[inline]
    pub fn contains(&self, type_tag: TypeTag) -> bool {
        self.entries.contains_key(&type_tag)
    }

    pub fn type_name(&self, type_tag: TypeTag) -> Option<&str> {
        self.entries.get(&type_tag).map(|v| v.name.as_str())
    }

    pub fn type_from_name(&self, name: &str) -> Option<TypeTag> {
        self.names.get(name).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
