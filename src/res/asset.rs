//! Loaded asset objects and the traits that asset types implement.

use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::errors::*;
use crate::utils::FastHashMap;

use super::header::AssetHeader;
use super::stream::{AssetReader, AssetWriter};

/// Identifies the concrete type of an asset in serialized headers and in the
/// `TypeFactory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(pub u32);

impl TypeTag {
    pub const INVALID: TypeTag = TypeTag(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != TypeTag::INVALID
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Settings handed to `AssetObject::import`, keyed by option name.
pub type ImportOptions = FastHashMap<String, serde_json::Value>;

/// The payload of an asset.
///
/// Objects are default-constructed by the `TypeFactory` and populated by
/// `load_stream`, which might run on the loader thread. Anything that must
/// happen on the owning thread belongs in `create`.
pub trait AssetObject: AsAny + Send + Sync {
    fn type_tag(&self) -> TypeTag;

    fn type_name(&self) -> &'static str;

    /// Reads the body that follows the header.
    fn load_stream(&mut self, reader: &mut AssetReader) -> Result<()>;

    fn save_stream(&self, writer: &mut AssetWriter) -> Result<()>;

    /// Finalization, called once on the owning thread after the object has been
    /// populated.
    fn create(&mut self) {}

    /// Called before the object is released by a sweep, an unload or a purge.
    fn destroy(&mut self) {}

    /// Populates the object from a source file of foreign format.
    fn import(&mut self, path: &Path, _: &ImportOptions) -> Result<()> {
        Err(Error::Unsupported(format!(
            "{} could not be imported from {:?}.",
            self.type_name(),
            path
        )))
    }
}

/// Asset types with a statically known tag, which could be registered into the
/// `TypeFactory` and fetched with typed accessors.
pub trait AssetType: AssetObject + Default {
    const TYPE_TAG: TypeTag;
    const TYPE_NAME: &'static str;
}

struct AssetInner {
    name: RwLock<String>,
    type_tag: TypeTag,
    ref_count: AtomicI32,
    version: AtomicU32,
    loaded: AtomicBool,
    engine: AtomicBool,
    embedded: AtomicBool,
    transient: AtomicBool,
    purged: AtomicBool,
    object: RwLock<Option<Box<dyn AssetObject>>>,
}

/// A shared asset object.
///
/// `Asset` is the registry's own pointer to a loaded object and does not count
/// as a reference. Callers hold `AssetRef`s, which retain and release the
/// asset's reference count. Releasing the last reference does not destroy
/// anything; destruction happens during `AssetManager::sweep` or `purge`.
#[derive(Clone)]
pub struct Asset {
    inner: Arc<AssetInner>,
}

impl Asset {
    pub(crate) fn new<T: Into<String>>(name: T, object: Box<dyn AssetObject>) -> Self {
        let inner = AssetInner {
            name: RwLock::new(name.into()),
            type_tag: object.type_tag(),
            ref_count: AtomicI32::new(0),
            version: AtomicU32::new(super::header::VERSION_CURRENT),
            loaded: AtomicBool::new(false),
            engine: AtomicBool::new(false),
            embedded: AtomicBool::new(false),
            transient: AtomicBool::new(false),
            purged: AtomicBool::new(false),
            object: RwLock::new(Some(object)),
        };

        Asset {
            inner: Arc::new(inner),
        }
    }

    #[inline]
    pub fn name(&self) -> String {
        self.inner.name.read().clone()
    }

    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        self.inner.type_tag
    }

    /// The number of `AssetRef`s pointing at this asset.
    #[inline]
    pub fn ref_count(&self) -> i32 {
        self.inner.ref_count.load(Ordering::Acquire)
    }

    /// Schema version of the stream this asset was loaded from.
    #[inline]
    pub fn version(&self) -> u32 {
        self.inner.version.load(Ordering::Relaxed)
    }

    /// Returns true once the object has been populated and finalized.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.load(Ordering::Acquire)
    }

    /// Engine assets are never collected by sweeps.
    #[inline]
    pub fn is_engine(&self) -> bool {
        self.inner.engine.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_embedded(&self) -> bool {
        self.inner.embedded.load(Ordering::Relaxed)
    }

    /// Transient assets are not registered, and serialize as null references.
    #[inline]
    pub fn is_transient(&self) -> bool {
        self.inner.transient.load(Ordering::Relaxed)
    }

    /// Borrows the object as `T`. Returns `None` if the object has been destroyed
    /// or is of another type.
    pub fn get<T: AssetObject>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.inner.object.read(), |v| {
            v.as_deref().and_then(|object| object.as_any().downcast_ref::<T>())
        })
        .ok()
    }

    pub fn get_mut<T: AssetObject>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.inner.object.write(), |v| {
            v.as_deref_mut()
                .and_then(|object| object.as_any_mut().downcast_mut::<T>())
        })
        .ok()
    }

    /// Serializes the header and the body of this asset.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let object = self.inner.object.read();
        let object = object
            .as_deref()
            .ok_or_else(|| Error::NotLoaded(self.name()))?;

        let mut writer = AssetWriter::new();
        writer.write_header(&AssetHeader::new(self.type_tag(), self.is_embedded()))?;
        object.save_stream(&mut writer)?;
        Ok(writer.into_inner())
    }

    pub(crate) fn set_name<T: Into<String>>(&self, name: T) {
        *self.inner.name.write() = name.into();
    }

    pub(crate) fn set_version(&self, version: u32) {
        self.inner.version.store(version, Ordering::Relaxed);
    }

    pub(crate) fn set_engine(&self, engine: bool) {
        self.inner.engine.store(engine, Ordering::Relaxed);
    }

    pub(crate) fn set_embedded(&self, embedded: bool) {
        self.inner.embedded.store(embedded, Ordering::Relaxed);
    }

    pub(crate) fn set_transient(&self, transient: bool) {
        self.inner.transient.store(transient, Ordering::Relaxed);
    }

    /// Detaches the object, so it could be populated without holding the lock.
    /// Readers observe an empty asset until it is put back.
    pub(crate) fn take_object(&self) -> Option<Box<dyn AssetObject>> {
        self.inner.object.write().take()
    }

    pub(crate) fn put_object(&self, object: Box<dyn AssetObject>) {
        *self.inner.object.write() = Some(object);
    }

    pub(crate) fn retain(&self) {
        self.inner.ref_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn release(&self) {
        // The object has been force-freed, outstanding handles are expected.
        if self.inner.purged.load(Ordering::Acquire) {
            return;
        }

        let prev = self.inner.ref_count.fetch_sub(1, Ordering::AcqRel);
        if prev <= 0 {
            self.inner.ref_count.fetch_add(1, Ordering::AcqRel);
            error!("Reference count of asset {} underflows.", self.name());
            debug_assert!(false, "reference count of asset {} underflows", self.name());
        }
    }

    pub(crate) fn mark_purged(&self) {
        self.inner.purged.store(true, Ordering::Release);
    }

    /// Runs the main-thread finalization of the object.
    ///
    /// `create` could follow references back to this asset, so it runs on the
    /// detached object.
    pub(crate) fn finalize(&self) {
        let object = self.take_object();
        if let Some(mut object) = object {
            object.create();
            self.put_object(object);
        }

        self.inner.loaded.store(true, Ordering::Release);
    }

    /// Destroys the object. The handles that still point at this asset observe
    /// an empty object afterwards.
    pub(crate) fn destroy(&self) {
        self.inner.loaded.store(false, Ordering::Release);

        // Dropping the object releases the assets it references, so it must not
        // happen under the lock.
        let object = self.inner.object.write().take();
        if let Some(mut object) = object {
            object.destroy();
        }
    }

    /// Drops an object that has never been finalized.
    pub(crate) fn discard(&self) {
        self.inner.loaded.store(false, Ordering::Release);
        let object = self.inner.object.write().take();
        drop(object);
    }
}

impl PartialEq for Asset {
    fn eq(&self, rhs: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &rhs.inner)
    }
}

impl Eq for Asset {}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Asset")
            .field("name", &self.name())
            .field("type_tag", &self.type_tag())
            .field("ref_count", &self.ref_count())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Reads the header and the body from `reader` into `object`.
pub fn deserialize(object: &mut dyn AssetObject, reader: &mut AssetReader) -> Result<AssetHeader> {
    let header = reader.read_header()?;
    if header.type_tag != object.type_tag() {
        return Err(Error::MalformedHeader(format!(
            "expected type {} ({}), found {}.",
            object.type_tag(),
            object.type_name(),
            header.type_tag
        )));
    }

    object.load_stream(reader)?;
    Ok(header)
}

/// The name of an asset stored at `path`, which is its file name without
/// extension.
pub fn name_from_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default()
}
