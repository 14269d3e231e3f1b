use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::errors::*;

use super::asset::{self, Asset, AssetObject, AssetType, ImportOptions, TypeTag};
use super::asset_ref::AssetRef;
use super::dir::{AssetDir, DirRef};
use super::factory::TypeFactory;
use super::header::AssetHeader;
use super::loader::AsyncLoader;
use super::location::{AssetLocation, EmbeddedFile};
use super::registry::Registry;
use super::request::LoadState;
use super::settings::AssetSettings;
use super::stream::{AssetReader, ReferenceResolver};
use super::stub::AssetStub;

/// The entry point of the asset system.
///
/// The manager owns the `Registry`, the asynchronous loader and the transient
/// assets. Everything except the byte-level deserialization of asynchronous
/// loads happens on the thread that owns the manager; call `update` once per
/// frame to finalize the loads that have completed in the background.
pub struct AssetManager {
    settings: AssetSettings,
    factory: Arc<TypeFactory>,
    registry: Registry,
    loader: AsyncLoader,
    transients: Vec<Asset>,
    purging: bool,
}

impl AssetManager {
    /// Creates a manager and spawns its loader thread.
    pub fn new(factory: TypeFactory, settings: AssetSettings) -> Result<Self> {
        let factory = Arc::new(factory);
        let loader = AsyncLoader::new(factory.clone())?;

        Ok(AssetManager {
            settings,
            factory,
            registry: Registry::new(),
            loader,
            transients: Vec::new(),
            purging: false,
        })
    }

    #[inline]
    pub fn settings(&self) -> &AssetSettings {
        &self.settings
    }

    #[inline]
    pub fn factory(&self) -> &TypeFactory {
        &self.factory
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns true while a purge is running.
    #[inline]
    pub fn is_purging(&self) -> bool {
        self.purging
    }

    #[inline]
    pub fn exists(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    #[inline]
    pub fn stub(&self, name: &str) -> Option<&AssetStub> {
        self.registry.lookup(name)
    }

    /// Gets the asset `name` if it is loaded already. Never loads.
    pub fn get(&self, name: &str) -> Option<AssetRef> {
        self.registry
            .lookup(name)
            .and_then(|v| v.asset())
            .map(AssetRef::from_asset)
    }

    /// Registers an asset at `location` into the root folder.
    pub fn register(
        &mut self,
        name: &str,
        type_tag: TypeTag,
        location: AssetLocation,
        engine: bool,
    ) -> Result<()> {
        let root = self.registry.root().clone();
        self.register_in(&root, name, type_tag, location, engine)
    }

    /// Registers the serialized asset at `path` into `dir`, reading its type
    /// from the header. Returns the name of the asset.
    pub fn register_file<P: AsRef<Path>>(&mut self, dir: &DirRef, path: P) -> Result<String> {
        let location = AssetLocation::File(path.as_ref().to_owned());
        let header = location.read_header()?;
        let name = asset::name_from_path(path);

        self.register_in(dir, &name, header.type_tag, location, false)?;
        Ok(name)
    }

    fn register_in(
        &mut self,
        dir: &DirRef,
        name: &str,
        type_tag: TypeTag,
        location: AssetLocation,
        engine: bool,
    ) -> Result<()> {
        if !self.factory.contains(type_tag) {
            return Err(Error::UnknownType(type_tag));
        }

        let engine = engine || dir.read().is_engine();
        self.registry.register(name, type_tag, location, engine, Some(dir))?;

        Ok(())
    }

    /// Recursively registers the serialized assets under `path` into a folder
    /// named `name`. Only the header of each file is read.
    pub fn discover<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<DirRef> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::FileNotFound(path.to_owned()));
        }

        let engine = name == self.settings.engine_directory;
        let dir = AssetDir::create_child(self.registry.root(), name, engine);
        let num = self.discover_dir(&dir, path)?;

        info!("Discovered {} assets in {}.", num, path.display());
        Ok(dir)
    }

    fn discover_dir(&mut self, dir: &DirRef, path: &Path) -> Result<usize> {
        let mut entries = fs::read_dir(path)?
            .map(|v| v.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;

        entries.sort();

        let mut num = 0;
        for entry in entries {
            if entry.is_dir() {
                let name = entry
                    .file_name()
                    .map(|v| v.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let engine = name == self.settings.engine_directory;
                let child = AssetDir::create_child(dir, &name, engine);
                num += self.discover_dir(&child, &entry)?;
                continue;
            }

            let matches = entry
                .extension()
                .map_or(false, |v| v == self.settings.extension.as_str());

            if matches {
                match self.register_file(dir, &entry) {
                    Ok(_) => num += 1,
                    Err(err) => error!("Failed to register {}: {}", entry.display(), err),
                }
            }
        }

        Ok(num)
    }

    /// Registers the assets listed in a manifest. Each line of the manifest
    /// consists of a type name and a file name relative to the manifest,
    /// separated by a comma.
    pub fn discover_manifest<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            error!("Failed to read manifest {}: {}", path.display(), err);
            match err.kind() {
                std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
                _ => Error::IO(err),
            }
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let root = self.registry.root().clone();

        let mut num = 0;
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut columns = line.splitn(2, ',');
            let (type_name, file) = match (columns.next(), columns.next()) {
                (Some(type_name), Some(file)) => (type_name.trim(), file.trim()),
                _ => {
                    warn!("Malformed line {} of manifest {}.", i + 1, path.display());
                    continue;
                }
            };

            let type_tag = match self.factory.type_from_name(type_name) {
                Some(type_tag) => type_tag,
                None => {
                    warn!("Unknown asset type {} in manifest {}.", type_name, path.display());
                    continue;
                }
            };

            let file = base.join(file);
            let name = asset::name_from_path(&file);
            let location = AssetLocation::File(file);
            match self.register_in(&root, &name, type_tag, location, false) {
                Ok(_) => num += 1,
                Err(err) => warn!("Failed to register {}: {}", name, err),
            }
        }

        info!("Discovered {} assets in manifest {}.", num, path.display());
        Ok(num)
    }

    /// Registers the embedded assets that are not registered yet.
    pub fn discover_embedded(&mut self, files: &'static [EmbeddedFile]) -> usize {
        let root = self.registry.root().clone();

        let mut num = 0;
        for file in files {
            if self.registry.contains(file.name) {
                continue;
            }

            let location = AssetLocation::Embedded(file);
            let result = AssetHeader::peek(file.data).and_then(|header| {
                self.register_in(&root, file.name, header.type_tag, location, file.engine)
            });

            match result {
                Ok(_) => num += 1,
                Err(err) => error!("Failed to register embedded asset {}: {}", file.name, err),
            }
        }

        info!("Discovered {} embedded assets.", num);
        num
    }

    /// Loads the asset `name` on the current thread, and returns a handle to it.
    /// Returns the installed object if it is loaded already.
    pub fn load_sync(&mut self, name: &str) -> Option<AssetRef> {
        self.load(name).map(|v| AssetRef::from_asset(&v))
    }

    /// Loads the asset `name` as `T`. Fails if it has been registered as another
    /// type.
    pub fn load_sync_as<T: AssetType>(&mut self, name: &str) -> Option<AssetRef> {
        let type_tag = self.registry.lookup(name)?.type_tag();
        if type_tag != T::TYPE_TAG {
            error!(
                "Asset {} is of type {}, not {} ({}).",
                name,
                type_tag,
                T::TYPE_TAG,
                T::TYPE_NAME
            );

            return None;
        }

        self.load_sync(name)
    }

    /// Loads the asset `name` in background, and assigns it into `target` once it
    /// has been finalized by `update`. Any earlier pending load of `target` no
    /// longer assigns into it.
    pub fn load_async(&mut self, name: &str, target: &AssetRef) -> Result<()> {
        let target = target.downgrade();
        self.loader.submit(&self.registry, name, Some(&target))
    }

    /// Loads the asset `name` in background, without a handle waiting for it.
    pub fn preload(&mut self, name: &str) -> Result<()> {
        self.loader.submit(&self.registry, name, None)
    }

    /// Advances the asynchronous pipeline. The completions reported by the loader
    /// thread are taken in, and then at most `finalize_budget` requests are
    /// finalized. A request whose dependencies are not installed yet goes back
    /// to the end of the queue. After `requeue_limit` attempts it is loaded
    /// synchronously instead, which breaks dependency cycles.
    ///
    /// Returns the number of requests handled.
    pub fn update(&mut self) -> usize {
        self.loader.poll(&self.registry);

        let mut handled = 0;
        while handled < self.settings.finalize_budget {
            let ticket = match self.loader.pop_completed() {
                Some(ticket) => ticket,
                None => break,
            };

            if self.loader.dependencies_ready(ticket, &self.registry) {
                self.loader.finish(ticket, &mut self.registry);
                handled += 1;
                continue;
            }

            let count = self.loader.bump(ticket);
            let name = self.loader.request_name(ticket).map(|v| v.to_owned());

            if count >= self.settings.requeue_limit {
                if let Some(name) = name {
                    warn!(
                        "Asset {} waited {} times for its dependencies, loads it synchronously.",
                        name, count
                    );

                    self.load(&name);
                }

                self.loader.finish(ticket, &mut self.registry);
                handled += 1;
            } else {
                if let Some(name) = name {
                    debug!("Asset {} is waiting for its dependencies.", name);
                }

                self.loader.requeue(ticket);
                break;
            }
        }

        handled
    }

    /// The stage of the asynchronous load of `name`. Loaded assets are reported
    /// as `Finalized`.
    pub fn load_state(&self, name: &str) -> Option<LoadState> {
        if self.registry.lookup(name)?.is_loaded() {
            return Some(LoadState::Finalized);
        }

        self.loader.state(name)
    }

    /// The number of asynchronous load requests created so far.
    #[inline]
    pub fn requests_created(&self) -> usize {
        self.loader.requests_created()
    }

    /// The number of asynchronous load requests not finalized yet.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    /// Synchronously loads every registered asset. Returns the number of assets
    /// that are loaded afterwards.
    pub fn load_all(&mut self) -> usize {
        let mut num = 0;
        for name in self.registry.names() {
            if self.load(&name).is_some() {
                num += 1;
            }
        }

        num
    }

    // The synchronous path. The stub is installed before its body is read, so a
    // reference cycle resolves to the object being loaded instead of recursing.
    // It never enters the asynchronous pipeline.
    fn load(&mut self, name: &str) -> Option<Asset> {
        let (type_tag, location, engine) = match self.registry.lookup(name) {
            Some(stub) => {
                if let Some(asset) = stub.asset() {
                    return Some(asset.clone());
                }

                (stub.type_tag(), stub.location().clone(), stub.is_engine())
            }
            None => {
                error!("Asset {} does not exist in the registry.", name);
                return None;
            }
        };

        let object = match self.factory.create(type_tag) {
            Ok(object) => object,
            Err(err) => {
                error!("Failed to create asset {}: {}", name, err);
                debug_assert!(false, "missing factory of type {}", type_tag);
                return None;
            }
        };

        let asset = Asset::new(name, object);
        asset.set_engine(engine);

        if let Some(stub) = self.registry.lookup_mut(name) {
            stub.set_asset(Some(asset.clone()));
        }

        match self.deserialize(&asset, &location) {
            Ok(header) => {
                asset.set_version(header.version);
                asset.set_embedded(header.embedded);
                asset.finalize();

                debug!("Loaded asset {} from {}.", name, location);
                Some(asset)
            }
            Err(err) => {
                error!("Failed to load asset {} from {}: {}", name, location, err);

                if let Some(stub) = self.registry.lookup_mut(name) {
                    if stub.asset() == Some(&asset) {
                        stub.set_asset(None);
                    }
                }

                asset.discard();
                None
            }
        }
    }

    fn deserialize(&mut self, asset: &Asset, location: &AssetLocation) -> Result<AssetHeader> {
        let bytes = location.read()?;

        // Detached while the body is read, since resolving its references could
        // load assets that refer back to this one.
        let mut object = asset
            .take_object()
            .ok_or_else(|| Error::NotLoaded(asset.name()))?;

        let result = {
            let mut reader = AssetReader::with_resolver(bytes, self);
            asset::deserialize(&mut *object, &mut reader)
        };

        asset.put_object(object);
        result
    }

    /// Frees every loaded, non-engine asset that has no references, and every
    /// unreferenced transient asset. Freeing an asset releases the assets it
    /// references, so this repeats until a pass frees nothing or `sweep_passes`
    /// is reached.
    ///
    /// Returns the number of assets freed.
    pub fn sweep(&mut self) -> usize {
        let mut num = 0;

        for _ in 0..self.settings.sweep_passes {
            let mut freed = Vec::new();

            for stub in self.registry.iter_mut() {
                if stub.is_engine() {
                    continue;
                }

                let unused = stub
                    .asset()
                    .map_or(false, |v| v.is_loaded() && v.ref_count() == 0);

                if unused {
                    freed.extend(stub.set_asset(None));
                }
            }

            let mut i = 0;
            while i < self.transients.len() {
                if self.transients[i].ref_count() == 0 {
                    freed.push(self.transients.swap_remove(i));
                } else {
                    i += 1;
                }
            }

            if freed.is_empty() {
                break;
            }

            num += freed.len();
            for asset in freed {
                debug!("Unloaded asset {}.", asset.name());
                asset.destroy();
            }
        }

        debug!("Swept {} assets.", num);
        num
    }

    /// Unloads every asset, or every non-engine asset, regardless of references.
    /// The stubs are kept. Handles that still point at purged assets stay valid,
    /// but observe destroyed objects and no longer count references.
    pub fn purge(&mut self, include_engine: bool) {
        self.purging = true;

        let mut purged = Vec::new();
        for stub in self.registry.iter_mut() {
            if stub.is_engine() && !include_engine {
                continue;
            }

            purged.extend(stub.set_asset(None));
        }

        let mut i = 0;
        while i < self.transients.len() {
            if include_engine || !self.transients[i].is_engine() {
                purged.push(self.transients.swap_remove(i));
            } else {
                i += 1;
            }
        }

        // All of them are marked before any is destroyed, since destroying an
        // object releases the assets it references.
        for asset in &purged {
            asset.mark_purged();
        }

        for asset in &purged {
            asset.destroy();
        }

        info!("Purged {} assets.", purged.len());
        self.purging = false;
    }

    /// Unloads the asset `name` if nothing references it. Returns true if an
    /// object has been unloaded.
    pub fn unload(&mut self, name: &str) -> bool {
        let purging = self.purging;
        let stub = match self.registry.lookup_mut(name) {
            Some(stub) => stub,
            None => return false,
        };

        match stub.asset() {
            Some(asset) if asset.ref_count() > 0 && !purging => {
                warn!(
                    "Asset {} is still referenced {} times, ignores unloading.",
                    name,
                    asset.ref_count()
                );

                false
            }
            Some(_) => {
                if let Some(asset) = stub.set_asset(None) {
                    debug!("Unloaded asset {}.", name);
                    asset.destroy();
                }

                true
            }
            None => false,
        }
    }

    /// Removes the asset `name` from the registry, unloading it if nothing
    /// references it. A referenced object outlives its stub until its handles
    /// are gone.
    pub fn deregister(&mut self, name: &str) -> bool {
        if !self.registry.contains(name) {
            return false;
        }

        self.unload(name);
        self.registry.deregister(name).is_some()
    }

    /// Deregisters every asset, or every non-engine asset.
    pub fn deregister_all(&mut self, include_engine: bool) -> usize {
        let names: Vec<_> = self
            .registry
            .iter()
            .filter(|v| include_engine || !v.is_engine())
            .map(|v| v.name().to_owned())
            .collect();

        let mut num = 0;
        for name in &names {
            if self.deregister(name) {
                num += 1;
            }
        }

        num
    }

    /// Renames the asset `name`. Saving it afterwards moves its file.
    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<()> {
        self.registry.rename(name, new_name)?;
        self.loader.rename(name, new_name);
        Ok(())
    }

    /// Writes the asset `name` back to its file. If the asset has been renamed,
    /// the file is moved to follow the new name.
    pub fn save(&mut self, name: &str) -> Result<()> {
        let extension = self.settings.extension.clone();
        let stub = self
            .registry
            .lookup_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;

        let asset = match stub.asset() {
            Some(asset) => asset.clone(),
            None => {
                warn!("Asset {} is not loaded, ignores saving.", name);
                return Err(Error::NotLoaded(name.to_owned()));
            }
        };

        let path = match stub.location().path() {
            Some(path) => path.to_owned(),
            None => {
                return Err(Error::Unsupported(format!(
                    "embedded asset {} is read-only.",
                    name
                )))
            }
        };

        let dst = if asset::name_from_path(&path) == name {
            path.clone()
        } else {
            path.with_file_name(format!("{}.{}", name, extension))
        };

        fs::write(&dst, asset.serialize()?)?;

        if dst != path {
            if let Err(err) = fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    return Err(Error::IO(err));
                }
            }

            stub.set_location(AssetLocation::File(dst));
        }

        debug!("Saved asset {}.", name);
        Ok(())
    }

    /// Creates a default object of `type_tag`, finalizes it, registers it into
    /// `dir` and writes it to `path`.
    pub fn create_and_register<P: AsRef<Path>>(
        &mut self,
        type_tag: TypeTag,
        dir: &DirRef,
        path: P,
    ) -> Result<AssetRef> {
        let object = self.factory.create(type_tag)?;
        self.install(object, dir, path.as_ref())
    }

    /// Imports the foreign file at `src` as `type_tag`, registers the result into
    /// `dir` and writes it to `path`.
    pub fn import_asset<P1, P2>(
        &mut self,
        type_tag: TypeTag,
        src: P1,
        dir: &DirRef,
        path: P2,
        options: &ImportOptions,
    ) -> Result<AssetRef>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let mut object = self.factory.create(type_tag)?;
        object.import(src.as_ref(), options)?;
        self.install(object, dir, path.as_ref())
    }

    fn install(
        &mut self,
        object: Box<dyn AssetObject>,
        dir: &DirRef,
        path: &Path,
    ) -> Result<AssetRef> {
        let path = path.with_extension(&self.settings.extension);
        let name = asset::name_from_path(&path);

        if self.registry.contains(&name) {
            return Err(Error::DuplicateRegistration(name));
        }

        let type_tag = object.type_tag();
        self.register_in(dir, &name, type_tag, AssetLocation::File(path), false)?;

        let asset = Asset::new(name.as_str(), object);
        asset.finalize();

        if let Some(stub) = self.registry.lookup_mut(&name) {
            asset.set_engine(stub.is_engine());
            stub.set_asset(Some(asset.clone()));
        }

        let handle = AssetRef::from_asset(&asset);
        if let Err(err) = self.save(&name) {
            self.registry.deregister(&name);
            return Err(err);
        }

        info!("Created asset {}.", name);
        Ok(handle)
    }

    /// Adds an unnamed asset that is not registered. It is freed by a sweep once
    /// unreferenced, and serializes as a null reference.
    pub fn add_transient(&mut self, object: Box<dyn AssetObject>) -> AssetRef {
        self.add_transient_as(object, false)
    }

    /// Adds a transient asset that belongs to the engine. It survives
    /// `purge(false)`, but is still freed by a sweep once unreferenced.
    pub fn add_engine_transient(&mut self, object: Box<dyn AssetObject>) -> AssetRef {
        self.add_transient_as(object, true)
    }

    fn add_transient_as(&mut self, object: Box<dyn AssetObject>, engine: bool) -> AssetRef {
        let asset = Asset::new(String::new(), object);
        asset.set_transient(true);
        asset.set_engine(engine);
        asset.finalize();

        self.transients.push(asset.clone());
        AssetRef::from_asset(&asset)
    }

    /// The number of live transient assets.
    #[inline]
    pub fn transients(&self) -> usize {
        self.transients.len()
    }
}

impl ReferenceResolver for AssetManager {
    fn resolve(&mut self, name: &str, target: &mut AssetRef) {
        let asset = self.load(name);
        target.set(asset.as_ref());
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.purge(true);
    }
}
