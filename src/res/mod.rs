//! The asset system resolves named assets to shared objects, loads them from files
//! or from blobs embedded into the executable, and manages their lifetime.
//!
//! # Asset
//!
//! An asset is a named piece of content, like a material or a texture, that has
//! been serialized into a binary stream. Every stream starts with a fixed-size
//! `AssetHeader` (magic number, schema version, type tag and an embedded flag),
//! followed by the body of its type. Bodies could reference other assets by
//! name; the references are resolved into handles while the body is read, and
//! that is how dependencies between assets are discovered.
//!
//! Concrete asset types implement `AssetObject`, and are constructed through the
//! `TypeFactory` from the type tag in the header.
//!
//! # Registry
//!
//! The `Registry` maps the unique name of every known asset to an `AssetStub`,
//! which describes where the asset lives and holds its object once loaded. Stubs
//! are created by discovering a directory, by parsing a manifest, or by scanning
//! a table of embedded files; loading and unloading never creates or destroys a
//! stub.
//!
//! ## Handle
//!
//! `AssetRef` is a counted handle to an asset. A non-null handle contributes one to
//! the reference count of its asset. Handles could also be bound to a pending
//! asynchronous load, and are assigned once it is finalized.
//!
//! ## Ownership & Lifetime
//!
//! Releasing the last handle never destroys an object. Objects are destroyed by
//! `AssetManager::sweep`, which frees unreferenced objects, or by
//! `AssetManager::purge`, which frees everything regardless of references.
//!
//! # Loading
//!
//! `AssetManager::load_sync` loads an asset and its references inline. The
//! asynchronous path deserializes on a dedicated loader thread instead, and
//! `AssetManager::update` finalizes the completed loads on the owning thread once
//! everything they reference has been installed. A load that waits for its
//! dependencies too long (usually because of a reference cycle) is completed
//! synchronously.
//!
//! ```rust,no_run
//! use stockroom::prelude::*;
//!
//! let mut assets = AssetManager::new(TypeFactory::with_builtins(), AssetSettings::default())?;
//! assets.discover("Content", "assets/Content")?;
//!
//! let handle = AssetRef::new();
//! assets.load_async("T_Brick", &handle)?;
//!
//! while handle.is_pending() {
//!     assets.update();
//! }
//! # Ok::<(), stockroom::errors::Error>(())
//! ```

pub mod asset;
pub mod asset_ref;
pub mod assets;
pub mod dir;
pub mod factory;
pub mod header;
pub mod location;
pub mod manager;
pub mod registry;
pub mod request;
pub mod settings;
pub mod stream;
pub mod stub;

mod loader;
mod worker;

pub mod prelude {
    pub use super::asset::{Asset, AssetObject, AssetType, ImportOptions, TypeTag};
    pub use super::asset_ref::AssetRef;
    pub use super::assets::RawFile;
    pub use super::dir::{AssetDir, DirRef};
    pub use super::factory::TypeFactory;
    pub use super::header::AssetHeader;
    pub use super::location::{AssetLocation, EmbeddedFile};
    pub use super::manager::AssetManager;
    pub use super::request::LoadState;
    pub use super::settings::AssetSettings;
    pub use super::stream::{AssetReader, AssetWriter};
    pub use super::stub::AssetStub;
}
