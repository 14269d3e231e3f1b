//! The folder tree that discovered assets are listed in.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

pub type DirRef = Arc<RwLock<AssetDir>>;

/// A folder of assets. Folders own their children, and refer back to their
/// parents weakly.
#[derive(Debug)]
pub struct AssetDir {
    name: String,
    path: String,
    engine: bool,
    parent: Option<Weak<RwLock<AssetDir>>>,
    children: Vec<DirRef>,
    assets: Vec<String>,
}

impl AssetDir {
    /// Creates the root folder, whose path is empty.
    pub fn new_root() -> DirRef {
        Arc::new(RwLock::new(AssetDir {
            name: String::new(),
            path: String::new(),
            engine: false,
            parent: None,
            children: Vec::new(),
            assets: Vec::new(),
        }))
    }

    /// Returns the child folder `name` of `parent`, creating it if it does not
    /// exist. Children of engine folders are engine folders as well.
    pub fn create_child(parent: &DirRef, name: &str, engine: bool) -> DirRef {
        if let Some(child) = parent.read().find_child(name) {
            return child;
        }

        let (path, engine) = {
            let parent = parent.read();
            (format!("{}{}/", parent.path, name), engine || parent.engine)
        };

        let child = Arc::new(RwLock::new(AssetDir {
            name: name.to_owned(),
            path,
            engine,
            parent: Some(Arc::downgrade(parent)),
            children: Vec::new(),
            assets: Vec::new(),
        }));

        parent.write().children.push(child.clone());
        child
    }

    pub fn find_child(&self, name: &str) -> Option<DirRef> {
        self.children
            .iter()
            .find(|v| v.read().name == name)
            .cloned()
    }

    /// Finds a folder by its slash separated path relative to `root`, e.g.
    /// `"Content/Materials/"`.
    pub fn find_path(root: &DirRef, path: &str) -> Option<DirRef> {
        let mut dir = root.clone();
        for component in path.split('/').filter(|v| !v.is_empty()) {
            let child = dir.read().find_child(component)?;
            dir = child;
        }

        Some(dir)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path of this folder relative to the root, ending with a slash.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn is_engine(&self) -> bool {
        self.engine
    }

    pub fn parent(&self) -> Option<DirRef> {
        self.parent.as_ref().and_then(|v| v.upgrade())
    }

    #[inline]
    pub fn children(&self) -> &[DirRef] {
        &self.children
    }

    /// The names of the assets listed in this folder.
    #[inline]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub(crate) fn add_asset(&mut self, name: &str) {
        if !self.assets.iter().any(|v| v == name) {
            self.assets.push(name.to_owned());
        }
    }

    pub(crate) fn remove_asset(&mut self, name: &str) {
        self.assets.retain(|v| v != name);
    }

    pub(crate) fn rename_asset(&mut self, name: &str, new_name: &str) {
        for v in &mut self.assets {
            if v == name {
                *v = new_name.to_owned();
            }
        }
    }
}
