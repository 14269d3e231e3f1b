#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;

use stockroom::errors::Result;
use stockroom::prelude::*;

#[derive(Debug, Default)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub created: bool,
}

impl AssetType for Texture {
    const TYPE_TAG: TypeTag = TypeTag(100);
    const TYPE_NAME: &'static str = "Texture";
}

impl AssetObject for Texture {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn load_stream(&mut self, reader: &mut AssetReader) -> Result<()> {
        self.width = reader.read_u32()?;
        self.height = reader.read_u32()?;
        Ok(())
    }

    fn save_stream(&self, writer: &mut AssetWriter) -> Result<()> {
        writer.write_u32(self.width);
        writer.write_u32(self.height);
        Ok(())
    }

    fn create(&mut self) {
        self.created = true;
    }
}

#[derive(Debug, Default)]
pub struct Material {
    pub texture: AssetRef,
    pub roughness: u32,
    pub texture_ready: bool,
}

impl AssetType for Material {
    const TYPE_TAG: TypeTag = TypeTag(101);
    const TYPE_NAME: &'static str = "Material";
}

impl AssetObject for Material {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn load_stream(&mut self, reader: &mut AssetReader) -> Result<()> {
        reader.read_asset(&mut self.texture)?;
        self.roughness = reader.read_u32()?;
        Ok(())
    }

    fn save_stream(&self, writer: &mut AssetWriter) -> Result<()> {
        writer.write_asset(&self.texture)?;
        writer.write_u32(self.roughness);
        Ok(())
    }

    fn create(&mut self) {
        self.texture_ready = self.texture.get().map_or(false, |v| v.is_loaded());
    }
}

#[derive(Debug, Default)]
pub struct Node {
    pub next: AssetRef,
    pub label: String,
}

impl AssetType for Node {
    const TYPE_TAG: TypeTag = TypeTag(102);
    const TYPE_NAME: &'static str = "Node";
}

impl AssetObject for Node {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn load_stream(&mut self, reader: &mut AssetReader) -> Result<()> {
        reader.read_asset(&mut self.next)?;
        self.label = reader.read_string()?;
        Ok(())
    }

    fn save_stream(&self, writer: &mut AssetWriter) -> Result<()> {
        writer.write_asset(&self.next)?;
        writer.write_string(&self.label)
    }
}

/// Like `Node`, but `create` reads the asset it references.
#[derive(Debug, Default)]
pub struct Peer {
    pub next: AssetRef,
    pub label: String,
    pub seen: Option<String>,
}

impl AssetType for Peer {
    const TYPE_TAG: TypeTag = TypeTag(103);
    const TYPE_NAME: &'static str = "Peer";
}

impl AssetObject for Peer {
    fn type_tag(&self) -> TypeTag {
        Self::TYPE_TAG
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn load_stream(&mut self, reader: &mut AssetReader) -> Result<()> {
        reader.read_asset(&mut self.next)?;
        self.label = reader.read_string()?;
        Ok(())
    }

    fn save_stream(&self, writer: &mut AssetWriter) -> Result<()> {
        writer.write_asset(&self.next)?;
        writer.write_string(&self.label)
    }

    fn create(&mut self) {
        let seen = self.next.with(|v: &Peer| v.label.clone());
        self.seen = seen;
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A factory of the fixture types. `loads` counts every texture constructed.
pub fn factory(loads: &Arc<AtomicUsize>) -> TypeFactory {
    let mut factory = TypeFactory::with_builtins();

    let loads = loads.clone();
    factory
        .register_with(Texture::TYPE_TAG, Texture::TYPE_NAME, move || {
            loads.fetch_add(1, Ordering::SeqCst);
            Box::new(Texture::default()) as Box<dyn AssetObject>
        })
        .unwrap();

    factory.register::<Material>().unwrap();
    factory.register::<Node>().unwrap();
    factory.register::<Peer>().unwrap();
    factory
}

pub fn manager() -> (AssetManager, Arc<AtomicUsize>) {
    manager_with(AssetSettings::default())
}

pub fn manager_with(settings: AssetSettings) -> (AssetManager, Arc<AtomicUsize>) {
    init_logger();

    let loads = Arc::new(AtomicUsize::new(0));
    let assets = AssetManager::new(factory(&loads), settings).unwrap();
    (assets, loads)
}

fn header(type_tag: TypeTag) -> AssetWriter {
    let mut writer = AssetWriter::new();
    writer
        .write_header(&AssetHeader::new(type_tag, false))
        .unwrap();
    writer
}

pub fn texture_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut writer = header(Texture::TYPE_TAG);
    writer.write_u32(width);
    writer.write_u32(height);
    writer.into_inner()
}

pub fn material_bytes(texture: &str, roughness: u32) -> Vec<u8> {
    let mut writer = header(Material::TYPE_TAG);
    writer.write_string(texture).unwrap();
    writer.write_u32(roughness);
    writer.into_inner()
}

pub fn node_bytes(next: &str, label: &str) -> Vec<u8> {
    let mut writer = header(Node::TYPE_TAG);
    writer.write_string(next).unwrap();
    writer.write_string(label).unwrap();
    writer.into_inner()
}

pub fn peer_bytes(next: &str, label: &str) -> Vec<u8> {
    let mut writer = header(Peer::TYPE_TAG);
    writer.write_string(next).unwrap();
    writer.write_string(label).unwrap();
    writer.into_inner()
}

/// Leaks a table of embedded files, as if it had been compiled into the binary.
pub fn embedded(files: Vec<(&str, Vec<u8>, bool)>) -> &'static [EmbeddedFile] {
    let files: Vec<_> = files
        .into_iter()
        .map(|(name, data, engine)| EmbeddedFile {
            name: Box::leak(name.to_owned().into_boxed_str()),
            data: Box::leak(data.into_boxed_slice()),
            engine,
        })
        .collect();

    Box::leak(files.into_boxed_slice())
}

pub fn write_file<P: AsRef<Path>>(root: P, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = root.as_ref().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }

    fs::write(&path, bytes).unwrap();
    path
}

/// Ticks `assets` until `func` returns true, panics after 5 seconds.
pub fn wait_until<F>(assets: &mut AssetManager, mut func: F)
where
    F: FnMut(&mut AssetManager) -> bool,
{
    let start = Instant::now();
    loop {
        assets.update();
        if func(assets) {
            return;
        }

        assert!(
            start.elapsed() < Duration::from_secs(5),
            "timed out waiting for the asset loader."
        );

        thread::sleep(Duration::from_millis(1));
    }
}

/// Runs `func` on another thread, and panics if it does not return within
/// `secs` seconds.
pub fn within<F>(secs: u64, func: F)
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        func();
        let _ = tx.send(());
    });

    match rx.recv_timeout(Duration::from_secs(secs)) {
        Ok(()) => {}
        Err(RecvTimeoutError::Timeout) => panic!("timed out after {} seconds.", secs),
        Err(RecvTimeoutError::Disconnected) => panic!("the test thread panicked."),
    }
}
