//! Byte cursors used to read and write serialized asset bodies.
//!
//! Asset bodies are little-endian. Strings are prefixed with their length as a
//! `u32`, and references to other assets are written as the referenced asset's
//! name, which is resolved back into a handle while reading.

use std::borrow::Cow;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::*;

use super::asset_ref::AssetRef;
use super::header::{AssetHeader, VERSION_CURRENT};

/// The longest string a body could carry.
pub const MAX_STRING_LEN: usize = 16 * 1024;

/// Resolves the asset references discovered while a body is being read.
///
/// The synchronous path loads the referenced asset inline, while the background
/// loader only records the reference so the owning thread could resolve it later.
pub trait ReferenceResolver {
    fn resolve(&mut self, name: &str, target: &mut AssetRef);
}

pub struct AssetReader<'a> {
    cursor: Cursor<Cow<'a, [u8]>>,
    version: u32,
    resolver: Option<&'a mut dyn ReferenceResolver>,
}

impl<'a> AssetReader<'a> {
    /// Creates a reader that could not resolve asset references. Every reference
    /// it reads is left null.
    pub fn new<T: Into<Cow<'a, [u8]>>>(bytes: T) -> Self {
        AssetReader {
            cursor: Cursor::new(bytes.into()),
            version: VERSION_CURRENT,
            resolver: None,
        }
    }

    pub fn with_resolver<T: Into<Cow<'a, [u8]>>>(
        bytes: T,
        resolver: &'a mut dyn ReferenceResolver,
    ) -> Self {
        AssetReader {
            cursor: Cursor::new(bytes.into()),
            version: VERSION_CURRENT,
            resolver: Some(resolver),
        }
    }

    /// Reads the header. Later reads could check `version` to skip the fields
    /// that older schemas do not have.
    pub fn read_header(&mut self) -> Result<AssetHeader> {
        let header = AssetHeader::read(&mut self.cursor)?;
        self.version = header.version;
        Ok(header)
    }

    /// The schema version of the stream.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// The number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(truncated)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(truncated)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<LittleEndian>().map_err(truncated)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<LittleEndian>().map_err(truncated)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        if len > MAX_STRING_LEN {
            return Err(Error::Malformed(format!(
                "string of {} bytes exceeds the limit of {}.",
                len, MAX_STRING_LEN
            )));
        }

        let bytes = self.read_exact(len)?;
        String::from_utf8(bytes).map_err(|err| Error::Malformed(err.to_string()))
    }

    /// Reads a length-prefixed blob.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        self.read_exact(len)
    }

    /// Reads the name of a referenced asset and hands it to the resolver, which
    /// points `target` at the asset (or binds it to a pending load). An empty
    /// name is a null reference.
    pub fn read_asset(&mut self, target: &mut AssetRef) -> Result<()> {
        let name = self.read_string()?;
        if name.is_empty() {
            target.set(None);
            return Ok(());
        }

        match self.resolver.as_mut() {
            Some(resolver) => resolver.resolve(&name, target),
            None => warn!("Reference to asset {} could not be resolved.", name),
        }

        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > self.remaining() {
            return Err(Error::Malformed(format!(
                "expected {} bytes at {}, but only {} remain.",
                len,
                self.position(),
                self.remaining()
            )));
        }

        let mut bytes = vec![0; len];
        self.cursor.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

fn truncated(err: std::io::Error) -> Error {
    Error::Malformed(format!("unexpected end of stream ({}).", err))
}

/// Serializes an asset body into a memory buffer.
#[derive(Debug, Default)]
pub struct AssetWriter {
    buf: Vec<u8>,
}

impl AssetWriter {
    pub fn new() -> Self {
        AssetWriter { buf: Vec::new() }
    }

    pub fn write_header(&mut self, header: &AssetHeader) -> Result<()> {
        header.write(&mut self.buf)
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    #[inline]
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_string(&mut self, v: &str) -> Result<()> {
        if v.len() > MAX_STRING_LEN {
            return Err(Error::Malformed(format!(
                "string of {} bytes exceeds the limit of {}.",
                v.len(),
                MAX_STRING_LEN
            )));
        }

        self.write_u32(v.len() as u32);
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.write_u32(v.len() as u32);
        self.buf.extend_from_slice(v);
    }

    /// Writes a reference by name. Null and transient references are written as
    /// an empty name.
    pub fn write_asset(&mut self, v: &AssetRef) -> Result<()> {
        match v.get() {
            Some(ref asset) if !asset.is_transient() => self.write_string(&asset.name()),
            _ => self.write_string(""),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
