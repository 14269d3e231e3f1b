//! Built-in asset types.

pub mod raw_file;

pub use self::raw_file::RawFile;
