use std::path::PathBuf;

use crate::res::asset::TypeTag;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    IO(#[cause] std::io::Error),
    #[fail(display = "{}", _0)]
    Json(#[cause] serde_json::Error),
    #[fail(display = "Undefined path {:?}.", _0)]
    FileNotFound(PathBuf),
    #[fail(display = "Asset {} does not exist in the registry.", _0)]
    NotFound(String),
    #[fail(display = "Asset {} has been registered with another location.", _0)]
    DuplicateRegistration(String),
    #[fail(display = "Malformed asset header: {}", _0)]
    MalformedHeader(String),
    #[fail(display = "Malformed asset body: {}", _0)]
    Malformed(String),
    #[fail(display = "Type {} has no registered factory.", _0)]
    UnknownType(TypeTag),
    #[fail(display = "Asset {} is not loaded.", _0)]
    NotLoaded(String),
    #[fail(display = "{}", _0)]
    Unsupported(String),
    #[fail(display = "The asset loader thread has been disconnected.")]
    WorkerDisconnected,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
