//! The one error type callers of this crate branch on.

use pk3::Pk3Error;
use soc::SocError;
use std::path::PathBuf;
use thiserror::Error;
use wad::WadError;

use crate::picture::PictureError;

pub type Result<T> = std::result::Result<T, KartError>;

#[derive(Debug, Error)]
pub enum KartError {
    #[error("{0:?} is neither a WAD nor a PK3")]
    UnsupportedFormat(PathBuf),
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed archive: {0}")]
    Format(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("SOC fragment {index} of {label} failed to parse: {source}")]
    ConfigParse {
        label: String,
        index: usize,
        #[source]
        source: SocError,
    },
    #[error("no palette to decode with, set a base file")]
    MissingBaseFile,
    /// Only seen inside palette resolution, which falls back to the default
    /// palette when it happens
    #[error("no palette entry matching PAL{0}")]
    PaletteNotFound(u32),
    #[error(transparent)]
    Picture(#[from] PictureError),
}

impl From<WadError> for KartError {
    fn from(e: WadError) -> Self {
        match e {
            WadError::Io { path, source } => KartError::Io { path, source },
            e => KartError::Format(e.to_string()),
        }
    }
}

impl From<Pk3Error> for KartError {
    fn from(e: Pk3Error) -> Self {
        match e {
            Pk3Error::Io { path, source } => KartError::Io { path, source },
            Pk3Error::NotFound(name) => KartError::NotFound(name),
            e => KartError::Format(e.to_string()),
        }
    }
}
