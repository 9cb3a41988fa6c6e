//! Read access to PK3 packages: plain zip archives whose paths form a real
//! folder hierarchy (`Graphics/`, `SOC/`, `Palettes/` and so on).
//!
//! The whole archive is read into memory when opened. Entry reads then work
//! on a clone of the parsed archive, which shares the central directory, so
//! any number of reads can be made through a shared reference.

use log::debug;
use regex::Regex;
use std::io::{Cursor, ErrorKind, Read};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use zip::ZipArchive;
use zip::result::ZipError;

/// Local file header signature, found at the start of any non-empty zip
const LOCAL_HEADER_SIG: &[u8; 4] = b"PK\x03\x04";
/// End of central directory signature, the start of an empty zip
const EMPTY_ARCHIVE_SIG: &[u8; 4] = b"PK\x05\x06";

#[derive(Debug, Error)]
pub enum Pk3Error {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} is not a valid zip archive: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("no file {0} in package")]
    NotFound(String),
}

/// Sniff the first four bytes of `path` for a zip signature
pub async fn is_pk3(path: impl AsRef<Path>) -> Result<bool, Pk3Error> {
    let path = path.as_ref();
    let mut file = File::open(path).await.map_err(|source| Pk3Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut sig = [0u8; 4];
    match file.read_exact(&mut sig).await {
        Ok(_) => Ok(&sig == LOCAL_HEADER_SIG || &sig == EMPTY_ARCHIVE_SIG),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(source) => Err(Pk3Error::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Paths inside a package never start with a slash, but callers often hand
/// them over rooted
fn entry_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

pub struct Pk3Data {
    path: PathBuf,
    archive: ZipArchive<Cursor<Arc<[u8]>>>,
    /// File entries in archive order, directory records excluded
    files: Vec<String>,
    /// Every folder implied by a file path, in first-seen order
    folders: Vec<String>,
}

impl fmt::Debug for Pk3Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\nPk3Data {{\n  path: {:?},\n  files: {},\n  folders: {},\n}}",
            self.path,
            self.files.len(),
            self.folders.len()
        )
    }
}

impl Pk3Data {
    pub async fn open<A>(file_path: A) -> Result<Pk3Data, Pk3Error>
    where
        A: Into<PathBuf>,
    {
        let path = file_path.into();
        let data: Arc<[u8]> = tokio::fs::read(&path)
            .await
            .map_err(|source| Pk3Error::Io {
                path: path.clone(),
                source,
            })?
            .into();

        let mut archive = ZipArchive::new(Cursor::new(data)).map_err(|source| Pk3Error::Zip {
            path: path.clone(),
            source,
        })?;

        let mut files = Vec::with_capacity(archive.len());
        let mut folders: Vec<String> = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|source| Pk3Error::Zip {
                path: path.clone(),
                source,
            })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_owned();
            let mut end = 0;
            while let Some(pos) = name[end..].find('/') {
                end += pos;
                let folder = &name[..end];
                if !folder.is_empty() && !folders.iter().any(|f| f == folder) {
                    folders.push(folder.to_owned());
                }
                end += 1;
            }
            files.push(name);
        }

        debug!(
            "Opened package {:?}: {} files in {} folders",
            path,
            files.len(),
            folders.len()
        );
        Ok(Pk3Data {
            path,
            archive,
            files,
            folders,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every file in the package, in archive order
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Every folder whose path matches `pattern`
    pub fn folders<'a>(&'a self, pattern: &'a Regex) -> impl Iterator<Item = &'a str> {
        self.folders
            .iter()
            .map(String::as_str)
            .filter(move |f| pattern.is_match(f))
    }

    /// The files under any of `folders`, at any depth, in archive order
    pub fn folder_files<'a>(&'a self, folders: &[&str]) -> impl Iterator<Item = &'a str> {
        let prefixes: Vec<String> = folders
            .iter()
            .map(|folder| format!("{}/", entry_name(folder).trim_end_matches('/')))
            .collect();
        self.files
            .iter()
            .map(String::as_str)
            .filter(move |f| prefixes.iter().any(|prefix| f.starts_with(prefix)))
    }

    /// Decompress the entry at `path`
    pub fn bytes(&self, path: &str) -> Result<Vec<u8>, Pk3Error> {
        let name = entry_name(path);
        let mut archive = self.archive.clone();
        let mut entry = archive.by_name(name).map_err(|source| match source {
            ZipError::FileNotFound => Pk3Error::NotFound(name.to_owned()),
            source => Pk3Error::Zip {
                path: self.path.clone(),
                source,
            },
        })?;
        // The header size is untrusted, let the read grow the buffer
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(|source| Pk3Error::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(buf)
    }

    /// Decompress the entry at `path` as UTF-8, replacing invalid sequences
    pub fn text(&self, path: &str) -> Result<String, Pk3Error> {
        let bytes = self.bytes(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
