use futures::{StreamExt, TryStreamExt, stream};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use ::pk3::Pk3Data;

use super::{MAX_CONCURRENT_READS, ResourceContainer, palette_pattern};
use crate::directory::DirectoryTree;
use crate::error::{KartError, Result};
use crate::palette::Palette;

/// The top level folder holding SOC files, any case
static RE_SOC_FOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^soc$").unwrap());
/// A folder of custom palettes, at any depth
static RE_PALETTE_FOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|/)palettes?$").unwrap());

/// A PK3: a zip whose paths form real folders
pub struct Pk3Container {
    data: Pk3Data,
    directory: DirectoryTree,
    base_palette: Option<Palette>,
}

impl fmt::Debug for Pk3Container {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\nPk3Container {{\n  data: {:?},\n  directory: {:?},\n}}",
            self.data, self.directory
        )
    }
}

impl Pk3Container {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let data = Pk3Data::open(path).await?;
        let directory = DirectoryTree::from_paths(data.file_names());
        debug!("Loaded {:?}: {} tree nodes", data.path(), directory.len());
        Ok(Pk3Container {
            data,
            directory,
            base_palette: None,
        })
    }
}

impl ResourceContainer for Pk3Container {
    fn path(&self) -> &Path {
        self.data.path()
    }

    fn directory(&self) -> &DirectoryTree {
        &self.directory
    }

    fn base_palette(&self) -> Option<&Palette> {
        self.base_palette.as_ref()
    }

    fn set_base_palette(&mut self, palette: Palette) {
        self.base_palette = Some(palette);
    }

    async fn text(&self, path: &str) -> Result<String> {
        Ok(self.data.text(path)?)
    }

    async fn buffer(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.data.bytes(path)?)
    }

    /// Every file under a top level `SOC` folder, in archive order. Folder
    /// names differing only in case are all read.
    async fn soc_fragments(&self) -> Result<Vec<String>> {
        let folders: Vec<&str> = self.data.folders(&RE_SOC_FOLDER).collect();
        if folders.is_empty() {
            return Err(KartError::NotFound("SOC folder".to_owned()));
        }
        let files: Vec<&str> = self.data.folder_files(&folders).collect();
        stream::iter(files.iter().map(|file| self.text(file)))
            .buffered(MAX_CONCURRENT_READS)
            .try_collect()
            .await
    }

    /// Searches the first `Palettes` folder only
    fn find_palette(&self, palette_id: u32) -> Option<String> {
        let pattern = palette_pattern(palette_id)?;
        let folder = self
            .directory
            .root()
            .search(&RE_PALETTE_FOLDER)
            .find(|node| !node.is_file())?;
        folder
            .all_files()
            .find(|node| pattern.is_match(node.name()))
            .map(|node| node.full_path().to_owned())
    }
}
