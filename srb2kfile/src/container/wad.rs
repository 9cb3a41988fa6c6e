use futures::{StreamExt, TryStreamExt, stream};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use ::wad::{WadFile, WadLump};

use super::{MAX_CONCURRENT_READS, ResourceContainer, palette_pattern};
use crate::directory::DirectoryTree;
use crate::error::{KartError, Result};
use crate::palette::Palette;

/// Lumps holding SOC text. `MAINCFG` lumps merge before `SOC_*` lumps.
static RE_MAINCFG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^MAINCFG").unwrap());
static RE_SOC_LUMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^SOC_").unwrap());

/// A WAD: one flat list of lumps, no folders
pub struct WadContainer {
    wad: WadFile,
    directory: DirectoryTree,
    base_palette: Option<Palette>,
}

impl fmt::Debug for WadContainer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\nWadContainer {{\n  wad: {:?},\n  directory: {:?},\n}}",
            self.wad, self.directory
        )
    }
}

impl WadContainer {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let wad = WadFile::open(path).await?;
        let directory = DirectoryTree::from_names(wad.lumps().map(WadLump::name));
        debug!(
            "Loaded {} {:?}: {} distinct lump names",
            if wad.is_iwad() { "IWAD" } else { "PWAD" },
            wad.path(),
            directory.len() - 1
        );
        Ok(WadContainer {
            wad,
            directory,
            base_palette: None,
        })
    }

    /// Every lump named `name`, in file order
    pub async fn buffers(&self, name: &str) -> Result<Vec<Vec<u8>>> {
        let name = name.trim_start_matches('/');
        let lumps = self.wad.read_lumps(name).await?;
        if lumps.is_empty() {
            return Err(KartError::NotFound(name.to_owned()));
        }
        Ok(lumps)
    }
}

impl ResourceContainer for WadContainer {
    fn path(&self) -> &Path {
        self.wad.path()
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
        let bytes = self.buffer(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// The first lump named `path`
    async fn buffer(&self, path: &str) -> Result<Vec<u8>> {
        let name = path.trim_start_matches('/');
        let lump = self
            .wad
            .find_lumps(name)
            .next()
            .ok_or_else(|| KartError::NotFound(name.to_owned()))?;
        Ok(self.wad.read_lump(lump).await?)
    }

    /// Every `MAINCFG` lump, then every `SOC_*` lump. Lumps sharing a name
    /// are all included, in file order.
    async fn soc_fragments(&self) -> Result<Vec<String>> {
        let root = self.directory.root();
        let names: Vec<&str> = root
            .search(&RE_MAINCFG)
            .chain(root.search(&RE_SOC_LUMP))
            .map(|node| node.full_path())
            .collect();

        let lumps: Vec<Vec<Vec<u8>>> = stream::iter(names.iter().map(|name| self.buffers(name)))
            .buffered(MAX_CONCURRENT_READS)
            .try_collect()
            .await?;
        Ok(lumps
            .into_iter()
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect())
    }

    fn find_palette(&self, palette_id: u32) -> Option<String> {
        let pattern = palette_pattern(palette_id)?;
        self.directory
            .root()
            .search(&pattern)
            .next()
            .map(|node| node.full_path().to_owned())
    }
}
