//! Uniform access to the two archive formats.
//!
//! Both [`WadContainer`] and [`Pk3Container`] implement [`ResourceContainer`];
//! everything that only depends on the shared operations (SOC merging,
//! picture decoding, base file loading) is provided by the trait itself.
//! [`open_file`] sniffs a path and hands back whichever variant fits.

mod pk3;
mod wad;

pub use self::pk3::Pk3Container;
pub use self::wad::WadContainer;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use soc::Soc;
use std::path::Path;

use crate::directory::DirectoryTree;
use crate::error::{KartError, Result};
use crate::image;
use crate::palette::Palette;
use crate::picture::Picture;
use crate::socs::combine_socs;

/// Name of the palette a base package supplies
static RE_BASE_PALETTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^PLAYPAL(\.pal|\.lmp)?$").unwrap());

/// SOC fragments read at once, results keep their order
pub(crate) const MAX_CONCURRENT_READS: usize = 8;

/// Matches an entry carrying palette number `palette_id`
pub(crate) fn palette_pattern(palette_id: u32) -> Option<Regex> {
    Regex::new(&format!(r"(?i)PAL{}(\.pal|\.lmp)?$", palette_id)).ok()
}

#[allow(async_fn_in_trait)]
pub trait ResourceContainer {
    /// The archive on disk backing this container
    fn path(&self) -> &Path;

    /// The folder tree of every entry, built when the container was opened
    fn directory(&self) -> &DirectoryTree;

    /// Palette used when nothing more specific applies
    fn base_palette(&self) -> Option<&Palette>;

    fn set_base_palette(&mut self, palette: Palette);

    /// Text content of the entry at `path`
    async fn text(&self, path: &str) -> Result<String>;

    /// Raw content of the entry at `path`
    async fn buffer(&self, path: &str) -> Result<Vec<u8>>;

    /// Text of every SOC fragment in the archive, in merge order
    async fn soc_fragments(&self) -> Result<Vec<String>>;

    /// Path of the entry holding palette number `palette_id`, if any
    fn find_palette(&self, palette_id: u32) -> Option<String>;

    /// Name used to attribute SOC errors
    fn label(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path().to_string_lossy().into_owned())
    }

    /// Every SOC fragment merged into one document
    async fn all_socs(&self) -> Result<Soc> {
        let fragments = self.soc_fragments().await?;
        combine_socs(&self.label(), &fragments)
    }

    /// A single SOC entry parsed on its own
    async fn soc(&self, path: &str) -> Result<Soc> {
        let text = self.text(path).await?;
        combine_socs(&self.label(), &[text])
    }

    /// Decode the picture at `path` with the palette it should be shown in
    async fn image(&self, path: &str) -> Result<Picture> {
        image::get_image(self, path).await
    }

    /// Decode the picture at `path` with the given palette
    async fn image_with_palette(&self, path: &str, palette: &Palette) -> Result<Picture> {
        image::get_image_with_palette(self, path, palette).await
    }

    /// The `PLAYPAL` this archive ships, if it has one
    async fn playpal(&self) -> Result<Palette> {
        let path = self
            .directory()
            .root()
            .all_files()
            .find(|node| RE_BASE_PALETTE.is_match(node.name()))
            .map(|node| node.full_path().to_owned())
            .ok_or_else(|| KartError::NotFound("PLAYPAL".to_owned()))?;
        Ok(Palette::from_bytes(self.buffer(&path).await?)?)
    }

    /// Take the default palette from another archive, normally the base
    /// game's `srb2.pk3`
    async fn set_base_file(&mut self, base_path: &Path) -> Result<()> {
        let base = open_file(base_path).await?;
        let palette = base.playpal().await?;
        info!("{}: using palette from {:?}", self.label(), base_path);
        self.set_base_palette(palette);
        Ok(())
    }
}

/// An opened archive of either format
#[derive(Debug)]
pub enum Container {
    Wad(WadContainer),
    Pk3(Pk3Container),
}

/// Open `path` as whichever format its signature says. The WAD signature is
/// checked first.
pub async fn open_file(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    if ::wad::is_wad(path).await? {
        debug!("{:?} is a WAD", path);
        return Ok(Container::Wad(WadContainer::open(path).await?));
    }
    if ::pk3::is_pk3(path).await? {
        debug!("{:?} is a PK3", path);
        return Ok(Container::Pk3(Pk3Container::open(path).await?));
    }
    Err(KartError::UnsupportedFormat(path.to_path_buf()))
}

impl ResourceContainer for Container {
    fn path(&self) -> &Path {
        match self {
            Container::Wad(c) => c.path(),
            Container::Pk3(c) => c.path(),
        }
    }

    fn directory(&self) -> &DirectoryTree {
        match self {
            Container::Wad(c) => c.directory(),
            Container::Pk3(c) => c.directory(),
        }
    }

    fn base_palette(&self) -> Option<&Palette> {
        match self {
            Container::Wad(c) => c.base_palette(),
            Container::Pk3(c) => c.base_palette(),
        }
    }

    fn set_base_palette(&mut self, palette: Palette) {
        match self {
            Container::Wad(c) => c.set_base_palette(palette),
            Container::Pk3(c) => c.set_base_palette(palette),
        }
    }

    async fn text(&self, path: &str) -> Result<String> {
        match self {
            Container::Wad(c) => c.text(path).await,
            Container::Pk3(c) => c.text(path).await,
        }
    }

    async fn buffer(&self, path: &str) -> Result<Vec<u8>> {
        match self {
            Container::Wad(c) => c.buffer(path).await,
            Container::Pk3(c) => c.buffer(path).await,
        }
    }

    async fn soc_fragments(&self) -> Result<Vec<String>> {
        match self {
            Container::Wad(c) => c.soc_fragments().await,
            Container::Pk3(c) => c.soc_fragments().await,
        }
    }

    fn find_palette(&self, palette_id: u32) -> Option<String> {
        match self {
            Container::Wad(c) => c.find_palette(palette_id),
            Container::Pk3(c) => c.find_palette(palette_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{palette_bytes, write_pk3, write_wad};

    #[tokio::test]
    async fn open_picks_the_format() {
        let dir = tempfile::tempdir().unwrap();
        let wad = write_wad(dir.path(), "kart.wad", &[("MAINCFG", b"Level 1\n")]);
        let pk3 = write_pk3(dir.path(), "kart.pk3", &[("SOC/MAINCFG", b"Level 1\n")]);

        let c = open_file(&wad).await.unwrap();
        assert!(matches!(c, Container::Wad(_)));
        assert_eq!(c.label(), "kart.wad");
        assert!(c.directory().root().lookup("MAINCFG").is_some());

        let c = open_file(&pk3).await.unwrap();
        assert!(matches!(c, Container::Pk3(_)));
        assert!(c.directory().get("SOC/MAINCFG").is_some());
    }

    #[tokio::test]
    async fn open_rejects_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("readme.txt");
        std::fs::write(&text, "not an archive").unwrap();
        let empty = dir.path().join("empty");
        std::fs::write(&empty, "").unwrap();

        for path in [text, empty] {
            match open_file(&path).await {
                Err(KartError::UnsupportedFormat(p)) => assert_eq!(p, path),
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn open_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_file(dir.path().join("gone.pk3")).await.unwrap_err();
        assert!(matches!(err, KartError::Io { .. }));
    }

    #[tokio::test]
    async fn broken_wad_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wad");
        // Claims 100 lumps with the directory at offset 12
        let mut bytes = b"PWAD".to_vec();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(&12u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let err = open_file(&path).await.unwrap_err();
        assert!(matches!(err, KartError::Format(_)));
    }

    #[tokio::test]
    async fn set_base_file_takes_first_playpal() {
        let dir = tempfile::tempdir().unwrap();
        let mut playpal = palette_bytes(3);
        playpal.extend(palette_bytes(4));
        let base = write_pk3(dir.path(), "srb2.pk3", &[("PLAYPAL", playpal.as_slice())]);
        let addon = write_wad(dir.path(), "addon.wad", &[("MAP01P", b"")]);

        let mut c = open_file(&addon).await.unwrap();
        assert!(c.base_palette().is_none());
        c.set_base_file(&base).await.unwrap();
        let palette = c.base_palette().unwrap();
        assert_eq!(palette.colour(10), [10, 3, 3]);
        assert_eq!(palette.as_bytes().len(), 2 * 768);
    }

    #[tokio::test]
    async fn set_base_file_without_playpal() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_pk3(dir.path(), "srb2.pk3", &[("COLORMAP", b"x")]);
        let addon = write_wad(dir.path(), "addon.wad", &[]);

        let mut c = open_file(&addon).await.unwrap();
        let err = c.set_base_file(&base).await.unwrap_err();
        assert!(matches!(err, KartError::NotFound(name) if name == "PLAYPAL"));
        assert!(c.base_palette().is_none());
    }

    #[tokio::test]
    async fn single_soc_parses_alone() {
        let dir = tempfile::tempdir().unwrap();
        let pk3 = write_pk3(
            dir.path(),
            "kart.pk3",
            &[
                ("SOC/A", b"Level GT\nPalette = 2\n"),
                ("SOC/B", b"Level GW\nPalette = 3\n"),
            ],
        );
        let c = open_file(&pk3).await.unwrap();
        let soc = c.soc("SOC/B").await.unwrap();
        assert!(soc.level("gt").is_none());
        assert_eq!(soc.level("gw").unwrap()["palette"], "3");
    }
}
