//! Choosing the palette a picture is shown in, then decoding it.
//!
//! Level pictures (`MAPxxP`, the level select thumbnails) may be drawn in a
//! custom palette chosen by the level's SOC `Palette` property. Everything
//! else, and any level picture whose custom palette can't be found, uses the
//! container's base palette.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use soc::Soc;

use crate::container::ResourceContainer;
use crate::error::{KartError, Result};
use crate::palette::Palette;
use crate::picture::{Picture, decode_patch};

/// `MAP`, a two character map id, then `P`
static RE_MAP_PICTURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^MAP(\w\w)P").unwrap());

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The lowercase map id of a level picture name, `MAPGTP` gives `gt`
pub fn map_picture_id(name: &str) -> Option<String> {
    RE_MAP_PICTURE
        .captures(name)
        .map(|c| c[1].to_ascii_lowercase())
}

/// The level's `Palette` property. It counts from 1, with 0 or no value at
/// all meaning the default palette.
fn level_palette_number(soc: &Soc, map_id: &str) -> Option<u32> {
    let value = soc.level(map_id)?.get("palette")?;
    match value.trim().parse::<u32>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Level {} has an unusable palette {:?}", map_id, value);
            None
        }
    }
}

/// The custom palette for level `map_id`, `None` if it uses the default
async fn level_palette<C>(container: &C, map_id: &str) -> Result<Option<Palette>>
where
    C: ResourceContainer + ?Sized,
{
    let soc = container.all_socs().await?;
    let Some(number) = level_palette_number(&soc, map_id) else {
        return Ok(None);
    };
    // Palette entries are numbered from 0
    let palette_id = number - 1;
    let path = container
        .find_palette(palette_id)
        .ok_or(KartError::PaletteNotFound(palette_id))?;
    debug!("Level {} uses palette {}", map_id, path);
    let bytes = container.buffer(&path).await?;
    Ok(Some(Palette::from_bytes(bytes)?))
}

/// Work out which palette the picture at `path` is drawn with
pub async fn resolve_palette<C>(container: &C, path: &str) -> Result<Palette>
where
    C: ResourceContainer + ?Sized,
{
    if let Some(map_id) = map_picture_id(base_name(path)) {
        match level_palette(container, &map_id).await {
            Ok(Some(palette)) => return Ok(palette),
            Ok(None) => {}
            Err(KartError::PaletteNotFound(id)) => {
                warn!(
                    "{}: level {} wants palette PAL{} which isn't in the package, using the default",
                    container.label(),
                    map_id,
                    id
                );
            }
            Err(e) => return Err(e),
        }
    }
    container
        .base_palette()
        .cloned()
        .ok_or(KartError::MissingBaseFile)
}

pub async fn get_image<C>(container: &C, path: &str) -> Result<Picture>
where
    C: ResourceContainer + ?Sized,
{
    let palette = resolve_palette(container, path).await?;
    get_image_with_palette(container, path, &palette).await
}

pub async fn get_image_with_palette<C>(
    container: &C,
    path: &str,
    palette: &Palette,
) -> Result<Picture>
where
    C: ResourceContainer + ?Sized,
{
    let bytes = container.buffer(path).await?;
    Ok(decode_patch(&bytes, palette)?)
}
