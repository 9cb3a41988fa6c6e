//! Reading SRB2Kart packages.
//!
//! A package is either a WAD (a flat list of named lumps) or a PK3 (a zip
//! with real folders). [`open_file`] opens either behind the one
//! [`ResourceContainer`] interface which offers:
//!
//! - the [`DirectoryTree`] of every entry, for browsing and regex search
//! - raw and text reads of single entries
//! - every SOC fragment in the package merged into one [`Soc`]
//! - pictures decoded to RGBA, in the palette the game would show them in
//!
//! Pictures need a base palette, normally the `PLAYPAL` from the game's
//! `srb2.pk3`, which is set with [`ResourceContainer::set_base_file`].

mod container;
mod directory;
mod error;
mod image;
mod palette;
mod picture;
mod socs;
#[cfg(test)]
mod test_utils;

pub use crate::container::{Container, Pk3Container, ResourceContainer, WadContainer, open_file};
pub use crate::directory::{Descendants, DirectoryTree, Node, NodeId};
pub use crate::error::{KartError, Result};
pub use crate::image::{map_picture_id, resolve_palette};
pub use crate::palette::{PALETTE_BYTES, PALETTE_COLOURS, Palette};
pub use crate::picture::{Picture, PictureError, decode_patch};
pub use crate::socs::combine_socs;
pub use soc::{Properties, Soc};
