use std::fmt;
use std::sync::Arc;

use crate::picture::PictureError;

/// Colours in one palette
pub const PALETTE_COLOURS: usize = 256;
/// Bytes in one palette, an RGB triple per colour
pub const PALETTE_BYTES: usize = PALETTE_COLOURS * 3;

/// Maps the colour indexes of a picture to RGB. Cloning shares the buffer.
///
/// The buffer may hold more than one palette back to back (`PLAYPAL` holds
/// fourteen), only the first is used for decoding.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette(Arc<[u8]>);

impl Palette {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, PictureError> {
        let bytes = bytes.into();
        if bytes.len() < PALETTE_BYTES {
            return Err(PictureError::ShortPalette(bytes.len()));
        }
        Ok(Palette(bytes))
    }

    pub fn colour(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.0[i], self.0[i + 1], self.0[i + 2]]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Palette {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Palette({} bytes)", self.0.len())
    }
}
