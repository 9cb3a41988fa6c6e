//! Decoding of column based "patch" pictures to RGBA.
//!
//! The data in a patch is structured as follows:
//!
//! | Field Size  | Data Type    | Content                                     |
//! |-------------|--------------|---------------------------------------------|
//! | 0x00-0x01   | u16          | Width of the picture                        |
//! | 0x02-0x03   | u16          | Height of the picture                       |
//! | 0x04-0x05   | i16          | Left offset, where to place the picture     |
//! | 0x06-0x07   | i16          | Top offset                                  |
//! | 0x08-...    | u32 * width  | Offset from the start of data to each column|
//!
//! A column is a list of posts, each being:
//!
//! | Field Size  | Data Type    | Content                                     |
//! |-------------|--------------|---------------------------------------------|
//! | 0x00        | u8           | Top delta, `0xFF` ends the column           |
//! | 0x01        | u8           | Length of the post in pixels                |
//! | 0x02        | u8           | Unused padding                              |
//! | 0x03-...    | u8 * length  | Palette indexes                             |
//! | last        | u8           | Unused padding                              |
//!
//! Pictures taller than 254 pixels use "tall patch" posts: a top delta that
//! is not below the previous post's is relative to that post.

use thiserror::Error;

use crate::palette::Palette;

const PATCH_HEADER_SIZE: usize = 8;
const COLUMN_END: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PictureError {
    #[error("not a patch: {0}")]
    NotAPatch(&'static str),
    #[error("patch data is truncated at byte {0}")]
    Truncated(usize),
    #[error("palette has {0} bytes, it needs at least 768")]
    ShortPalette(usize),
}

/// A decoded picture, 4 bytes of RGBA per pixel in rows. Pixels no post
/// covers are fully transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub width: usize,
    pub height: usize,
    pub left_offset: i16,
    pub top_offset: i16,
    pub pixels: Vec<u8>,
}

impl Picture {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

fn read_2_bytes(data: &[u8], offset: usize) -> u16 {
    (data[offset + 1] as u16) << 8 | (data[offset] as u16)
}

fn read_4_bytes(data: &[u8], offset: usize) -> u32 {
    (data[offset + 3] as u32) << 24
        | (data[offset + 2] as u32) << 16
        | (data[offset + 1] as u32) << 8
        | (data[offset] as u32)
}

pub fn decode_patch(data: &[u8], palette: &Palette) -> Result<Picture, PictureError> {
    if data.len() < PATCH_HEADER_SIZE {
        return Err(PictureError::NotAPatch("too short for a header"));
    }
    let width = read_2_bytes(data, 0) as usize;
    let height = read_2_bytes(data, 2) as usize;
    if width == 0 || height == 0 {
        return Err(PictureError::NotAPatch("zero width or height"));
    }
    if PATCH_HEADER_SIZE + width * 4 > data.len() {
        return Err(PictureError::NotAPatch("column table runs past the data"));
    }

    let mut pixels = vec![0u8; width * height * 4];
    for x in 0..width {
        let mut pos = read_4_bytes(data, PATCH_HEADER_SIZE + x * 4) as usize;
        let mut top: i32 = -1;
        loop {
            let delta = *data.get(pos).ok_or(PictureError::Truncated(pos))?;
            if delta == COLUMN_END {
                break;
            }
            let length = *data.get(pos + 1).ok_or(PictureError::Truncated(pos + 1))? as usize;
            top = if delta as i32 <= top {
                top + delta as i32
            } else {
                delta as i32
            };

            let start = pos + 3;
            let post = data
                .get(start..start + length)
                .ok_or(PictureError::Truncated(start))?;
            for (i, index) in post.iter().enumerate() {
                let y = top as usize + i;
                if y >= height {
                    break;
                }
                let [r, g, b] = palette.colour(*index);
                let p = (y * width + x) * 4;
                pixels[p..p + 4].copy_from_slice(&[r, g, b, 0xFF]);
            }
            // Skip the trailing pad byte
            pos = start + length + 1;
        }
    }

    Ok(Picture {
        width,
        height,
        left_offset: read_2_bytes(data, 4) as i16,
        top_offset: read_2_bytes(data, 6) as i16,
        pixels,
    })
}
