//! Synthesised WADs, PK3s, palettes and patches for the unit tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;

/// A palette where colour `i` is `[i, seed, seed]`
pub(crate) fn palette_bytes(seed: u8) -> Vec<u8> {
    (0..=255u8).flat_map(|i| [i, seed, seed]).collect()
}

/// A `width` x `height` patch where every pixel is colour `index`
pub(crate) fn solid_patch(width: u16, height: u8, index: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&(height as u16).to_le_bytes());
    data.extend_from_slice(&[0, 0, 0, 0]);

    let table_end = 8 + width as usize * 4;
    let column_len = 3 + height as usize + 1 + 1;
    for x in 0..width as usize {
        let offset = (table_end + x * column_len) as u32;
        data.extend_from_slice(&offset.to_le_bytes());
    }
    for _ in 0..width {
        data.extend_from_slice(&[0, height, 0]);
        data.extend(std::iter::repeat_n(index, height as usize));
        data.extend_from_slice(&[0, 0xFF]);
    }
    data
}

pub(crate) fn write_wad(dir: &Path, name: &str, lumps: &[(&str, &[u8])]) -> PathBuf {
    let mut data = Vec::new();
    let mut dirs = Vec::new();
    let mut offset = 12u32;
    for (lump, bytes) in lumps {
        dirs.push((offset, bytes.len() as u32, *lump));
        offset += bytes.len() as u32;
        data.extend_from_slice(bytes);
    }

    let mut wad = Vec::new();
    wad.extend_from_slice(b"PWAD");
    wad.extend_from_slice(&(lumps.len() as u32).to_le_bytes());
    wad.extend_from_slice(&offset.to_le_bytes());
    wad.extend_from_slice(&data);
    for (offset, size, lump) in dirs {
        wad.extend_from_slice(&offset.to_le_bytes());
        wad.extend_from_slice(&size.to_le_bytes());
        let mut n = [0u8; 8];
        n[..lump.len()].copy_from_slice(lump.as_bytes());
        wad.extend_from_slice(&n);
    }

    let path = dir.join(name);
    std::fs::write(&path, wad).unwrap();
    path
}

pub(crate) fn write_pk3(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (entry, bytes) in entries {
        if entry.ends_with('/') {
            zip.add_directory(*entry, FileOptions::default()).unwrap();
        } else {
            zip.start_file(*entry, FileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
    }
    zip.finish().unwrap();
    path
}
