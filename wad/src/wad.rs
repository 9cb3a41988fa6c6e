use log::debug;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::{fmt, str};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Size in bytes of the WAD header
pub const HEADER_SIZE: usize = 12;
/// Size in bytes of one directory record
pub const DIRECTORY_ENTRY_SIZE: usize = 16;
const LUMP_NAME_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum WadError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} is not a WAD, header ident is {ident:?}")]
    BadIdent { path: PathBuf, ident: String },
    #[error("{path:?} is truncated, needed {needed} bytes but the file has {len}")]
    Truncated { path: PathBuf, needed: u64, len: u64 },
    #[error("lump {name} in {path:?} lies outside the file")]
    LumpOutOfBounds { path: PathBuf, name: String },
}

impl WadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn read_4_bytes(buf: &[u8], offset: usize) -> u32 {
    (buf[offset + 3] as u32) << 24
        | (buf[offset + 2] as u32) << 16
        | (buf[offset + 1] as u32) << 8
        | (buf[offset] as u32)
}

/// `IWAD` for a game WAD, `PWAD` for a patch/addon
fn is_wad_ident(ident: &[u8]) -> bool {
    ident == b"IWAD" || ident == b"PWAD"
}

/// Sniff the first four bytes of `path` for a WAD ident. A file too short to
/// hold an ident is not a WAD.
pub async fn is_wad(path: impl AsRef<Path>) -> Result<bool, WadError> {
    let path = path.as_ref();
    let mut file = File::open(path).await.map_err(|e| WadError::io(path, e))?;
    let mut ident = [0u8; 4];
    match file.read_exact(&mut ident).await {
        Ok(_) => Ok(is_wad_ident(&ident)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(WadError::io(path, e)),
    }
}

/// Header which tells us the WAD type and where the directory is
///
/// The header structure in the WAD is as follows:
///
/// | Field Size | Data Type    | Content                                              |
/// |------------|--------------|------------------------------------------------------|
/// | 0x00-0x03  | 4 ASCII char | *Must* be an ASCII string (either "IWAD" or "PWAD")  |
/// | 0x04-0x07  | unsigned int | The number entries in the directory                  |
/// | 0x08-0x0b  | unsigned int | Offset in bytes to the directory in the WAD file     |
///
struct WadHeader {
    /// Will be either `IWAD` for game, or `PWAD` for patch
    wad_type: [u8; 4],
    /// The count of "lumps" of data
    dir_count: u32,
    /// Offset in bytes that the directory starts at
    dir_offset: u32,
}

impl WadHeader {
    fn parse(buf: &[u8; HEADER_SIZE]) -> Self {
        WadHeader {
            wad_type: [buf[0], buf[1], buf[2], buf[3]],
            dir_count: read_4_bytes(buf, 4),
            dir_offset: read_4_bytes(buf, 8),
        }
    }
}

impl fmt::Debug for WadHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\nWadHeader {{\n  wad_type: {},\n  dir_count: {},\n  dir_offset: {},\n}}",
            String::from_utf8_lossy(&self.wad_type),
            self.dir_count,
            self.dir_offset
        )
    }
}

/// Contains the details for a lump of data: where it starts, the size of it,
/// and the name
///
/// The directory structure in the WAD is as follows:
///
/// | Field Size | Data Type    | Content                                                    |
/// |------------|--------------|------------------------------------------------------------|
/// | 0x00-0x03  | unsigned int | Offset value to the start of the lump data in the WAD file |
/// | 0x04-0x07  | unsigned int | The size of the lump in bytes                              |
/// | 0x08-0x0f  | 8 ASCII char | ASCII holding the name of the lump                         |
///
#[derive(Clone, PartialEq, Eq)]
pub struct WadLump {
    /// The offset in bytes where the lump data starts
    lump_offset: u32,
    /// The size in bytes of the lump referenced
    lump_size: u32,
    /// Name for the lump data
    lump_name: String,
}

impl WadLump {
    fn parse(buf: &[u8]) -> Self {
        let name = &buf[8..8 + LUMP_NAME_LEN];
        // Names are NUL padded, anything after the first NUL is junk
        let end = name.iter().position(|b| *b == 0).unwrap_or(LUMP_NAME_LEN);
        WadLump {
            lump_offset: read_4_bytes(buf, 0),
            lump_size: read_4_bytes(buf, 4),
            lump_name: String::from_utf8_lossy(&name[..end]).into_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.lump_name
    }

    pub fn offset(&self) -> u32 {
        self.lump_offset
    }

    pub fn size(&self) -> u32 {
        self.lump_size
    }

    fn end(&self) -> u64 {
        self.lump_offset as u64 + self.lump_size as u64
    }
}

impl fmt::Debug for WadLump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\nWadLump {{\n  lump_name: {},\n  lump_size: {},\n  lump_offset: {},\n}}",
            &self.lump_name, self.lump_size, self.lump_offset
        )
    }
}

/// "Where's All (the) Data": the directory of a WAD on disk, telling us where
/// each data lump starts
pub struct WadFile {
    wad_file_path: PathBuf,
    header: WadHeader,
    /// Tells us where each lump of data is, in file order
    wad_dirs: Vec<WadLump>,
}

impl fmt::Debug for WadFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\nWadFile {{\n  wad_file_path: {:?},\n  header: {:?},\n  wad_dirs: {},\n}}",
            self.wad_file_path,
            self.header,
            self.wad_dirs.len()
        )
    }
}

impl WadFile {
    /// Read the header and full directory of the WAD at `file_path`. The lump
    /// data itself is left on disk.
    pub async fn open<A>(file_path: A) -> Result<WadFile, WadError>
    where
        A: Into<PathBuf>,
    {
        let wad_file_path = file_path.into();
        let path = wad_file_path.as_path();
        let mut file = File::open(path).await.map_err(|e| WadError::io(path, e))?;
        let file_len = file
            .metadata()
            .await
            .map_err(|e| WadError::io(path, e))?
            .len();

        if file_len < HEADER_SIZE as u64 {
            return Err(WadError::Truncated {
                path: wad_file_path,
                needed: HEADER_SIZE as u64,
                len: file_len,
            });
        }

        let mut buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| WadError::io(path, e))?;
        let header = WadHeader::parse(&buf);
        if !is_wad_ident(&header.wad_type) {
            return Err(WadError::BadIdent {
                path: wad_file_path,
                ident: String::from_utf8_lossy(&header.wad_type).into_owned(),
            });
        }

        let dir_len = header.dir_count as u64 * DIRECTORY_ENTRY_SIZE as u64;
        let dir_end = header.dir_offset as u64 + dir_len;
        if dir_end > file_len {
            return Err(WadError::Truncated {
                path: wad_file_path,
                needed: dir_end,
                len: file_len,
            });
        }

        let mut dir_data = vec![0u8; dir_len as usize];
        file.seek(SeekFrom::Start(header.dir_offset as u64))
            .await
            .map_err(|e| WadError::io(path, e))?;
        file.read_exact(&mut dir_data)
            .await
            .map_err(|e| WadError::io(path, e))?;

        let mut wad_dirs = Vec::with_capacity(header.dir_count as usize);
        for record in dir_data.chunks_exact(DIRECTORY_ENTRY_SIZE) {
            let lump = WadLump::parse(record);
            if lump.end() > file_len {
                return Err(WadError::LumpOutOfBounds {
                    path: wad_file_path,
                    name: lump.lump_name,
                });
            }
            wad_dirs.push(lump);
        }

        debug!("Read WAD directory: {:?}", header);
        Ok(WadFile {
            wad_file_path,
            header,
            wad_dirs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.wad_file_path
    }

    /// `true` for an `IWAD`, `false` for a `PWAD`
    pub fn is_iwad(&self) -> bool {
        &self.header.wad_type == b"IWAD"
    }

    /// Every lump in the directory, in file order
    pub fn lumps(&self) -> impl Iterator<Item = &WadLump> {
        self.wad_dirs.iter()
    }

    /// All lumps named `name`, in file order. WADs may carry many lumps with
    /// the same name.
    pub fn find_lumps<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a WadLump> {
        self.wad_dirs.iter().filter(move |l| l.lump_name == name)
    }

    /// Read the data of a single lump from disk
    pub async fn read_lump(&self, lump: &WadLump) -> Result<Vec<u8>, WadError> {
        if lump.lump_size == 0 {
            return Ok(Vec::new());
        }
        let path = self.wad_file_path.as_path();
        let mut file = File::open(path).await.map_err(|e| WadError::io(path, e))?;
        file.seek(SeekFrom::Start(lump.lump_offset as u64))
            .await
            .map_err(|e| WadError::io(path, e))?;
        let mut data = vec![0u8; lump.lump_size as usize];
        file.read_exact(&mut data)
            .await
            .map_err(|e| WadError::io(path, e))?;
        Ok(data)
    }

    /// Read every lump named `name`, in file order. Empty if there are none.
    pub async fn read_lumps(&self, name: &str) -> Result<Vec<Vec<u8>>, WadError> {
        let mut lumps = Vec::new();
        for lump in self.find_lumps(name) {
            lumps.push(self.read_lump(lump).await?);
        }
        Ok(lumps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build_wad(ident: &[u8; 4], lumps: &[(&str, &[u8])]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut dirs = Vec::new();
        let mut offset = HEADER_SIZE as u32;
        for (name, bytes) in lumps {
            dirs.push((offset, bytes.len() as u32, *name));
            offset += bytes.len() as u32;
            data.extend_from_slice(bytes);
        }
        let mut wad = Vec::new();
        wad.extend_from_slice(ident);
        wad.extend_from_slice(&(lumps.len() as u32).to_le_bytes());
        wad.extend_from_slice(&offset.to_le_bytes());
        wad.extend_from_slice(&data);
        for (offset, size, name) in dirs {
            wad.extend_from_slice(&offset.to_le_bytes());
            wad.extend_from_slice(&size.to_le_bytes());
            let mut n = [0u8; LUMP_NAME_LEN];
            n[..name.len()].copy_from_slice(name.as_bytes());
            wad.extend_from_slice(&n);
        }
        wad
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn read_four_bytes() {
        let buf = [0x78, 0x56, 0x34, 0x12];
        assert_eq!(read_4_bytes(&buf, 0), 0x12345678);
    }

    #[test]
    fn lump_name_trims_padding() {
        let mut record = [0u8; DIRECTORY_ENTRY_SIZE];
        record[0] = 12;
        record[4] = 3;
        record[8..12].copy_from_slice(b"PAL1");
        record[13] = b'X';
        let lump = WadLump::parse(&record);
        assert_eq!(lump.name(), "PAL1");
        assert_eq!(lump.offset(), 12);
        assert_eq!(lump.size(), 3);
    }

    #[tokio::test]
    async fn sniff_idents() {
        let pwad = write_temp(&build_wad(b"PWAD", &[]));
        let iwad = write_temp(&build_wad(b"IWAD", &[]));
        let zip = write_temp(b"PK\x03\x04rest");
        let short = write_temp(b"PW");

        assert!(is_wad(pwad.path()).await.unwrap());
        assert!(is_wad(iwad.path()).await.unwrap());
        assert!(!is_wad(zip.path()).await.unwrap());
        assert!(!is_wad(short.path()).await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = is_wad(dir.path().join("nope.wad")).await.unwrap_err();
        assert!(matches!(err, WadError::Io { .. }));
    }

    #[tokio::test]
    async fn read_all_dirs() {
        let file = write_temp(&build_wad(
            b"PWAD",
            &[("MAINCFG", b"Level 1\n"), ("MAP01", b""), ("SOC_KART", b"#")],
        ));
        let wad = WadFile::open(file.path()).await.unwrap();
        assert!(!wad.is_iwad());

        let names: Vec<&str> = wad.lumps().map(WadLump::name).collect();
        assert_eq!(names, ["MAINCFG", "MAP01", "SOC_KART"]);
    }

    #[tokio::test]
    async fn read_same_named_lumps_in_order() {
        let file = write_temp(&build_wad(
            b"PWAD",
            &[("ANIMDEFS", b"first"), ("PLAYPAL", b"pal"), ("ANIMDEFS", b"second")],
        ));
        let wad = WadFile::open(file.path()).await.unwrap();

        let lumps = wad.read_lumps("ANIMDEFS").await.unwrap();
        assert_eq!(lumps, vec![b"first".to_vec(), b"second".to_vec()]);
        assert!(wad.read_lumps("COLORMAP").await.unwrap().is_empty());

        let marker = wad.lumps().find(|l| l.name() == "PLAYPAL").unwrap();
        assert_eq!(wad.read_lump(marker).await.unwrap(), b"pal");
    }

    #[tokio::test]
    async fn reject_bad_ident() {
        let file = write_temp(&build_wad(b"ZIPS", &[]));
        let err = WadFile::open(file.path()).await.unwrap_err();
        assert!(matches!(err, WadError::BadIdent { ident, .. } if ident == "ZIPS"));
    }

    #[tokio::test]
    async fn reject_truncated_directory() {
        let mut bytes = build_wad(b"PWAD", &[("THINGS", b"0123456789")]);
        bytes.truncate(bytes.len() - 4);
        let file = write_temp(&bytes);
        let err = WadFile::open(file.path()).await.unwrap_err();
        assert!(matches!(err, WadError::Truncated { .. }));
    }

    #[tokio::test]
    async fn reject_lump_past_end() {
        let mut bytes = build_wad(b"PWAD", &[("THINGS", b"0123456789")]);
        // Bump the lump size in the single directory record
        let size_at = bytes.len() - DIRECTORY_ENTRY_SIZE + 4;
        bytes[size_at] = 0xFF;
        let file = write_temp(&bytes);
        let err = WadFile::open(file.path()).await.unwrap_err();
        assert!(matches!(err, WadError::LumpOutOfBounds { name, .. } if name == "THINGS"));
    }
}
