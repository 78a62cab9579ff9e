//! Read-only filesystem images.
//!
//! Image layout (all integers big endian):
//!
//! ```text
//! magic     "N64R"
//! version   u16 (1)
//! count     u16
//! entries   count * { name_len u16, name [u8; name_len], level u8,
//!                     offset u32, stored_size u32, raw_size u32 }
//! payload
//! ```
//!
//! Offsets are from the start of the image. Each file is stored with the compression
//! level recorded in its entry (see [crate::asset]).

use indexmap::IndexMap;
use tracing::debug;

use crate::{asset, AssetError, DfsError};

/// The path prefix under which the cartridge filesystem is mounted.
pub const DEFAULT_MOUNT_POINT: &str = "rom:/";

const MAGIC: &[u8; 4] = b"N64R";
const VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomEntry {
    pub level: u8,
    pub offset: u32,
    pub stored_size: u32,
    pub raw_size: u32,
}

#[derive(Debug, Clone)]
pub struct RomImage {
    data: Vec<u8>,
    entries: IndexMap<String, RomEntry>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], DfsError> {
        let end = self.pos.checked_add(len).ok_or(DfsError::Truncated)?;
        let bytes = self.data.get(self.pos..end).ok_or(DfsError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, DfsError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DfsError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DfsError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl RomImage {
    pub fn parse(data: Vec<u8>) -> Result<Self, DfsError> {
        let mut reader = Reader {
            data: &data,
            pos: 0,
        };
        if reader.bytes(4).map_err(|_| DfsError::BadMagic)? != MAGIC {
            return Err(DfsError::BadMagic);
        }
        let version = reader.u16()?;
        if version != VERSION {
            return Err(DfsError::UnsupportedVersion(version));
        }

        let count = reader.u16()?;
        let mut entries = IndexMap::new();
        for _ in 0..count {
            let name_len = reader.u16()? as usize;
            let name = String::from_utf8_lossy(reader.bytes(name_len)?).into_owned();
            let entry = RomEntry {
                level: reader.u8()?,
                offset: reader.u32()?,
                stored_size: reader.u32()?,
                raw_size: reader.u32()?,
            };
            let end = entry.offset as usize + entry.stored_size as usize;
            if end > data.len() {
                return Err(DfsError::Truncated);
            }
            entries.insert(name, entry);
        }

        debug!("dfs: parsed image with {} files", entries.len());
        Ok(Self { data, entries })
    }

    pub fn entry(&self, name: &str) -> Option<&RomEntry> {
        self.entries.get(name)
    }

    /// The stored (possibly compressed) bytes of a file.
    pub fn stored_bytes(&self, entry: &RomEntry) -> &[u8] {
        let start = entry.offset as usize;
        &self.data[start..start + entry.stored_size as usize]
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }
}

/// Builds a filesystem image from in-memory files.
#[derive(Debug, Clone, Default)]
pub struct RomBuilder {
    files: IndexMap<String, (u8, Vec<u8>)>,
}

impl RomBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, to be compressed at `level`.
    pub fn add_file(&mut self, name: &str, bytes: Vec<u8>, level: u8) -> &mut Self {
        self.files.insert(name.to_string(), (level, bytes));
        self
    }

    pub fn build(&self) -> Result<Vec<u8>, AssetError> {
        let mut stored = Vec::new();
        for (level, bytes) in self.files.values() {
            stored.push(asset::compress(*level, bytes)?);
        }

        let header_size: usize = 8 + self
            .files
            .keys()
            .map(|name| 2 + name.len() + 1 + 12)
            .sum::<usize>();

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&(self.files.len() as u16).to_be_bytes());

        let mut offset = header_size;
        for ((name, (level, bytes)), data) in self.files.iter().zip(&stored) {
            out.extend_from_slice(&(name.len() as u16).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.push(*level);
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            offset += data.len();
        }
        for data in &stored {
            out.extend_from_slice(data);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_and_parse() {
        let image = RomBuilder::new()
            .add_file("a.bin", vec![1, 2, 3], 0)
            .add_file("dir/b.bin", vec![7; 100], 0)
            .build()
            .unwrap();
        let rom = RomImage::parse(image).unwrap();

        assert_eq!(rom.file_names().collect::<Vec<_>>(), vec!["a.bin", "dir/b.bin"]);
        let entry = rom.entry("dir/b.bin").unwrap();
        assert_eq!(entry.raw_size, 100);
        assert_eq!(rom.stored_bytes(entry), &[7; 100][..]);
        assert!(rom.entry("missing").is_none());
    }

    #[test]
    fn test_bad_images() {
        assert_eq!(RomImage::parse(b"XXXX".to_vec()).err(), Some(DfsError::BadMagic));
        assert_eq!(RomImage::parse(vec![]).err(), Some(DfsError::BadMagic));

        let mut image = RomBuilder::new()
            .add_file("a.bin", vec![1, 2, 3], 0)
            .build()
            .unwrap();
        image.truncate(image.len() - 1);
        assert_eq!(RomImage::parse(image).err(), Some(DfsError::Truncated));

        let mut image = RomBuilder::new().build().unwrap();
        image[5] = 2;
        assert_eq!(
            RomImage::parse(image).err(),
            Some(DfsError::UnsupportedVersion(2))
        );
    }
}
