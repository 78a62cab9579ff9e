//! Loading files from mounted filesystem images, with transparent decompression.
//!
//! Level 0 is stored uncompressed and level 1 is fast deflate; both are always
//! available. Levels 2 and 3 trade speed for ratio and must be enabled with
//! [AssetStore::init_compression] before files using them can be loaded.

use indexmap::IndexMap;
use miniz_oxide::{deflate::compress_to_vec, inflate::decompress_to_vec_with_limit};
use tracing::{debug, info};

use crate::{dfs::RomImage, AssetError, DfsError};

pub const MAX_LEVEL: u8 = 3;

fn deflate_level(level: u8) -> Result<u8, AssetError> {
    match level {
        1 => Ok(1),
        2 => Ok(6),
        3 => Ok(9),
        _ => Err(AssetError::UnsupportedLevel(level)),
    }
}

/// Compresses `data` at the given level.
pub fn compress(level: u8, data: &[u8]) -> Result<Vec<u8>, AssetError> {
    match level {
        0 => Ok(data.to_vec()),
        _ => Ok(compress_to_vec(data, deflate_level(level)?)),
    }
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    enabled_levels: [bool; MAX_LEVEL as usize + 1],
    mounts: IndexMap<String, RomImage>,
}

impl Default for AssetStore {
    fn default() -> Self {
        Self {
            enabled_levels: [true, true, false, false],
            mounts: IndexMap::new(),
        }
    }
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables decompression of files stored at `level`.
    pub fn init_compression(&mut self, level: u8) -> Result<(), AssetError> {
        if level > MAX_LEVEL {
            return Err(AssetError::UnsupportedLevel(level));
        }
        info!("asset: compression level {} enabled", level);
        self.enabled_levels[level as usize] = true;
        Ok(())
    }

    pub fn mount(&mut self, mount_point: &str, image: RomImage) -> Result<(), DfsError> {
        if self.mounts.contains_key(mount_point) {
            return Err(DfsError::AlreadyMounted(mount_point.to_string()));
        }
        info!("dfs: mounted {}", mount_point);
        self.mounts.insert(mount_point.to_string(), image);
        Ok(())
    }

    pub fn unmount(&mut self, mount_point: &str) -> Result<(), DfsError> {
        self.mounts
            .shift_remove(mount_point)
            .ok_or_else(|| DfsError::NotMounted(mount_point.to_string()))?;
        info!("dfs: unmounted {}", mount_point);
        Ok(())
    }

    pub fn is_mounted(&self, mount_point: &str) -> bool {
        self.mounts.contains_key(mount_point)
    }

    /// Reads and decompresses the file at `path` (e.g. `rom:/model.t3dm`).
    pub fn load(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let (image, name) = self
            .mounts
            .iter()
            .find_map(|(mount_point, image)| {
                path.strip_prefix(mount_point.as_str())
                    .map(|name| (image, name))
            })
            .ok_or_else(|| DfsError::NotMounted(path.to_string()))?;

        let entry = image
            .entry(name)
            .ok_or_else(|| DfsError::FileNotFound(path.to_string()))?;
        let enabled = self
            .enabled_levels
            .get(entry.level as usize)
            .ok_or(AssetError::UnsupportedLevel(entry.level))?;
        if !enabled {
            return Err(AssetError::CompressionLevelNotInitialized(entry.level));
        }

        let stored = image.stored_bytes(entry);
        let data = match entry.level {
            0 => stored.to_vec(),
            _ => decompress_to_vec_with_limit(stored, entry.raw_size as usize).map_err(|error| {
                AssetError::Corrupt {
                    path: path.to_string(),
                    reason: format!("{:?}", error.status),
                }
            })?,
        };
        if data.len() != entry.raw_size as usize {
            return Err(AssetError::Corrupt {
                path: path.to_string(),
                reason: format!("expected {} bytes, got {}", entry.raw_size, data.len()),
            });
        }

        debug!(
            "asset: loaded {} ({} -> {} bytes)",
            path,
            stored.len(),
            data.len()
        );
        Ok(data)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dfs::{RomBuilder, DEFAULT_MOUNT_POINT};

    fn payload() -> Vec<u8> {
        (0..2000u32).map(|i| (i % 7) as u8).collect()
    }

    fn store_with(level: u8) -> AssetStore {
        let image = RomBuilder::new()
            .add_file("data.bin", payload(), level)
            .build()
            .unwrap();
        let mut store = AssetStore::new();
        store
            .mount(DEFAULT_MOUNT_POINT, RomImage::parse(image).unwrap())
            .unwrap();
        store
    }

    #[test]
    fn test_load_levels_0_and_1() {
        for level in [0, 1] {
            let store = store_with(level);
            assert_eq!(store.load("rom:/data.bin").unwrap(), payload());
        }
    }

    #[test]
    fn test_level_2_needs_init() {
        let mut store = store_with(2);
        assert_eq!(
            store.load("rom:/data.bin"),
            Err(AssetError::CompressionLevelNotInitialized(2))
        );
        store.init_compression(2).unwrap();
        assert_eq!(store.load("rom:/data.bin").unwrap(), payload());
    }

    #[test]
    fn test_compression_shrinks_repetitive_data() {
        let compressed = compress(2, &payload()).unwrap();
        assert!(compressed.len() < payload().len());
        assert_eq!(compress(4, &payload()), Err(AssetError::UnsupportedLevel(4)));
    }

    #[test]
    fn test_missing_files_and_mounts() {
        let mut store = store_with(0);
        assert_eq!(
            store.load("rom:/nope.bin"),
            Err(AssetError::Dfs(DfsError::FileNotFound(
                "rom:/nope.bin".to_string()
            )))
        );
        assert_eq!(
            store.load("sd:/data.bin"),
            Err(AssetError::Dfs(DfsError::NotMounted("sd:/data.bin".to_string())))
        );

        store.unmount(DEFAULT_MOUNT_POINT).unwrap();
        assert!(!store.is_mounted(DEFAULT_MOUNT_POINT));
        assert_eq!(
            store.unmount(DEFAULT_MOUNT_POINT),
            Err(DfsError::NotMounted(DEFAULT_MOUNT_POINT.to_string()))
        );
    }

    #[test]
    fn test_corrupt_payload() {
        let mut image = RomBuilder::new()
            .add_file("data.bin", payload(), 1)
            .build()
            .unwrap();
        let len = image.len();
        for b in &mut image[len - 16..] {
            *b = 0xFF;
        }
        let mut store = AssetStore::new();
        store
            .mount(DEFAULT_MOUNT_POINT, RomImage::parse(image).unwrap())
            .unwrap();
        assert!(matches!(
            store.load("rom:/data.bin"),
            Err(AssetError::Corrupt { .. })
        ));
    }
}
