//! # DiscVault Pipeline
//!
//! Byte-range readable file handles for the DiscVault project.
//!
//! This crate provides the [`ImageFile`](discvault_core::ImageFile)
//! implementations that images and metadata sheets are read through:
//! - **MemoryFile**: an in-memory blob handed over by the host
//! - **MappedFile**: memory-mapped host file for direct action
//! - **StreamFile**: host file read on demand through tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use discvault_pipeline::{open_image, VaultConfig};
//! use std::path::Path;
//!
//! # async fn run() -> discvault_core::Result<()> {
//! let image = open_image(Path::new("game.bin"), &VaultConfig::default()).await?;
//! let header = image.read_at(0, 16).await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod mmap;
pub mod stream;

pub use memory::MemoryFile;
pub use mmap::MappedFile;
pub use stream::StreamFile;

use discvault_core::{ImageFile, Result};
use std::path::Path;
use std::sync::Arc;

/// Configuration for opening images from host paths
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Use memory mapping for direct action (high performance)
    pub use_mmap: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { use_mmap: true }
    }
}

/// Open a host file as a shared image handle according to `config`
pub async fn open_image(path: &Path, config: &VaultConfig) -> Result<Arc<dyn ImageFile>> {
    if config.use_mmap {
        Ok(Arc::new(MappedFile::open(path)?))
    } else {
        Ok(Arc::new(StreamFile::open(path).await?))
    }
}

/// Final path component as a display name (falls back to the whole path)
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_uses_mmap() {
        assert!(VaultConfig::default().use_mmap);
    }

    #[tokio::test]
    async fn test_open_image_with_and_without_mmap() {
        let mut tmpfile = NamedTempFile::with_suffix(".iso").unwrap();
        tmpfile.write_all(&[1u8, 2, 3, 4]).unwrap();
        tmpfile.flush().unwrap();

        for use_mmap in [true, false] {
            let image = open_image(tmpfile.path(), &VaultConfig { use_mmap }).await.unwrap();
            assert_eq!(image.len(), 4);
            assert_eq!(&image.read_at(1, 2).await.unwrap()[..], &[2, 3]);
        }
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of(Path::new("/tmp/dir/game.cue")), "game.cue");
    }
}
