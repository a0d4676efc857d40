//! Raw vault - plain 2048-byte-sector ISO image
//!
//! The simplest vault type: the image already holds only user data, one
//! logical sector after another, with no side metadata file.

use async_trait::async_trait;
use bytes::Bytes;
use discvault_core::{
    AudioClip, Error, ImageFile, Result, SectorSource, SectorStream, TrackInfo, TrackKind,
    SECTOR_SIZE,
};
use std::sync::Arc;

use crate::sequential::{read_strided, Stride};

/// Raw vault - a simple passthrough to the underlying image
///
/// # Example
///
/// ```rust
/// use discvault_vaults::RawVault;
/// use discvault_pipeline::MemoryFile;
/// use discvault_core::SectorSource;
/// use std::sync::Arc;
///
/// let vault = RawVault::new(Arc::new(MemoryFile::new("disc.iso", vec![0u8; 2048 * 20])));
/// assert_eq!(vault.identify(), "Raw ISO image");
/// assert_eq!(vault.max_track(), 1);
/// ```
pub struct RawVault {
    image: Arc<dyn ImageFile>,
}

impl RawVault {
    /// Wrap a plain ISO image
    pub fn new(image: Arc<dyn ImageFile>) -> Self {
        Self { image }
    }
}

#[async_trait]
impl SectorSource for RawVault {
    fn identify(&self) -> &str {
        "Raw ISO image"
    }

    async fn read_sector(&self, sector: u32) -> Result<Bytes> {
        let offset = sector as u64 * SECTOR_SIZE as u64;
        self.image.read_at(offset, SECTOR_SIZE).await
    }

    fn read_sequential_sectors(&self, start: u32, length: u64) -> SectorStream {
        let base = start as u64 * SECTOR_SIZE as u64;
        read_strided(self.image.clone(), Stride::contiguous(base, SECTOR_SIZE), length)
    }

    fn max_track(&self) -> u32 {
        1
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        let sectors = self.image.len() / SECTOR_SIZE as u64;
        vec![TrackInfo::new(1, TrackKind::Data, 0).with_sector_count(sectors)]
    }

    async fn extract_track(&self, track: u32) -> Result<AudioClip> {
        Err(Error::not_implemented(format!(
            "{} is a plain ISO image and carries no audio tracks (requested track {})",
            self.image.name(),
            track
        )))
    }

    fn reload_image(&mut self, image: Arc<dyn ImageFile>) {
        tracing::debug!("Reloading raw image {}", image.name());
        self.image = image;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discvault_pipeline::MemoryFile;
    use futures::TryStreamExt;

    fn numbered_iso(sectors: usize) -> Arc<dyn ImageFile> {
        let mut data = vec![0u8; sectors * SECTOR_SIZE];
        for (s, sector) in data.chunks_mut(SECTOR_SIZE).enumerate() {
            sector.fill(s as u8);
        }
        Arc::new(MemoryFile::new("disc.iso", data))
    }

    #[tokio::test]
    async fn test_read_sector() {
        let vault = RawVault::new(numbered_iso(4));

        let sector = vault.read_sector(2).await.unwrap();
        assert_eq!(sector.len(), SECTOR_SIZE);
        assert!(sector.iter().all(|&b| b == 2));

        assert!(vault.read_sector(4).await.is_err());
    }

    #[tokio::test]
    async fn test_read_sequential_sectors() {
        let vault = RawVault::new(numbered_iso(4));

        let chunks: Vec<Bytes> = vault
            .read_sequential_sectors(1, 2 * SECTOR_SIZE as u64 + 10)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].iter().all(|&b| b == 1));
        assert!(chunks[1].iter().all(|&b| b == 2));
        assert_eq!(chunks[2].len(), 10);
        assert!(chunks[2].iter().all(|&b| b == 3));
    }

    #[tokio::test]
    async fn test_tracks_and_extract() {
        let vault = RawVault::new(numbered_iso(4));

        assert_eq!(vault.max_track(), 1);
        let tracks = vault.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].kind, TrackKind::Data);
        assert_eq!(tracks[0].sector_count, Some(4));

        let err = vault.extract_track(1).await.unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }

    #[tokio::test]
    async fn test_reload_image() {
        let mut vault = RawVault::new(numbered_iso(1));
        assert!(vault.read_sector(3).await.is_err());

        vault.reload_image(numbered_iso(4));
        let sector = vault.read_sector(3).await.unwrap();
        assert!(sector.iter().all(|&b| b == 3));
    }
}
