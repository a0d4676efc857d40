//! MDF/MDS vault
//!
//! The MDF file holds raw sectors; the MDS sidecar declares each track's
//! mode, sector stride and byte offset. Data sectors are addressed through
//! track 1's geometry, audio tracks through their own.

pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use discvault_core::{
    checked_add_u64, checked_multiply_u64, validate_allocation_size, AudioClip, Error, ImageFile,
    Result, SectorSource, SectorStream, TrackInfo, TrackKind, MAX_AUDIO_PAYLOAD, RAW_DATA_OFFSET,
    RAW_SECTOR_SIZE, SECTOR_SIZE,
};
use std::sync::Arc;

use crate::sequential::{for_each_chunk, read_strided, Stride};
use crate::wave::ClipBuilder;

pub use types::{MdsHeader, MdsMode, MdsTrack};

/// Raw image vault driven by an MDS header
pub struct MdsVault {
    image: Arc<dyn ImageFile>,
    header: MdsHeader,
}

impl MdsVault {
    pub fn new(image: Arc<dyn ImageFile>, header: MdsHeader) -> Self {
        Self { image, header }
    }

    /// Parse the MDS sidecar bytes and bind them to `image`
    pub fn from_sheet(image: Arc<dyn ImageFile>, sheet_name: &str, sheet: &[u8]) -> Result<Self> {
        let header = MdsHeader::parse(sheet_name, sheet)?;
        tracing::debug!(
            "{}: {} tracks, track 1 stride {} at offset {}",
            sheet_name,
            header.iter().count(),
            header.first_track().sector_size,
            header.first_track().byte_offset
        );
        Ok(Self::new(image, header))
    }

    fn data_layout(&self, start: u32) -> Result<Stride> {
        let first = self.header.first_track();
        let skip = checked_multiply_u64(start as u64, first.sector_size as u64, "sector offset")?;
        let layout = Stride {
            base: checked_add_u64(first.byte_offset, skip, "sector offset")?,
            stride: first.sector_size as u64,
            chunk_offset: RAW_DATA_OFFSET as u64,
            chunk_len: SECTOR_SIZE,
        };
        layout.validate(self.image.name())?;
        Ok(layout)
    }
}

#[async_trait]
impl SectorSource for MdsVault {
    fn identify(&self) -> &str {
        "MDF/MDS image"
    }

    async fn read_sector(&self, sector: u32) -> Result<Bytes> {
        let offset = self.data_layout(sector)?.payload_offset(0)?;
        self.image.read_at(offset, SECTOR_SIZE).await
    }

    fn read_sequential_sectors(&self, start: u32, length: u64) -> SectorStream {
        match self.data_layout(start) {
            Ok(layout) => read_strided(self.image.clone(), layout, length),
            Err(e) => Box::pin(futures::stream::once(async move { Err(e) })),
        }
    }

    fn max_track(&self) -> u32 {
        self.header.max_track()
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.header
            .iter()
            .map(|track| {
                let kind = if track.is_audio() {
                    TrackKind::Audio
                } else {
                    TrackKind::Data
                };
                let start = track.byte_offset / track.sector_size as u64;
                TrackInfo::new(track.number, kind, start)
                    .with_sector_count(track.sector_count as u64)
            })
            .collect()
    }

    async fn extract_track(&self, number: u32) -> Result<AudioClip> {
        let track = self
            .header
            .get(number)
            .ok_or_else(|| Error::invalid_track(number, "track not present"))?;
        if !track.is_audio() {
            return Err(Error::invalid_track(
                number,
                format!("not an audio track (mode {:?})", track.mode),
            ));
        }

        let payload_len = checked_multiply_u64(
            track.sector_count as u64,
            RAW_SECTOR_SIZE as u64,
            "audio track size",
        )?;
        let capacity = validate_allocation_size(payload_len, MAX_AUDIO_PAYLOAD, "audio track")?;

        // Audio frames are stored whole; no sync header to skip
        let layout = Stride {
            base: track.byte_offset,
            stride: track.sector_size as u64,
            chunk_offset: 0,
            chunk_len: RAW_SECTOR_SIZE,
        };
        tracing::debug!(
            "Extracting track {} from {}: {} sectors at offset {}",
            number,
            self.image.name(),
            track.sector_count,
            track.byte_offset
        );

        let mut clip = ClipBuilder::with_capacity(capacity);
        for_each_chunk(
            read_strided(self.image.clone(), layout, payload_len),
            |chunk| clip.push(chunk),
        )
        .await?;
        Ok(clip.finish())
    }

    fn reload_image(&mut self, image: Arc<dyn ImageFile>) {
        tracing::debug!("Reloading MDF image {}", image.name());
        self.image = image;
    }
}

#[cfg(test)]
mod tests {
    use super::types::build_mds;
    use super::*;
    use crate::wave::{declared_data_size, WAV_HEADER_SIZE};
    use discvault_pipeline::MemoryFile;
    use futures::TryStreamExt;

    /// 10 data sectors of 2048 bytes, then 5 audio frames of 2352 bytes
    fn mdf_image() -> Arc<dyn ImageFile> {
        let mut data = vec![0u8; 10 * 2048 + 5 * RAW_SECTOR_SIZE];
        for (s, sector) in data[..10 * 2048].chunks_mut(2048).enumerate() {
            sector.fill(s as u8);
        }
        data[10 * 2048..].fill(0xA9);
        Arc::new(MemoryFile::new("disc.mdf", data))
    }

    fn vault() -> MdsVault {
        let mds = build_mds(&[(0xAA, 1, 2048, 0, 10), (0xA9, 2, 2352, 20480, 5)]);
        MdsVault::from_sheet(mdf_image(), "disc.mds", &mds).unwrap()
    }

    #[tokio::test]
    async fn test_extract_audio_track() {
        let vault = vault();
        assert_eq!(vault.max_track(), 2);

        let err = vault.extract_track(1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTrack { track: 1, .. }));

        let clip = vault.extract_track(2).await.unwrap();
        assert_eq!(clip.len(), WAV_HEADER_SIZE + 5 * RAW_SECTOR_SIZE);
        assert_eq!(declared_data_size(&clip.data), Some(5 * RAW_SECTOR_SIZE as u32));
        assert!(clip.data[WAV_HEADER_SIZE..].iter().all(|&b| b == 0xA9));

        assert!(vault.extract_track(3).await.is_err());
    }

    #[tokio::test]
    async fn test_read_sector_uses_first_track_stride() {
        let vault = vault();

        // Sector 2 payload starts 16 bytes into the 2048-byte stride
        let sector = vault.read_sector(2).await.unwrap();
        assert_eq!(sector.len(), SECTOR_SIZE);
        assert!(sector[..2048 - 16].iter().all(|&b| b == 2));
        assert!(sector[2048 - 16..].iter().all(|&b| b == 3));
    }

    #[tokio::test]
    async fn test_sequential_sectors_match_read_sector() {
        let vault = vault();

        let chunks: Vec<Bytes> = vault
            .read_sequential_sectors(1, 2 * SECTOR_SIZE as u64)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vault.read_sector(1).await.unwrap());
        assert_eq!(chunks[1], vault.read_sector(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_data_stride_shorter_than_sector_fails() {
        let mds = build_mds(&[(0xAA, 1, 1000, 0, 10)]);
        let image: Arc<dyn ImageFile> = Arc::new(MemoryFile::new("disc.mdf", vec![0u8; 20_000]));
        let vault = MdsVault::from_sheet(image, "disc.mds", &mds).unwrap();

        let result: Result<Vec<Bytes>> = vault.read_sequential_sectors(0, 3000).try_collect().await;
        assert!(matches!(result, Err(Error::Parse { .. })));
        assert!(matches!(vault.read_sector(0).await, Err(Error::Parse { .. })));
    }

    #[tokio::test]
    async fn test_audio_stride_shorter_than_frame_fails() {
        let mds = build_mds(&[(0xAA, 1, 2048, 0, 1), (0xA9, 2, 2048, 2048, 4)]);
        let image: Arc<dyn ImageFile> = Arc::new(MemoryFile::new("disc.mdf", vec![0u8; 5 * 2048]));
        let vault = MdsVault::from_sheet(image, "disc.mds", &mds).unwrap();

        assert!(matches!(vault.extract_track(2).await, Err(Error::Parse { .. })));
    }

    #[tokio::test]
    async fn test_reload_image() {
        let mds = build_mds(&[(0xAA, 1, 2048, 0, 10)]);
        let empty: Arc<dyn ImageFile> = Arc::new(MemoryFile::new("disc.mdf", Vec::<u8>::new()));
        let mut vault = MdsVault::from_sheet(empty, "disc.mds", &mds).unwrap();
        assert!(vault.read_sector(2).await.is_err());

        vault.reload_image(mdf_image());
        let sector = vault.read_sector(2).await.unwrap();
        assert!(sector[..2048 - 16].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_track_listing() {
        let tracks = vault().tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0], TrackInfo::new(1, TrackKind::Data, 0).with_sector_count(10));
        assert_eq!(tracks[1].kind, TrackKind::Audio);
        assert_eq!(tracks[1].sector_count, Some(5));
    }
}
