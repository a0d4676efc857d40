//! BIN/CUE vault - raw 2352-byte-sector image described by a cue sheet or CCD file
//!
//! Data sectors are Mode 1: 12 sync bytes and a 4-byte header precede the
//! 2048 bytes of user data. Audio sectors are whole CD-DA frames.

use async_trait::async_trait;
use bytes::Bytes;
use discvault_core::{
    checked_multiply_u64, validate_allocation_size, AudioClip, Error, ImageFile, Result,
    SectorSource, SectorStream, TrackInfo, TrackKind, MAX_AUDIO_PAYLOAD, RAW_DATA_OFFSET,
    RAW_SECTOR_SIZE, SECTOR_SIZE,
};
use std::sync::Arc;

use crate::sequential::{read_strided, Stride};
use crate::sheet::{parse_ccd, parse_cue, TrackTable};
use crate::wave::assemble_clip;

/// Which sheet syntax the track table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// Textual cue sheet (`TRACK` / `INDEX mm:ss:ff`)
    Cue,
    /// CloneCD control file (`[TRACK n]`, `INDEX 1=sector`)
    Ccd,
}

/// Raw image vault driven by a parsed track table
pub struct BinCueVault {
    image: Arc<dyn ImageFile>,
    tracks: TrackTable,
    kind: SheetKind,
}

impl BinCueVault {
    /// Build a vault from an image and an already parsed track table
    pub fn new(image: Arc<dyn ImageFile>, tracks: TrackTable, kind: SheetKind) -> Self {
        Self {
            image,
            tracks,
            kind,
        }
    }

    /// Parse cue sheet text and bind it to `image`
    pub fn from_cue(image: Arc<dyn ImageFile>, sheet_name: &str, text: &str) -> Result<Self> {
        let tracks = parse_cue(sheet_name, text)?;
        Ok(Self::new(image, tracks, SheetKind::Cue))
    }

    /// Parse CCD text and bind it to `image`
    pub fn from_ccd(image: Arc<dyn ImageFile>, sheet_name: &str, text: &str) -> Result<Self> {
        let tracks = parse_ccd(sheet_name, text)?;
        Ok(Self::new(image, tracks, SheetKind::Ccd))
    }

    /// Sheet syntax this vault was built from
    pub fn sheet_kind(&self) -> SheetKind {
        self.kind
    }

    fn image_sectors(&self) -> u64 {
        self.image.len() / RAW_SECTOR_SIZE as u64
    }

    /// Byte range `[start, end)` of an audio track in the image
    fn audio_range(&self, number: u32) -> Result<(u64, u64)> {
        let track = self
            .tracks
            .get(number)
            .ok_or_else(|| Error::invalid_track(number, "track not present"))?;
        if !track.is_audio {
            return Err(Error::invalid_track(number, "not an audio track"));
        }

        let start_sector = track
            .start_sector()
            .ok_or_else(|| Error::invalid_track(number, "track has no INDEX"))?;
        let start = checked_multiply_u64(start_sector, RAW_SECTOR_SIZE as u64, "track start")?;

        let end = match self.tracks.next_after(number).and_then(|next| next.first_sector()) {
            Some(next_sector) => {
                checked_multiply_u64(next_sector, RAW_SECTOR_SIZE as u64, "track end")?
            }
            None => self.image.len(),
        };

        if end < start {
            return Err(Error::invalid_track(
                number,
                format!("track ends at byte {} before it starts at byte {}", end, start),
            ));
        }
        Ok((start, end))
    }
}

#[async_trait]
impl SectorSource for BinCueVault {
    fn identify(&self) -> &str {
        match self.kind {
            SheetKind::Cue => "BIN/CUE image",
            SheetKind::Ccd => "CloneCD image",
        }
    }

    async fn read_sector(&self, sector: u32) -> Result<Bytes> {
        let offset = sector as u64 * RAW_SECTOR_SIZE as u64 + RAW_DATA_OFFSET as u64;
        self.image.read_at(offset, SECTOR_SIZE).await
    }

    fn read_sequential_sectors(&self, start: u32, length: u64) -> SectorStream {
        let layout = Stride {
            base: start as u64 * RAW_SECTOR_SIZE as u64,
            stride: RAW_SECTOR_SIZE as u64,
            chunk_offset: RAW_DATA_OFFSET as u64,
            chunk_len: SECTOR_SIZE,
        };
        read_strided(self.image.clone(), layout, length)
    }

    fn max_track(&self) -> u32 {
        self.tracks.max_track()
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks
            .iter()
            .filter_map(|track| {
                let start = track.start_sector()?;
                let end = self
                    .tracks
                    .next_after(track.number)
                    .and_then(|next| next.first_sector())
                    .unwrap_or_else(|| self.image_sectors());
                let kind = if track.is_audio {
                    TrackKind::Audio
                } else {
                    TrackKind::Data
                };
                Some(
                    TrackInfo::new(track.number, kind, start)
                        .with_sector_count(end.saturating_sub(start)),
                )
            })
            .collect()
    }

    async fn extract_track(&self, track: u32) -> Result<AudioClip> {
        let (start, end) = self.audio_range(track)?;
        let len = validate_allocation_size(end - start, MAX_AUDIO_PAYLOAD, "audio track")?;

        tracing::debug!(
            "Extracting track {} from {}: {} bytes at offset {}",
            track,
            self.image.name(),
            len,
            start
        );
        let payload = self.image.read_at(start, len).await?;
        Ok(assemble_clip(&payload))
    }

    fn reload_image(&mut self, image: Arc<dyn ImageFile>) {
        tracing::debug!("Reloading raw image {}", image.name());
        self.image = image;
    }
}
