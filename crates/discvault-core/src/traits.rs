//! Core traits for disc image access

use crate::{
    error::{Error, Result},
    types::{AudioClip, SectorStream, TrackInfo},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// A byte-range readable file handle supplied by the host
///
/// Images and their metadata sheets arrive as opaque blobs; this is the only
/// way the readers ever touch them.
#[async_trait]
pub trait ImageFile: Send + Sync {
    /// File name as supplied by the host (used for format dispatch and error messages)
    fn name(&self) -> &str;

    /// Total size of the file in bytes
    fn len(&self) -> u64;

    /// True if the file holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly `len` bytes starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the range is not fully inside the file
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes>;

    /// Read the whole file into memory
    async fn read_all(&self) -> Result<Bytes> {
        let len = usize::try_from(self.len()).map_err(|_| Error::OutOfRange {
            offset: 0,
            len: self.len(),
            size: self.len(),
        })?;
        self.read_at(0, len).await
    }
}

/// Check that `[offset, offset + len)` lies inside a file of `size` bytes
pub fn check_range(offset: u64, len: usize, size: u64) -> Result<()> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfRange {
            offset,
            len: len as u64,
            size,
        }),
    }
}

/// Trait for disc image vaults: sector-addressable access to one container format
///
/// Every call except [`SectorSource::reload_image`] is stateless, so independent
/// reads may run concurrently.
#[async_trait]
pub trait SectorSource: Send + Sync {
    /// Get a human-readable identifier for this vault type
    fn identify(&self) -> &str;

    /// Read one 2048-byte logical sector
    async fn read_sector(&self, sector: u32) -> Result<Bytes>;

    /// Read `length` bytes of user data starting at logical sector `start`
    ///
    /// The returned stream yields 2048-byte chunks, the last one trimmed to the
    /// remaining length. It is one-shot: call again to re-read.
    fn read_sequential_sectors(&self, start: u32, length: u64) -> SectorStream;

    /// Highest track number present on the disc
    fn max_track(&self) -> u32;

    /// Track layout of the disc, ordered by track number
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Extract one audio track as a self-contained WAV clip
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTrack`] if the track is absent or not audio,
    /// [`Error::NotImplemented`] for formats without audio tracks
    async fn extract_track(&self, track: u32) -> Result<AudioClip>;

    /// Swap the underlying image blob
    ///
    /// Precondition: no read against this source may be in flight. The
    /// exclusive borrow enforces this within safe code; callers sharing the
    /// source across tasks must serialize reloads themselves.
    fn reload_image(&mut self, image: Arc<dyn ImageFile>);
}
