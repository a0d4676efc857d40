//! Core types for disc image access

use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;

use crate::error::Result;

/// ISO9660 logical sector size (user data only)
pub const SECTOR_SIZE: usize = 2048;

/// Raw CD sector size (sync + header + user data + ECC, or one CD-DA frame)
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Offset of user data inside a raw Mode 1 sector (12 sync + 4 header bytes)
pub const RAW_DATA_OFFSET: usize = 16;

/// CD sectors (frames) per second of playback
pub const SECTORS_PER_SECOND: u32 = 75;

/// Lazy, one-shot sequence of sector payload chunks
pub type SectorStream = BoxStream<'static, Result<Bytes>>;

/// Kind of content stored in a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Mode 1 data track (ISO9660 payload)
    Data,
    /// CD-DA audio track
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Data => write!(f, "data"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// One entry of a disc's track table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Track number (1-based, gaps allowed)
    pub number: u32,

    /// Data or audio
    pub kind: TrackKind,

    /// First sector of the track in the image
    pub start_sector: u64,

    /// Number of sectors, when the container records it
    pub sector_count: Option<u64>,
}

impl TrackInfo {
    /// Create a new track entry
    pub fn new(number: u32, kind: TrackKind, start_sector: u64) -> Self {
        Self {
            number,
            kind,
            start_sector,
            sector_count: None,
        }
    }

    /// Set the sector count
    pub fn with_sector_count(mut self, sector_count: u64) -> Self {
        self.sector_count = Some(sector_count);
        self
    }

    /// True for CD-DA tracks
    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }
}

impl fmt::Display for TrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Track {:02} [{} @ sector {}",
            self.number, self.kind, self.start_sector
        )?;
        if let Some(count) = self.sector_count {
            write!(f, ", {} sectors", count)?;
        }
        write!(f, "]")
    }
}

/// A playable audio clip extracted from a disc
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// MIME type of `data`
    pub mime_type: &'static str,

    /// Container header followed by the PCM payload
    pub data: Bytes,
}

impl AudioClip {
    /// MIME type of WAV clips
    pub const WAV_MIME: &'static str = "audio/wav";

    /// Wrap an encoded WAV buffer
    pub fn wav(data: Bytes) -> Self {
        Self {
            mime_type: Self::WAV_MIME,
            data,
        }
    }

    /// Length of the encoded clip in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the clip holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Format size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
