//! MDS (Media Descriptor Sidecar) header structures
//!
//! The MDS file is a fixed binary layout: a 0x70-byte preamble, one 0x50-byte
//! record per track descriptor, then one 8-byte extra record per descriptor
//! carrying the sector count.

use discvault_core::{validate_sector_size, Error, Field, Result};
use std::collections::BTreeMap;

/// ASCII signature at the start of every MDS file
pub const MDS_SIGNATURE: &[u8; 16] = b"MEDIA DESCRIPTOR";

/// Start of the per-track record table
pub const TRACK_TABLE_OFFSET: usize = 0x70;
/// Size of one per-track record
pub const TRACK_RECORD_SIZE: usize = 0x50;
/// Size of one extra record
pub const EXTRA_RECORD_SIZE: usize = 8;

/// Track numbers at or above this mark session and lead-out entries
pub const FIRST_NON_TRACK: u8 = 100;

/// Preamble fields
pub mod header {
    use super::Field;

    pub const SIGNATURE: Field = Field::bytes("signature", 0x00, 16);
    pub const ENTRY_COUNT: Field = Field::le("entry count", 0x62, 1);
}

/// Per-track record fields, relative to the record start
pub mod track_record {
    use super::Field;

    pub const MODE: Field = Field::le("mode", 0x00, 1);
    pub const NUMBER: Field = Field::le("track number", 0x04, 1);
    pub const SECTOR_SIZE: Field = Field::le("sector size", 0x10, 2);
    pub const BYTE_OFFSET: Field = Field::le("byte offset", 0x28, 4);
}

/// Extra record fields, relative to the record start
pub mod extra_record {
    use super::Field;

    pub const SECTOR_COUNT: Field = Field::le("sector count", 0x04, 4);
}

/// Track mode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdsMode {
    /// Mode 1 data (0xAA)
    Mode1,
    /// CD-DA audio (0xA9)
    Audio,
    /// Any other mode byte, kept for diagnostics
    Other(u8),
}

impl MdsMode {
    pub const MODE1: u8 = 0xAA;
    pub const AUDIO: u8 = 0xA9;

    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::MODE1 => MdsMode::Mode1,
            Self::AUDIO => MdsMode::Audio,
            other => MdsMode::Other(other),
        }
    }
}

/// Geometry of one track inside the MDF image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MdsTrack {
    pub number: u32,
    pub mode: MdsMode,
    /// Bytes per raw sector on disk
    pub sector_size: u32,
    /// Byte offset of the track's first sector in the MDF image
    pub byte_offset: u64,
    pub sector_count: u32,
}

impl MdsTrack {
    pub fn is_audio(&self) -> bool {
        self.mode == MdsMode::Audio
    }
}

/// Parsed MDS header: the track table, keyed by track number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdsHeader {
    first: MdsTrack,
    tracks: BTreeMap<u32, MdsTrack>,
}

fn read_field(file: &str, field: &Field, data: &[u8]) -> Result<u64> {
    field
        .read(data)
        .ok_or_else(|| Error::parse(file, format!("truncated header reading {}", field.name)))
}

impl MdsHeader {
    /// Parse an MDS file's contents
    ///
    /// `file` names the MDS file in error messages.
    pub fn parse(file: &str, data: &[u8]) -> Result<Self> {
        match header::SIGNATURE.slice(data) {
            Some(sig) if sig == MDS_SIGNATURE => {}
            _ => return Err(Error::parse(file, "missing MEDIA DESCRIPTOR signature")),
        }

        let entries = read_field(file, &header::ENTRY_COUNT, data)? as usize;
        let extra_table = TRACK_TABLE_OFFSET + entries * TRACK_RECORD_SIZE;

        let mut tracks = BTreeMap::new();
        for i in 0..entries {
            let record = data
                .get(TRACK_TABLE_OFFSET + i * TRACK_RECORD_SIZE..)
                .unwrap_or_default();
            let number = read_field(file, &track_record::NUMBER, record)? as u8;
            if number >= FIRST_NON_TRACK {
                tracing::trace!("{}: skipping descriptor {} (point 0x{:02X})", file, i, number);
                continue;
            }

            let extra = data
                .get(extra_table + i * EXTRA_RECORD_SIZE..)
                .unwrap_or_default();

            let sector_size = read_field(file, &track_record::SECTOR_SIZE, record)? as u32;
            validate_sector_size(sector_size, file)?;

            let track = MdsTrack {
                number: number as u32,
                mode: MdsMode::from_u8(read_field(file, &track_record::MODE, record)? as u8),
                sector_size,
                byte_offset: read_field(file, &track_record::BYTE_OFFSET, record)?,
                sector_count: read_field(file, &extra_record::SECTOR_COUNT, extra)? as u32,
            };
            if tracks.insert(track.number, track).is_some() {
                return Err(Error::parse(file, format!("duplicate track {}", number)));
            }
        }

        let first = match tracks.get(&1) {
            Some(first) if first.mode == MdsMode::Mode1 => *first,
            Some(first) => {
                return Err(Error::parse(
                    file,
                    format!("track 1 must be Mode1, found {:?}", first.mode),
                ))
            }
            None => return Err(Error::parse(file, "no track 1")),
        };

        Ok(Self { first, tracks })
    }

    pub fn get(&self, number: u32) -> Option<&MdsTrack> {
        self.tracks.get(&number)
    }

    /// The first (data) track, which drives sector addressing
    pub fn first_track(&self) -> &MdsTrack {
        &self.first
    }

    pub fn max_track(&self) -> u32 {
        self.tracks.keys().next_back().copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MdsTrack> {
        self.tracks.values()
    }
}

/// Builder for synthetic MDS files used in tests
#[cfg(test)]
pub(crate) fn build_mds(records: &[(u8, u8, u16, u32, u32)]) -> Vec<u8> {
    let entries = records.len();
    let table_len = entries * (TRACK_RECORD_SIZE + EXTRA_RECORD_SIZE);
    let mut data = vec![0u8; TRACK_TABLE_OFFSET + table_len];
    data[..16].copy_from_slice(MDS_SIGNATURE);
    data[0x62] = entries as u8;

    for (i, &(mode, number, sector_size, byte_offset, sector_count)) in records.iter().enumerate() {
        let rec = TRACK_TABLE_OFFSET + i * TRACK_RECORD_SIZE;
        data[rec] = mode;
        data[rec + 0x04] = number;
        data[rec + 0x10..rec + 0x12].copy_from_slice(&sector_size.to_le_bytes());
        data[rec + 0x28..rec + 0x2C].copy_from_slice(&byte_offset.to_le_bytes());

        let extra = TRACK_TABLE_OFFSET + entries * TRACK_RECORD_SIZE + i * EXTRA_RECORD_SIZE;
        data[extra + 4..extra + 8].copy_from_slice(&sector_count.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tracks() {
        let data = build_mds(&[
            (0xAA, 1, 2048, 0, 10),
            (0xA9, 2, 2352, 20480, 5),
            (0x00, 0xA0, 0, 0, 0),
        ]);
        let header = MdsHeader::parse("disc.mds", &data).unwrap();

        assert_eq!(header.max_track(), 2);
        assert_eq!(header.iter().count(), 2);
        let audio = header.get(2).unwrap();
        assert!(audio.is_audio());
        assert_eq!(audio.sector_size, 2352);
        assert_eq!(audio.byte_offset, 20480);
        assert_eq!(audio.sector_count, 5);
        assert_eq!(header.first_track().mode, MdsMode::Mode1);
    }

    #[test]
    fn test_bad_signature() {
        let mut data = build_mds(&[(0xAA, 1, 2048, 0, 10)]);
        data[0] = b'X';
        let err = MdsHeader::parse("disc.mds", &data).unwrap_err();
        assert!(matches!(err, Error::Parse { ref file, .. } if file == "disc.mds"));
    }

    #[test]
    fn test_first_track_must_be_mode1() {
        let data = build_mds(&[(0xA9, 1, 2352, 0, 10)]);
        assert!(matches!(
            MdsHeader::parse("disc.mds", &data),
            Err(Error::Parse { .. })
        ));

        let data = build_mds(&[(0xAA, 2, 2048, 0, 10)]);
        assert!(MdsHeader::parse("disc.mds", &data).is_err());
    }

    #[test]
    fn test_truncated_header() {
        let data = build_mds(&[(0xAA, 1, 2048, 0, 10), (0xA9, 2, 2352, 20480, 5)]);
        let err = MdsHeader::parse("disc.mds", &data[..data.len() - 4]).unwrap_err();
        assert!(err.to_string().contains("sector count"));
    }

    #[test]
    fn test_zero_sector_size() {
        let data = build_mds(&[(0xAA, 1, 0, 0, 10)]);
        assert!(matches!(
            MdsHeader::parse("disc.mds", &data),
            Err(Error::Parse { .. })
        ));
    }
}
