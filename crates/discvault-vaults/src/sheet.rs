//! Cue sheet and CloneCD control file parsing
//!
//! Both formats describe the track layout of a single raw 2352-byte-sector
//! image. They are parsed into the same [`TrackTable`].

use discvault_core::{Error, Result, SECTORS_PER_SECOND};
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use std::collections::BTreeMap;

/// One track as described by a cue sheet or CCD file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTrack {
    /// Track number (1-based)
    pub number: u32,
    /// True for CD-DA tracks
    pub is_audio: bool,
    /// Absolute sector of each INDEX, keyed by index number
    pub indices: BTreeMap<u32, u64>,
}

impl SheetTrack {
    fn new(number: u32, is_audio: bool) -> Self {
        Self {
            number,
            is_audio,
            indices: BTreeMap::new(),
        }
    }

    /// Where track playback starts: INDEX 1, or INDEX 0 when 1 is absent
    pub fn start_sector(&self) -> Option<u64> {
        self.indices.get(&1).or_else(|| self.indices.get(&0)).copied()
    }

    /// Where the track begins on disc including its pregap: INDEX 0, else INDEX 1
    pub fn first_sector(&self) -> Option<u64> {
        self.indices.get(&0).or_else(|| self.indices.get(&1)).copied()
    }
}

/// Ordered track table, immutable once parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTable {
    tracks: BTreeMap<u32, SheetTrack>,
}

impl TrackTable {
    /// Look up a track by number
    pub fn get(&self, number: u32) -> Option<&SheetTrack> {
        self.tracks.get(&number)
    }

    /// The next defined track after `number` (track numbers may have gaps)
    pub fn next_after(&self, number: u32) -> Option<&SheetTrack> {
        self.tracks
            .range(number.saturating_add(1)..)
            .next()
            .map(|(_, track)| track)
    }

    /// Highest track number present
    pub fn max_track(&self) -> u32 {
        self.tracks.keys().next_back().copied().unwrap_or(0)
    }

    /// Tracks in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &SheetTrack> {
        self.tracks.values()
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// True if no track was defined
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn insert(&mut self, file: &str, line: usize, track: SheetTrack) -> Result<()> {
        if self.tracks.contains_key(&track.number) {
            return Err(Error::parse(
                file,
                format!("line {}: duplicate TRACK {}", line, track.number),
            ));
        }
        self.tracks.insert(track.number, track);
        Ok(())
    }

    fn validate(&self, file: &str) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(Error::parse(file, "no TRACK entries found"));
        }
        for track in self.tracks.values() {
            if track.start_sector().is_none() {
                return Err(Error::parse(
                    file,
                    format!("track {} has no INDEX 0 or INDEX 1", track.number),
                ));
            }
        }
        match self.tracks.get(&1) {
            None => Err(Error::parse(file, "track 1 is missing")),
            Some(track) if track.is_audio => Err(Error::parse(file, "track 1 is not a data track")),
            Some(_) => Ok(()),
        }
    }
}

/// Decode sheet bytes to text
///
/// A BOM wins; otherwise strict UTF-8 is tried and Shift_JIS is the fallback.
pub fn decode_sheet_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => {
            tracing::warn!("Sheet is not valid UTF-8, decoding as Shift_JIS");
            let (text, _) = SHIFT_JIS.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Convert an `mm:ss:ff` cue timecode to an absolute sector number
///
/// Returns `None` unless all three fields are numeric, seconds < 60 and
/// frames < 75.
pub fn index_to_sector(timecode: &str) -> Option<u64> {
    let mut fields = timecode.split(':');
    let minutes: u64 = fields.next()?.parse().ok()?;
    let seconds: u64 = fields.next()?.parse().ok()?;
    let frames: u64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() || seconds >= 60 || frames >= SECTORS_PER_SECOND as u64 {
        return None;
    }

    let per_second = SECTORS_PER_SECOND as u64;
    Some(minutes * 60 * per_second + seconds * per_second + frames)
}

/// Parse cue sheet text
///
/// Only `TRACK` and `INDEX` lines matter; all other commands are ignored.
pub fn parse_cue(file: &str, text: &str) -> Result<TrackTable> {
    let mut table = TrackTable::default();
    let mut current: Option<SheetTrack> = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(keyword) = parts.first() else {
            continue;
        };

        if keyword.eq_ignore_ascii_case("TRACK") {
            if parts.len() < 3 {
                return Err(Error::parse(file, format!("line {}: invalid TRACK line", line_no)));
            }
            let number: u32 = parts[1].parse().map_err(|_| {
                Error::parse(
                    file,
                    format!("line {}: invalid track number '{}'", line_no, parts[1]),
                )
            })?;
            if let Some(done) = current.take() {
                table.insert(file, line_no, done)?;
            }
            current = Some(SheetTrack::new(number, parts[2].eq_ignore_ascii_case("AUDIO")));
        } else if keyword.eq_ignore_ascii_case("INDEX") {
            let Some(track) = current.as_mut() else {
                return Err(Error::parse(file, format!("line {}: INDEX before TRACK", line_no)));
            };
            if parts.len() < 3 {
                return Err(Error::parse(file, format!("line {}: invalid INDEX line", line_no)));
            }
            let index: u32 = parts[1].parse().map_err(|_| {
                Error::parse(
                    file,
                    format!("line {}: invalid index number '{}'", line_no, parts[1]),
                )
            })?;
            let sector = index_to_sector(parts[2]).ok_or_else(|| {
                Error::parse(
                    file,
                    format!("line {}: invalid timecode '{}'", line_no, parts[2]),
                )
            })?;
            track.indices.insert(index, sector);
        }
        // FILE, REM, PREGAP, POSTGAP, TITLE, FLAGS, ... carry nothing we need
    }

    if let Some(done) = current.take() {
        table.insert(file, text.lines().count(), done)?;
    }

    table.validate(file)?;
    tracing::debug!("Parsed cue sheet {}: {} tracks", file, table.len());
    Ok(table)
}

/// Parse CloneCD control file text
///
/// `[TRACK n]` sections carry `MODE=` and `INDEX 0=`/`INDEX 1=` keys holding
/// absolute sector numbers. `MODE=0` marks an audio track.
pub fn parse_ccd(file: &str, text: &str) -> Result<TrackTable> {
    let mut table = TrackTable::default();
    let mut current: Option<SheetTrack> = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            if let Some(done) = current.take() {
                table.insert(file, line_no, done)?;
            }
            let words: Vec<&str> = section.split_whitespace().collect();
            if let [name, number] = words.as_slice() {
                if name.eq_ignore_ascii_case("TRACK") {
                    let number: u32 = number.parse().map_err(|_| {
                        Error::parse(
                            file,
                            format!("line {}: invalid track section [{}]", line_no, section),
                        )
                    })?;
                    current = Some(SheetTrack::new(number, false));
                }
            }
            continue;
        }

        let (Some(track), Some((key, value))) = (current.as_mut(), line.split_once('=')) else {
            continue;
        };
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        let value = value.trim();

        match key.as_str() {
            "MODE" => {
                let mode: u32 = value.parse().map_err(|_| {
                    Error::parse(file, format!("line {}: invalid MODE '{}'", line_no, value))
                })?;
                track.is_audio = mode == 0;
            }
            "INDEX 0" | "INDEX 1" => {
                let index = if key == "INDEX 0" { 0 } else { 1 };
                let sector: u64 = value.parse().map_err(|_| {
                    Error::parse(file, format!("line {}: invalid {} '{}'", line_no, key, value))
                })?;
                track.indices.insert(index, sector);
            }
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        table.insert(file, text.lines().count(), done)?;
    }

    table.validate(file)?;
    tracing::debug!("Parsed CCD file {}: {} tracks", file, table.len());
    Ok(table)
}
