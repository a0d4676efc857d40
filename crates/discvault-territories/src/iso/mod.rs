//! ISO-9660 (CD-ROM) file system implementation
//!
//! Read-only, layered on any [`SectorSource`]. Joliet names are used when a
//! Joliet supplementary descriptor is present, otherwise the primary
//! descriptor's names are decoded as Shift_JIS.

pub mod types;

use bytes::{Bytes, BytesMut};
use discvault_core::{
    validate_allocation_size, Error, Result, SectorSource, SectorStream, MAX_DIRECTORY_ENTRIES,
    MAX_FILE_EXTRACT_SIZE, MAX_VOLUME_DESCRIPTORS, SECTOR_SIZE,
};
use futures::TryStreamExt;
use std::sync::Arc;
use types::{TextEncoding, VolumeDescriptor, VolumeDescriptorType, VOLUME_DESCRIPTOR_START};

pub use types::DirEnt;

/// Directory reader position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirState {
    /// Parsing records from the current sector
    ReadingSector,
    /// Current sector consumed, move to the next one
    AdvancingSector,
    /// Declared directory length consumed
    Done,
}

/// An entry found by [`IsoTerritory::walk`] with its path from the walk root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub entry: DirEnt,
}

/// ISO-9660 file system territory
///
/// Bound to the volume descriptor chosen at [`create`](IsoTerritory::create)
/// time and its text encoding.
pub struct IsoTerritory {
    source: Arc<dyn SectorSource>,
    descriptor: VolumeDescriptor,
    encoding: TextEncoding,
}

impl IsoTerritory {
    /// Scan the volume descriptor set and bind to the best descriptor
    ///
    /// A Joliet supplementary descriptor wins over the primary descriptor.
    /// Non-Joliet supplementary descriptors are ignored.
    ///
    /// # Errors
    ///
    /// Returns `NoPrimaryVolumeDescriptor` if the set ends (or the scan
    /// limit is reached) with nothing selected, and `InvalidTerritory` if a
    /// descriptor lacks the `CD001` identifier.
    pub async fn create(source: Arc<dyn SectorSource>) -> Result<Self> {
        let mut primary: Option<VolumeDescriptor> = None;
        let mut joliet: Option<VolumeDescriptor> = None;
        let mut terminated = false;

        for sector in VOLUME_DESCRIPTOR_START..VOLUME_DESCRIPTOR_START + MAX_VOLUME_DESCRIPTORS {
            let descriptor = VolumeDescriptor::parse(sector, source.read_sector(sector).await?)?;

            match descriptor.kind {
                Some(VolumeDescriptorType::PrimaryVolumeDescriptor) => {
                    if primary.is_none() {
                        primary = Some(descriptor);
                    }
                }
                Some(VolumeDescriptorType::SupplementaryVolumeDescriptor) => {
                    if !descriptor.is_joliet() {
                        tracing::warn!(
                            "Ignoring non-Joliet supplementary descriptor at sector {}",
                            sector
                        );
                    } else if joliet.is_none() {
                        joliet = Some(descriptor);
                    }
                }
                Some(VolumeDescriptorType::VolumeDescriptorSetTerminator) => {
                    terminated = true;
                    break;
                }
                other => {
                    tracing::trace!("Skipping volume descriptor {:?} at sector {}", other, sector);
                }
            }
        }

        if !terminated {
            tracing::warn!(
                "No descriptor set terminator within {} sectors",
                MAX_VOLUME_DESCRIPTORS
            );
            return Err(Error::NoPrimaryVolumeDescriptor);
        }

        let descriptor = joliet.or(primary).ok_or(Error::NoPrimaryVolumeDescriptor)?;
        let encoding = descriptor.encoding();
        tracing::debug!(
            "Using {:?} descriptor at sector {} ({:?})",
            descriptor.kind,
            descriptor.sector,
            encoding
        );

        Ok(Self {
            source,
            descriptor,
            encoding,
        })
    }

    /// Encoding used for names on this volume
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn volume_label(&self) -> String {
        self.descriptor.volume_label()
    }

    pub fn root_dir(&self) -> Result<DirEnt> {
        self.descriptor.root_record()
    }

    /// Read every record of a directory in on-disk order, `.` and `..` included
    ///
    /// A zero length byte pads the rest of a sector. A record running past
    /// the end of its sector is a `CrossBoundary` error.
    pub async fn read_dir(&self, dir: &DirEnt) -> Result<Vec<DirEnt>> {
        let mut sector = dir.sector;
        let mut position = 0usize;
        let mut remaining = dir.size as u64;
        let mut current = Bytes::new();
        let mut entries = Vec::new();

        let mut state = if remaining == 0 {
            DirState::Done
        } else {
            DirState::ReadingSector
        };

        loop {
            state = match state {
                DirState::ReadingSector => {
                    if position == 0 {
                        current = self.source.read_sector(sector).await?;
                    }

                    match current.get(position).copied().unwrap_or(0) as usize {
                        0 => position = SECTOR_SIZE,
                        length => {
                            let end = position + length;
                            if end > SECTOR_SIZE {
                                return Err(Error::CrossBoundary {
                                    sector,
                                    position: end,
                                });
                            }
                            entries.push(DirEnt::parse(&current[position..end], self.encoding)?);
                            if entries.len() > MAX_DIRECTORY_ENTRIES {
                                return Err(Error::invalid_territory(format!(
                                    "directory at sector {} exceeds {} entries",
                                    dir.sector, MAX_DIRECTORY_ENTRIES
                                )));
                            }
                            position = end;
                        }
                    }

                    if position == SECTOR_SIZE {
                        DirState::AdvancingSector
                    } else if (position as u64) < remaining {
                        DirState::ReadingSector
                    } else {
                        DirState::Done
                    }
                }
                DirState::AdvancingSector => {
                    sector = sector.checked_add(1).ok_or_else(|| {
                        Error::invalid_territory("directory runs past sector space")
                    })?;
                    position = 0;
                    remaining = remaining.saturating_sub(SECTOR_SIZE as u64);
                    if remaining == 0 {
                        DirState::Done
                    } else {
                        DirState::ReadingSector
                    }
                }
                DirState::Done => break,
            };
        }

        tracing::trace!("Read {} records from directory at sector {}", entries.len(), dir.sector);
        Ok(entries)
    }

    /// Case-insensitive lookup of `name` in `parent`
    pub async fn get_dir_ent(&self, name: &str, parent: &DirEnt) -> Result<Option<DirEnt>> {
        let wanted = name.to_lowercase();
        Ok(self
            .read_dir(parent)
            .await?
            .into_iter()
            .find(|entry| entry.name.to_lowercase() == wanted))
    }

    /// Stream a file's contents; one-shot, call again to re-read
    pub fn read_file(&self, entry: &DirEnt) -> SectorStream {
        self.source
            .read_sequential_sectors(entry.sector, entry.size as u64)
    }

    /// Resolve a `/` or `\` separated path from the root
    pub async fn lookup(&self, path: &str) -> Result<DirEnt> {
        let mut current = self.root_dir()?;
        for component in path.split(['/', '\\']).filter(|c| !c.is_empty()) {
            if !current.is_directory() {
                return Err(Error::invalid_territory(format!(
                    "{} is not a directory (resolving {})",
                    current.name, path
                )));
            }
            current = self
                .get_dir_ent(component, &current)
                .await?
                .ok_or_else(|| Error::not_found(format!("{} (resolving {})", component, path)))?;
        }
        Ok(current)
    }

    /// Every entry below `dir`, depth first, without `.` and `..`
    pub async fn walk(&self, dir: &DirEnt) -> Result<Vec<WalkEntry>> {
        let mut found = Vec::new();
        let mut pending = vec![(String::new(), dir.clone())];

        while let Some((prefix, directory)) = pending.pop() {
            let mut subdirs = Vec::new();
            for entry in self.read_dir(&directory).await? {
                if entry.is_self_or_parent() {
                    continue;
                }
                if found.len() >= MAX_DIRECTORY_ENTRIES {
                    return Err(Error::invalid_territory(format!(
                        "walk exceeds {} entries",
                        MAX_DIRECTORY_ENTRIES
                    )));
                }

                let path = format!("{}/{}", prefix, entry.name);
                if entry.is_directory() {
                    subdirs.push((path.clone(), entry.clone()));
                }
                found.push(WalkEntry { path, entry });
            }
            // Reverse so the first subdirectory is walked first
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(found)
    }

    /// Read a whole file into memory
    pub async fn extract_file(&self, entry: &DirEnt) -> Result<Bytes> {
        if entry.is_directory() {
            return Err(Error::invalid_territory(format!(
                "Cannot read directory {} as file",
                entry.name
            )));
        }
        let capacity =
            validate_allocation_size(entry.size as u64, MAX_FILE_EXTRACT_SIZE, &entry.name)?;

        let data = self
            .read_file(entry)
            .try_fold(BytesMut::with_capacity(capacity), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(data.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discvault_core::ImageFile;
    use discvault_pipeline::MemoryFile;
    use discvault_vaults::{BinCueVault, RawVault};

    const ROOT_SECTOR: u32 = 20;

    fn utf16be(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    fn record(name: &[u8], sector: u32, size: u32, flags: u8) -> Vec<u8> {
        let mut len = 33 + name.len();
        len += len % 2;
        let mut bytes = vec![0u8; len];
        bytes[0] = len as u8;
        bytes[2..6].copy_from_slice(&sector.to_le_bytes());
        bytes[6..10].copy_from_slice(&sector.to_be_bytes());
        bytes[10..14].copy_from_slice(&size.to_le_bytes());
        bytes[14..18].copy_from_slice(&size.to_be_bytes());
        bytes[25] = flags;
        bytes[32] = name.len() as u8;
        bytes[33..33 + name.len()].copy_from_slice(name);
        bytes
    }

    /// Stretch a record to `len` bytes (system use area)
    fn padded(mut rec: Vec<u8>, len: usize) -> Vec<u8> {
        rec.resize(len, 0);
        rec[0] = len as u8;
        rec
    }

    /// Synthetic ISO image assembled sector by sector
    struct IsoBuilder {
        data: Vec<u8>,
    }

    impl IsoBuilder {
        fn new(sectors: usize) -> Self {
            Self {
                data: vec![0u8; sectors * SECTOR_SIZE],
            }
        }

        fn sector_mut(&mut self, sector: u32) -> &mut [u8] {
            let start = sector as usize * SECTOR_SIZE;
            &mut self.data[start..start + SECTOR_SIZE]
        }

        fn descriptor(
            &mut self,
            sector: u32,
            kind: u8,
            label: &[u8],
            escape: &[u8],
            root: Vec<u8>,
        ) {
            let vd = self.sector_mut(sector);
            vd[0] = kind;
            vd[1..6].copy_from_slice(b"CD001");
            vd[6] = 1;
            vd[40..40 + label.len()].copy_from_slice(label);
            vd[88..88 + escape.len()].copy_from_slice(escape);
            vd[156..156 + root.len()].copy_from_slice(&root);
        }

        fn terminator(&mut self, sector: u32) {
            self.descriptor(sector, 255, b"", b"", Vec::new());
        }

        fn records(&mut self, sector: u32, offset: usize, records: &[Vec<u8>]) {
            let mut pos = offset;
            for rec in records {
                self.sector_mut(sector)[pos..pos + rec.len()].copy_from_slice(rec);
                pos += rec.len();
            }
        }

        fn raw(self) -> Arc<dyn ImageFile> {
            Arc::new(MemoryFile::new("disc.iso", self.data))
        }

        fn source(self) -> Arc<dyn SectorSource> {
            Arc::new(RawVault::new(self.raw()))
        }
    }

    /// Primary (Shift_JIS names) and Joliet (UTF-16BE names) views of one tree:
    /// `/SYSTEM3.EXE`, `/DATA/README.TXT` (`/Data` under Joliet)
    fn dual_view_iso(with_joliet: bool) -> IsoBuilder {
        let mut iso = IsoBuilder::new(40);
        let mut label = [b' '; 32];
        label[..7].copy_from_slice(b"PRIMARY");
        iso.descriptor(16, 1, &label, b"", record(&[0], ROOT_SECTOR, 2048, 2));

        if with_joliet {
            let mut label = utf16be("ゲーム               ");
            label.truncate(32);
            iso.descriptor(17, 2, &label, b"%/E", record(&[0], 21, 2048, 2));
            iso.terminator(18);
        } else {
            iso.terminator(17);
        }

        iso.records(ROOT_SECTOR, 0, &[
            record(&[0], ROOT_SECTOR, 2048, 2),
            record(&[1], ROOT_SECTOR, 2048, 2),
            record(b"SYSTEM3.EXE;1", 30, 5, 0),
            record(b"DATA", 22, 2048, 2),
        ]);
        iso.records(21, 0, &[
            record(&[0], 21, 2048, 2),
            record(&[1], 21, 2048, 2),
            record(&utf16be("SYSTEM3.EXE;1"), 30, 5, 0),
            record(&utf16be("Data"), 23, 2048, 2),
        ]);
        iso.records(22, 0, &[
            record(&[0], 22, 2048, 2),
            record(&[1], ROOT_SECTOR, 2048, 2),
            record(b"README.TXT;1", 31, 3000, 0),
        ]);
        iso.records(23, 0, &[
            record(&[0], 23, 2048, 2),
            record(&[1], 21, 2048, 2),
            record(&utf16be("README.TXT;1"), 31, 3000, 0),
        ]);

        iso.sector_mut(30)[..5].copy_from_slice(b"hello");
        iso.sector_mut(31).fill(b'a');
        iso.sector_mut(32)[..3000 - 2048].fill(b'b');
        iso
    }

    #[tokio::test]
    async fn test_joliet_preferred_over_primary() {
        let territory = IsoTerritory::create(dual_view_iso(true).source()).await.unwrap();

        assert_eq!(territory.encoding(), TextEncoding::Utf16Be);
        assert_eq!(territory.volume_label(), "ゲーム");

        let names: Vec<String> = territory
            .read_dir(&territory.root_dir().unwrap())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, [".", "..", "SYSTEM3.EXE", "Data"]);
    }

    #[tokio::test]
    async fn test_primary_only() {
        let territory = IsoTerritory::create(dual_view_iso(false).source()).await.unwrap();
        assert_eq!(territory.encoding(), TextEncoding::ShiftJis);
        assert_eq!(territory.volume_label(), "PRIMARY");
    }

    #[tokio::test]
    async fn test_non_joliet_supplementary_is_ignored() {
        let mut iso = dual_view_iso(false);
        iso.descriptor(17, 2, b"OTHER", b"XYZ", record(&[0], 21, 2048, 2));
        iso.terminator(18);

        let territory = IsoTerritory::create(iso.source()).await.unwrap();
        assert_eq!(territory.volume_label(), "PRIMARY");
    }

    #[tokio::test]
    async fn test_no_primary_descriptor() {
        let mut iso = IsoBuilder::new(20);
        iso.terminator(16);
        let err = IsoTerritory::create(iso.source()).await.err().unwrap();
        assert!(matches!(err, Error::NoPrimaryVolumeDescriptor));
    }

    #[tokio::test]
    async fn test_missing_terminator_is_bounded() {
        let mut iso = IsoBuilder::new(16 + MAX_VOLUME_DESCRIPTORS as usize + 1);
        for sector in 16..16 + MAX_VOLUME_DESCRIPTORS {
            iso.descriptor(sector, 0, b"", b"", Vec::new());
        }
        let err = IsoTerritory::create(iso.source()).await.err().unwrap();
        assert!(matches!(err, Error::NoPrimaryVolumeDescriptor));
    }

    #[tokio::test]
    async fn test_invalid_identifier() {
        let mut iso = IsoBuilder::new(20);
        iso.sector_mut(16)[1..6].copy_from_slice(b"XXXXX");
        let err = IsoTerritory::create(iso.source()).await.err().unwrap();
        assert!(matches!(err, Error::InvalidTerritory(_)));
    }

    #[tokio::test]
    async fn test_get_dir_ent_is_case_insensitive() {
        for joliet in [false, true] {
            let territory = IsoTerritory::create(dual_view_iso(joliet).source()).await.unwrap();
            let root = territory.root_dir().unwrap();

            let upper = territory.get_dir_ent("SYSTEM3.EXE", &root).await.unwrap().unwrap();
            let lower = territory.get_dir_ent("system3.exe", &root).await.unwrap().unwrap();
            assert_eq!(upper, lower);
            assert_eq!(upper.sector, 30);

            assert!(territory.get_dir_ent("MISSING", &root).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_padding_skip_advances_to_next_sector() {
        let mut iso = IsoBuilder::new(40);
        iso.descriptor(16, 1, b"PAD", b"", record(&[0], ROOT_SECTOR, 4096, 2));
        iso.terminator(17);

        // 68 + 6 * 255 + 202 = 1800, then a zero length byte
        let mut first = vec![
            record(&[0], ROOT_SECTOR, 4096, 2),
            record(&[1], ROOT_SECTOR, 4096, 2),
        ];
        for i in 0..6 {
            first.push(padded(record(format!("F{}.DAT;1", i).as_bytes(), 30, 1, 0), 255));
        }
        first.push(padded(record(b"F6.DAT;1", 30, 1, 0), 202));
        iso.records(ROOT_SECTOR, 0, &first);
        iso.records(ROOT_SECTOR + 1, 0, &[record(b"LAST.TXT;1", 31, 1, 0)]);

        let territory = IsoTerritory::create(iso.source()).await.unwrap();
        let entries = territory.read_dir(&territory.root_dir().unwrap()).await.unwrap();

        assert_eq!(entries.len(), 10);
        assert_eq!(entries[8].name, "F6.DAT");
        assert_eq!(entries[9].name, "LAST.TXT");
    }

    #[tokio::test]
    async fn test_record_crossing_sector_boundary() {
        let mut iso = IsoBuilder::new(40);
        iso.descriptor(16, 1, b"BAD", b"", record(&[0], ROOT_SECTOR, 4096, 2));
        iso.terminator(17);

        // 8 * 254 = 2032, so a 34-byte record would end at 2066
        let recs: Vec<Vec<u8>> = (0..8)
            .map(|i| padded(record(format!("F{}.DAT", i).as_bytes(), 30, 1, 0), 254))
            .collect();
        iso.records(ROOT_SECTOR, 0, &recs);
        iso.sector_mut(ROOT_SECTOR)[2032] = 34;

        let territory = IsoTerritory::create(iso.source()).await.unwrap();
        let err = territory
            .read_dir(&territory.root_dir().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CrossBoundary {
                sector: ROOT_SECTOR,
                position: 2066
            }
        ));
    }

    #[tokio::test]
    async fn test_lookup_and_extract() {
        let territory = IsoTerritory::create(dual_view_iso(false).source()).await.unwrap();

        let readme = territory.lookup("/data/readme.txt").await.unwrap();
        assert_eq!(readme.size, 3000);
        let same = territory.lookup("DATA\\README.TXT").await.unwrap();
        assert_eq!(readme, same);

        let data = territory.extract_file(&readme).await.unwrap();
        assert_eq!(data.len(), 3000);
        assert!(data[..2048].iter().all(|&b| b == b'a'));
        assert!(data[2048..].iter().all(|&b| b == b'b'));

        let exe = territory.lookup("SYSTEM3.EXE").await.unwrap();
        assert_eq!(&territory.extract_file(&exe).await.unwrap()[..], b"hello");

        assert!(matches!(
            territory.lookup("/DATA/NOPE").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            territory.lookup("/SYSTEM3.EXE/X").await.unwrap_err(),
            Error::InvalidTerritory(_)
        ));
        assert!(territory.extract_file(&territory.root_dir().unwrap()).await.is_err());

        let root = territory.lookup("/").await.unwrap();
        assert!(root.is_directory());
    }

    #[tokio::test]
    async fn test_read_file_streams_chunks() {
        let territory = IsoTerritory::create(dual_view_iso(false).source()).await.unwrap();
        let readme = territory.lookup("DATA/README.TXT").await.unwrap();

        let chunks: Vec<Bytes> = territory.read_file(&readme).try_collect().await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2048);
        assert_eq!(chunks[1].len(), 3000 - 2048);
    }

    #[tokio::test]
    async fn test_walk() {
        let territory = IsoTerritory::create(dual_view_iso(true).source()).await.unwrap();
        let paths: Vec<String> = territory
            .walk(&territory.root_dir().unwrap())
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.path)
            .collect();

        assert_eq!(paths, ["/SYSTEM3.EXE", "/Data", "/Data/README.TXT"]);
    }

    #[tokio::test]
    async fn test_filesystem_over_bin_cue() {
        // Re-pack the ISO as Mode 1 raw sectors
        let iso = dual_view_iso(true);
        let mut bin = Vec::with_capacity(iso.data.len() / SECTOR_SIZE * 2352);
        for sector in iso.data.chunks(SECTOR_SIZE) {
            let mut raw = [0u8; 2352];
            raw[15] = 1;
            raw[16..16 + SECTOR_SIZE].copy_from_slice(sector);
            bin.extend_from_slice(&raw);
        }
        let image: Arc<dyn ImageFile> = Arc::new(MemoryFile::new("disc.bin", bin));
        let cue = "FILE \"disc.bin\" BINARY\n  TRACK 01 MODE1/2352\n    INDEX 01 00:00:00\n";
        let vault = BinCueVault::from_cue(image, "disc.cue", cue).unwrap();
        let source: Arc<dyn SectorSource> = Arc::new(vault);

        let territory = IsoTerritory::create(source).await.unwrap();
        assert_eq!(territory.volume_label(), "ゲーム");
        let exe = territory.lookup("system3.exe").await.unwrap();
        assert_eq!(&territory.extract_file(&exe).await.unwrap()[..], b"hello");
    }
}
