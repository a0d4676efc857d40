//! ISO-9660 file system types and structures

use bytes::Bytes;
use discvault_core::{Error, Field, Result, SECTOR_SIZE};
use encoding_rs::{SHIFT_JIS, UTF_16BE};
use std::fmt;

/// Volume descriptors start at sector 16
pub const VOLUME_DESCRIPTOR_START: u32 = 16;

/// Standard identifier carried by every volume descriptor
pub const STANDARD_IDENTIFIER: &[u8; 5] = b"CD001";

/// Joliet UCS-2 level 1, 2 and 3 escape sequences
pub const JOLIET_ESCAPES: [&[u8; 3]; 3] = [b"%/@", b"%/C", b"%/E"];

/// Volume descriptor fields
pub mod descriptor {
    use super::Field;

    pub const TYPE: Field = Field::le("descriptor type", 0, 1);
    pub const IDENTIFIER: Field = Field::bytes("standard identifier", 1, 5);
    pub const VOLUME_ID: Field = Field::bytes("volume identifier", 40, 32);
    pub const ESCAPE_SEQUENCE: Field = Field::bytes("escape sequence", 88, 3);
    /// Root directory record, 34 bytes
    pub const ROOT_RECORD: Field = Field::bytes("root directory record", 156, 34);
}

/// Directory record fields, relative to the record start
pub mod record {
    use super::Field;

    pub const LENGTH: Field = Field::le("record length", 0, 1);
    pub const SECTOR: Field = Field::le("extent location", 2, 4);
    pub const SIZE: Field = Field::le("data length", 10, 4);
    pub const FLAGS: Field = Field::le("file flags", 25, 1);
    pub const NAME_LENGTH: Field = Field::le("file identifier length", 32, 1);
    /// File identifier starts right after the fixed part
    pub const NAME_OFFSET: usize = 33;
}

/// Volume descriptor types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VolumeDescriptorType {
    BootRecord = 0,
    PrimaryVolumeDescriptor = 1,
    SupplementaryVolumeDescriptor = 2,
    VolumePartitionDescriptor = 3,
    VolumeDescriptorSetTerminator = 255,
}

impl VolumeDescriptorType {
    /// Try to convert from a u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::BootRecord),
            1 => Some(Self::PrimaryVolumeDescriptor),
            2 => Some(Self::SupplementaryVolumeDescriptor),
            3 => Some(Self::VolumePartitionDescriptor),
            255 => Some(Self::VolumeDescriptorSetTerminator),
            _ => None,
        }
    }
}

/// Text encoding of identifiers under one volume descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Primary descriptors (ASCII is a subset)
    ShiftJis,
    /// Joliet supplementary descriptors
    Utf16Be,
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        let encoding = match self {
            TextEncoding::ShiftJis => SHIFT_JIS,
            TextEncoding::Utf16Be => UTF_16BE,
        };
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            tracing::trace!("Replacement characters while decoding {:02X?}", bytes);
        }
        text.into_owned()
    }
}

/// One 2048-byte volume descriptor
#[derive(Debug, Clone)]
pub struct VolumeDescriptor {
    /// `None` for reserved type codes
    pub kind: Option<VolumeDescriptorType>,
    /// Sector the descriptor was read from
    pub sector: u32,
    data: Bytes,
}

impl VolumeDescriptor {
    /// Wrap a descriptor sector, checking its standard identifier
    pub fn parse(sector: u32, data: Bytes) -> Result<Self> {
        if data.len() < SECTOR_SIZE {
            return Err(Error::invalid_territory(format!(
                "volume descriptor at sector {} is {} bytes",
                sector,
                data.len()
            )));
        }

        let identifier = descriptor::IDENTIFIER.slice(&data).unwrap_or_default();
        if identifier != STANDARD_IDENTIFIER {
            return Err(Error::invalid_territory(format!(
                "Invalid ISO-9660 identifier at sector {}: {:?}",
                sector, identifier
            )));
        }

        let kind = descriptor::TYPE
            .read_u8(&data)
            .and_then(VolumeDescriptorType::from_u8);
        Ok(Self { kind, sector, data })
    }

    /// Supplementary descriptor carrying a Joliet escape sequence
    pub fn is_joliet(&self) -> bool {
        self.kind == Some(VolumeDescriptorType::SupplementaryVolumeDescriptor)
            && descriptor::ESCAPE_SEQUENCE
                .slice(&self.data)
                .is_some_and(|esc| JOLIET_ESCAPES.iter().any(|j| &j[..] == esc))
    }

    /// Encoding for identifiers under this descriptor
    pub fn encoding(&self) -> TextEncoding {
        if self.is_joliet() {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::ShiftJis
        }
    }

    /// Volume identifier, decoded, with trailing padding removed
    pub fn volume_label(&self) -> String {
        let raw = descriptor::VOLUME_ID.slice(&self.data).unwrap_or_default();
        self.encoding()
            .decode(raw)
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    /// Directory record of the root directory
    pub fn root_record(&self) -> Result<DirEnt> {
        let raw = descriptor::ROOT_RECORD
            .slice(&self.data)
            .ok_or_else(|| Error::invalid_territory("descriptor too short for root record"))?;
        DirEnt::parse(raw, self.encoding())
    }
}

/// Directory record (variable length)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEnt {
    /// Length of the on-disk record in bytes
    pub length: u8,
    /// First logical sector of the entry's data
    pub sector: u32,
    /// Data length in bytes
    pub size: u32,
    /// Bit flags (hidden, directory, ...)
    pub flags: u8,
    /// Decoded name with any `;version` suffix removed
    pub name: String,
}

impl DirEnt {
    /// File flag: Hidden
    pub const FLAG_HIDDEN: u8 = 0x01;
    /// File flag: Directory
    pub const FLAG_DIRECTORY: u8 = 0x02;

    /// Parse one record; `bytes` must start at the record and hold all of it
    pub fn parse(bytes: &[u8], encoding: TextEncoding) -> Result<Self> {
        let malformed =
            |what: &str| Error::invalid_territory(format!("malformed directory record: {}", what));

        let length = record::LENGTH
            .read_u8(bytes)
            .ok_or_else(|| malformed("empty"))?;
        if (length as usize) < record::NAME_OFFSET || bytes.len() < length as usize {
            return Err(malformed("record shorter than its fixed fields"));
        }
        let bytes = &bytes[..length as usize];

        let name_len = record::NAME_LENGTH.read_u8(bytes).unwrap_or(0) as usize;
        let raw_name = bytes
            .get(record::NAME_OFFSET..record::NAME_OFFSET + name_len)
            .ok_or_else(|| malformed("identifier runs past the record"))?;

        Ok(Self {
            length,
            sector: record::SECTOR.read_u32(bytes).unwrap_or(0),
            size: record::SIZE.read_u32(bytes).unwrap_or(0),
            flags: record::FLAGS.read_u8(bytes).unwrap_or(0),
            name: decode_name(raw_name, encoding),
        })
    }

    /// Check if this is a directory
    pub fn is_directory(&self) -> bool {
        (self.flags & Self::FLAG_DIRECTORY) != 0
    }

    /// Check if this is hidden
    pub fn is_hidden(&self) -> bool {
        (self.flags & Self::FLAG_HIDDEN) != 0
    }

    /// `.` or `..`
    pub fn is_self_or_parent(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

fn decode_name(raw: &[u8], encoding: TextEncoding) -> String {
    // 0x00 = current dir, 0x01 = parent dir
    match raw {
        [] | [0x00] => return String::from("."),
        [0x01] => return String::from(".."),
        _ => {}
    }

    let name = encoding.decode(raw);
    match name.find(';') {
        Some(pos) => name[..pos].to_string(),
        None => name,
    }
}

impl fmt::Display for DirEnt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} ({} bytes at sector {})",
            self.name,
            if self.is_directory() { "/" } else { "" },
            self.size,
            self.sector
        )
    }
}
