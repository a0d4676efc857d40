//! Declarative binary field tables
//!
//! On-disk structures are described as tables of [`Field`]s (offset, width,
//! byte order) and read through a single bounds-checked accessor, so every
//! parser reads as a list of constants instead of index arithmetic.

/// Byte order of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// One fixed-position integer or byte-string field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Name used in error messages
    pub name: &'static str,
    /// Byte offset from the start of the structure
    pub offset: usize,
    /// Width in bytes (1, 2, 4 or 8 for integers; any width for byte strings)
    pub width: usize,
    /// Byte order for integer reads
    pub endian: Endian,
}

impl Field {
    /// A little-endian field
    pub const fn le(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
            endian: Endian::Little,
        }
    }

    /// A big-endian field
    pub const fn be(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
            endian: Endian::Big,
        }
    }

    /// A byte-string field (byte order is irrelevant)
    pub const fn bytes(name: &'static str, offset: usize, width: usize) -> Self {
        Self::le(name, offset, width)
    }

    /// Byte just past the end of this field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// The raw bytes of this field, or `None` if `data` is too short
    pub fn slice<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        data.get(self.offset..self.end())
    }

    /// Read this field as an unsigned integer
    ///
    /// Returns `None` if `data` is too short or the width exceeds 8 bytes.
    pub fn read(&self, data: &[u8]) -> Option<u64> {
        if self.width == 0 || self.width > 8 {
            return None;
        }
        let raw = self.slice(data)?;
        let value = match self.endian {
            Endian::Little => raw.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64),
            Endian::Big => raw.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
        };
        Some(value)
    }

    /// Read a field of width 1
    pub fn read_u8(&self, data: &[u8]) -> Option<u8> {
        debug_assert_eq!(self.width, 1);
        self.read(data).map(|v| v as u8)
    }

    /// Read a field of width 2
    pub fn read_u16(&self, data: &[u8]) -> Option<u16> {
        debug_assert_eq!(self.width, 2);
        self.read(data).map(|v| v as u16)
    }

    /// Read a field of width 4
    pub fn read_u32(&self, data: &[u8]) -> Option<u32> {
        debug_assert_eq!(self.width, 4);
        self.read(data).map(|v| v as u32)
    }
}
