//! Memory-mapped image file for direct action (high-performance I/O)

use async_trait::async_trait;
use bytes::Bytes;
use discvault_core::{check_range, ImageFile, Result, MAX_MMAP_SIZE};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

use crate::file_name_of;

/// An image file backed by a read-only memory map of a host file.
///
/// Reads are served straight from the mapping without a system call per
/// request, which suits the many small sector reads of a directory walk.
///
/// # Example
///
/// ```rust,no_run
/// use discvault_pipeline::MappedFile;
/// use std::path::Path;
///
/// let image = MappedFile::open(Path::new("game.iso")).unwrap();
/// ```
pub struct MappedFile {
    name: String,
    mmap: Mmap,
}

impl MappedFile {
    /// Open and map a host file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or mapped
    ///
    /// # Security
    ///
    /// Validates file before mapping:
    /// - Ensures file is a regular file (not device, pipe, etc.)
    /// - Checks file size is within reasonable limits
    /// - Uses read-only mapping to prevent accidental writes
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file_name_of(path), &file)
    }

    /// Map an already opened file under the given name
    ///
    /// # Safety
    ///
    /// Uses `unsafe` for memory mapping; the file must not be truncated while
    /// mapped (caller responsibility, same as any mmap-based reader).
    pub fn from_file(name: impl Into<String>, file: &File) -> io::Result<Self> {
        let metadata = file.metadata()?;

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Only regular files can be memory-mapped",
            ));
        }

        if metadata.len() > MAX_MMAP_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "File size {} exceeds memory mapping limit {} (16 GB)",
                    metadata.len(),
                    MAX_MMAP_SIZE
                ),
            ));
        }

        // SAFETY: regular file, bounded size, valid descriptor, read-only private mapping
        let mmap = unsafe { Mmap::map(file)? };
        tracing::trace!("Mapped {} bytes", mmap.len());

        Ok(Self {
            name: name.into(),
            mmap,
        })
    }
}

#[async_trait]
impl ImageFile for MappedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        check_range(offset, len, self.len())?;
        let start = offset as usize;
        Ok(Bytes::copy_from_slice(&self.mmap[start..start + len]))
    }
}
