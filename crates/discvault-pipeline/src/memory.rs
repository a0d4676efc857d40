//! In-memory image file - an opaque blob handed over by the host

use async_trait::async_trait;
use bytes::Bytes;
use discvault_core::{check_range, ImageFile, Result};

/// A named, immutable in-memory blob
///
/// Reads are zero-copy slices of the shared buffer.
///
/// # Example
///
/// ```rust
/// use discvault_pipeline::MemoryFile;
/// use discvault_core::ImageFile;
///
/// let image = MemoryFile::new("game.iso", vec![0u8; 4096]);
/// assert_eq!(image.len(), 4096);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Bytes,
}

impl MemoryFile {
    /// Wrap a buffer under the given file name
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl ImageFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        check_range(offset, len, self.len())?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + len))
    }
}
