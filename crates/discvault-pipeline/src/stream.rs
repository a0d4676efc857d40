//! Streamed image file - seek and read per request through tokio

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use discvault_core::{check_range, ImageFile, Result};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use crate::file_name_of;

/// An image file read from the host file system on demand
///
/// Used when memory mapping is disabled. The file cursor is shared, so reads
/// are serialized behind a mutex.
pub struct StreamFile {
    name: String,
    length: u64,
    file: Mutex<File>,
}

impl StreamFile {
    /// Open a host file for streamed reads
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await?;
        let length = file.metadata().await?.len();
        Ok(Self {
            name: file_name_of(path),
            length,
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl ImageFile for StreamFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.length
    }

    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        check_range(offset, len, self.length)?;

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = BytesMut::zeroed(len);
        file.read_exact(&mut buf).await?;
        Ok(buf.freeze())
    }
}
