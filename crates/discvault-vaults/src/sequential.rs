//! Strided sequential reads shared by every vault
//!
//! A run of sectors is described by where the first sector starts, the
//! distance between sectors, and which slice of each sector is payload. Reads
//! are issued in batches and the batch buffer is sliced into per-sector chunks
//! without copying.

use bytes::Bytes;
use discvault_core::{
    checked_add_u64, checked_multiply_u64, u64_to_usize, Error, ImageFile, Result, SectorStream,
};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;

/// Sectors fetched per I/O request
const BATCH_SECTORS: u64 = 64;

/// Geometry of a run of equally spaced sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stride {
    /// Byte offset of sector 0 of the run
    pub base: u64,
    /// Distance in bytes between consecutive sectors
    pub stride: u64,
    /// Offset of the payload inside each sector
    pub chunk_offset: u64,
    /// Payload bytes taken from each sector
    pub chunk_len: usize,
}

impl Stride {
    /// Contiguous payload with no per-sector header (plain 2048-byte images)
    pub fn contiguous(base: u64, chunk_len: usize) -> Self {
        Self {
            base,
            stride: chunk_len as u64,
            chunk_offset: 0,
            chunk_len,
        }
    }

    /// Byte offset of the payload of sector `index` within the run
    pub fn payload_offset(&self, index: u64) -> Result<u64> {
        let sector_start = checked_multiply_u64(index, self.stride, "sector offset")?;
        let sector_start = checked_add_u64(self.base, sector_start, "sector offset")?;
        checked_add_u64(sector_start, self.chunk_offset, "sector offset")
    }

    /// Reject geometries whose payload is longer than the sector stride
    pub fn validate(&self, file: &str) -> Result<()> {
        if (self.chunk_len as u64) > self.stride {
            return Err(Error::parse(
                file,
                format!(
                    "sector stride {} shorter than {}-byte payload",
                    self.stride, self.chunk_len
                ),
            ));
        }
        Ok(())
    }
}

struct Cursor {
    image: Arc<dyn ImageFile>,
    layout: Stride,
    next_sector: u64,
    remaining: u64,
    pending: VecDeque<Bytes>,
}

impl Cursor {
    async fn fill(&mut self) -> Result<()> {
        let chunk_len = self.layout.chunk_len as u64;
        let sectors_left = self.remaining.div_ceil(chunk_len);
        let count = sectors_left.min(BATCH_SECTORS);

        let last_len = if count == sectors_left {
            self.remaining - (count - 1) * chunk_len
        } else {
            chunk_len
        };

        let start = self.layout.payload_offset(self.next_sector)?;
        let span = checked_multiply_u64(count - 1, self.layout.stride, "batch span")?;
        let span = checked_add_u64(span, last_len, "batch span")?;
        let span = u64_to_usize(span, "batch span")?;

        tracing::trace!(
            "Reading {} sectors ({} bytes) at offset {}",
            count,
            span,
            start
        );
        let batch = self.image.read_at(start, span).await?;

        for i in 0..count {
            let offset = (i * self.layout.stride) as usize;
            let len = (if i + 1 == count { last_len } else { chunk_len }) as usize;
            self.pending.push_back(batch.slice(offset..offset + len));
        }

        self.next_sector += count;
        self.remaining -= (count - 1) * chunk_len + last_len;
        Ok(())
    }

    async fn advance(mut self) -> Result<Option<(Bytes, Self)>> {
        if self.pending.is_empty() {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.fill().await?;
        }
        match self.pending.pop_front() {
            Some(chunk) => Ok(Some((chunk, self))),
            None => Ok(None),
        }
    }
}

/// Stream `length` payload bytes from the run described by `layout`
///
/// Chunks are `layout.chunk_len` bytes except the last, which is trimmed to
/// what remains of `length`.
pub fn read_strided(image: Arc<dyn ImageFile>, layout: Stride, length: u64) -> SectorStream {
    if layout.chunk_len == 0 {
        return stream::empty().boxed();
    }
    if let Err(e) = layout.validate(image.name()) {
        return stream::once(async move { Err(e) }).boxed();
    }

    let cursor = Cursor {
        image,
        layout,
        next_sector: 0,
        remaining: length,
        pending: VecDeque::new(),
    };

    stream::try_unfold(cursor, Cursor::advance).boxed()
}

/// Drain a sector stream into `sink`, returning the number of bytes seen
pub async fn for_each_chunk(
    mut chunks: SectorStream,
    mut sink: impl FnMut(&[u8]),
) -> Result<u64> {
    let mut total = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        total += chunk.len() as u64;
        sink(&chunk);
    }
    Ok(total)
}
