//! WAV container synthesis for extracted CD-DA tracks
//!
//! CD-DA frames are already 16-bit little-endian stereo PCM at 44.1 kHz, so a
//! playable clip is just a canonical 44-byte RIFF/WAVE header followed by the
//! raw frames.

use bytes::{BufMut, BytesMut};
use discvault_core::AudioClip;

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_SIZE: usize = 44;

const FORMAT_PCM: u16 = 1;
const CHANNELS: u16 = 2;
const SAMPLE_RATE: u32 = 44_100;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;
const BYTE_RATE: u32 = SAMPLE_RATE * BLOCK_ALIGN as u32;

/// Build the 44-byte header for a PCM payload of `payload_len` bytes
///
/// Sizes are 32-bit in the container; callers cap payloads well below 4 GB.
pub fn build_header(payload_len: u32) -> [u8; WAV_HEADER_SIZE] {
    let mut header = [0u8; WAV_HEADER_SIZE];
    let mut buf = &mut header[..];

    buf.put_slice(b"RIFF");
    buf.put_u32_le(payload_len.wrapping_add(36));
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(FORMAT_PCM);
    buf.put_u16_le(CHANNELS);
    buf.put_u32_le(SAMPLE_RATE);
    buf.put_u32_le(BYTE_RATE);
    buf.put_u16_le(BLOCK_ALIGN);
    buf.put_u16_le(BITS_PER_SAMPLE);

    buf.put_slice(b"data");
    buf.put_u32_le(payload_len);

    header
}

/// Buffer that collects PCM chunks behind a reserved header slot
pub(crate) struct ClipBuilder {
    buf: BytesMut,
}

impl ClipBuilder {
    /// Reserve room for a header plus `payload_len` bytes
    pub(crate) fn with_capacity(payload_len: usize) -> Self {
        let mut buf = BytesMut::with_capacity(WAV_HEADER_SIZE + payload_len);
        buf.put_bytes(0, WAV_HEADER_SIZE);
        Self { buf }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.put_slice(chunk);
    }

    /// Write the header for the collected payload and seal the clip
    pub(crate) fn finish(mut self) -> AudioClip {
        let payload_len = (self.buf.len() - WAV_HEADER_SIZE) as u32;
        self.buf[..WAV_HEADER_SIZE].copy_from_slice(&build_header(payload_len));
        AudioClip::wav(self.buf.freeze())
    }
}

/// Concatenate a header and `payload` into a finished clip
pub fn assemble_clip(payload: &[u8]) -> AudioClip {
    let mut builder = ClipBuilder::with_capacity(payload.len());
    builder.push(payload);
    builder.finish()
}

/// Declared `data` chunk size of a clip
#[cfg(test)]
pub(crate) fn declared_data_size(clip: &[u8]) -> Option<u32> {
    let raw = clip.get(40..44)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
