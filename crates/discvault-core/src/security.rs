//! Security validation constants and helpers
//!
//! This module defines limits and checked arithmetic used while parsing
//! untrusted disc images and metadata sheets.

use crate::Error;

/// Maximum raw sector stride we'll accept from a container header
pub const MAX_RAW_SECTOR_SIZE: u32 = 4096;

/// Maximum PCM payload of a single extracted audio track (1 GB)
pub const MAX_AUDIO_PAYLOAD: u64 = 1024 * 1024 * 1024;

/// Maximum file size to extract into one buffer (1 GB)
pub const MAX_FILE_EXTRACT_SIZE: u64 = 1024 * 1024 * 1024;

/// Maximum directory entries gathered by one tree walk
pub const MAX_DIRECTORY_ENTRIES: usize = 100_000;

/// Maximum volume descriptors scanned before giving up on a terminator
pub const MAX_VOLUME_DESCRIPTORS: u32 = 64;

/// Maximum metadata sheet size (cue/ccd/mds files are tiny; 16 MB is generous)
pub const MAX_SHEET_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum file size for memory mapping (16 GB - practical limit for most systems)
pub const MAX_MMAP_SIZE: u64 = 16 * 1024 * 1024 * 1024;

/// Validate that a size is within a limit and fits in memory
///
/// # Security
/// Prevents memory exhaustion from sizes declared by malicious images
pub fn validate_allocation_size(size: u64, limit: u64, context: &str) -> crate::Result<usize> {
    if size > limit {
        return Err(Error::invalid_territory(format!(
            "{} size {} exceeds limit {}",
            context, size, limit
        )));
    }

    u64_to_usize(size, context)
}

/// Safely multiply two u64 values with overflow checking
///
/// # Security
/// Prevents integer overflow in offset calculations
pub fn checked_multiply_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| Error::invalid_territory(format!("{}: multiplication overflow", context)))
}

/// Safely add two u64 values with overflow checking
pub fn checked_add_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_add(b)
        .ok_or_else(|| Error::invalid_territory(format!("{}: addition overflow", context)))
}

/// Safely convert u64 to usize with platform checking
///
/// # Security
/// Prevents truncation on 32-bit platforms
pub fn u64_to_usize(value: u64, context: &str) -> crate::Result<usize> {
    value.try_into().map_err(|_| {
        Error::invalid_territory(format!(
            "{}: value {} exceeds platform usize limit",
            context, value
        ))
    })
}

/// Validate a raw sector stride declared by a container header
pub fn validate_sector_size(sector_size: u32, file: &str) -> crate::Result<()> {
    if sector_size == 0 || sector_size > MAX_RAW_SECTOR_SIZE {
        return Err(Error::parse(
            file,
            format!(
                "invalid sector size {} (must be 1-{})",
                sector_size, MAX_RAW_SECTOR_SIZE
            ),
        ));
    }
    Ok(())
}

/// Sanitize a filename extracted from a disc image
///
/// # Security
/// Prevents malicious filenames from causing path traversal on the host
pub fn sanitize_extracted_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|&c| c != '/' && c != '\\')
        .filter(|&c| !c.is_control())
        .take(255)
        .collect::<String>()
        .trim_start_matches(|c| c == '.' || c == ' ')
        .trim_end_matches(|c| c == '.' || c == ' ')
        .to_string()
}
