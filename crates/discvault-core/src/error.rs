//! Liberation error types

use thiserror::Error;

/// The main error type for disc image operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading from a host file
    #[error("Pipeline I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image could not be matched to a known container format
    #[error("Format detection failed: {0}")]
    FormatDetection(String),

    /// The image format requires a companion metadata sheet that was not supplied
    #[error("Format detection failed: {image} requires a metadata file (.cue, .ccd or .mds)")]
    MissingMetadata { image: String },

    /// A metadata sheet or container header is malformed
    #[error("Failed to parse {file}: {reason}")]
    Parse { file: String, reason: String },

    /// The volume descriptor set ended without a usable descriptor
    #[error("No primary volume descriptor found")]
    NoPrimaryVolumeDescriptor,

    /// Track is absent or is not an audio track
    #[error("Invalid track {track}: {reason}")]
    InvalidTrack { track: u32, reason: String },

    /// A directory record runs past the end of its sector
    #[error("Directory record crosses sector boundary (sector {sector}, position {position})")]
    CrossBoundary { sector: u32, position: usize },

    /// Operation not available for this container format
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Byte range lies outside the image
    #[error("Read of {len} bytes at offset {offset} exceeds image size {size}")]
    OutOfRange { offset: u64, len: u64, size: u64 },

    /// Invalid territory (file system) structure
    #[error("Invalid territory: {0}")]
    InvalidTerritory(String),

    /// File or directory not found in territory
    #[error("Not found: {0}")]
    NotFound(String),

    /// Text could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type alias for disc image operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a parse error naming the offending file
    pub fn parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a format detection error
    pub fn format_detection(msg: impl Into<String>) -> Self {
        Error::FormatDetection(msg.into())
    }

    /// Create an invalid track error
    pub fn invalid_track(track: u32, reason: impl Into<String>) -> Self {
        Error::InvalidTrack {
            track,
            reason: reason.into(),
        }
    }

    /// Create an invalid territory error
    pub fn invalid_territory(msg: impl Into<String>) -> Self {
        Error::InvalidTerritory(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a not implemented error
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Error::NotImplemented(msg.into())
    }

    /// True for every failure to pick a container format, including a missing sheet
    pub fn is_format_detection(&self) -> bool {
        matches!(self, Error::FormatDetection(_) | Error::MissingMetadata { .. })
    }
}
