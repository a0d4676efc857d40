//! # DiscVault Core
//!
//! Core traits, types, and error handling for optical disc image access.
//!
//! This crate provides the foundational abstractions shared by the rest of
//! the workspace:
//! - **ImageFile**: a byte-range readable blob supplied by the host
//! - **SectorSource**: sector-addressable access to one container format (a vault)
//! - **Layout**: declarative binary field tables for on-disk structures
//!
//! ## Terminology
//!
//! - **Vault** = Container format (raw ISO, BIN/CUE, CCD, MDF/MDS)
//! - **Territory** = File system (ISO9660 / Joliet)
//! - **Sheet** = Companion metadata file describing track layout
//! - **Liberation** = Data extraction
//!
//! ## Example
//!
//! ```rust,no_run
//! use discvault_core::{Result, SectorSource};
//!
//! async fn describe(source: &dyn SectorSource) -> Result<()> {
//!     println!("Vault type: {}", source.identify());
//!     for track in source.tracks() {
//!         println!("{}", track);
//!     }
//!     let pvd = source.read_sector(16).await?;
//!     println!("Sector 16 starts with {:02X?}", &pvd[..6]);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod layout;
pub mod security;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use layout::{Endian, Field};
pub use security::*;
pub use traits::{check_range, ImageFile, SectorSource};
pub use types::{
    format_size, AudioClip, SectorStream, TrackInfo, TrackKind, RAW_DATA_OFFSET, RAW_SECTOR_SIZE,
    SECTORS_PER_SECOND, SECTOR_SIZE,
};
