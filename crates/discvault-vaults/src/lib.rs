//! # DiscVault Vaults
//!
//! Container format handlers for the DiscVault project.
//!
//! Every handler implements [`SectorSource`](discvault_core::SectorSource):
//! - **RawVault**: plain 2048-byte-sector ISO images
//! - **BinCueVault**: raw 2352-byte-sector images described by a cue sheet or CCD file
//! - **MdsVault**: MDF images described by a binary MDS header
//!
//! ## Example
//!
//! ```rust,no_run
//! use discvault_vaults::factory::open_paths;
//! use discvault_pipeline::VaultConfig;
//! use std::path::Path;
//!
//! # async fn run() -> discvault_core::Result<()> {
//! // Open any supported format with auto-detection
//! let mds = Path::new("game.mds");
//! let source = open_paths(Path::new("game.mdf"), Some(mds), &VaultConfig::default()).await?;
//!
//! println!("Type: {}", source.identify());
//! for track in source.tracks() {
//!     println!("{}", track);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bincue;
pub mod factory;
pub mod mds;
pub mod raw;
pub mod sequential;
pub mod sheet;
pub mod wave;

pub use bincue::{BinCueVault, SheetKind};
pub use factory::{
    detect_source_type, open_paths, open_sector_source, supported_formats, SourceType,
};
pub use mds::MdsVault;
pub use raw::RawVault;
pub use sheet::{SheetTrack, TrackTable};
pub use wave::{assemble_clip, build_header, WAV_HEADER_SIZE};
