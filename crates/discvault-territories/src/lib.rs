//! # DiscVault Territories
//!
//! File system layer for the DiscVault project.
//!
//! A territory is built only on top of a
//! [`SectorSource`](discvault_core::SectorSource), so the same ISO-9660 reader
//! serves plain ISO, BIN/CUE, CCD and MDF/MDS images.
//!
//! ## Example
//!
//! ```rust,no_run
//! use discvault_territories::IsoTerritory;
//! use discvault_vaults::factory::open_paths;
//! use discvault_pipeline::VaultConfig;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> discvault_core::Result<()> {
//! let cue = Path::new("game.cue");
//! let source = open_paths(Path::new("game.bin"), Some(cue), &VaultConfig::default()).await?;
//! let territory = IsoTerritory::create(Arc::from(source)).await?;
//! println!("Volume: {}", territory.volume_label());
//! for entry in territory.read_dir(&territory.root_dir()?).await? {
//!     println!("{}", entry);
//! }
//! # Ok(())
//! # }
//! ```

pub mod iso;

pub use iso::types::TextEncoding;
pub use iso::{DirEnt, IsoTerritory, WalkEntry};
