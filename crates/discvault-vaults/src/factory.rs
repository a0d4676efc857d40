//! Vault factory for automatic format detection
//!
//! Picks a sector reader from the image name and the companion metadata
//! sheet's extension, then parses the sheet.

use crate::{BinCueVault, MdsVault, RawVault};
use discvault_core::{
    validate_allocation_size, Error, ImageFile, Result, SectorSource, MAX_SHEET_SIZE,
};
use discvault_pipeline::{open_image, VaultConfig};
use std::path::Path;
use std::sync::Arc;

use crate::sheet::decode_sheet_text;

/// Detected vault type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// Plain 2048-byte-sector ISO image
    Raw,
    /// Raw image described by a cue sheet
    Cue,
    /// Raw image described by a CloneCD control file
    Ccd,
    /// MDF image described by an MDS header
    Mds,
}

impl SourceType {
    /// Get a human-readable name for this vault type
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Raw => "Raw ISO Image",
            SourceType::Cue => "BIN/CUE",
            SourceType::Ccd => "CloneCD",
            SourceType::Mds => "MDF/MDS",
        }
    }
}

/// Lowercased extension of a file name, if any
fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Detect the vault type from the image name and optional sheet name
///
/// `.iso` images are read directly and any sheet is ignored. Everything else
/// needs a sheet whose extension selects the parser.
pub fn detect_source_type(image_name: &str, metadata_name: Option<&str>) -> Result<SourceType> {
    if extension_of(image_name).as_deref() == Some("iso") {
        return Ok(SourceType::Raw);
    }

    let sheet = metadata_name.ok_or_else(|| Error::MissingMetadata {
        image: image_name.to_string(),
    })?;

    match extension_of(sheet).as_deref() {
        Some("cue") => Ok(SourceType::Cue),
        Some("ccd") => Ok(SourceType::Ccd),
        Some("mds") => Ok(SourceType::Mds),
        _ => Err(Error::format_detection(format!(
            "unrecognized metadata file {} for image {}",
            sheet, image_name
        ))),
    }
}

async fn read_sheet(sheet: &dyn ImageFile) -> Result<bytes::Bytes> {
    validate_allocation_size(sheet.len(), MAX_SHEET_SIZE, sheet.name())?;
    sheet.read_all().await
}

/// Build a sector source for `image`, parsing `metadata` when required
pub async fn open_sector_source(
    image: Arc<dyn ImageFile>,
    metadata: Option<Arc<dyn ImageFile>>,
) -> Result<Box<dyn SectorSource>> {
    let source_type = detect_source_type(image.name(), metadata.as_ref().map(|m| m.name()))?;
    tracing::debug!("Opening {} as {}", image.name(), source_type.name());

    let sheet = match (source_type, metadata) {
        (SourceType::Raw, _) => return Ok(Box::new(RawVault::new(image))),
        (_, Some(sheet)) => sheet,
        (_, None) => {
            return Err(Error::MissingMetadata {
                image: image.name().to_string(),
            })
        }
    };

    let raw = read_sheet(sheet.as_ref()).await?;
    let source: Box<dyn SectorSource> = if source_type == SourceType::Mds {
        Box::new(MdsVault::from_sheet(image, sheet.name(), &raw)?)
    } else {
        let text = decode_sheet_text(&raw);
        if source_type == SourceType::Ccd {
            Box::new(BinCueVault::from_ccd(image, sheet.name(), &text)?)
        } else {
            Box::new(BinCueVault::from_cue(image, sheet.name(), &text)?)
        }
    };
    Ok(source)
}

/// Open an image (and optional sheet) from host paths
///
/// # Example
///
/// ```rust,no_run
/// use discvault_vaults::factory::open_paths;
/// use discvault_pipeline::VaultConfig;
/// use std::path::Path;
///
/// # async fn run() -> discvault_core::Result<()> {
/// let source = open_paths(
///     Path::new("game.bin"),
///     Some(Path::new("game.cue")),
///     &VaultConfig::default(),
/// )
/// .await?;
/// println!("Vault type: {}", source.identify());
/// # Ok(())
/// # }
/// ```
pub async fn open_paths(
    image_path: &Path,
    metadata_path: Option<&Path>,
    config: &VaultConfig,
) -> Result<Box<dyn SectorSource>> {
    let image = open_image(image_path, config).await?;
    let metadata = match metadata_path {
        Some(path) => Some(open_image(path, config).await?),
        None => None,
    };
    open_sector_source(image, metadata).await
}

/// Get information about supported vault types
pub fn supported_formats() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        ("Raw ISO Image", &["iso"]),
        ("BIN/CUE", &["bin", "img", "cue"]),
        ("CloneCD", &["img", "ccd"]),
        ("MDF/MDS", &["mdf", "mds"]),
    ]
}
