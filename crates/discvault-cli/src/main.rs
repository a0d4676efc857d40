//! DiscVault CLI - disc image inspection tool
//!
//! Reads ISO, BIN/CUE, CCD and MDF/MDS images: lists the track layout,
//! browses the ISO-9660 file system and extracts files and audio tracks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use discvault_core::{format_size, sanitize_extracted_filename, SectorSource};
use discvault_pipeline::VaultConfig;
use discvault_territories::IsoTerritory;
use discvault_vaults::factory::{open_paths, supported_formats};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "discvault")]
#[command(about = "Inspect CD-ROM disc images and extract their files and audio tracks")]
#[command(version)]
struct Cli {
    /// Disc image (.iso, .bin, .img, .mdf)
    image: PathBuf,

    /// Companion metadata sheet (.cue, .ccd, .mds)
    #[arg(short, long, env = "DISCVAULT_METADATA")]
    metadata: Option<PathBuf>,

    /// Read through buffered file I/O instead of memory mapping
    #[arg(long)]
    no_mmap: bool,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show container type, track table and volume label
    Info,

    /// List a directory
    Ls {
        /// Directory path inside the image
        #[arg(default_value = "/")]
        path: String,
    },

    /// List every file and directory
    Tree,

    /// Write a file's contents to stdout or a host file
    Cat {
        /// File path inside the image
        path: String,

        /// Output file, or directory to place the file in
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract an audio track as a WAV clip
    Track {
        /// Track number (1-based)
        number: u32,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = VaultConfig {
        use_mmap: !cli.no_mmap,
    };
    let source: Arc<dyn SectorSource> = Arc::from(
        open_paths(&cli.image, cli.metadata.as_deref(), &config)
            .await
            .with_context(|| format!("Failed to open {}", cli.image.display()))?,
    );

    match cli.command {
        Command::Info => cmd_info(&cli.image, source).await,
        Command::Ls { path } => cmd_ls(source, &path).await,
        Command::Tree => cmd_tree(source).await,
        Command::Cat { path, output } => cmd_cat(source, &path, output.as_deref()).await,
        Command::Track { number, output } => cmd_track(source, number, output.as_deref()).await,
    }
}

async fn cmd_info(image: &Path, source: Arc<dyn SectorSource>) -> Result<()> {
    println!("=== Vault Information ===");
    println!("Path:   {}", image.display());
    println!("Type:   {}", source.identify());
    println!("Tracks: {}", source.max_track());
    println!();

    println!("=== Tracks ===");
    for track in source.tracks() {
        println!("{}", track);
    }
    println!();

    match IsoTerritory::create(source).await {
        Ok(territory) => {
            println!("=== File System ===");
            println!("Type:   ISO-9660 ({:?} names)", territory.encoding());
            println!("Label:  {}", territory.volume_label());
        }
        Err(e) => {
            tracing::warn!("No readable ISO-9660 volume: {}", e);
            println!("No ISO-9660 file system found.");
        }
    }

    println!();
    println!("Supported formats:");
    for (name, extensions) in supported_formats() {
        println!("  {:<15} {}", name, extensions.join(", "));
    }
    Ok(())
}

async fn cmd_ls(source: Arc<dyn SectorSource>, path: &str) -> Result<()> {
    let territory = IsoTerritory::create(source).await?;
    let dir = territory.lookup(path).await?;
    if !dir.is_directory() {
        bail!("{} is not a directory", path);
    }

    println!("{:<5} {:<12} {:<10} Name", "Type", "Size", "Sector");
    println!("{}", "-".repeat(50));
    for entry in territory.read_dir(&dir).await? {
        if entry.is_self_or_parent() {
            continue;
        }
        println!(
            "{:<5} {:<12} {:<10} {}{}",
            if entry.is_directory() { "DIR" } else { "FILE" },
            format_size(entry.size as u64),
            entry.sector,
            entry.name,
            if entry.is_hidden() { " (hidden)" } else { "" }
        );
    }
    Ok(())
}

async fn cmd_tree(source: Arc<dyn SectorSource>) -> Result<()> {
    let territory = IsoTerritory::create(source).await?;
    let root = territory.root_dir()?;

    println!("{}", territory.volume_label());
    let entries = territory.walk(&root).await?;
    for item in &entries {
        let depth = item.path.matches('/').count().saturating_sub(1);
        println!("{}{}", "  ".repeat(depth), item.entry);
    }
    println!();
    println!("{} entries", entries.len());
    Ok(())
}

async fn cmd_cat(source: Arc<dyn SectorSource>, path: &str, output: Option<&Path>) -> Result<()> {
    let territory = IsoTerritory::create(source).await?;
    let entry = territory.lookup(path).await?;
    if entry.is_directory() {
        bail!("{} is a directory", path);
    }

    let target = match output {
        Some(out) if out.is_dir() => Some(out.join(sanitize_extracted_filename(&entry.name))),
        Some(out) => Some(out.to_path_buf()),
        None => None,
    };
    let mut writer = open_output(target.as_deref()).await?;

    let mut chunks = territory.read_file(&entry);
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    tracing::info!("Wrote {} ({})", entry.name, format_size(written));
    Ok(())
}

async fn cmd_track(
    source: Arc<dyn SectorSource>,
    number: u32,
    output: Option<&Path>,
) -> Result<()> {
    let clip = source
        .extract_track(number)
        .await
        .with_context(|| format!("Failed to extract track {}", number))?;

    let mut writer = open_output(output).await?;
    writer.write_all(&clip.data).await?;
    writer.flush().await?;

    tracing::info!(
        "Extracted track {} as {} ({})",
        number,
        clip.mime_type,
        format_size(clip.len() as u64)
    );
    Ok(())
}

async fn open_output(path: Option<&Path>) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_track_command() {
        let cli = Cli::try_parse_from([
            "discvault",
            "game.bin",
            "--metadata",
            "game.cue",
            "track",
            "2",
            "-o",
            "track02.wav",
        ])
        .unwrap();

        assert_eq!(cli.metadata.as_deref(), Some(Path::new("game.cue")));
        assert!(!cli.no_mmap);
        match cli.command {
            Command::Track { number, output } => {
                assert_eq!(number, 2);
                assert_eq!(output.as_deref(), Some(Path::new("track02.wav")));
            }
            _ => panic!("expected track command"),
        }
    }

    #[test]
    fn test_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["discvault", "disc.iso", "--no-mmap", "ls"]).unwrap();
        assert!(cli.no_mmap);
        assert!(matches!(cli.command, Command::Ls { ref path } if path == "/"));
    }
}
