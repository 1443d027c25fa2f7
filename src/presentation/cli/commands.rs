//! CLI commands using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ntfsresc - forensic NTFS reader for partial disk images
#[derive(Parser)]
#[command(name = "ntfsresc")]
#[command(version = "0.1.0")]
#[command(about = "Walk the MFT and $I30 indexes of a partial NTFS image", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Default MFT index of the volume root directory.
pub const ROOT_MFT_INDEX: u64 = 5;

#[derive(Subcommand)]
pub enum Commands {
    /// Print volume geometry decoded from the boot sector
    Info {
        /// Path to the partial disk image
        #[arg(short, long)]
        image: String,

        /// Byte offset of the NTFS partition within the image
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
    },

    /// List one directory's entries
    List {
        /// Path to the partial disk image
        #[arg(short, long)]
        image: String,

        /// Byte offset of the NTFS partition within the image
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// ddrescue-style map file describing which regions of the image are safe to read
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Overlay base path for previously recovered clusters
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// MFT index of the directory to list
        #[arg(long, default_value_t = ROOT_MFT_INDEX)]
        mft_index: u64,
    },

    /// Recursively restore files rooted at an MFT index
    Restore {
        /// Path to the partial disk image
        #[arg(short, long)]
        image: String,

        /// Directory to restore files into
        #[arg(short = 'O', long)]
        output: PathBuf,

        /// Byte offset of the NTFS partition within the image
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// ddrescue-style map file describing which regions of the image are safe to read
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Overlay base path for previously recovered clusters
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// MFT index to root the restore at
        #[arg(long, default_value_t = ROOT_MFT_INDEX)]
        mft_index: u64,
    },

    /// Walk the same scope as `restore` without writing files, then report bad clusters
    BadClusters {
        /// Path to the partial disk image
        #[arg(short, long)]
        image: String,

        /// Byte offset of the NTFS partition within the image
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// ddrescue-style map file describing which regions of the image are safe to read
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Overlay base path for previously recovered clusters
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// MFT index to root the walk at
        #[arg(long)]
        mft_index: u64,
    },

    /// Recover clusters directly from a source device into the overlay
    Recover {
        /// Path to the partial disk image (used only to derive cluster size)
        #[arg(short, long)]
        image: String,

        /// Path to the device to read the missing clusters from
        #[arg(long)]
        device: String,

        /// Byte offset of the NTFS partition within the device
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// Overlay base path to write recovered clusters into
        #[arg(long)]
        overlay: PathBuf,

        /// First cluster to recover
        #[arg(long)]
        start_cluster: u64,

        /// Number of clusters to recover
        #[arg(long)]
        count: u64,
    },
}
