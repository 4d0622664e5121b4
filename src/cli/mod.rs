//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// bfav - archive bilibili favorites folders to CSV and drive BBDown
#[derive(Parser, Debug)]
#[command(name = "bfav", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config store path (default: ~/.bfav/config.json)
    #[arg(long, global = true, env = "BFAV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Print downloader commands without executing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage registered favorites folders
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// One-off export of a favlist to a CSV ledger (nothing is registered)
    Export(ExportArgs),

    /// Resync a registered folder and download everything new
    Update {
        /// Folder index as shown by `bfav folder list`
        index: usize,
    },

    /// Check a registered folder's ledger against local files and re-download gaps
    Verify {
        /// Folder index as shown by `bfav folder list`
        index: usize,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Folder Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Register a favlist and run its initial export
    Add(FolderAddArgs),

    /// List registered folders
    List,

    /// Edit a registered folder (omitted flags keep their current value)
    Edit(FolderEditArgs),

    /// Remove a registered folder (files on disk are kept)
    Remove {
        /// Folder index as shown by `bfav folder list`
        index: usize,
    },
}

#[derive(Args, Debug)]
pub struct FolderAddArgs {
    /// Favlist URL (or bare numeric folder id)
    pub url: String,

    /// Download directory (defaults to the current directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Display name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Ledger text encoding
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,

    /// Listing page size
    #[arg(long, default_value = "40")]
    pub page_size: u32,

    /// Cookie header value (needed for private folders)
    #[arg(long)]
    pub cookie: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct FolderEditArgs {
    /// Folder index as shown by `bfav folder list`
    pub index: usize,

    /// New favlist URL
    #[arg(long)]
    pub url: Option<String>,

    /// New download directory
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// New ledger path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// New display name ('-' clears it)
    #[arg(short, long)]
    pub name: Option<String>,

    /// New ledger text encoding
    #[arg(long)]
    pub encoding: Option<String>,

    /// New listing page size
    #[arg(long)]
    pub page_size: Option<u32>,

    /// New cookie value ('-' clears it)
    #[arg(long)]
    pub cookie: Option<String>,

    /// New HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Favlist URL (or bare numeric folder id)
    pub url: String,

    /// Ledger path (defaults to `<dir>/<timestamp>-favlist.csv`)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Directory for the ledger when --csv is not given
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Ledger text encoding
    #[arg(long, default_value = "utf-8")]
    pub encoding: String,

    /// Listing page size
    #[arg(long, default_value = "40")]
    pub page_size: u32,

    /// Cookie header value (needed for private folders)
    #[arg(long)]
    pub cookie: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,
}
