//! CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use modkit::RetocCommand;
use uasset_bridge::EngineVersion;

#[derive(Parser)]
#[command(name = "modkit")]
#[command(about = "Unreal Engine modding toolkit", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show bridge and asset library versions
    Version,

    /// Export every .uasset in a folder to JSON
    #[command(visible_alias = "e")]
    Export {
        /// Folder to scan recursively
        folder: PathBuf,

        /// .usmap mappings file (uses configured default if not provided)
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Engine version, e.g. UE5_4 or 1010 (uses configured default if not provided)
        #[arg(short, long)]
        engine: Option<EngineVersion>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import every .json in a folder back to .uasset/.uexp
    ///
    /// The engine version is read from each JSON document.
    #[command(visible_alias = "i")]
    Import {
        /// Folder to scan recursively
        folder: PathBuf,

        /// .usmap mappings file (uses configured default if not provided)
        #[arg(short, long)]
        mappings: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count asset and JSON files in a folder
    Count {
        folder: PathBuf,
    },

    /// Run a retoc IoStore operation
    Retoc {
        /// to-zen, to-legacy, unpack, info or list
        command: RetocCommand,

        /// Input folder or container
        input: PathBuf,

        /// Output directory (to-zen) or path (to-legacy, unpack)
        output: Option<PathBuf>,

        /// Path to the retoc executable (uses configured default if not provided)
        #[arg(long, env = "MODKIT_RETOC")]
        retoc: Option<PathBuf>,

        /// Engine version passed to to-zen (uses configured default if not provided)
        #[arg(long)]
        ue_version: Option<String>,

        /// Mod name used for packed output files
        #[arg(long)]
        mod_name: Option<String>,

        /// Load-order number used for packed output files
        #[arg(long)]
        serialization: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change configuration
    #[command(visible_alias = "c")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a preference (ue_version, theme, mappings, retoc, ...)
    SetPref { key: String, value: String },

    /// Remember a path under a key
    SetPath { key: String, path: String },
}
