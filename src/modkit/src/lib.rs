//! Unreal Engine modding toolkit
//!
//! Orchestration on top of [`uasset_bridge`]:
//! - Batch `.uasset` <-> JSON conversion over whole folders
//! - IoStore packing and unpacking through the external `retoc` tool
//! - Persistent user configuration
//!
//! ## Example
//!
//! ```no_run
//! use modkit::{assets, CancelToken};
//! use uasset_bridge::{Bridge, EngineVersion};
//!
//! let bridge = Bridge::from_env();
//! let report = assets::export_assets(
//!     &bridge,
//!     "Mods/MyMod/Content".as_ref(),
//!     None,
//!     EngineVersion::UE5_4,
//!     &CancelToken::new(),
//! );
//! println!("{}", report.message);
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod assets;
pub mod cancel;
pub mod config;
pub mod retoc;

pub use assets::BatchReport;
pub use cancel::CancelToken;
pub use config::Config;
pub use retoc::{RetocCommand, RetocOperation, RetocResult, RetocService};

/// Errors from toolkit services
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Folder does not exist: {0}")]
    FolderNotFound(PathBuf),

    #[error("Mappings file does not exist: {0}")]
    MappingsNotFound(PathBuf),

    #[error("retoc not found at: {0}")]
    RetocNotFound(PathBuf),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("operation {0} not found or already completed")]
    OperationNotFound(String),

    #[error("no {0} operation currently running")]
    NoRunningOperation(RetocCommand),

    #[error("Failed to scan directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Bridge(#[from] uasset_bridge::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Durations are reported as text such as `"1.5s"`
pub(crate) fn serialize_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{:?}", duration))
}
