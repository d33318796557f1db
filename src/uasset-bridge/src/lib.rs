//! Native bridge for Unreal Engine asset (de)serialization
//!
//! Exposes `.uasset`/`.uexp` <-> JSON conversion behind a C ABI built around
//! opaque handles. The actual parsing is delegated to an [`AssetLibrary`]
//! backend; this crate owns the handle lifecycle and the error protocol.
//!
//! # Ownership rules
//!
//! - Handles: the bridge owns the resource, the caller must call the matching
//!   `Free*` function exactly once
//! - Strings returned by the bridge: caller must call `FreeString`
//! - Strings passed to the bridge: caller owns, the bridge only reads
//!
//! # Error protocol
//!
//! Every fallible entry point clears the calling thread's last error on entry
//! and, on failure, stores `"<Operation>: <reason>"` and returns a sentinel
//! (`0` handle, `-1` count, `0` status, null string). Release functions never
//! touch the error slot.
//!
//! ## Example
//!
//! ```no_run
//! use uasset_bridge::{Bridge, EngineVersion};
//!
//! # fn main() -> uasset_bridge::Result<()> {
//! let bridge = Bridge::from_env();
//! let asset = bridge.load_asset("Content/BP_Item.uasset", EngineVersion::UE5_4, None)?;
//! println!("{} exports", bridge.export_count(asset)?);
//! let json = bridge.serialize_to_json(asset)?;
//! std::fs::write("BP_Item.json", json)?;
//! bridge.release_asset(asset);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod document;
pub mod engine;
pub mod error_channel;
pub mod ffi;
pub mod library;
pub mod mappings;
pub mod registry;

pub use bridge::{AssetHandle, Bridge, MappingsHandle};
pub use document::AssetDocument;
pub use engine::EngineVersion;
pub use library::{default_backend, AssetLibrary, HelperBackend};
pub use mappings::Mappings;
pub use registry::{Handle, Registry};

/// Which kind of resource a handle was expected to reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Mappings,
    Asset,
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleKind::Mappings => f.write_str("mappings"),
            HandleKind::Asset => f.write_str("asset"),
        }
    }
}

/// Errors reported by bridge operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} is null")]
    NullArgument(&'static str),

    #[error("{0} is empty")]
    EmptyArgument(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid {kind} handle ({reason})")]
    InvalidHandle {
        kind: HandleKind,
        reason: &'static str,
    },

    #[error("handle table is full ({0} live handles)")]
    RegistryFull(usize),

    #[error("failed to parse mappings: {0}")]
    Mappings(String),

    #[error("helper failed: {0}")]
    Helper(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("asset JSON must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("string contains an interior NUL byte")]
    InteriorNul(#[from] std::ffi::NulError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("panicked: {0}")]
    Panic(String),
}

impl Error {
    pub(crate) fn invalid_handle(kind: HandleKind, reason: &'static str) -> Self {
        Error::InvalidHandle { kind, reason }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
