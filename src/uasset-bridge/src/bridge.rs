//! Typed facade over the handle registry and the library backend
//!
//! Every operation returns a [`Result`]; the C ABI in [`crate::ffi`] turns
//! those into sentinels plus last-error messages. Rust callers can use this
//! API directly and skip the string marshaling.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::document::AssetDocument;
use crate::engine::EngineVersion;
use crate::library::{default_backend, AssetLibrary};
use crate::mappings::Mappings;
use crate::registry::{Handle, Registry};
use crate::{Error, HandleKind, Result};

/// Handle to a loaded mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingsHandle(Handle);

/// Handle to a loaded or deserialized asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetHandle(Handle);

macro_rules! raw_handle {
    ($name:ident) => {
        impl $name {
            /// Wrap a raw value received from a caller, `None` for zero
            pub fn from_raw(raw: usize) -> Option<Self> {
                Handle::from_raw(raw).map(Self)
            }

            pub fn into_raw(self) -> usize {
                self.0.into_raw()
            }
        }
    };
}

raw_handle!(MappingsHandle);
raw_handle!(AssetHandle);

struct AssetEntry {
    document: AssetDocument,
    // Non-owning: releasing the table must not be blocked by assets using it
    mappings: Option<Weak<Mappings>>,
}

enum Resource {
    Mappings(Arc<Mappings>),
    Asset(Arc<Mutex<AssetEntry>>),
}

impl Resource {
    fn kind(&self) -> HandleKind {
        match self {
            Resource::Mappings(_) => HandleKind::Mappings,
            Resource::Asset(_) => HandleKind::Asset,
        }
    }
}

/// Owns every live resource and the backend that produces them
pub struct Bridge {
    library: Box<dyn AssetLibrary>,
    registry: Mutex<Registry<Resource>>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("library", &self.library.name())
            .field("live_handles", &self.live_handles())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require_path<'a>(path: &'a str) -> Result<&'a Path> {
    if path.is_empty() {
        return Err(Error::EmptyArgument("path"));
    }
    Ok(Path::new(path))
}

fn require_existing_file<'a>(path: &'a str) -> Result<&'a Path> {
    let path = require_path(path)?;
    if !path.is_file() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

impl Bridge {
    pub fn new(library: Box<dyn AssetLibrary>) -> Self {
        Self {
            library,
            registry: Mutex::new(Registry::new()),
        }
    }

    /// Bridge over the default backend, configured from the environment
    pub fn from_env() -> Self {
        Self::new(default_backend())
    }

    pub fn library(&self) -> &dyn AssetLibrary {
        self.library.as_ref()
    }

    /// Number of handles issued and not yet released
    pub fn live_handles(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Human-readable bridge and library version
    pub fn version(&self) -> String {
        format!(
            "uasset-bridge v{} ({} backend: {})",
            env!("CARGO_PKG_VERSION"),
            self.library.name(),
            self.library.version()
        )
    }

    fn issue(&self, resource: Resource) -> Result<Handle> {
        lock(&self.registry).insert(resource)
    }

    fn resolve_mappings(&self, handle: MappingsHandle) -> Result<Arc<Mappings>> {
        match lock(&self.registry).get(handle.0) {
            Some(Resource::Mappings(mappings)) => Ok(Arc::clone(mappings)),
            Some(_) => Err(Error::invalid_handle(HandleKind::Mappings, "wrong kind")),
            None => Err(Error::invalid_handle(HandleKind::Mappings, "released or unknown")),
        }
    }

    fn resolve_asset(&self, handle: AssetHandle) -> Result<Arc<Mutex<AssetEntry>>> {
        match lock(&self.registry).get(handle.0) {
            Some(Resource::Asset(entry)) => Ok(Arc::clone(entry)),
            Some(_) => Err(Error::invalid_handle(HandleKind::Asset, "wrong kind")),
            None => Err(Error::invalid_handle(HandleKind::Asset, "released or unknown")),
        }
    }

    /// Load a .usmap mapping table
    pub fn load_mappings(&self, path: &str) -> Result<MappingsHandle> {
        let path = require_existing_file(path)?;
        let mappings = self.library.read_mappings(path)?;
        let handle = self.issue(Resource::Mappings(Arc::new(mappings)))?;
        tracing::debug!(path = %path.display(), handle = handle.into_raw(), "mappings loaded");
        Ok(MappingsHandle(handle))
    }

    /// Release a mapping table
    ///
    /// Best effort: an unknown or stale handle is logged and otherwise ignored.
    /// Assets that still reference the table lose their attachment.
    pub fn release_mappings(&self, handle: MappingsHandle) {
        self.release(handle.0, HandleKind::Mappings);
    }

    /// Load a .uasset file (and its companion .uexp)
    pub fn load_asset(
        &self,
        path: &str,
        engine: EngineVersion,
        mappings: Option<MappingsHandle>,
    ) -> Result<AssetHandle> {
        let path = require_existing_file(path)?;
        let mappings = mappings.map(|h| self.resolve_mappings(h)).transpose()?;

        let document = self
            .library
            .read_asset(path, engine, mappings.as_deref())?
            .with_file_path(path);

        let entry = AssetEntry {
            document,
            mappings: mappings.as_ref().map(Arc::downgrade),
        };
        let handle = self.issue(Resource::Asset(Arc::new(Mutex::new(entry))))?;
        tracing::debug!(path = %path.display(), %engine, handle = handle.into_raw(), "asset loaded");
        Ok(AssetHandle(handle))
    }

    /// Build an asset from JSON text; no mapping table is attached
    pub fn deserialize_from_json(&self, json: &str) -> Result<AssetHandle> {
        if json.is_empty() {
            return Err(Error::EmptyArgument("json"));
        }
        let document = AssetDocument::from_json(json)?;
        let entry = AssetEntry {
            document,
            mappings: None,
        };
        let handle = self.issue(Resource::Asset(Arc::new(Mutex::new(entry))))?;
        Ok(AssetHandle(handle))
    }

    /// Number of top-level exports
    pub fn export_count(&self, asset: AssetHandle) -> Result<usize> {
        let entry = self.resolve_asset(asset)?;
        let count = lock(&entry).document.export_count();
        Ok(count)
    }

    /// Pretty-printed JSON of the whole asset graph
    pub fn serialize_to_json(&self, asset: AssetHandle) -> Result<String> {
        let entry = self.resolve_asset(asset)?;
        let json = lock(&entry).document.to_pretty_json()?;
        Ok(json)
    }

    /// Path the asset was loaded from, empty for assets built from JSON
    pub fn file_path(&self, asset: AssetHandle) -> Result<String> {
        let entry = self.resolve_asset(asset)?;
        let path = lock(&entry)
            .document
            .file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Ok(path)
    }

    /// Write the asset back to binary form
    ///
    /// A supplied mapping table replaces whatever was attached before; later
    /// writes without one reuse it for as long as the table stays loaded.
    pub fn write_to_file(
        &self,
        asset: AssetHandle,
        path: &str,
        mappings: Option<MappingsHandle>,
    ) -> Result<()> {
        let entry = self.resolve_asset(asset)?;
        let path = require_path(path)?;
        let supplied = mappings.map(|h| self.resolve_mappings(h)).transpose()?;

        let mut entry = lock(&entry);
        if let Some(mappings) = &supplied {
            entry.mappings = Some(Arc::downgrade(mappings));
        }

        let attached = match &entry.mappings {
            Some(weak) => {
                let upgraded = weak.upgrade();
                if upgraded.is_none() {
                    tracing::warn!(
                        path = %path.display(),
                        "attached mappings were released; writing without mappings"
                    );
                }
                upgraded
            }
            None => None,
        };

        self.library
            .write_asset(&entry.document, path, attached.as_deref())?;
        tracing::debug!(path = %path.display(), handle = asset.into_raw(), "asset written");
        Ok(())
    }

    /// Release an asset
    ///
    /// Best effort: an unknown or stale handle is logged and otherwise ignored.
    pub fn release_asset(&self, handle: AssetHandle) {
        self.release(handle.0, HandleKind::Asset);
    }

    fn release(&self, handle: Handle, expected: HandleKind) {
        let mut registry = lock(&self.registry);
        match registry.get(handle).map(Resource::kind) {
            Some(kind) if kind == expected => {
                registry.remove(handle);
            }
            Some(kind) => tracing::warn!(
                handle = handle.into_raw(),
                "ignoring release of a {} handle as {}",
                kind,
                expected
            ),
            None => tracing::warn!(
                handle = handle.into_raw(),
                "ignoring release of unknown or already released {} handle",
                expected
            ),
        }
    }
}
