//! Mapping tables (.usmap schema dictionaries)

use std::io::Cursor;
use std::path::{Path, PathBuf};

use usmap::Usmap;

use crate::{Error, Result};

/// Loaded schema needed to interpret unversioned properties
///
/// Immutable once loaded. Backends that hand the schema to an external tool
/// use [`Mappings::path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mappings {
    path: PathBuf,
    struct_count: usize,
    enum_count: usize,
}

impl Mappings {
    pub fn new(path: impl Into<PathBuf>, struct_count: usize, enum_count: usize) -> Self {
        Self {
            path: path.into(),
            struct_count,
            enum_count,
        }
    }

    /// Parse a .usmap file
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let usmap = Usmap::read(&mut Cursor::new(data)).map_err(|e| Error::Mappings(e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            structs = usmap.structs.len(),
            enums = usmap.enums.len(),
            "loaded mappings"
        );

        Ok(Self::new(path, usmap.structs.len(), usmap.enums.len()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn struct_count(&self) -> usize {
        self.struct_count
    }

    pub fn enum_count(&self) -> usize {
        self.enum_count
    }
}
