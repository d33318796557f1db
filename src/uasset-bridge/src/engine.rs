//! Engine version tags
//!
//! The bridge never interprets these; they are handed to the library backend
//! to select the binary format revision.

use std::fmt;
use std::str::FromStr;

/// Opaque engine version tag passed through to the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineVersion(pub i32);

impl EngineVersion {
    pub const UE4_0: Self = Self(0);
    pub const UE4_27: Self = Self(510);
    pub const UE5_0: Self = Self(1004);
    pub const UE5_1: Self = Self(1007);
    pub const UE5_2: Self = Self(1008);
    pub const UE5_3: Self = Self(1009);
    pub const UE5_4: Self = Self(1010);

    const NAMED: &'static [(&'static str, EngineVersion)] = &[
        ("UE4_0", Self::UE4_0),
        ("UE4_27", Self::UE4_27),
        ("UE5_0", Self::UE5_0),
        ("UE5_1", Self::UE5_1),
        ("UE5_2", Self::UE5_2),
        ("UE5_3", Self::UE5_3),
        ("UE5_4", Self::UE5_4),
    ];

    /// Raw tag as it crosses the C ABI
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Name of a known revision (e.g. `UE5_4`)
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(name, _)| *name)
    }

    /// Look up a known revision by name, case-insensitive
    ///
    /// Accepts `UE5_4`, `ue5_4`, `5.4` and `UE5.4`.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_uppercase().replace('.', "_");
        let normalized = if normalized.starts_with("UE") {
            normalized
        } else {
            format!("UE{}", normalized)
        };
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, v)| *v)
    }

    /// All named revisions, oldest first
    pub fn known() -> impl Iterator<Item = (&'static str, EngineVersion)> {
        Self::NAMED.iter().copied()
    }
}

impl Default for EngineVersion {
    fn default() -> Self {
        Self::UE5_4
    }
}

impl From<i32> for EngineVersion {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for EngineVersion {
    type Err = String;

    /// Parses either a known name or a raw integer tag
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(raw) = s.trim().parse::<i32>() {
            return Ok(Self(raw));
        }
        Self::from_name(s).ok_or_else(|| {
            let names: Vec<&str> = Self::known().map(|(n, _)| n).collect();
            format!(
                "unknown engine version '{}' (expected one of {} or a raw integer)",
                s,
                names.join(", ")
            )
        })
    }
}
