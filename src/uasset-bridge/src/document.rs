//! In-memory asset graph
//!
//! The library backend produces and consumes the asset as a JSON object graph.
//! Keys keep the order the backend emitted them in, so pretty-printing the same
//! graph always yields the same bytes.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Top-level member holding the exported objects
pub const EXPORTS_KEY: &str = "Exports";

/// One parsed asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDocument {
    root: Map<String, Value>,
    file_path: Option<PathBuf>,
}

impl AssetDocument {
    /// Parse asset JSON; anything other than an object is rejected
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self {
                root,
                file_path: None,
            }),
            Value::Null => Err(Error::NotAnObject("null")),
            Value::Bool(_) => Err(Error::NotAnObject("a boolean")),
            Value::Number(_) => Err(Error::NotAnObject("a number")),
            Value::String(_) => Err(Error::NotAnObject("a string")),
            Value::Array(_) => Err(Error::NotAnObject("an array")),
        }
    }

    /// Record where the asset was loaded from
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Load path, `None` for assets built from JSON
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Top-level exported objects
    pub fn exports(&self) -> &[Value] {
        self.root
            .get(EXPORTS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn export_count(&self) -> usize {
        self.exports().len()
    }

    /// Two-space indented JSON text of the whole graph
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"Info":"Serialized with UAssetAPI","NameMap":["/Game/Items/BP_Torch","Default__BP_Torch_C"],"Exports":[{"$type":"NormalExport","ObjectName":"BP_Torch_C"},{"$type":"NormalExport","ObjectName":"Default__BP_Torch_C"}],"PackageGuid":"{00000000-0000-0000-0000-000000000000}"}"#;

    #[test]
    fn test_export_count() {
        let doc = AssetDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.export_count(), 2);
        assert_eq!(doc.exports()[0]["ObjectName"], "BP_Torch_C");
    }

    #[test]
    fn test_missing_exports_is_zero() {
        let doc = AssetDocument::from_json(r#"{"NameMap": []}"#).unwrap();
        assert_eq!(doc.export_count(), 0);

        let doc = AssetDocument::from_json(r#"{"Exports": null}"#).unwrap();
        assert_eq!(doc.export_count(), 0);
    }

    #[test]
    fn test_non_object_rejected() {
        for (text, kind) in [
            ("null", "null"),
            ("[1,2]", "an array"),
            ("\"Exports\"", "a string"),
            ("42", "a number"),
        ] {
            match AssetDocument::from_json(text) {
                Err(Error::NotAnObject(got)) => assert_eq!(got, kind),
                other => panic!("expected NotAnObject for {}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let result = AssetDocument::from_json("{\"Exports\": [");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_pretty_keeps_key_order() {
        let doc = AssetDocument::from_json(SAMPLE).unwrap();
        let pretty = doc.to_pretty_json().unwrap();

        let info = pretty.find("\"Info\"").unwrap();
        let names = pretty.find("\"NameMap\"").unwrap();
        let exports = pretty.find("\"Exports\"").unwrap();
        let guid = pretty.find("\"PackageGuid\"").unwrap();
        assert!(info < names && names < exports && exports < guid);
        assert!(pretty.contains("\n  \"Exports\": ["));
    }

    #[test]
    fn test_pretty_is_idempotent() {
        let doc = AssetDocument::from_json(SAMPLE).unwrap();
        let first = doc.to_pretty_json().unwrap();
        let reparsed = AssetDocument::from_json(&first).unwrap();
        let second = reparsed.to_pretty_json().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, doc.to_pretty_json().unwrap());
    }

    #[test]
    fn test_file_path() {
        let doc = AssetDocument::from_json("{}").unwrap();
        assert_eq!(doc.file_path(), None);

        let doc = doc.with_file_path("/mods/BP_Torch.uasset");
        assert_eq!(doc.file_path(), Some(Path::new("/mods/BP_Torch.uasset")));
    }
}
