//! Asset library backends
//!
//! The bridge never parses the Unreal binary format itself. Parsing and
//! writing go through an [`AssetLibrary`]:
//! - `HelperBackend`: runs an external UAssetAPI-based helper executable
//!   (default, cross-platform, works through wrappers such as Wine)
//!
//! Mapping tables are parsed in process unless a backend overrides
//! [`AssetLibrary::read_mappings`].

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::document::AssetDocument;
use crate::engine::EngineVersion;
use crate::mappings::Mappings;
use crate::{Error, Result};

/// Environment variable naming the helper command
pub const HELPER_ENV: &str = "UASSET_BRIDGE_HELPER";

/// Helper command used when [`HELPER_ENV`] is unset
pub const DEFAULT_HELPER: &str = "UAssetHelper";

/// Reads and writes Unreal assets on behalf of the bridge
pub trait AssetLibrary: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Human-readable version of the underlying library
    ///
    /// Must not fail; backends report `"unknown"` when they can't tell.
    fn version(&self) -> String;

    /// Load a mapping table
    fn read_mappings(&self, path: &Path) -> Result<Mappings> {
        Mappings::read(path)
    }

    /// Parse the asset at `path` (its companion `.uexp` is the backend's business)
    fn read_asset(
        &self,
        path: &Path,
        engine: EngineVersion,
        mappings: Option<&Mappings>,
    ) -> Result<AssetDocument>;

    /// Write `asset` to `path`, possibly alongside a companion payload file
    fn write_asset(
        &self,
        asset: &AssetDocument,
        path: &Path,
        mappings: Option<&Mappings>,
    ) -> Result<()>;
}

/// External helper executable backend
///
/// # Protocol
///
/// The command is invoked as one of:
/// ```text
/// <command> tojson <asset_path> <json_out> <engine_version> [<usmap_path>]
/// <command> fromjson <json_in> <asset_out> [<usmap_path>]
/// <command> version
/// ```
///
/// - JSON is exchanged through files in a private temporary directory
/// - `version` prints the library version to stdout
/// - Exit code 0 indicates success; stderr is reported on failure
pub struct HelperBackend {
    command: String,
}

impl HelperBackend {
    /// Create a helper backend with the given command
    ///
    /// The command is split on whitespace, so `wine UAssetHelper.exe` works.
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Use `UASSET_BRIDGE_HELPER`, falling back to [`DEFAULT_HELPER`]
    pub fn from_env() -> Self {
        match std::env::var(HELPER_ENV) {
            Ok(command) if !command.trim().is_empty() => Self::new(command),
            _ => Self::new(DEFAULT_HELPER),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn run<I, S>(&self, subcommand: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let parts: Vec<&str> = self.command.split_whitespace().collect();
        let (program, prefix_args) = parts
            .split_first()
            .ok_or_else(|| Error::Helper("Empty helper command".into()))?;

        let output = Command::new(program)
            .args(prefix_args)
            .arg(subcommand)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                Error::Helper(format!("Failed to spawn command '{}': {}", self.command, e))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!(helper = %self.command, subcommand, "{}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Helper(format!(
                "Command '{} {}' failed with exit code {:?}: {}",
                self.command,
                subcommand,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

impl std::fmt::Debug for HelperBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperBackend")
            .field("command", &self.command)
            .finish()
    }
}

impl AssetLibrary for HelperBackend {
    fn name(&self) -> &'static str {
        "helper"
    }

    fn version(&self) -> String {
        match self.run("version", std::iter::empty::<&str>()) {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if text.is_empty() {
                    "unknown".to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::warn!("could not query helper version: {}", e);
                "unknown".to_string()
            }
        }
    }

    fn read_asset(
        &self,
        path: &Path,
        engine: EngineVersion,
        mappings: Option<&Mappings>,
    ) -> Result<AssetDocument> {
        let scratch = tempfile::tempdir()?;
        let json_path = scratch.path().join("asset.json");

        let mut args = vec![
            path.as_os_str().to_owned(),
            json_path.as_os_str().to_owned(),
            engine.raw().to_string().into(),
        ];
        if let Some(mappings) = mappings {
            args.push(mappings.path().as_os_str().to_owned());
        }
        self.run("tojson", &args)?;

        let text = std::fs::read_to_string(&json_path).map_err(|e| {
            Error::Helper(format!(
                "helper reported success but produced no JSON for {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(AssetDocument::from_json(&text)?.with_file_path(path))
    }

    fn write_asset(
        &self,
        asset: &AssetDocument,
        path: &Path,
        mappings: Option<&Mappings>,
    ) -> Result<()> {
        let scratch = tempfile::tempdir()?;
        let json_path = scratch.path().join("asset.json");
        std::fs::write(&json_path, asset.to_pretty_json()?)?;

        let mut args = vec![json_path.as_os_str().to_owned(), path.as_os_str().to_owned()];
        if let Some(mappings) = mappings {
            args.push(mappings.path().as_os_str().to_owned());
        }
        self.run("fromjson", &args)?;

        if !path.exists() {
            return Err(Error::Helper(format!(
                "helper reported success but wrote nothing to {}",
                path.display()
            )));
        }

        Ok(())
    }
}

/// Create the default library backend
pub fn default_backend() -> Box<dyn AssetLibrary> {
    Box::new(HelperBackend::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command() {
        let backend = HelperBackend::new("");
        let result = backend.read_asset(Path::new("x.uasset"), EngineVersion::UE5_4, None);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Empty helper command"), "got: {}", err);
    }

    #[test]
    fn test_nonexistent_command() {
        let backend = HelperBackend::new("nonexistent_uasset_helper --flag");
        let result = backend.read_asset(Path::new("x.uasset"), EngineVersion::UE5_4, None);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to spawn"), "got: {}", err);
    }

    #[test]
    fn test_version_falls_back_to_unknown() {
        let backend = HelperBackend::new("nonexistent_uasset_helper");
        assert_eq!(backend.version(), "unknown");
        assert_eq!(backend.name(), "helper");
    }

    #[cfg(unix)]
    mod helper_script {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        // "Binary" assets are plain JSON here; tojson/fromjson just copy.
        // fromjson also drops a companion .uexp and records its arguments.
        const SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  version) echo "FixtureHelper 1.2.3" ;;
  tojson) cp "$2" "$3" && echo "$4 $5" > "$2.args" ;;
  fromjson) cp "$2" "$3" && printf 'payload' > "${3%.uasset}.uexp" && echo "$4" > "$3.args" ;;
  fail) echo "boom" >&2; exit 3 ;;
  *) echo "unknown command $1" >&2; exit 2 ;;
esac
"#;

        fn helper() -> (TempDir, HelperBackend) {
            let dir = tempfile::tempdir().unwrap();
            let script = dir.path().join("helper.sh");
            std::fs::write(&script, SCRIPT).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            let backend = HelperBackend::new(script.to_str().unwrap());
            (dir, backend)
        }

        #[test]
        fn test_version_from_helper() {
            let (_dir, backend) = helper();
            assert_eq!(backend.version(), "FixtureHelper 1.2.3");
        }

        #[test]
        fn test_read_asset_passes_engine_and_mappings() {
            let (dir, backend) = helper();
            let asset = dir.path().join("BP_Torch.uasset");
            std::fs::write(&asset, r#"{"Exports":[{"ObjectName":"BP_Torch_C"}]}"#).unwrap();
            let mappings = Mappings::new(dir.path().join("Game.usmap"), 0, 0);

            let doc = backend
                .read_asset(&asset, EngineVersion::UE5_3, Some(&mappings))
                .unwrap();
            assert_eq!(doc.export_count(), 1);
            assert_eq!(doc.file_path(), Some(asset.as_path()));

            let args = std::fs::read_to_string(dir.path().join("BP_Torch.uasset.args")).unwrap();
            assert!(args.starts_with("1009 "), "got: {}", args);
            assert!(args.contains("Game.usmap"), "got: {}", args);
        }

        #[test]
        fn test_write_asset_produces_pair() {
            let (dir, backend) = helper();
            let doc = AssetDocument::from_json(r#"{"Exports":[]}"#).unwrap();
            let out = dir.path().join("Out.uasset");

            backend.write_asset(&doc, &out, None).unwrap();
            assert!(out.exists());
            assert!(dir.path().join("Out.uexp").exists());
        }

        #[test]
        fn test_failure_reports_stderr() {
            let (_dir, backend) = helper();
            let err = backend
                .run("fail", std::iter::empty::<&str>())
                .unwrap_err()
                .to_string();
            assert!(err.contains("boom"), "got: {}", err);
            assert!(err.contains("Some(3)"), "got: {}", err);
        }

        #[test]
        fn test_read_asset_invalid_json_from_helper() {
            let (dir, backend) = helper();
            let asset = dir.path().join("Broken.uasset");
            std::fs::write(&asset, "not json at all").unwrap();

            let result = backend.read_asset(&asset, EngineVersion::UE5_4, None);
            assert!(matches!(result, Err(Error::Json(_))), "got: {:?}", result);
        }
    }
}
