//! Batch asset conversion
//!
//! Walks a mod folder and converts every `.uasset` to JSON (export) or every
//! `.json` back to `.uasset`/`.uexp` (import), one bridge handle at a time.
//! Per-file failures are recorded in the report and never abort the batch.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;
use uasset_bridge::{AssetHandle, Bridge, EngineVersion, MappingsHandle};
use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::{Error, Result};

/// Files between progress lines
const PROGRESS_INTERVAL: usize = 10;

/// Outcome of a batch export or import
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// True only when every file converted
    pub success: bool,
    pub message: String,
    /// Human-readable transcript
    pub output: String,
    #[serde(serialize_with = "crate::serialize_duration")]
    pub duration: Duration,
    pub files_processed: usize,
    pub files_failed: usize,
    pub error: Option<String>,
}

impl BatchReport {
    fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Assets are read as this engine version
    Export(EngineVersion),
    /// The engine version travels inside the JSON
    Import,
}

impl Direction {
    fn source_extension(self) -> &'static str {
        match self {
            Direction::Export(_) => "uasset",
            Direction::Import => "json",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Direction::Export(_) => "Export",
            Direction::Import => "Import",
        }
    }

    fn missing_mappings_note(self) -> &'static str {
        match self {
            Direction::Export(_) => "Mappings: None (export may be incomplete)",
            Direction::Import => "Mappings: None (import may fail for unversioned properties)",
        }
    }
}

/// Releases a mappings handle when dropped
struct MappingsGuard<'a> {
    bridge: &'a Bridge,
    handle: MappingsHandle,
}

impl Drop for MappingsGuard<'_> {
    fn drop(&mut self) {
        self.bridge.release_mappings(self.handle);
    }
}

/// Releases an asset handle when dropped
struct AssetGuard<'a> {
    bridge: &'a Bridge,
    handle: AssetHandle,
}

impl Drop for AssetGuard<'_> {
    fn drop(&mut self) {
        self.bridge.release_asset(self.handle);
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or(Error::Bridge(uasset_bridge::Error::InvalidUtf8("path")))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// All files under `folder` with the given extension (case-insensitive), sorted
fn find_files(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn require_folder(folder: &Path) -> Result<()> {
    if !folder.is_dir() {
        return Err(Error::FolderNotFound(folder.to_path_buf()));
    }
    Ok(())
}

/// Export every `.uasset` under `folder` to a `.json` beside it
pub fn export_assets(
    bridge: &Bridge,
    folder: &Path,
    mappings: Option<&Path>,
    engine: EngineVersion,
    cancel: &CancelToken,
) -> BatchReport {
    run_batch(bridge, Direction::Export(engine), folder, mappings, cancel)
}

/// Import every `.json` under `folder` to a `.uasset` (and `.uexp`) beside it
///
/// No engine version is taken: each document carries its own.
pub fn import_assets(
    bridge: &Bridge,
    folder: &Path,
    mappings: Option<&Path>,
    cancel: &CancelToken,
) -> BatchReport {
    run_batch(bridge, Direction::Import, folder, mappings, cancel)
}

fn load_mappings<'a>(bridge: &'a Bridge, path: &Path) -> Result<MappingsGuard<'a>> {
    if !path.is_file() {
        return Err(Error::MappingsNotFound(path.to_path_buf()));
    }
    let handle = bridge.load_mappings(path_str(path)?)?;
    Ok(MappingsGuard { bridge, handle })
}

fn run_batch(
    bridge: &Bridge,
    direction: Direction,
    folder: &Path,
    mappings: Option<&Path>,
    cancel: &CancelToken,
) -> BatchReport {
    let start = Instant::now();

    if let Err(e) = require_folder(folder) {
        return BatchReport::failed(e);
    }

    let mappings_guard = match mappings.map(|path| load_mappings(bridge, path)).transpose() {
        Ok(guard) => guard,
        Err(e @ Error::MappingsNotFound(_)) => return BatchReport::failed(e),
        Err(e) => return BatchReport::failed(format!("Failed to load mappings: {}", e)),
    };
    let mappings_handle = mappings_guard.as_ref().map(|g| g.handle);

    let files = match find_files(folder, direction.source_extension()) {
        Ok(files) => files,
        Err(e) => return BatchReport::failed(e),
    };

    tracing::info!(
        folder = %folder.display(),
        files = files.len(),
        "{} started",
        direction.title().to_lowercase()
    );

    let mut output = String::new();
    let _ = writeln!(output, "=== UAsset {} ===", direction.title());
    let _ = writeln!(output, "Folder: {}", folder.display());
    match mappings {
        Some(path) => {
            let _ = writeln!(output, "Mappings: {}", path.display());
        }
        None => {
            let _ = writeln!(output, "{}", direction.missing_mappings_note());
        }
    }
    let _ = writeln!(
        output,
        "Found {} .{} file(s)\n",
        files.len(),
        direction.source_extension()
    );

    let mut processed = 0;
    let mut failed = 0;

    for (i, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            output.push_str("\n*** Operation cancelled by user ***\n");
            tracing::info!("{} cancelled", direction.title().to_lowercase());
            return BatchReport {
                success: false,
                message: String::new(),
                output,
                duration: start.elapsed(),
                files_processed: processed,
                files_failed: failed,
                error: Some("Operation cancelled".to_string()),
            };
        }

        let name = file.file_name().unwrap_or_default().to_string_lossy();
        let _ = writeln!(output, "[{}/{}] Processing: {}", i + 1, files.len(), name);

        let converted = match direction {
            Direction::Export(engine) => export_one(bridge, file, engine, mappings_handle),
            Direction::Import => import_one(bridge, file, mappings_handle),
        };

        match converted {
            Ok(target) => {
                let target = target.file_name().unwrap_or_default().to_string_lossy();
                let _ = writeln!(output, "  ✓ {}ed to: {}", direction.title(), target);
                processed += 1;
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), "{:#}", e);
                let _ = writeln!(output, "  ✗ {:#}", e);
                failed += 1;
            }
        }

        if (processed + failed) % PROGRESS_INTERVAL == 0 {
            let _ = writeln!(
                output,
                "Progress: {}/{} files processed",
                processed + failed,
                files.len()
            );
            tracing::info!("{}/{} files processed", processed + failed, files.len());
        }
    }

    let duration = start.elapsed();
    let _ = writeln!(output, "\n=== {} Complete ===", direction.title());
    let _ = writeln!(output, "Successfully processed: {} files", processed);
    let _ = writeln!(output, "Failed: {} files", failed);
    let _ = writeln!(output, "Duration: {:?}", duration);

    let message = format!(
        "{} completed - {} successful, {} failed",
        direction.title(),
        processed,
        failed
    );
    tracing::info!("{}", message);

    BatchReport {
        success: failed == 0,
        message,
        output,
        duration,
        files_processed: processed,
        files_failed: failed,
        error: None,
    }
}

fn export_one(
    bridge: &Bridge,
    file: &Path,
    engine: EngineVersion,
    mappings: Option<MappingsHandle>,
) -> anyhow::Result<PathBuf> {
    let handle = bridge
        .load_asset(path_str(file)?, engine, mappings)
        .context("Failed to load")?;
    let asset = AssetGuard { bridge, handle };

    let json = bridge
        .serialize_to_json(asset.handle)
        .context("Failed to serialize")?;

    let json_path = file.with_extension("json");
    fs::write(&json_path, json).context("Failed to write JSON")?;
    Ok(json_path)
}

fn import_one(
    bridge: &Bridge,
    file: &Path,
    mappings: Option<MappingsHandle>,
) -> anyhow::Result<PathBuf> {
    let json = fs::read_to_string(file).context("Failed to read JSON")?;

    let handle = bridge
        .deserialize_from_json(&json)
        .context("Failed to deserialize")?;
    let asset = AssetGuard { bridge, handle };

    let uasset_path = file.with_extension("uasset");
    bridge
        .write_to_file(asset.handle, path_str(&uasset_path)?, mappings)
        .context("Failed to write asset")?;
    Ok(uasset_path)
}

/// Count `.uasset` and `.uexp` files under `folder`
pub fn count_asset_files(folder: &Path) -> Result<(usize, usize)> {
    require_folder(folder)?;
    let uasset = find_files(folder, "uasset")?.len();
    let uexp = find_files(folder, "uexp")?.len();
    Ok((uasset, uexp))
}

/// Count `.json` files under `folder`
pub fn count_json_files(folder: &Path) -> Result<usize> {
    require_folder(folder)?;
    Ok(find_files(folder, "json")?.len())
}
