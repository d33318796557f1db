//! Asset export/import command handlers

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use modkit::config::{Config, MAPPINGS};
use modkit::{assets, BatchReport, CancelToken};
use uasset_bridge::{Bridge, EngineVersion};

/// Last-used path keys
const EXPORT_KEY: &str = "export";
const IMPORT_KEY: &str = "import";

pub fn export(
    folder: &Path,
    mappings: Option<PathBuf>,
    engine: Option<EngineVersion>,
    json: bool,
) -> Result<()> {
    run(EXPORT_KEY, folder, mappings, json, |bridge, config, mappings| {
        let engine = engine.unwrap_or_else(|| config.engine_version());
        assets::export_assets(bridge, folder, mappings, engine, &CancelToken::new())
    })
}

pub fn import(folder: &Path, mappings: Option<PathBuf>, json: bool) -> Result<()> {
    run(IMPORT_KEY, folder, mappings, json, |bridge, _, mappings| {
        assets::import_assets(bridge, folder, mappings, &CancelToken::new())
    })
}

fn run(
    key: &str,
    folder: &Path,
    mappings: Option<PathBuf>,
    json: bool,
    batch: impl FnOnce(&Bridge, &Config, Option<&Path>) -> BatchReport,
) -> Result<()> {
    let mut config = Config::load()?;
    let mappings = mappings.or_else(|| config.preference(MAPPINGS).map(PathBuf::from));

    let bridge = Bridge::from_env();
    let report = batch(&bridge, &config, mappings.as_deref());

    config.set_last_used_path(key, folder.display().to_string());
    if let Err(e) = config.save() {
        eprintln!("Warning: could not save config: {:#}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.output);
        if !report.message.is_empty() {
            println!("{}", report.message);
        }
    }

    if !report.success {
        match report.error {
            Some(error) => bail!(error),
            None => bail!("{} file(s) failed", report.files_failed),
        }
    }
    Ok(())
}

/// Handle the count command
pub fn count(folder: &Path) -> Result<()> {
    let (uasset, uexp) = assets::count_asset_files(folder)?;
    let json = assets::count_json_files(folder)?;

    println!("Folder: {}", folder.display());
    println!("  .uasset: {}", uasset);
    println!("  .uexp:   {}", uexp);
    println!("  .json:   {}", json);
    Ok(())
}
