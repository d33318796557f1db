//! Command handlers

pub mod assets;
pub mod configure;
pub mod retoc;

use anyhow::Result;
use uasset_bridge::Bridge;

/// Handle the version command
pub fn version() -> Result<()> {
    let bridge = Bridge::from_env();
    println!("modkit v{}", env!("CARGO_PKG_VERSION"));
    println!("{}", bridge.version());
    Ok(())
}
