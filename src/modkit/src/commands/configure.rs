//! Configuration command handlers

use anyhow::Result;
use modkit::Config;

use crate::cli::ConfigCommand;

pub fn handle(command: ConfigCommand) -> Result<()> {
    let mut config = Config::load()?;

    match command {
        ConfigCommand::Show => show_config(&config),
        ConfigCommand::SetPref { key, value } => {
            println!("{} = {}", key, value);
            config.set_preference(key, value);
            save(&config)?;
        }
        ConfigCommand::SetPath { key, path } => {
            println!("{} -> {}", key, path);
            config.set_last_used_path(key, path);
            save(&config)?;
        }
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("Preferences:");
    for (key, value) in &config.preferences {
        println!("  {} = {}", key, value);
    }

    println!("Last used paths:");
    if config.last_used_paths.is_empty() {
        println!("  (none)");
    }
    for (key, path) in &config.last_used_paths {
        println!("  {} -> {}", key, path);
    }

    println!("Engine version: {}", config.engine_version());
    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

fn save(config: &Config) -> Result<()> {
    config.save()?;
    if let Ok(path) = Config::config_path() {
        println!("Config saved to: {}", path.display());
    }
    Ok(())
}
