mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modkit=info,uasset_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => commands::version()?,

        Commands::Export {
            folder,
            mappings,
            engine,
            json,
        } => {
            commands::assets::export(&folder, mappings, engine, json)?;
        }

        Commands::Import {
            folder,
            mappings,
            json,
        } => {
            commands::assets::import(&folder, mappings, json)?;
        }

        Commands::Count { folder } => commands::assets::count(&folder)?,

        Commands::Retoc {
            command,
            input,
            output,
            retoc,
            ue_version,
            mod_name,
            serialization,
            json,
        } => {
            commands::retoc::handle(commands::retoc::RetocArgs {
                command,
                input,
                output,
                retoc,
                ue_version,
                mod_name,
                serialization,
                json,
            })?;
        }

        Commands::Config { command } => commands::configure::handle(command)?,
    }

    Ok(())
}
