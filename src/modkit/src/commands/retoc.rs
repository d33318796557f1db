//! retoc command handler

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use modkit::config::{Config, RETOC, UE_VERSION};
use modkit::retoc::{MOD_NAME_OPTION, SERIALIZATION_OPTION};
use modkit::{RetocCommand, RetocOperation, RetocService};

pub struct RetocArgs {
    pub command: RetocCommand,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub retoc: Option<PathBuf>,
    pub ue_version: Option<String>,
    pub mod_name: Option<String>,
    pub serialization: Option<String>,
    pub json: bool,
}

pub fn handle(args: RetocArgs) -> Result<()> {
    let config = Config::load()?;

    let retoc = args
        .retoc
        .or_else(|| config.preference(RETOC).map(PathBuf::from))
        .context("No retoc executable configured (pass --retoc or run `modkit config set-pref retoc <path>`)")?;

    let output = match (args.command, args.output) {
        (_, Some(output)) => output,
        (RetocCommand::Info | RetocCommand::List, None) => PathBuf::new(),
        (command, None) => bail!("{} requires an output path", command),
    };

    let mut op = RetocOperation::new(args.command, args.input, output);
    if args.command == RetocCommand::ToZen {
        let version = args
            .ue_version
            .or_else(|| config.preference(UE_VERSION).map(str::to_string));
        if let Some(version) = version {
            op = op.with_ue_version(version);
        }
    }
    if let Some(name) = args.mod_name {
        op = op.with_option(MOD_NAME_OPTION, name);
    }
    if let Some(serialization) = args.serialization {
        op = op.with_option(SERIALIZATION_OPTION, serialization);
    }

    let service = RetocService::new(retoc);
    let result = service.run(&op);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", result.output);
        println!("{} ({:?})", result.message, result.duration);
    }

    if !result.success {
        bail!(result
            .error
            .unwrap_or_else(|| "retoc operation failed".to_string()));
    }
    Ok(())
}
