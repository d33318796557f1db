//! retoc subprocess service
//!
//! Wraps the external `retoc` tool for IoStore package work: packing legacy
//! assets into zen containers, unpacking, and inspection. Each run gets an
//! operation id and can be cancelled by id or by command from another thread.
//!
//! ## Example
//!
//! ```no_run
//! use modkit::{RetocCommand, RetocOperation, RetocService};
//!
//! let service = RetocService::new("tools/retoc/retoc");
//! let op = RetocOperation::new(RetocCommand::ToZen, "Mods/MyMod", "Paks")
//!     .with_ue_version("UE5_4")
//!     .with_option("--mod-name", "MyMod")
//!     .with_option("--serialization", "7");
//! let result = service.run(&op);
//! println!("{}: {}", result.operation_id, result.message);
//! ```

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::{Error, Result};

/// How often a running child is checked for exit or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Serialization used when none is given
const DEFAULT_SERIALIZATION: &str = "0001";

/// Option naming the mod in packed output file names
pub const MOD_NAME_OPTION: &str = "--mod-name";
/// Option giving the load-order number in packed output file names
pub const SERIALIZATION_OPTION: &str = "--serialization";

/// Files retoc produces for a to-zen run
const ZEN_EXTENSIONS: [&str; 3] = ["utoc", "ucas", "pak"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetocCommand {
    /// Legacy assets -> IoStore container
    ToZen,
    /// IoStore container -> legacy assets
    ToLegacy,
    /// Extract container contents
    Unpack,
    /// Print container metadata
    Info,
    /// List container contents
    List,
}

impl RetocCommand {
    pub const ALL: [RetocCommand; 5] = [
        RetocCommand::ToZen,
        RetocCommand::ToLegacy,
        RetocCommand::Unpack,
        RetocCommand::Info,
        RetocCommand::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RetocCommand::ToZen => "to-zen",
            RetocCommand::ToLegacy => "to-legacy",
            RetocCommand::Unpack => "unpack",
            RetocCommand::Info => "info",
            RetocCommand::List => "list",
        }
    }
}

impl fmt::Display for RetocCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetocCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCommand(s.to_string()))
    }
}

/// One retoc invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetocOperation {
    pub command: RetocCommand,
    pub input_path: PathBuf,
    /// Output directory for to-zen, output path otherwise; unused by info/list
    #[serde(default)]
    pub output_path: PathBuf,
    #[serde(default)]
    pub ue_version: Option<String>,
    /// Flag/value pairs such as `--mod-name MyMod`
    #[serde(default)]
    pub options: Vec<String>,
}

impl RetocOperation {
    pub fn new(command: RetocCommand, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            command,
            input_path: input.into(),
            output_path: output.into(),
            ue_version: None,
            options: Vec::new(),
        }
    }

    pub fn with_ue_version(mut self, version: impl Into<String>) -> Self {
        self.ue_version = Some(version.into());
        self
    }

    pub fn with_option(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(flag.into());
        self.options.push(value.into());
        self
    }

    /// Value following the last occurrence of `flag`, ignoring empty values
    fn option(&self, flag: &str) -> Option<&str> {
        self.options
            .windows(2)
            .filter(|pair| pair[0] == flag && !pair[1].is_empty())
            .last()
            .map(|pair| pair[1].as_str())
    }

    /// Input folder name; retoc names to-zen output after it
    fn base_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string())
    }

    /// Copy with input and output resolved against the current directory
    ///
    /// retoc runs from its own directory, so relative paths would otherwise
    /// point somewhere else. An empty output stays empty.
    fn to_absolute(&self) -> std::io::Result<Self> {
        let mut op = self.clone();
        op.input_path = std::path::absolute(&self.input_path)?;
        if !self.output_path.as_os_str().is_empty() {
            op.output_path = std::path::absolute(&self.output_path)?;
        }
        Ok(op)
    }

    fn zen_output(&self, extension: &str) -> PathBuf {
        self.output_path
            .join(format!("{}.{}", self.base_name(), extension))
    }

    /// Command line passed to retoc
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.command.as_str().into()];

        match self.command {
            RetocCommand::ToLegacy | RetocCommand::Unpack => {
                args.push(self.input_path.clone().into());
                args.push(self.output_path.clone().into());
            }
            RetocCommand::ToZen => {
                if let Some(version) = self.ue_version.as_deref().filter(|v| !v.is_empty()) {
                    args.push("--version".into());
                    args.push(version.into());
                }
                // retoc wants the .utoc file, not the directory
                args.push(self.input_path.clone().into());
                args.push(self.zen_output("utoc").into());
            }
            RetocCommand::Info | RetocCommand::List => {
                args.push(self.input_path.clone().into());
            }
        }

        args
    }

    /// `z_<mod>_<serial>_p`, the prefix packed mods are loaded under
    pub fn packed_stem(&self) -> String {
        let mod_name = self
            .option(MOD_NAME_OPTION)
            .map(str::to_string)
            .unwrap_or_else(|| self.base_name());
        let serialization = self
            .option(SERIALIZATION_OPTION)
            .map(normalize_serialization)
            .unwrap_or_else(|| DEFAULT_SERIALIZATION.to_string());
        format!("z_{}_{}_p", mod_name, serialization)
    }
}

/// Leading integer of `s` (after whitespace) modulo 10000, if any
///
/// Only the last four digits matter, so runs of any length are accepted.
fn leading_integer_mod_10000(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    let n: i64 = rest[len.saturating_sub(4)..len].parse().ok()?;
    Some(if negative { -n } else { n })
}

/// Force a serialization number to exactly four characters
///
/// Numbers are taken modulo 10000 and zero-padded; anything else is
/// truncated or left-padded with zeros.
pub fn normalize_serialization(raw: &str) -> String {
    if let Some(n) = leading_integer_mod_10000(raw) {
        return format!("{:04}", n);
    }
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() >= 4 {
        chars[..4].iter().collect()
    } else {
        format!("{}{}", "0".repeat(4 - chars.len()), raw)
    }
}

/// Outcome of a retoc run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetocResult {
    pub success: bool,
    pub message: String,
    /// Combined stdout and stderr lines in arrival order
    pub output: String,
    pub error: Option<String>,
    #[serde(serialize_with = "crate::serialize_duration")]
    pub duration: Duration,
    /// Id usable with [`RetocService::cancel`] while running
    pub operation_id: String,
}

impl RetocResult {
    fn failed(operation_id: &str, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            operation_id: operation_id.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Running {
    by_id: HashMap<String, CancelToken>,
    // Latest operation per command
    by_command: HashMap<RetocCommand, String>,
}

/// Runs retoc operations; safe to share between threads
pub struct RetocService {
    retoc_path: PathBuf,
    running: Mutex<Running>,
}

/// Unregisters an operation when the run ends
struct Registration<'a> {
    service: &'a RetocService,
    id: String,
    command: RetocCommand,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut running = self.service.running();
        running.by_id.remove(&self.id);
        if running.by_command.get(&self.command) == Some(&self.id) {
            running.by_command.remove(&self.command);
        }
    }
}

fn stream_lines<R: Read + Send + 'static>(
    reader: R,
    operation_id: String,
    lines: Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            tracing::info!(operation = %operation_id, "[retoc] {}", line);
            if lines.send(line).is_err() {
                break;
            }
        }
    })
}

impl RetocService {
    pub fn new(retoc_path: impl Into<PathBuf>) -> Self {
        Self {
            retoc_path: retoc_path.into(),
            running: Mutex::new(Running::default()),
        }
    }

    pub fn retoc_path(&self) -> &Path {
        &self.retoc_path
    }

    fn running(&self) -> MutexGuard<'_, Running> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, command: RetocCommand) -> (Registration<'_>, CancelToken) {
        let id = Uuid::new_v4().to_string();
        let token = CancelToken::new();

        let mut running = self.running();
        running.by_id.insert(id.clone(), token.clone());
        running.by_command.insert(command, id.clone());

        let registration = Registration {
            service: self,
            id,
            command,
        };
        (registration, token)
    }

    /// Id of the running operation for `command`, if any
    pub fn operation_for(&self, command: RetocCommand) -> Option<String> {
        self.running().by_command.get(&command).cloned()
    }

    /// Run an operation to completion (or cancellation)
    pub fn run(&self, operation: &RetocOperation) -> RetocResult {
        let start = Instant::now();
        let (registration, cancel) = self.register(operation.command);
        let id = registration.id.clone();

        if !self.retoc_path.is_file() {
            return RetocResult::failed(&id, Error::RetocNotFound(self.retoc_path.clone()));
        }

        let resolved = std::path::absolute(&self.retoc_path)
            .and_then(|retoc_path| Ok((retoc_path, operation.to_absolute()?)));
        let (retoc_path, operation) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => return RetocResult::failed(&id, format!("Failed to resolve paths: {}", e)),
        };

        let args = operation.arguments();
        tracing::info!(
            operation = %id,
            "running {} {}",
            retoc_path.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut command = Command::new(&retoc_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // retoc loads its oodle library from beside the executable
        if let Some(dir) = retoc_path.parent() {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return RetocResult::failed(&id, format!("Failed to start retoc: {}", e)),
        };

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(stream_lines(stdout, id.clone(), tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(stream_lines(stderr, id.clone(), tx.clone()));
        }
        drop(tx);

        let mut cancelled = false;
        let status = loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break stop(&mut child, &id);
            }
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => break Err(e),
            }
        };

        // Descendants of a killed or unreaped retoc can keep the pipes open,
        // so the readers are only joined after a normal exit
        if !cancelled && status.is_ok() {
            for reader in readers {
                let _ = reader.join();
            }
        } else {
            tracing::debug!(operation = %id, "not waiting for retoc output readers");
        }
        let mut output = String::new();
        for line in rx.try_iter() {
            output.push_str(&line);
            output.push('\n');
        }

        let mut result = RetocResult {
            output,
            duration: start.elapsed(),
            operation_id: id.clone(),
            ..Default::default()
        };

        if cancelled {
            result.message = "Operation cancelled by user".to_string();
            result.error = Some("cancelled".to_string());
            tracing::info!(operation = %id, "retoc cancelled");
            return result;
        }

        match status {
            Ok(status) if status.success() => {
                result.success = true;
                result.message = "Retoc operation completed successfully".to_string();

                if operation.command == RetocCommand::ToZen {
                    if let Err(e) = rename_output_files(&operation) {
                        tracing::warn!(operation = %id, "{:#}", e);
                        result
                            .message
                            .push_str(&format!(" (Warning: File renaming failed: {:#})", e));
                    }
                }
            }
            Ok(status) => {
                result.message = "Retoc operation failed".to_string();
                result.error = Some(status.to_string());
            }
            Err(e) => {
                result.message = "Retoc operation failed".to_string();
                result.error = Some(e.to_string());
            }
        }

        tracing::info!(operation = %id, success = result.success, "{}", result.message);
        result
    }

    /// Cancel a running operation by id
    pub fn cancel(&self, operation_id: &str) -> Result<()> {
        let running = self.running();
        let token = running
            .by_id
            .get(operation_id)
            .ok_or_else(|| Error::OperationNotFound(operation_id.to_string()))?;
        token.cancel();
        Ok(())
    }

    /// Cancel the latest running operation of `command`
    pub fn cancel_command(&self, command: RetocCommand) -> Result<()> {
        let id = self
            .operation_for(command)
            .ok_or(Error::NoRunningOperation(command))?;
        self.cancel(&id)
    }
}

/// Kill a cancelled child and reap it without blocking on a failed kill
fn stop(child: &mut Child, operation_id: &str) -> std::io::Result<ExitStatus> {
    match child.kill() {
        Ok(()) => child.wait(),
        Err(e) => {
            tracing::warn!(operation = %operation_id, "failed to kill retoc: {}", e);
            child
                .try_wait()?
                .ok_or_else(|| std::io::Error::other("retoc is still running after a failed kill"))
        }
    }
}

/// Rename to-zen output to the packed mod naming scheme
///
/// Returns the new paths of the files that existed.
pub fn rename_output_files(operation: &RetocOperation) -> anyhow::Result<Vec<PathBuf>> {
    let stem = operation.packed_stem();
    let mut renamed = Vec::new();

    for extension in ZEN_EXTENSIONS {
        let from = operation.zen_output(extension);
        if !from.exists() {
            continue;
        }
        let to = operation.output_path.join(format!("{}.{}", stem, extension));
        std::fs::rename(&from, &to)
            .with_context(|| format!("failed to rename {} to {}", from.display(), to.display()))?;
        renamed.push(to);
    }

    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        for command in RetocCommand::ALL {
            assert_eq!(command.as_str().parse::<RetocCommand>().unwrap(), command);
        }
        assert!(matches!(
            "repack".parse::<RetocCommand>(),
            Err(Error::UnknownCommand(name)) if name == "repack"
        ));
    }

    #[test]
    fn test_operation_deserializes_kebab_case() {
        let op: RetocOperation = serde_json::from_str(
            r#"{"command":"to-legacy","input_path":"in","output_path":"out"}"#,
        )
        .unwrap();
        assert_eq!(op.command, RetocCommand::ToLegacy);
        assert!(op.options.is_empty());
        assert_eq!(op.ue_version, None);
    }

    #[test]
    fn test_to_zen_arguments() {
        let op = RetocOperation::new(RetocCommand::ToZen, "/mods/MyMod", "/paks")
            .with_ue_version("UE5_4");
        let args: Vec<_> = op.arguments();
        assert_eq!(
            args,
            vec![
                OsString::from("to-zen"),
                "--version".into(),
                "UE5_4".into(),
                "/mods/MyMod".into(),
                PathBuf::from("/paks").join("MyMod.utoc").into(),
            ]
        );

        let op = RetocOperation::new(RetocCommand::ToZen, "/mods/MyMod", "/paks").with_ue_version("");
        assert_eq!(op.arguments().len(), 3);
    }

    #[test]
    fn test_other_arguments() {
        let op = RetocOperation::new(RetocCommand::Unpack, "a.utoc", "out");
        assert_eq!(op.arguments(), vec![OsString::from("unpack"), "a.utoc".into(), "out".into()]);

        let op = RetocOperation::new(RetocCommand::ToLegacy, "a.utoc", "out");
        assert_eq!(op.arguments()[0], "to-legacy");

        let op = RetocOperation::new(RetocCommand::List, "a.utoc", "ignored");
        assert_eq!(op.arguments(), vec![OsString::from("list"), "a.utoc".into()]);
    }

    #[test]
    fn test_paths_resolved_against_current_dir() {
        let cwd = std::env::current_dir().unwrap();

        let op = RetocOperation::new(RetocCommand::Info, "game.utoc", "").to_absolute().unwrap();
        assert_eq!(op.input_path, cwd.join("game.utoc"));
        assert_eq!(op.output_path, PathBuf::new());

        let op = RetocOperation::new(RetocCommand::ToZen, "Mods/MyMod", "Paks")
            .to_absolute()
            .unwrap();
        assert_eq!(op.output_path, cwd.join("Paks"));
        assert_eq!(op.packed_stem(), "z_MyMod_0001_p");
        assert_eq!(op.arguments()[2], cwd.join("Paks").join("MyMod.utoc").into_os_string());
    }

    #[test]
    fn test_normalize_serialization() {
        assert_eq!(normalize_serialization("7"), "0007");
        assert_eq!(normalize_serialization("0042"), "0042");
        assert_eq!(normalize_serialization("123456"), "3456");
        assert_eq!(normalize_serialization("12ab"), "0012");
        assert_eq!(normalize_serialization("-5"), "-005");
        assert_eq!(normalize_serialization("123456789012345678901234"), "1234");
        assert_eq!(normalize_serialization("-99999999999999999999"), "-9999");
        assert_eq!(normalize_serialization("+00000000000000000000007x"), "0007");
        assert_eq!(normalize_serialization("ab"), "00ab");
        assert_eq!(normalize_serialization("abcdef"), "abcd");
    }

    #[test]
    fn test_packed_stem() {
        let op = RetocOperation::new(RetocCommand::ToZen, "/mods/MyMod", "/paks");
        assert_eq!(op.packed_stem(), "z_MyMod_0001_p");

        let op = op
            .with_option(MOD_NAME_OPTION, "Torches")
            .with_option(SERIALIZATION_OPTION, "12");
        assert_eq!(op.packed_stem(), "z_Torches_0012_p");

        // Empty values keep the defaults
        let op = RetocOperation::new(RetocCommand::ToZen, "/mods/MyMod", "/paks")
            .with_option(MOD_NAME_OPTION, "");
        assert_eq!(op.packed_stem(), "z_MyMod_0001_p");
    }

    #[test]
    fn test_rename_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("Paks");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("MyMod.utoc"), b"toc").unwrap();
        std::fs::write(out.join("MyMod.ucas"), b"cas").unwrap();

        let op = RetocOperation::new(RetocCommand::ToZen, dir.path().join("MyMod"), &out)
            .with_option(SERIALIZATION_OPTION, "3");
        let renamed = rename_output_files(&op).unwrap();

        assert_eq!(renamed.len(), 2);
        assert!(out.join("z_MyMod_0003_p.utoc").exists());
        assert!(out.join("z_MyMod_0003_p.ucas").exists());
        assert!(!out.join("MyMod.utoc").exists());
        assert!(!out.join("z_MyMod_0003_p.pak").exists());
    }

    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let service = RetocService::new(dir.path().join("retoc"));
        let op = RetocOperation::new(RetocCommand::Info, "a.utoc", "");

        let result = service.run(&op);
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("retoc not found at"));
        assert!(!result.operation_id.is_empty());
        assert_eq!(service.operation_for(RetocCommand::Info), None);
    }

    #[test]
    fn test_cancel_unknown() {
        let service = RetocService::new("retoc");
        assert!(matches!(
            service.cancel("nope"),
            Err(Error::OperationNotFound(_))
        ));
        assert!(matches!(
            service.cancel_command(RetocCommand::Unpack),
            Err(Error::NoRunningOperation(RetocCommand::Unpack))
        ));
    }

    #[cfg(unix)]
    mod fake_retoc {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        const SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  to-zen)
    for last; do :; done
    base="${last%.utoc}"
    touch "$last" "$base.ucas" "$base.pak"
    echo "packed $last"
    ;;
  info)
    echo "cwd=$(pwd)"
    echo "container $2"
    echo "warning: legacy header" >&2
    ;;
  unpack)
    # the sleep outlives a killed shell and keeps stdout open
    echo "unpacking $2"
    sleep 30
    ;;
  *) echo "bad input" >&2; exit 2 ;;
esac
"#;

        fn retoc() -> (TempDir, RetocService) {
            let dir = tempfile::tempdir().unwrap();
            let tools = dir.path().join("tools");
            std::fs::create_dir_all(&tools).unwrap();
            let script = tools.join("retoc");
            std::fs::write(&script, SCRIPT).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            (dir, RetocService::new(script))
        }

        #[test]
        fn test_info_collects_output() {
            let (dir, service) = retoc();
            let op = RetocOperation::new(RetocCommand::Info, "game.utoc", "");

            let result = service.run(&op);
            assert!(result.success, "{:?}", result);
            assert_eq!(result.message, "Retoc operation completed successfully");
            let container = std::env::current_dir().unwrap().join("game.utoc");
            assert!(result.output.contains(&format!("container {}", container.display())));
            assert!(result.output.contains("warning: legacy header"));
            assert!(result.output.contains("tools"), "runs beside the executable");
            assert!(dir.path().exists());
        }

        #[test]
        fn test_failure_reports_exit_status() {
            let (_dir, service) = retoc();
            let op = RetocOperation::new(RetocCommand::ToLegacy, "a.utoc", "out");

            let result = service.run(&op);
            assert!(!result.success);
            assert_eq!(result.message, "Retoc operation failed");
            assert!(result.error.unwrap().contains('2'));
            assert!(result.output.contains("bad input"));
        }

        #[test]
        fn test_to_zen_renames_output() {
            let (dir, service) = retoc();
            let input = dir.path().join("MyMod");
            let out = dir.path().join("Paks");
            std::fs::create_dir_all(&input).unwrap();
            std::fs::create_dir_all(&out).unwrap();

            let op = RetocOperation::new(RetocCommand::ToZen, &input, &out)
                .with_ue_version("UE5_4")
                .with_option(MOD_NAME_OPTION, "Torches")
                .with_option(SERIALIZATION_OPTION, "42");
            let result = service.run(&op);

            assert!(result.success, "{:?}", result);
            for ext in ZEN_EXTENSIONS {
                assert!(out.join(format!("z_Torches_0042_p.{}", ext)).exists());
            }
        }

        #[test]
        fn test_cancel_by_command() {
            let (_dir, service) = retoc();
            let op = RetocOperation::new(RetocCommand::Unpack, "a.utoc", "out");

            let result = thread::scope(|scope| {
                let running = scope.spawn(|| service.run(&op));
                let started = Instant::now();
                while service.operation_for(RetocCommand::Unpack).is_none() {
                    assert!(started.elapsed() < Duration::from_secs(10));
                    thread::sleep(Duration::from_millis(10));
                }
                service.cancel_command(RetocCommand::Unpack).unwrap();
                running.join().unwrap()
            });

            assert!(!result.success);
            assert_eq!(result.message, "Operation cancelled by user");
            assert_eq!(result.error.as_deref(), Some("cancelled"));
            // Returns without waiting on the orphaned sleep holding the pipe
            assert!(result.duration < Duration::from_secs(10), "{:?}", result.duration);
            assert_eq!(service.operation_for(RetocCommand::Unpack), None);
        }

        /// `path` relative to the current directory, via `..` components
        fn relative_to_cwd(path: &Path) -> PathBuf {
            let cwd = std::env::current_dir().unwrap();
            let mut relative = PathBuf::new();
            for _ in cwd.components().skip(1) {
                relative.push("..");
            }
            relative.join(path.strip_prefix("/").unwrap())
        }

        #[test]
        fn test_to_zen_with_relative_paths() {
            let (dir, service) = retoc();
            let input = dir.path().join("MyMod");
            let out = dir.path().join("Paks");
            std::fs::create_dir_all(&input).unwrap();
            std::fs::create_dir_all(&out).unwrap();

            let service = RetocService::new(relative_to_cwd(service.retoc_path()));
            let op = RetocOperation::new(
                RetocCommand::ToZen,
                relative_to_cwd(&input),
                relative_to_cwd(&out),
            )
            .with_option(SERIALIZATION_OPTION, "9");
            assert!(op.output_path.is_relative());

            let result = service.run(&op);

            assert!(result.success, "{:?}", result);
            assert!(!result.message.contains("Warning"), "{}", result.message);
            for ext in ZEN_EXTENSIONS {
                assert!(out.join(format!("z_MyMod_0009_p.{}", ext)).exists());
            }
            assert!(!dir.path().join("tools").join("Paks").exists());
        }
    }
}
