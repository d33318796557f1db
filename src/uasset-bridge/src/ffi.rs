//! C ABI entry points
//!
//! All functions are callable from C, Go (cgo), C# and friends. Handles are
//! `uintptr_t`, strings are null-terminated UTF-8.
//!
//! Memory ownership rules:
//! - Handles: the bridge owns the resource, caller must call `FreeMappings` / `FreeAsset`
//! - Strings returned by the bridge: caller must call `FreeString`
//! - Strings passed to the bridge: caller owns, the bridge only reads
//!
//! No error or panic ever unwinds out of these functions. Failures return the
//! documented sentinel and leave `"<Operation>: <reason>"` in the calling
//! thread's last-error slot (see `GetLastErrorString`).

use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;

use crate::bridge::{AssetHandle, Bridge, MappingsHandle};
use crate::engine::EngineVersion;
use crate::error_channel;
use crate::{Error, HandleKind, Result};

/// Environment variable enabling stderr logging (value is an `EnvFilter`)
pub const LOG_ENV: &str = "UASSET_BRIDGE_LOG";

/// Returned by `GetVersion` if the version text can't be marshaled
const VERSION_FALLBACK: &CStr = c"uasset-bridge (version unavailable)";

static BRIDGE: Lazy<Bridge> = Lazy::new(|| {
    init_logging();
    let bridge = Bridge::from_env();
    tracing::info!("bridge initialized with {} backend", bridge.library().name());
    bridge
});

fn init_logging() {
    let Ok(filter) = std::env::var(LOG_ENV) else {
        return;
    };
    // The host may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .try_init();
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a fallible operation under the uniform failure protocol
fn guarded<T>(operation: &str, failed: T, body: impl FnOnce(&Bridge) -> Result<T>) -> T {
    error_channel::clear();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&BRIDGE)))
        .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))));

    match outcome {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("{} failed: {}", operation, e);
            error_channel::set(format!("{}: {}", operation, e));
            failed
        }
    }
}

/// Run a release operation: never fails, never touches the error slot
fn best_effort(operation: &str, body: impl FnOnce(&Bridge)) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body(&BRIDGE))) {
        tracing::warn!(
            "{} warning: {}",
            operation,
            panic_message(payload.as_ref())
        );
    }
}

/// Borrow a caller string
///
/// # Safety
///
/// `ptr` must be null or point to a null-terminated string that stays valid
/// for the duration of the call.
unsafe fn read_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::NullArgument(what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| Error::InvalidUtf8(what))
}

fn into_c_string(s: String) -> Result<*mut c_char> {
    Ok(CString::new(s)?.into_raw())
}

fn asset_handle(raw: usize) -> Result<AssetHandle> {
    AssetHandle::from_raw(raw).ok_or_else(|| Error::invalid_handle(HandleKind::Asset, "null"))
}

fn optional_mappings(raw: usize) -> Option<MappingsHandle> {
    MappingsHandle::from_raw(raw)
}

/// Version of the bridge and its library backend
///
/// Never null. Caller must call `FreeString`.
#[export_name = "GetVersion"]
pub extern "C" fn get_version() -> *mut c_char {
    let version = guarded("GetVersion", None, |bridge| {
        into_c_string(bridge.version()).map(Some)
    });
    version.unwrap_or_else(|| VERSION_FALLBACK.to_owned().into_raw())
}

/// Load a .usmap mappings file
///
/// Returns a handle, or 0 on failure. Caller must call `FreeMappings`.
///
/// # Safety
///
/// `path` must be null or a valid null-terminated string.
#[export_name = "LoadMappings"]
pub unsafe extern "C" fn load_mappings(path: *const c_char) -> usize {
    guarded("LoadMappings", 0, |bridge| {
        let path = read_str(path, "path")?;
        Ok(bridge.load_mappings(path)?.into_raw())
    })
}

/// Release a mappings handle; 0 is ignored
#[export_name = "FreeMappings"]
pub extern "C" fn free_mappings(mappings: usize) {
    let Some(handle) = MappingsHandle::from_raw(mappings) else {
        return;
    };
    best_effort("FreeMappings", |bridge| bridge.release_mappings(handle));
}

/// Load a .uasset file
///
/// `mappings` may be 0. Returns a handle, or 0 on failure. Caller must call
/// `FreeAsset`.
///
/// # Safety
///
/// `path` must be null or a valid null-terminated string.
#[export_name = "LoadAsset"]
pub unsafe extern "C" fn load_asset(path: *const c_char, engine_version: i32, mappings: usize) -> usize {
    guarded("LoadAsset", 0, |bridge| {
        let path = read_str(path, "path")?;
        let engine = EngineVersion::from(engine_version);
        Ok(bridge
            .load_asset(path, engine, optional_mappings(mappings))?
            .into_raw())
    })
}

/// Release an asset handle; 0 is ignored
#[export_name = "FreeAsset"]
pub extern "C" fn free_asset(asset: usize) {
    let Some(handle) = AssetHandle::from_raw(asset) else {
        return;
    };
    best_effort("FreeAsset", |bridge| bridge.release_asset(handle));
}

/// Number of exports in an asset, or -1 on failure
#[export_name = "GetAssetExportCount"]
pub extern "C" fn get_asset_export_count(asset: usize) -> i32 {
    guarded("GetAssetExportCount", -1, |bridge| {
        let count = bridge.export_count(asset_handle(asset)?)?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    })
}

/// Pretty-printed JSON of an asset, or null on failure
///
/// Caller must call `FreeString`.
#[export_name = "SerializeAssetToJson"]
pub extern "C" fn serialize_asset_to_json(asset: usize) -> *mut c_char {
    guarded("SerializeAssetToJson", std::ptr::null_mut(), |bridge| {
        into_c_string(bridge.serialize_to_json(asset_handle(asset)?)?)
    })
}

/// Build an asset from JSON text
///
/// Returns a handle, or 0 on failure. Caller must call `FreeAsset`.
///
/// # Safety
///
/// `json` must be null or a valid null-terminated string.
#[export_name = "DeserializeAssetFromJson"]
pub unsafe extern "C" fn deserialize_asset_from_json(json: *const c_char) -> usize {
    guarded("DeserializeAssetFromJson", 0, |bridge| {
        let json = read_str(json, "json")?;
        Ok(bridge.deserialize_from_json(json)?.into_raw())
    })
}

/// Write an asset to .uasset/.uexp files
///
/// `mappings` may be 0; a non-zero handle replaces the asset's attached
/// mapping table. Returns 1 on success, 0 on failure.
///
/// # Safety
///
/// `path` must be null or a valid null-terminated string.
#[export_name = "WriteAssetToFile"]
pub unsafe extern "C" fn write_asset_to_file(asset: usize, path: *const c_char, mappings: usize) -> i32 {
    guarded("WriteAssetToFile", 0, |bridge| {
        let asset = asset_handle(asset)?;
        let path = read_str(path, "path")?;
        bridge.write_to_file(asset, path, optional_mappings(mappings))?;
        Ok(1)
    })
}

/// Path an asset was loaded from (empty for JSON-built assets), or null on failure
///
/// Caller must call `FreeString`.
#[export_name = "GetAssetFilePath"]
pub extern "C" fn get_asset_file_path(asset: usize) -> *mut c_char {
    guarded("GetAssetFilePath", std::ptr::null_mut(), |bridge| {
        into_c_string(bridge.file_path(asset_handle(asset)?)?)
    })
}

/// Last error on the calling thread, `"No error"` if none
///
/// Never null. Caller must call `FreeString`.
#[export_name = "GetLastErrorString"]
pub extern "C" fn get_last_error_string() -> *mut c_char {
    error_channel::export_last_error()
}

/// Free a string returned by any bridge function; null is ignored
///
/// # Safety
///
/// `ptr` must be null or a string returned by this library that has not been
/// freed yet.
#[export_name = "FreeString"]
pub unsafe extern "C" fn free_string(ptr: *mut c_char) {
    error_channel::free_string(ptr);
}
