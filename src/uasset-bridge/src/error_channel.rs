//! Per-thread last-error slot
//!
//! Entry points report success or failure through their return value only;
//! the diagnostic text travels through this side channel. Each thread has its
//! own slot, so concurrent callers never see each other's messages.

use std::cell::RefCell;
use std::ffi::{c_char, CString};

/// Returned by [`export_last_error`] when no error is stored
pub const NO_ERROR: &str = "No error";

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Reset the calling thread's stored error
pub fn clear() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}

/// Overwrite the calling thread's stored error
pub fn set(message: impl Into<String>) {
    let message = message.into();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Current error for the calling thread, empty if none
pub fn get() -> String {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Caller-owned copy of the current error, never null
///
/// Substitutes [`NO_ERROR`] when the slot is empty. If the message cannot be
/// turned into a C string, a fallback describing why is returned instead.
pub fn export_last_error() -> *mut c_char {
    let message = get();
    let message = if message.is_empty() {
        NO_ERROR.to_string()
    } else {
        message
    };

    match CString::new(message) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            // NulError keeps the bytes; drop the NULs so the fallback itself can't fail
            let reason = format!("Error retrieving last error: {}", e);
            let bytes: Vec<u8> = reason.into_bytes().into_iter().filter(|b| *b != 0).collect();
            CString::new(bytes).unwrap_or_default().into_raw()
        }
    }
}

/// Release a string previously returned by the bridge
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by this crate that has not been
/// freed yet.
pub unsafe fn free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr));
}
