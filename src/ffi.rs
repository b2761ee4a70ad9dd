//! FFI bindings for the attendance matrix engine
//!
//! This module provides C-compatible functions so a desktop host can run the
//! engine on a background worker. All functions take C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `attendance_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;

use crate::pipeline::{generate_report, records_to_report_json};
use crate::source::InMemorySource;
use crate::types::ReportScope;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Read the shared (records, start, end, section) arguments; NULL section means all sections
unsafe fn read_request(
    records_json: *const c_char,
    start: *const c_char,
    end: *const c_char,
    section: *const c_char,
) -> Result<(String, ReportScope), String> {
    let records = cstr_to_string(records_json).ok_or("Invalid records JSON string pointer")?;
    let start = cstr_to_string(start).ok_or("Invalid start date string pointer")?;
    let end = cstr_to_string(end).ok_or("Invalid end date string pointer")?;
    let section = cstr_to_string(section);

    let start = parse_date(&start)?;
    let end = parse_date(&end)?;

    Ok((records, ReportScope::new(start, end, section)))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date {value:?}: {e}"))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Build a report from a JSON array of raw records and return the encoded envelope.
///
/// # Safety
/// - `records_json`, `start` and `end` must be valid null-terminated C strings;
///   dates use `YYYY-MM-DD`.
/// - `section` may be NULL (all sections).
/// - Returns a newly allocated string that must be freed with `attendance_free_string`.
/// - Returns NULL on error; call `attendance_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn attendance_report_json(
    records_json: *const c_char,
    start: *const c_char,
    end: *const c_char,
    section: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let (records, scope) = match read_request(records_json, start, end, section) {
        Ok(request) => request,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match records_to_report_json(&records, &scope) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Compute summary statistics only and return them as JSON.
///
/// Only records inside the window and matching the section count.
///
/// # Safety
/// Same contract as `attendance_report_json`.
#[no_mangle]
pub unsafe extern "C" fn attendance_statistics_json(
    records_json: *const c_char,
    start: *const c_char,
    end: *const c_char,
    section: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let (records, scope) = match read_request(records_json, start, end, section) {
        Ok(request) => request,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    let result = InMemorySource::from_json(&records)
        .and_then(|source| generate_report(&source, &scope))
        .and_then(|report| serde_json::to_string(&report.statistics).map_err(Into::into));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by the engine.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn attendance_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next engine call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn attendance_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the engine version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn attendance_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
