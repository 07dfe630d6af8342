//! FFI bindings for Synheart Trends
//!
//! This module provides C-compatible functions for calling Trends from the
//! mobile host. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `trends_free_string`.
//!
//! Enum arguments use their JSON spelling: granularity `"day"`, `"week"`,
//! `"month"`, `"year"`; direction `"prev"`, `"next"`; payload format
//! `"canonical"`, `"health_connect"`; week start `"sunday"`, `"monday"`.
//! Dates are `YYYY-MM-DD`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::adapters::PayloadFormat;
use crate::config::ViewConfig;
use crate::error::ComputeError;
use crate::navigation::step;
use crate::period::{parse_utc_offset, resolve_period, Calendar, WeekStart};
use crate::pipeline::{records_to_report_json, TrendProcessor};
use crate::types::{Direction, Granularity};
use crate::view::FetchOutcome;

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

/// Read a required string argument
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Result<String, ComputeError> {
    cstr_to_string(ptr).ok_or_else(|| ComputeError::MissingField(format!("{name} string pointer")))
}

/// Parse an enum from its JSON spelling (e.g. `"week"`)
fn parse_enum<T: DeserializeOwned>(value: &str, name: &str) -> Result<T, ComputeError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| ComputeError::ParseError(format!("invalid {name}: {value}")))
}

fn parse_date(value: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("{value}: {e}")))
}

/// Config JSON may be NULL, in which case the default config for steps applies
unsafe fn config_arg(ptr: *const c_char) -> Result<ViewConfig, ComputeError> {
    match cstr_to_string(ptr) {
        Some(json) if !json.trim().is_empty() => ViewConfig::from_json(&json),
        _ => Ok(ViewConfig::default()),
    }
}

/// Run `f`, converting errors into a NULL return plus `LAST_ERROR`
fn string_result<F>(f: F) -> *mut c_char
where
    F: FnOnce() -> Result<String, ComputeError>,
{
    clear_last_error();
    match f() {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Build a trend report JSON from a records payload.
///
/// # Safety
/// - `records_json`, `format`, `granularity` and `reference_date` must be valid
///   null-terminated C strings. `config_json` may be NULL.
/// - Returns a newly allocated string that must be freed with `trends_free_string`.
/// - Returns NULL on error; call `trends_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trends_report(
    records_json: *const c_char,
    format: *const c_char,
    config_json: *const c_char,
    granularity: *const c_char,
    reference_date: *const c_char,
) -> *mut c_char {
    string_result(|| {
        let records = required_arg(records_json, "records_json")?;
        let format: PayloadFormat = parse_enum(&required_arg(format, "format")?, "format")?;
        let config = config_arg(config_json)?;
        let granularity: Granularity =
            parse_enum(&required_arg(granularity, "granularity")?, "granularity")?;
        let reference = parse_date(&required_arg(reference_date, "reference_date")?)?;

        records_to_report_json(&records, format, config, granularity, reference)
    })
}

/// Step a reference date one granularity unit and return the new `YYYY-MM-DD`.
///
/// # Safety
/// - All arguments must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `trends_free_string`.
/// - Returns NULL on error; call `trends_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trends_step(
    reference_date: *const c_char,
    granularity: *const c_char,
    direction: *const c_char,
) -> *mut c_char {
    string_result(|| {
        let reference = parse_date(&required_arg(reference_date, "reference_date")?)?;
        let granularity: Granularity =
            parse_enum(&required_arg(granularity, "granularity")?, "granularity")?;
        let direction: Direction =
            parse_enum(&required_arg(direction, "direction")?, "direction")?;

        Ok(step(reference, granularity, direction)
            .format("%Y-%m-%d")
            .to_string())
    })
}

/// Resolve the interval covered by a granularity and reference date.
///
/// Returns `{"start": "...", "end": "..."}` with RFC 3339 local timestamps.
///
/// # Safety
/// - `granularity` and `reference_date` must be valid null-terminated C strings.
/// - `utc_offset` and `week_start` may be NULL (UTC, Sunday).
/// - Returns a newly allocated string that must be freed with `trends_free_string`.
/// - Returns NULL on error; call `trends_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trends_period(
    granularity: *const c_char,
    reference_date: *const c_char,
    utc_offset: *const c_char,
    week_start: *const c_char,
) -> *mut c_char {
    string_result(|| {
        let granularity: Granularity =
            parse_enum(&required_arg(granularity, "granularity")?, "granularity")?;
        let reference = parse_date(&required_arg(reference_date, "reference_date")?)?;
        let offset = parse_utc_offset(&cstr_to_string(utc_offset).unwrap_or_else(|| "UTC".into()))?;
        let week_start: WeekStart = match cstr_to_string(week_start) {
            Some(s) => parse_enum(&s, "week_start")?,
            None => WeekStart::default(),
        };

        let interval = resolve_period(granularity, reference, &Calendar::new(offset, week_start));
        serde_json::to_string(&interval).map_err(ComputeError::JsonError)
    })
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a TrendProcessor
pub struct TrendProcessorHandle {
    processor: TrendProcessor,
}

/// Create a processor for one trend screen.
///
/// # Safety
/// - `config_json` may be NULL (default config). `today` must be a valid
///   null-terminated C string (`YYYY-MM-DD`).
/// - Must be freed with `trends_processor_free`.
/// - Returns NULL on error; call `trends_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_new(
    config_json: *const c_char,
    today: *const c_char,
) -> *mut TrendProcessorHandle {
    clear_last_error();

    let built = (|| -> Result<TrendProcessor, ComputeError> {
        let config = config_arg(config_json)?;
        let today = parse_date(&required_arg(today, "today")?)?;
        TrendProcessor::new(config, today)
    })();

    match built {
        Ok(processor) => Box::into_raw(Box::new(TrendProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Dispose and free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trends_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_free(processor: *mut TrendProcessorHandle) {
    if !processor.is_null() {
        let mut handle = Box::from_raw(processor);
        handle.processor.dispose();
    }
}

/// Run `f` against a processor handle. Returns -1 on error, otherwise `f`'s value.
unsafe fn with_processor<F>(processor: *mut TrendProcessorHandle, f: F) -> i32
where
    F: FnOnce(&mut TrendProcessor) -> Result<i32, ComputeError>,
{
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    match f(&mut (*processor).processor) {
        Ok(code) => code,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Add the records of a payload. Returns the number of accepted records.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trends_processor_new`.
/// - `records_json` and `format` must be valid null-terminated C strings.
/// - Returns -1 on error; call `trends_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_ingest(
    processor: *mut TrendProcessorHandle,
    records_json: *const c_char,
    format: *const c_char,
) -> i32 {
    with_processor(processor, |p| {
        let records = required_arg(records_json, "records_json")?;
        let format: PayloadFormat = parse_enum(&required_arg(format, "format")?, "format")?;
        let accepted = p.ingest(&records, format)?;
        Ok(i32::try_from(accepted).unwrap_or(i32::MAX))
    })
}

/// Select a granularity. `today` is used when the config resets the date.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trends_processor_new`.
/// - `granularity` and `today` must be valid null-terminated C strings.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_select_granularity(
    processor: *mut TrendProcessorHandle,
    granularity: *const c_char,
    today: *const c_char,
) -> i32 {
    with_processor(processor, |p| {
        let granularity: Granularity =
            parse_enum(&required_arg(granularity, "granularity")?, "granularity")?;
        let today = parse_date(&required_arg(today, "today")?)?;
        p.select_granularity(granularity, today);
        Ok(0)
    })
}

/// Step the reference date one unit (`"prev"` or `"next"`).
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trends_processor_new`.
/// - `direction` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_navigate(
    processor: *mut TrendProcessorHandle,
    direction: *const c_char,
) -> i32 {
    with_processor(processor, |p| {
        let direction: Direction =
            parse_enum(&required_arg(direction, "direction")?, "direction")?;
        p.navigate(direction);
        Ok(0)
    })
}

/// Jump to a date picked by the user.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trends_processor_new`.
/// - `date` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_pick_date(
    processor: *mut TrendProcessorHandle,
    date: *const c_char,
) -> i32 {
    with_processor(processor, |p| {
        p.pick_date(parse_date(&required_arg(date, "date")?)?);
        Ok(0)
    })
}

/// Re-fetch the current period and return its report JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trends_processor_new`.
/// - Returns a newly allocated string that must be freed with `trends_free_string`.
/// - Returns NULL on error; call `trends_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trends_processor_report(
    processor: *mut TrendProcessorHandle,
) -> *mut c_char {
    if processor.is_null() {
        clear_last_error();
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;
    string_result(|| {
        if let FetchOutcome::Disposed = handle.processor.refresh() {
            return Err(ComputeError::ConfigError("processor disposed".to_string()));
        }
        handle.processor.report_json()
    })
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Trends functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Trends function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn trends_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Trends function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn trends_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Trends library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn trends_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null(), "unexpected NULL, last error: {:?}", last_error());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        trends_free_string(ptr);
        s
    }

    fn last_error() -> Option<String> {
        unsafe {
            let err = trends_last_error();
            if err.is_null() {
                None
            } else {
                Some(CStr::from_ptr(err).to_string_lossy().into_owned())
            }
        }
    }

    fn sample_records() -> CString {
        c(r#"[
            {"id": "a", "start_time": "2024-03-04T08:00:00Z", "end_time": "2024-03-04T09:00:00Z", "metric": "steps", "count": 1200},
            {"id": "b", "start_time": "2024-03-05T08:00:00Z", "end_time": "2024-03-05T09:00:00Z", "metric": "steps", "count": 800}
        ]"#)
    }

    #[test]
    fn test_ffi_report() {
        let records = sample_records();
        let format = c("canonical");
        let granularity = c("week");
        let reference = c("2024-03-06");

        unsafe {
            let json = take_string(trends_report(
                records.as_ptr(),
                format.as_ptr(),
                ptr::null(),
                granularity.as_ptr(),
                reference.as_ptr(),
            ));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["summary"]["total"], 2000.0);
            assert_eq!(value["series"].as_array().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_ffi_step() {
        let reference = c("2024-01-31");
        let granularity = c("month");
        let direction = c("next");

        unsafe {
            let next = take_string(trends_step(
                reference.as_ptr(),
                granularity.as_ptr(),
                direction.as_ptr(),
            ));
            assert_eq!(next, "2024-02-29");
        }
    }

    #[test]
    fn test_ffi_period() {
        let granularity = c("week");
        let reference = c("2024-03-06");
        let offset = c("+02:00");

        unsafe {
            let json = take_string(trends_period(
                granularity.as_ptr(),
                reference.as_ptr(),
                offset.as_ptr(),
                ptr::null(),
            ));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert!(value["start"].as_str().unwrap().starts_with("2024-03-03T00:00:00"));
            assert!(value["end"].as_str().unwrap().starts_with("2024-03-09T23:59:59.999"));
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let config = c(r#"{"metric": "steps"}"#);
        let today = c("2024-03-05");
        let records = sample_records();
        let format = c("canonical");
        let prev = c("prev");

        unsafe {
            let processor = trends_processor_new(config.as_ptr(), today.as_ptr());
            assert!(!processor.is_null());

            assert_eq!(
                trends_processor_ingest(processor, records.as_ptr(), format.as_ptr()),
                2
            );

            let json = take_string(trends_processor_report(processor));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["summary"]["total"], 800.0);

            assert_eq!(trends_processor_navigate(processor, prev.as_ptr()), 0);
            let json = take_string(trends_processor_report(processor));
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["summary"]["total"], 1200.0);

            trends_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let granularity = c("fortnight");
        let reference = c("2024-03-06");
        let direction = c("next");

        unsafe {
            let result = trends_step(reference.as_ptr(), granularity.as_ptr(), direction.as_ptr());
            assert!(result.is_null());
            assert!(last_error().unwrap().contains("fortnight"));

            assert_eq!(trends_processor_navigate(ptr::null_mut(), direction.as_ptr()), -1);
            assert_eq!(last_error().as_deref(), Some("Null processor pointer"));
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = trends_version();
            assert!(!version.is_null());
            assert!(!CStr::from_ptr(version).to_str().unwrap().is_empty());
        }
    }
}
