//! ovelib — reader for Overture (`.ove`) score files.
//!
//! Decodes both file generations (Overture 3 and 4) into a [`Score`],
//! resolves elements that span measures, and streams the result as
//! MIDI-like events or a Standard MIDI File.
//!
//! # Example
//! ```no_run
//! use ovelib::decode_file;
//!
//! let score = decode_file("path/to/song.ove").unwrap();
//! println!("Tracks: {}", score.track_count());
//! println!("Measures: {}", score.measure_count());
//! ```

pub mod chunk;
pub mod decoder;
pub mod error;
pub mod events;
pub mod lyrics;
pub mod model;
pub mod organizer;
pub mod parser;
pub mod smf;
pub mod tables;
pub mod timemap;

use std::path::Path;

pub use decoder::{DecodeOptions, FileDecoder, Progress};
pub use error::{OveError, Result};
pub use events::{convert, ConvertOptions, Event, EventHandler, EventLog, TrackInfo};
pub use model::*;
pub use smf::{score_to_smf, SmfWriter};
pub use timemap::MeasureToTick;

/// Decode an OVE file from a file path.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Score> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| OveError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    decode_bytes(&data)
}

/// Decode an OVE file held in memory.
pub fn decode_bytes(data: &[u8]) -> Result<Score> {
    FileDecoder::new(data, DecodeOptions::default()).decode()
}

/// Convert a decoded score to a JSON string.
/// Useful for passing data across FFI boundaries.
pub fn score_to_json(score: &Score) -> std::result::Result<String, String> {
    serde_json::to_string_pretty(score).map_err(|e| format!("JSON serialization error: {e}"))
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

fn json_or_null(score: Result<Score>) -> *mut c_char {
    match score.map(|s| score_to_json(&s)) {
        Ok(Ok(json)) => CString::new(json).unwrap_or_default().into_raw(),
        Ok(Err(e)) => {
            log::warn!("{e}");
            std::ptr::null_mut()
        }
        Err(e) => {
            log::warn!("{}", e.diagnostic());
            std::ptr::null_mut()
        }
    }
}

/// Decode an OVE file and return the score as a JSON C string.
/// The caller must free the returned string with `ovelib_free_string`.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn ovelib_decode_file_json(path: *const c_char) -> *mut c_char {
    if path.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(path) };
    let path_str = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    json_or_null(decode_file(path_str))
}

/// Decode OVE bytes and return the score as a JSON C string.
/// The caller must free the returned string with `ovelib_free_string`.
///
/// # Safety
/// `data` must point to `len` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn ovelib_decode_bytes_json(data: *const u8, len: usize) -> *mut c_char {
    if data.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };

    json_or_null(decode_bytes(bytes))
}

/// Free a string previously returned by ovelib functions.
///
/// # Safety
/// `ptr` must be a string previously returned by an ovelib function, or null.
#[no_mangle]
pub unsafe extern "C" fn ovelib_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
