//! Error kinds produced while decoding an OVE file.
//!
//! Every failure is fatal for the decode: the caller gets exactly one
//! `OveError` and no partially filled score.

use thiserror::Error;

/// Message shown when the file does not start with an `OVSC` header.
pub const NOT_COMPATIBLE_MESSAGE: &str =
    "Not compatible file, try to load and save with newer version, Overture 4 is recommended.";

/// Prefix used by [`OveError::diagnostic`].
pub const CANNOT_READ_MESSAGE: &str =
    "Can't read OVE file or not compatible file, try to load and save with newer version, Overture 4 is recommended.";

pub type Result<T> = std::result::Result<T, OveError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OveError {
    #[error("{}", NOT_COMPATIBLE_MESSAGE)]
    NotAnOveFile,

    #[error("Malformed chunk sequence: {0}")]
    MalformedChunkSequence(String),

    #[error("Unexpected chunk tag: expected '{expected}', found '{found}'")]
    UnexpectedChunkTag { expected: String, found: String },

    #[error("Truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Failed to decode {record} of measure {measure}, track {track}: {source}")]
    BarsDecodeFailed {
        record: &'static str,
        measure: usize,
        track: usize,
        #[source]
        source: Box<OveError>,
    },

    #[error("Track record {index} is truncated")]
    TruncatedTrackRecord { index: usize },

    #[error("Failed to read file '{path}': {message}")]
    Io { path: String, message: String },
}

impl OveError {
    /// Human-readable message suitable for direct display to a user.
    pub fn diagnostic(&self) -> String {
        format!("{CANNOT_READ_MESSAGE} ({self})")
    }

    pub(crate) fn is_truncation(&self) -> bool {
        matches!(self, OveError::TruncatedInput { .. })
    }

    /// Wrap a truncation raised inside a MEAS/COND/BDAT record with its
    /// measure and track; other errors pass through unchanged.
    pub(crate) fn in_bars(self, record: &'static str, measure: usize, track: usize) -> OveError {
        if self.is_truncation() {
            OveError::BarsDecodeFailed {
                record,
                measure,
                track,
                source: Box::new(self),
            }
        } else {
            self
        }
    }
}
