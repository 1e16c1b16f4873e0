//! Data model for a decoded Overture score.
//!
//! The [`Score`] owns every entity produced by the decoder. Musical content
//! lives in an arena of [`MeasureData`] cells indexed by
//! `track * measure_count + measure`; elements that span measures are owned
//! by the cell they start in, and the cell they stop in holds a
//! [`MusicRef`] back to them.

use serde::{Deserialize, Serialize};

mod measure;
mod music;
mod score;

pub use measure::*;
pub use music::*;
pub use score::*;

/// Ticks per quarter note. OVE files always use 480.
pub const QUARTER: i32 = 480;

/// Which generation of the format wrote the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Overture 3 (legacy framing)
    V3,
    /// Overture 4
    V4,
}

impl FormatVersion {
    pub fn is_v4(self) -> bool {
        self == FormatVersion::V4
    }

    /// Pick the value for this generation.
    pub fn pick<T>(self, v4: T, v3: T) -> T {
        match self {
            FormatVersion::V4 => v4,
            FormatVersion::V3 => v3,
        }
    }
}

/// A point in the score: measure index plus an offset inside the measure.
///
/// Ordered by measure first, then offset. The offset may be negative during
/// intermediate computation. For cross-measure elements `stop.measure` is a
/// relative measure count as decoded, and becomes absolute once the score
/// is organized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeasurePos {
    pub measure: i32,
    pub offset: i32,
}

impl MeasurePos {
    pub fn new(measure: i32, offset: i32) -> Self {
        MeasurePos { measure, offset }
    }
}

/// Graphical displacement of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}
