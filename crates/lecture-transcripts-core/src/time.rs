//! Seconds-to-milliseconds conversion for caption timestamps.
//!
//! Feeds carry `start` and `dur` as decimal seconds (`"17.767"`). Each value
//! is scaled by 1000 and rounded to the nearest millisecond, halves away
//! from zero. Truncation is never used: it shifts adjacent lines so that
//! they overlap or leave gaps.
//!
//! The end of a line is the sum of the two *rounded* parts, not a rounding
//! of `start + dur` in seconds, so `end_ms == start_ms + duration_ms` holds
//! exactly.
//!
//! ```rust
//! use lecture_transcripts_core::time::to_milliseconds;
//!
//! let t = to_milliseconds(5.04, 1.6).unwrap();
//! assert_eq!((t.start_ms(), t.duration_ms(), t.end_ms()), (5040, 1600, 6640));
//! ```

use crate::error::{Result, TranscriptError};
use crate::models::{LineTiming, MAX_TIMESTAMP_MS};

const MILLIS_PER_SECOND: f64 = 1000.0;

/// Convert a line's start and duration from seconds to a [`LineTiming`].
///
/// # Errors
///
/// [`TranscriptError::InvalidDuration`] if either value is negative, NaN,
/// infinite, or larger than [`MAX_TIMESTAMP_MS`] once converted.
pub fn to_milliseconds(start_seconds: f64, duration_seconds: f64) -> Result<LineTiming> {
    let start_ms = seconds_to_millis("start", start_seconds)?;
    let duration_ms = seconds_to_millis("duration", duration_seconds)?;
    LineTiming::new(start_ms, duration_ms)
}

/// Round a single seconds value to whole milliseconds.
pub fn seconds_to_millis(label: &str, seconds: f64) -> Result<u64> {
    if !seconds.is_finite() {
        return Err(TranscriptError::InvalidDuration(format!(
            "{} is not a finite number ({})",
            label, seconds
        )));
    }
    if seconds < 0.0 {
        return Err(TranscriptError::InvalidDuration(format!(
            "{} is negative ({}s)",
            label, seconds
        )));
    }
    let millis = (seconds * MILLIS_PER_SECOND).round();
    if millis > MAX_TIMESTAMP_MS as f64 {
        return Err(TranscriptError::InvalidDuration(format!(
            "{} of {}s is out of range",
            label, seconds
        )));
    }
    Ok(millis as u64)
}
