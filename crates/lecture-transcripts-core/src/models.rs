//! Core data models for transcript lines.
//!
//! A [`TranscriptLine`] is an immutable, store-assigned record. Before it has
//! been stored it travels as a [`NewTranscriptLine`], produced from a
//! [`RawLine`](crate::extract::RawLine) by the time converter.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, TranscriptError};

/// Largest accepted timestamp in milliseconds (2^53).
///
/// Every integer up to this bound is exactly representable as an `f64`,
/// and the sum of two such values still fits in an `i64` column.
pub const MAX_TIMESTAMP_MS: u64 = 1 << 53;

/// Identifier of the lecture that owns a set of transcript lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LectureKey(String);

impl LectureKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LectureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned line identifier. Increases with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LineId(pub i64);

/// Start and duration of a line in whole milliseconds.
///
/// The end is always derived as `start_ms + duration_ms`; it is never held
/// separately, so it cannot drift from its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineTiming {
    start_ms: u64,
    duration_ms: u64,
}

impl LineTiming {
    pub fn new(start_ms: u64, duration_ms: u64) -> Result<Self> {
        if start_ms > MAX_TIMESTAMP_MS {
            return Err(TranscriptError::InvalidDuration(format!(
                "start {}ms exceeds {}ms",
                start_ms, MAX_TIMESTAMP_MS
            )));
        }
        if duration_ms > MAX_TIMESTAMP_MS {
            return Err(TranscriptError::InvalidDuration(format!(
                "duration {}ms exceeds {}ms",
                duration_ms, MAX_TIMESTAMP_MS
            )));
        }
        Ok(Self {
            start_ms,
            duration_ms,
        })
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn end_ms(&self) -> u64 {
        // Both operands are bounded by MAX_TIMESTAMP_MS.
        self.start_ms + self.duration_ms
    }
}

impl Serialize for LineTiming {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("LineTiming", 3)?;
        s.serialize_field("start_ms", &self.start_ms)?;
        s.serialize_field("duration_ms", &self.duration_ms)?;
        s.serialize_field("end_ms", &self.end_ms())?;
        s.end()
    }
}

/// A normalized line that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranscriptLine {
    pub timing: LineTiming,
    pub content: String,
}

impl NewTranscriptLine {
    pub fn new(timing: LineTiming, content: impl Into<String>) -> Self {
        Self {
            timing,
            content: content.into(),
        }
    }
}

/// A stored transcript line.
///
/// Serializes as
/// `{ "id", "lecture_key", "start_ms", "duration_ms", "end_ms", "content" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    pub id: LineId,
    pub lecture_key: LectureKey,
    #[serde(flatten)]
    pub timing: LineTiming,
    pub content: String,
}

impl TranscriptLine {
    pub fn start_ms(&self) -> u64 {
        self.timing.start_ms()
    }

    pub fn duration_ms(&self) -> u64 {
        self.timing.duration_ms()
    }

    pub fn end_ms(&self) -> u64 {
        self.timing.end_ms()
    }
}

/// A caption track the provider publishes for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLanguage {
    /// Language code passed back as the `lang` feed parameter (e.g. `"en"`).
    pub code: String,
    /// Display name in the track's own language.
    pub name: String,
    /// Display name translated to the viewer's language.
    pub translated_name: String,
}
