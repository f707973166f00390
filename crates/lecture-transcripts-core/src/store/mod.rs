//! Storage abstraction for transcript lines.
//!
//! The [`TranscriptStore`] trait is everything the ingestion pipeline and the
//! HTTP layer need from persistence. Implementations exist for SQLite (in the
//! `lecture-transcripts` crate) and in-memory ([`memory::InMemoryStore`]).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LectureKey, NewTranscriptLine, TranscriptLine};

/// Abstract storage backend for transcript lines, grouped by lecture.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_all`](TranscriptStore::replace_all) | Swap a lecture's lines for a new set |
/// | [`find_by_lecture`](TranscriptStore::find_by_lecture) | Lines of a lecture, by start time |
/// | [`delete_all_for_lecture`](TranscriptStore::delete_all_for_lecture) | Clear a lecture's transcript |
///
/// Failures are reported as
/// [`TranscriptError::StorageUnavailable`](crate::TranscriptError::StorageUnavailable).
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Remove every line of `lecture`, then insert `lines`.
    ///
    /// Readers never observe a partially replaced lecture. Where the backend
    /// cannot guarantee that, the delete must still happen before the insert.
    /// Returns the number of lines inserted.
    async fn replace_all(&self, lecture: &LectureKey, lines: &[NewTranscriptLine])
        -> Result<usize>;

    /// Lines of `lecture` sorted by `start_ms`, ties in insertion order.
    ///
    /// An unknown lecture yields an empty vector.
    async fn find_by_lecture(&self, lecture: &LectureKey) -> Result<Vec<TranscriptLine>>;

    /// Remove every line of `lecture`, returning how many were removed.
    async fn delete_all_for_lecture(&self, lecture: &LectureKey) -> Result<u64>;
}
