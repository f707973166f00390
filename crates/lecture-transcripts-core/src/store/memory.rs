//! In-memory [`TranscriptStore`] implementation for tests and embedding.
//!
//! All lines live in one `Vec` behind a `std::sync::RwLock`. A replace runs
//! under a single write lock, so it is atomic to readers.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Result, TranscriptError};
use crate::models::{LectureKey, LineId, NewTranscriptLine, TranscriptLine};

use super::TranscriptStore;

struct StoredLine {
    id: LineId,
    lecture_key: LectureKey,
    line: NewTranscriptLine,
}

struct Inner {
    lines: Vec<StoredLine>,
    next_id: i64,
}

/// In-memory transcript store.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                lines: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Total number of stored lines across all lectures.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.lines.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| poisoned())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> TranscriptError {
    TranscriptError::StorageUnavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl TranscriptStore for InMemoryStore {
    async fn replace_all(
        &self,
        lecture: &LectureKey,
        lines: &[NewTranscriptLine],
    ) -> Result<usize> {
        let mut inner = self.write()?;
        inner.lines.retain(|s| &s.lecture_key != lecture);
        for line in lines {
            let id = LineId(inner.next_id);
            inner.next_id += 1;
            inner.lines.push(StoredLine {
                id,
                lecture_key: lecture.clone(),
                line: line.clone(),
            });
        }
        Ok(lines.len())
    }

    async fn find_by_lecture(&self, lecture: &LectureKey) -> Result<Vec<TranscriptLine>> {
        let inner = self.read()?;
        let mut found: Vec<TranscriptLine> = inner
            .lines
            .iter()
            .filter(|s| &s.lecture_key == lecture)
            .map(|s| TranscriptLine {
                id: s.id,
                lecture_key: s.lecture_key.clone(),
                timing: s.line.timing,
                content: s.line.content.clone(),
            })
            .collect();
        // Stable sort: the Vec is already in insertion order.
        found.sort_by_key(|l| l.start_ms());
        Ok(found)
    }

    async fn delete_all_for_lecture(&self, lecture: &LectureKey) -> Result<u64> {
        let mut inner = self.write()?;
        let before = inner.lines.len();
        inner.lines.retain(|s| &s.lecture_key != lecture);
        Ok((before - inner.lines.len()) as u64)
    }
}
