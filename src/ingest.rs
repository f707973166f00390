//! Ingestion pipeline orchestration.
//!
//! Coordinates one ingest: fetch → extract → convert → store. The stages run
//! in order on the calling task:
//!
//! ```text
//! Start → Fetching → Extracting → Storing → Done
//!            │           │           │
//!            └───────────┴───────────┴──▶ Failed
//! ```
//!
//! Extraction and conversion finish completely before the store is touched,
//! and the store is invoked exactly once, so a failure in any stage leaves the
//! lecture's stored lines as they were.
//!
//! Ingests of the same lecture are serialized by a per-lecture async lock;
//! different lectures proceed concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use lecture_transcripts_core::extract::{extract_languages, extract_lines};
use lecture_transcripts_core::store::TranscriptStore;
use lecture_transcripts_core::{LectureKey, Result, TranscriptLanguage, TranscriptLine, VideoId};

use crate::fetch::FeedFetcher;

/// Stage of a single ingest, carried into log records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IngestStage {
    Start,
    Fetching,
    Extracting,
    Storing,
    Done,
    Failed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Start => "start",
            IngestStage::Fetching => "fetching",
            IngestStage::Extracting => "extracting",
            IngestStage::Storing => "storing",
            IngestStage::Done => "done",
            IngestStage::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type LockTable = Mutex<HashMap<LectureKey, Arc<AsyncMutex<()>>>>;

/// Fetches a video's timed-text feed and stores it as a lecture's transcript.
///
/// Built from an explicitly constructed fetcher and store:
///
/// ```rust,no_run
/// # async fn demo(pool: sqlx::SqlitePool) -> anyhow::Result<()> {
/// use std::sync::Arc;
/// use lecture_transcripts::fetch::HttpFeedFetcher;
/// use lecture_transcripts::sqlite_store::SqliteStore;
/// use lecture_transcripts::{LectureKey, TranscriptPipeline, VideoId};
///
/// let fetcher = HttpFeedFetcher::new("http://video.google.com/timedtext", "en")?;
/// let pipeline = TranscriptPipeline::new(Arc::new(fetcher), Arc::new(SqliteStore::new(pool)));
///
/// let stored = pipeline
///     .ingest(&VideoId::new("jNQXAC9IVRw"), &LectureKey::new("intro-lecture"))
///     .await?;
/// println!("{} lines", stored);
/// # Ok(())
/// # }
/// ```
pub struct TranscriptPipeline {
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn TranscriptStore>,
    locks: LockTable,
}

impl TranscriptPipeline {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            fetcher,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest `video`'s transcript in the fetcher's default language.
    ///
    /// Returns the number of lines stored. On error nothing is written.
    pub async fn ingest(&self, video: &VideoId, lecture: &LectureKey) -> Result<usize> {
        self.ingest_in(video, lecture, None).await
    }

    /// Ingest `video`'s transcript in `language` (default language if `None`).
    pub async fn ingest_in(
        &self,
        video: &VideoId,
        lecture: &LectureKey,
        language: Option<&str>,
    ) -> Result<usize> {
        let _permit = self.acquire(lecture).await;
        let language = language.unwrap_or_else(|| self.fetcher.default_language());

        let mut stage = IngestStage::Start;
        let result = self.run(video, lecture, language, &mut stage).await;
        let failed_at = settle(&mut stage, &result, lecture);

        match &result {
            Ok(count) => tracing::info!(
                lecture = %lecture,
                video = %video,
                language,
                lines = count,
                "transcript ingested"
            ),
            Err(e) => tracing::warn!(
                lecture = %lecture,
                video = %video,
                language,
                stage = %failed_at,
                kind = e.kind(),
                error = %e,
                "transcript ingest failed"
            ),
        }
        result
    }

    async fn run(
        &self,
        video: &VideoId,
        lecture: &LectureKey,
        language: &str,
        stage: &mut IngestStage,
    ) -> Result<usize> {
        enter(stage, IngestStage::Fetching, lecture);
        let doc = self.fetcher.fetch_in(video, language).await?;

        enter(stage, IngestStage::Extracting, lecture);
        let lines = extract_lines(&doc)?;

        enter(stage, IngestStage::Storing, lecture);
        let stored = self.store.replace_all(lecture, &lines).await?;

        enter(stage, IngestStage::Done, lecture);
        Ok(stored)
    }

    /// Stored lines of `lecture`, ascending by start time.
    pub async fn list_lines(&self, lecture: &LectureKey) -> Result<Vec<TranscriptLine>> {
        self.store.find_by_lecture(lecture).await
    }

    /// Remove `lecture`'s transcript. Returns the number of lines removed.
    pub async fn clear(&self, lecture: &LectureKey) -> Result<u64> {
        let _permit = self.acquire(lecture).await;
        let removed = self.store.delete_all_for_lecture(lecture).await?;
        tracing::info!(lecture = %lecture, removed, "transcript cleared");
        Ok(removed)
    }

    /// Caption languages the provider publishes for `video`.
    pub async fn fetch_languages(&self, video: &VideoId) -> Result<Vec<TranscriptLanguage>> {
        let doc = self.fetcher.fetch_track_list(video).await?;
        let languages = extract_languages(&doc)?;
        tracing::debug!(video = %video, count = languages.len(), "listed caption tracks");
        Ok(languages)
    }

    async fn acquire(&self, lecture: &LectureKey) -> LecturePermit<'_> {
        let lock = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(lecture.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        LecturePermit {
            table: &self.locks,
            lecture: lecture.clone(),
            guard: Some(guard),
        }
    }
}

fn enter(stage: &mut IngestStage, next: IngestStage, lecture: &LectureKey) {
    tracing::debug!(lecture = %lecture, from = %stage, to = %next, "ingest stage");
    *stage = next;
}

/// Move a failed run into `Failed`, returning the stage it failed in.
fn settle(stage: &mut IngestStage, result: &Result<usize>, lecture: &LectureKey) -> IngestStage {
    let reached = *stage;
    if result.is_err() {
        enter(stage, IngestStage::Failed, lecture);
    }
    reached
}

/// Holds a lecture's lock; drops the table entry when nobody else wants it.
struct LecturePermit<'a> {
    table: &'a LockTable,
    lecture: LectureKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LecturePermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Entries are only cloned under the table lock, so a count of one
        // here means no other task is waiting on this lecture.
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .get(&self.lecture)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.lecture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use lecture_transcripts_core::feed::FeedDocument;
    use lecture_transcripts_core::store::memory::InMemoryStore;
    use lecture_transcripts_core::{NewTranscriptLine, TranscriptError};

    const THREE_LINES: &str = r#"<transcript>
<text start="5.04" dur="1.6">third</text>
<text start="0.4" dur="1">first</text>
<text start="2.28" dur="1">second</text>
</transcript>"#;

    /// Serves a fixed body, optionally after a delay.
    struct FixtureFetcher {
        body: Mutex<String>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixtureFetcher {
        fn new(body: &str) -> Self {
            Self {
                body: Mutex::new(body.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn set_body(&self, body: &str) {
            *self.body.lock().unwrap() = body.to_string();
        }
    }

    #[async_trait]
    impl FeedFetcher for FixtureFetcher {
        fn default_language(&self) -> &str {
            "en"
        }

        async fn fetch_in(&self, _video: &VideoId, language: &str) -> Result<FeedDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if language != "en" {
                return Err(TranscriptError::Network(format!("no {} track", language)));
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let body = self.body.lock().unwrap().clone();
            FeedDocument::parse(&body)
        }

        async fn fetch_track_list(&self, _video: &VideoId) -> Result<FeedDocument> {
            FeedDocument::parse(
                r#"<transcript_list><track lang_code="en" name="" lang_translated="English"/></transcript_list>"#,
            )
        }
    }

    /// Counts `replace_all` calls on top of an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        replaces: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptStore for CountingStore {
        async fn replace_all(
            &self,
            lecture: &LectureKey,
            lines: &[NewTranscriptLine],
        ) -> Result<usize> {
            self.replaces.fetch_add(1, Ordering::SeqCst);
            self.inner.replace_all(lecture, lines).await
        }

        async fn find_by_lecture(&self, lecture: &LectureKey) -> Result<Vec<TranscriptLine>> {
            self.inner.find_by_lecture(lecture).await
        }

        async fn delete_all_for_lecture(&self, lecture: &LectureKey) -> Result<u64> {
            self.inner.delete_all_for_lecture(lecture).await
        }
    }

    fn pipeline(fetcher: Arc<FixtureFetcher>, store: Arc<CountingStore>) -> TranscriptPipeline {
        TranscriptPipeline::new(fetcher, store)
    }

    #[tokio::test]
    async fn stores_lines_once_sorted_by_start() {
        let fetcher = Arc::new(FixtureFetcher::new(THREE_LINES));
        let store = Arc::new(CountingStore::default());
        let p = pipeline(fetcher, store.clone());
        let lecture = LectureKey::new("lec");

        let stored = p.ingest(&VideoId::new("vid"), &lecture).await.unwrap();
        assert_eq!(stored, 3);
        assert_eq!(store.replaces.load(Ordering::SeqCst), 1);

        let timings: Vec<(u64, u64, u64)> = p
            .list_lines(&lecture)
            .await
            .unwrap()
            .iter()
            .map(|l| (l.start_ms(), l.duration_ms(), l.end_ms()))
            .collect();
        assert_eq!(
            timings,
            [(400, 1000, 1400), (2280, 1000, 3280), (5040, 1600, 6640)]
        );
    }

    #[tokio::test]
    async fn malformed_line_writes_nothing() {
        let fetcher = Arc::new(FixtureFetcher::new(THREE_LINES));
        let store = Arc::new(CountingStore::default());
        let p = pipeline(fetcher.clone(), store.clone());
        let lecture = LectureKey::new("lec");
        let video = VideoId::new("vid");

        p.ingest(&video, &lecture).await.unwrap();

        fetcher.set_body(r#"<transcript><text start="1" dur="1">ok</text><text start="x" dur="1">bad</text></transcript>"#);
        let err = p.ingest(&video, &lecture).await.unwrap_err();
        assert_matches!(err, TranscriptError::MalformedAttribute { index: 1, .. });

        fetcher.set_body("");
        assert_matches!(
            p.ingest(&video, &lecture).await,
            Err(TranscriptError::Parse(_))
        );

        assert_eq!(store.replaces.load(Ordering::SeqCst), 1);
        assert_eq!(p.list_lines(&lecture).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn language_is_passed_to_fetcher() {
        let fetcher = Arc::new(FixtureFetcher::new(THREE_LINES));
        let store = Arc::new(CountingStore::default());
        let p = pipeline(fetcher, store.clone());

        let err = p
            .ingest_in(&VideoId::new("vid"), &LectureKey::new("lec"), Some("fr"))
            .await
            .unwrap_err();
        assert_matches!(err, TranscriptError::Network(_));
        assert_eq!(store.replaces.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn same_lecture_ingests_are_serialized() {
        let fetcher = Arc::new(FixtureFetcher {
            delay: Duration::from_millis(20),
            ..FixtureFetcher::new(THREE_LINES)
        });
        let store = Arc::new(CountingStore::default());
        let p = Arc::new(pipeline(fetcher.clone(), store));
        let lecture = LectureKey::new("lec");
        let video = VideoId::new("vid");

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&p);
                let lecture = lecture.clone();
                let video = video.clone();
                tokio::spawn(async move { p.ingest(&video, &lecture).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 3);
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
        assert_eq!(p.list_lines(&lecture).await.unwrap().len(), 3);
        assert!(p.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_and_languages() {
        let fetcher = Arc::new(FixtureFetcher::new(THREE_LINES));
        let store = Arc::new(CountingStore::default());
        let p = pipeline(fetcher, store);
        let lecture = LectureKey::new("lec");
        let video = VideoId::new("vid");

        p.ingest(&video, &lecture).await.unwrap();
        assert_eq!(p.clear(&lecture).await.unwrap(), 3);
        assert!(p.list_lines(&lecture).await.unwrap().is_empty());

        let languages = p.fetch_languages(&video).await.unwrap();
        assert_eq!(languages.len(), 1);
        assert_eq!(languages[0].code, "en");
        assert_eq!(languages[0].translated_name, "English");
    }

    #[tokio::test]
    async fn failed_run_ends_in_failed_stage() {
        let fetcher = Arc::new(FixtureFetcher::new(
            r#"<transcript><text start="1" dur="oops">x</text></transcript>"#,
        ));
        let p = pipeline(fetcher.clone(), Arc::new(CountingStore::default()));
        let lecture = LectureKey::new("lec");
        let video = VideoId::new("vid");

        let mut stage = IngestStage::Start;
        let result = p.run(&video, &lecture, "en", &mut stage).await;
        assert_eq!(stage, IngestStage::Extracting);
        assert_eq!(settle(&mut stage, &result, &lecture), IngestStage::Extracting);
        assert_eq!(stage, IngestStage::Failed);

        fetcher.set_body(THREE_LINES);
        let mut stage = IngestStage::Start;
        let result = p.run(&video, &lecture, "en", &mut stage).await;
        assert_eq!(settle(&mut stage, &result, &lecture), IngestStage::Done);
        assert_eq!(stage, IngestStage::Done);
    }

    #[test]
    fn stage_names() {
        assert_eq!(IngestStage::Fetching.to_string(), "fetching");
        assert_eq!(IngestStage::Done.as_str(), "done");
        assert_eq!(IngestStage::Failed.as_str(), "failed");
    }
}
