//! # Lecture Transcripts Core
//!
//! Runtime-agnostic logic for the lecture transcript pipeline: line models,
//! timed-text XML parsing, caption extraction, seconds-to-milliseconds
//! conversion, and the [`store::TranscriptStore`] abstraction.
//!
//! This crate contains no tokio, sqlx, or HTTP client dependencies. The
//! network fetcher, SQLite store, and orchestrating pipeline live in the
//! `lecture-transcripts` crate.
//!
//! ## Data Flow
//!
//! ```text
//! feed XML ──▶ feed::FeedDocument ──▶ extract::extract ──▶ RawLine
//!                                                            │
//!                                       time::to_milliseconds ▼
//!                          store::TranscriptStore ◀── NewTranscriptLine
//! ```

pub mod error;
pub mod extract;
pub mod feed;
pub mod models;
pub mod store;
pub mod time;
pub mod video;

pub use error::{Result, TranscriptError};
pub use models::{
    LectureKey, LineId, LineTiming, NewTranscriptLine, TranscriptLanguage, TranscriptLine,
};
pub use video::VideoId;
