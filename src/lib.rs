//! # Lecture Transcripts
//!
//! **Transcript ingestion for a lecture discussion app.**
//!
//! When a lecture is added, its video's caption feed is fetched from the
//! timed-text provider, each caption becomes a millisecond-precise
//! [`TranscriptLine`](lecture_transcripts_core::TranscriptLine), and the lines
//! are stored under the lecture's key so viewers can follow and comment on
//! the transcript.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ Timed-text   │──▶│  Pipeline        │──▶│  SQLite   │
//! │ feed (HTTP)  │   │ parse+convert    │   │ by lecture│
//! └──────────────┘   └──────────────────┘   └────┬─────┘
//!                                                 │
//!                                                 ▼
//!                                           ┌──────────┐
//!                                           │   HTTP   │
//!                                           │  (axum)  │
//!                                           └──────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **fetcher** ([`fetch`]) builds the feed URL for a video and parses
//!    the response into a [`FeedDocument`](lecture_transcripts_core::feed::FeedDocument).
//! 2. The **extractor** ([`lecture_transcripts_core::extract`]) yields one raw
//!    line per `<text>` element, entities decoded and newlines removed.
//! 3. The **time converter** ([`lecture_transcripts_core::time`]) rounds
//!    seconds to milliseconds; end = start + duration.
//! 4. The **store** ([`sqlite_store`]) replaces the lecture's lines in one
//!    transaction and serves them sorted by start time.
//! 5. The **pipeline** ([`ingest`]) runs the steps in order and aborts on the
//!    first failure without writing anything.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Database schema migrations (idempotent) |
//! | [`fetch`] | Feed URL building, HTTP fetch, XML parsing |
//! | [`sqlite_store`] | SQLite-backed `TranscriptStore` |
//! | [`ingest`] | Ingestion pipeline: fetch → extract → convert → store |
//! | [`server`] | HTTP routes for ingesting, listing, and clearing transcripts |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod db;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod sqlite_store;

pub use ingest::TranscriptPipeline;
pub use lecture_transcripts_core::{
    store, LectureKey, TranscriptError, TranscriptLanguage, TranscriptLine, VideoId,
};
