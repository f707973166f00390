//! Failure taxonomy for transcript ingestion.
//!
//! Every stage of the pipeline reports one of these kinds. None of them is
//! retried internally; the first one encountered aborts an ingest.

use thiserror::Error;

pub type Result<T, E = TranscriptError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The feed URL could not be built from the endpoint, video id, or language.
    #[error("cannot build feed url: {0}")]
    UrlBuild(String),

    /// Transport failure or a non-success HTTP status from the provider.
    #[error("feed request failed: {0}")]
    Network(String),

    /// The response body is not a well-formed XML document.
    #[error("feed is not well-formed xml: {0}")]
    Parse(String),

    /// A line-level element lacks a required attribute or carries a
    /// non-numeric one.
    #[error("<{element}> #{index}: attribute `{attribute}` is missing or malformed ({value:?})")]
    MalformedAttribute {
        element: &'static str,
        index: usize,
        attribute: &'static str,
        value: Option<String>,
    },

    /// A timestamp is negative, not finite, or out of range.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("transcript storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl TranscriptError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::UrlBuild(_) => "url_build",
            TranscriptError::Network(_) => "network",
            TranscriptError::Parse(_) => "parse",
            TranscriptError::MalformedAttribute { .. } => "malformed_attribute",
            TranscriptError::InvalidDuration(_) => "invalid_duration",
            TranscriptError::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    /// True when the failure originates in the provider's response rather
    /// than in the request or local storage.
    pub fn is_malformed_feed(&self) -> bool {
        matches!(
            self,
            TranscriptError::Parse(_)
                | TranscriptError::MalformedAttribute { .. }
                | TranscriptError::InvalidDuration(_)
        )
    }
}
