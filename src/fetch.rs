//! Timed-text feed fetcher.
//!
//! Builds the provider request URL, performs the GET with `reqwest`, and
//! parses the body into a [`FeedDocument`]. The three ways this can fail are
//! kept apart:
//!
//! | Failure | Error |
//! |---------|-------|
//! | Endpoint, video id, or language cannot go into a URL | [`TranscriptError::UrlBuild`] |
//! | Connection error, timeout, or non-2xx status | [`TranscriptError::Network`] |
//! | Body is not well-formed XML (including empty) | [`TranscriptError::Parse`] |
//!
//! No failure is turned into an empty document.
//!
//! # Request shape
//!
//! ```text
//! GET {base_url}?lang=en&v=jNQXAC9IVRw     transcript lines
//! GET {base_url}?type=list&v=jNQXAC9IVRw   available caption tracks
//! ```

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;

use lecture_transcripts_core::feed::FeedDocument;
use lecture_transcripts_core::{Result, TranscriptError, VideoId};

use crate::config::FeedConfig;

const PARAM_LANG: &str = "lang";
const PARAM_VIDEO: &str = "v";
const PARAM_TYPE: &str = "type";
const TYPE_LIST: &str = "list";

/// Source of timed-text documents.
///
/// The pipeline depends on this trait rather than on HTTP, so it can be
/// driven by a fixture or any other provider.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Language used by [`fetch`](FeedFetcher::fetch).
    fn default_language(&self) -> &str;

    /// Fetch the transcript feed for `video` in `language`.
    async fn fetch_in(&self, video: &VideoId, language: &str) -> Result<FeedDocument>;

    /// Fetch the list of caption tracks published for `video`.
    async fn fetch_track_list(&self, video: &VideoId) -> Result<FeedDocument>;

    /// Fetch the transcript feed in the default language.
    async fn fetch(&self, video: &VideoId) -> Result<FeedDocument> {
        self.fetch_in(video, self.default_language()).await
    }
}

/// [`FeedFetcher`] over HTTP.
///
/// Holds only a `reqwest::Client` (internally reference-counted) and the
/// endpoint, so one instance can serve concurrent requests.
#[derive(Debug)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    base_url: Url,
    default_language: String,
}

impl HttpFeedFetcher {
    /// Create a fetcher with a default client (no timeout).
    pub fn new(base_url: &str, default_language: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url, default_language)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        default_language: &str,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        if !is_language_code(default_language) {
            return Err(TranscriptError::UrlBuild(format!(
                "'{}' is not a language code",
                default_language
            )));
        }
        Ok(Self {
            client,
            base_url,
            default_language: default_language.to_string(),
        })
    }

    /// Build a fetcher from `[feed]` settings, applying the request timeout.
    pub fn from_config(config: &FeedConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lecture-transcripts/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(
            client,
            &config.base_url,
            &config.default_language,
        )?)
    }

    pub fn transcript_url(&self, video: &VideoId, language: &str) -> Result<Url> {
        if !is_language_code(language) {
            return Err(TranscriptError::UrlBuild(format!(
                "'{}' is not a language code",
                language
            )));
        }
        check_video_id(video)?;
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(PARAM_LANG, language)
            .append_pair(PARAM_VIDEO, video.as_str());
        Ok(url)
    }

    pub fn track_list_url(&self, video: &VideoId) -> Result<Url> {
        check_video_id(video)?;
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(PARAM_TYPE, TYPE_LIST)
            .append_pair(PARAM_VIDEO, video.as_str());
        Ok(url)
    }

    async fn get_document(&self, url: Url) -> Result<FeedDocument> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TranscriptError::Network(format!("GET {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TranscriptError::Network(format!(
                "GET {} returned HTTP {}",
                url, status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TranscriptError::Network(format!("reading body of {}: {}", url, e)))?;
        tracing::debug!(%url, bytes = body.len(), "fetched feed");

        FeedDocument::parse(&body)
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    fn default_language(&self) -> &str {
        &self.default_language
    }

    async fn fetch_in(&self, video: &VideoId, language: &str) -> Result<FeedDocument> {
        let url = self.transcript_url(video, language)?;
        self.get_document(url).await
    }

    async fn fetch_track_list(&self, video: &VideoId) -> Result<FeedDocument> {
        let url = self.track_list_url(video)?;
        self.get_document(url).await
    }
}

/// Parse an absolute `http`/`https` endpoint URL.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| TranscriptError::UrlBuild(format!("'{}': {}", base_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(TranscriptError::UrlBuild(format!(
            "'{}' is not an http(s) endpoint",
            base_url
        )));
    }
    Ok(url)
}

/// `en`, `pt-BR`, `zh_Hans`: ASCII alphanumerics plus `-` and `_`.
pub fn is_language_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= 35
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Reject ids that are empty or carry whitespace or control characters.
///
/// Anything else is percent-encoded into the query string.
fn check_video_id(video: &VideoId) -> Result<()> {
    let id = video.as_str();
    if id.is_empty() {
        return Err(TranscriptError::UrlBuild("video id is empty".to_string()));
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TranscriptError::UrlBuild(format!(
            "video id {:?} contains whitespace or control characters",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fetcher() -> HttpFeedFetcher {
        HttpFeedFetcher::new("http://video.google.com/timedtext", "en").unwrap()
    }

    #[test]
    fn builds_transcript_url_with_lang_then_video() {
        let url = fetcher()
            .transcript_url(&VideoId::new("jNQXAC9IVRw"), "en")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://video.google.com/timedtext?lang=en&v=jNQXAC9IVRw"
        );
    }

    #[test]
    fn escapes_reserved_characters_in_video_id() {
        let url = fetcher()
            .transcript_url(&VideoId::new("a&b/=#"), "de")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://video.google.com/timedtext?lang=de&v=a%26b%2F%3D%23"
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[1], ("v".to_string(), "a&b/=#".to_string()));
    }

    #[test]
    fn builds_track_list_url() {
        let url = fetcher().track_list_url(&VideoId::new("abc")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://video.google.com/timedtext?type=list&v=abc"
        );
    }

    #[test]
    fn keeps_existing_query_on_base() {
        let f = HttpFeedFetcher::new("https://captions.example.com/api?key=k", "en").unwrap();
        let url = f.transcript_url(&VideoId::new("x"), "en").unwrap();
        assert_eq!(url.as_str(), "https://captions.example.com/api?key=k&lang=en&v=x");
    }

    #[test]
    fn rejects_unsafe_video_ids() {
        let f = fetcher();
        for bad in ["", "abc def", "line\nbreak", "tab\there", "nul\0"] {
            assert_matches!(
                f.transcript_url(&VideoId::new(bad), "en"),
                Err(TranscriptError::UrlBuild(_)),
                "{:?} should not build",
                bad
            );
        }
        assert_matches!(
            f.track_list_url(&VideoId::new(" ")),
            Err(TranscriptError::UrlBuild(_))
        );
    }

    #[test]
    fn rejects_bad_language_and_endpoint() {
        assert_matches!(
            fetcher().transcript_url(&VideoId::new("x"), "en&v=evil"),
            Err(TranscriptError::UrlBuild(_))
        );
        assert_matches!(
            HttpFeedFetcher::new("video.google.com/timedtext", "en"),
            Err(TranscriptError::UrlBuild(_))
        );
        assert_matches!(
            HttpFeedFetcher::new("mailto:someone@example.com", "en"),
            Err(TranscriptError::UrlBuild(_))
        );
        assert_matches!(
            HttpFeedFetcher::new("http://video.google.com/timedtext", ""),
            Err(TranscriptError::UrlBuild(_))
        );
    }

    #[test]
    fn constructor_errors_are_reported_as_values() {
        let err = HttpFeedFetcher::new("ftp://example.com/timedtext", "en").unwrap_err();
        assert_eq!(err.kind(), "url_build");
        let ok = HttpFeedFetcher::new("https://example.com/timedtext", "pt-BR").unwrap();
        assert!(format!("{:?}", ok).contains("example.com"));
        assert_eq!(ok.default_language(), "pt-BR");
    }

    #[test]
    fn language_codes() {
        assert!(is_language_code("en"));
        assert!(is_language_code("pt-BR"));
        assert!(is_language_code("zh_Hans"));
        assert!(!is_language_code(""));
        assert!(!is_language_code("en us"));
        assert!(!is_language_code("ü"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let f = HttpFeedFetcher::new("http://127.0.0.1:1/timedtext", "en").unwrap();
        assert_matches!(
            f.fetch(&VideoId::new("abc")).await,
            Err(TranscriptError::Network(_))
        );
    }
}
