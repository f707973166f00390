//! Video identifiers and link parsing.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Opaque provider video identifier (e.g. `"jNQXAC9IVRw"`).
///
/// Not validated on construction; the fetcher rejects ids that cannot be
/// placed in a request URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link prefixes after which the video id starts, plain and percent-encoded.
const VIDEO_LINK_PATTERN: &str = concat!(
    r"(?:watch\?v=|/videos/|embed/|youtu\.be/|/v/|/e/|",
    r"watch\?v%3D|watch\?feature=player_embedded&v=|%2Fvideos%2F|",
    r"embed%2F|youtu\.be%2F|%2Fv%2F)",
    r"([^#&?\n]*)"
);

fn video_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VIDEO_LINK_PATTERN).expect("video link pattern is valid"))
}

/// Pull the video id out of a watch, embed, or short link.
///
/// Returns `None` when the link has no recognizable id, including when the
/// id part is empty (`https://youtu.be/`).
///
/// ```rust
/// use lecture_transcripts_core::video::video_id_from_url;
///
/// let id = video_id_from_url("https://www.youtube.com/watch?v=jNQXAC9IVRw&t=3").unwrap();
/// assert_eq!(id.as_str(), "jNQXAC9IVRw");
/// ```
pub fn video_id_from_url(link: &str) -> Option<VideoId> {
    video_link_regex()
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| !id.is_empty())
        .map(VideoId::new)
}
