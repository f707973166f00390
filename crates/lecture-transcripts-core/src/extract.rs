//! Caption line extraction from a parsed timed-text feed.
//!
//! A transcript feed looks like:
//!
//! ```xml
//! <transcript>
//!   <text start="0.4" dur="1">Hi</text>
//!   <text start="2.28" dur="1">and that&amp;#39;s
//! cool.</text>
//! </transcript>
//! ```
//!
//! Every `<text>` element, at any depth, becomes one [`RawLine`] in document
//! order. The provider escapes caption text twice, so after the parser's own
//! unescaping the text still holds entities like `&#39;`; a second decoding
//! pass resolves them. Newlines are removed so stored content is one line.
//!
//! Lines are **not** sorted here. Feed order is preserved, and ordering by
//! start time is the store's job.

use quick_xml::escape::unescape;

use crate::error::{Result, TranscriptError};
use crate::feed::{Descendants, FeedDocument, XmlElement};
use crate::models::{NewTranscriptLine, TranscriptLanguage};
use crate::time::to_milliseconds;

pub const LINE_TAG: &str = "text";
pub const ATTR_START: &str = "start";
pub const ATTR_DURATION: &str = "dur";

pub const TRACK_TAG: &str = "track";
pub const ATTR_LANG_CODE: &str = "lang_code";
pub const ATTR_LANG_NAME: &str = "name";
pub const ATTR_LANG_TRANSLATED: &str = "lang_translated";

/// One caption line as it appears in the feed, timestamps still in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub text: String,
}

impl RawLine {
    /// Convert timestamps to milliseconds.
    pub fn normalize(self) -> Result<NewTranscriptLine> {
        let timing = to_milliseconds(self.start_seconds, self.duration_seconds)?;
        Ok(NewTranscriptLine::new(timing, self.text))
    }
}

/// Lazily extract caption lines from `doc`.
///
/// Each call starts a fresh walk, so extracting twice from the same
/// document yields the same sequence.
pub fn extract(doc: &FeedDocument) -> RawLines<'_> {
    RawLines {
        elements: doc.root.descendants(),
        index: 0,
    }
}

/// Extract and normalize every line, stopping at the first failure.
pub fn extract_lines(doc: &FeedDocument) -> Result<Vec<NewTranscriptLine>> {
    extract(doc)
        .map(|raw| raw.and_then(RawLine::normalize))
        .collect()
}

/// Iterator returned by [`extract`].
pub struct RawLines<'a> {
    elements: Descendants<'a>,
    index: usize,
}

impl Iterator for RawLines<'_> {
    type Item = Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.elements.by_ref().find(|e| e.name == LINE_TAG)?;
        let index = self.index;
        self.index += 1;
        Some(raw_line(element, index))
    }
}

fn raw_line(element: &XmlElement, index: usize) -> Result<RawLine> {
    let start_seconds = seconds_attribute(element, index, ATTR_START)?;
    let duration_seconds = seconds_attribute(element, index, ATTR_DURATION)?;
    Ok(RawLine {
        start_seconds,
        duration_seconds,
        text: clean_caption_text(&element.text_content()),
    })
}

fn seconds_attribute(element: &XmlElement, index: usize, attribute: &'static str) -> Result<f64> {
    let raw = element.attribute(attribute);
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| TranscriptError::MalformedAttribute {
            element: LINE_TAG,
            index,
            attribute,
            value: raw.map(str::to_string),
        })
}

/// Decode entities left in caption text and drop line breaks.
pub fn clean_caption_text(text: &str) -> String {
    decode_entities(text)
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect()
}

/// Resolve `&name;` and `&#nn;` references one at a time.
///
/// A reference that does not resolve is copied through unchanged, as is a
/// bare `&`, so captions like `Q&A` survive.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let reference = tail
            .find(';')
            .filter(|&semi| semi > 1)
            .map(|semi| &tail[..=semi])
            .filter(|r| !r[1..].contains(|c: char| c == '&' || c.is_whitespace()));
        match reference {
            Some(r) => {
                match unescape(r) {
                    Ok(decoded) => out.push_str(&decoded),
                    Err(_) => out.push_str(r),
                }
                rest = &tail[r.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Read the caption tracks listed in a `type=list` response.
pub fn extract_languages(doc: &FeedDocument) -> Result<Vec<TranscriptLanguage>> {
    doc.elements_named(TRACK_TAG)
        .enumerate()
        .map(|(index, track)| {
            let code = track
                .attribute(ATTR_LANG_CODE)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| TranscriptError::MalformedAttribute {
                    element: TRACK_TAG,
                    index,
                    attribute: ATTR_LANG_CODE,
                    value: track.attribute(ATTR_LANG_CODE).map(str::to_string),
                })?;
            Ok(TranscriptLanguage {
                code: code.to_string(),
                name: track.attribute(ATTR_LANG_NAME).unwrap_or_default().to_string(),
                translated_name: track
                    .attribute(ATTR_LANG_TRANSLATED)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}
