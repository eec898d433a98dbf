//! Text-pattern extractors over raw watch-page HTML and caption bodies.
//!
//! The watch page is not a stable interface. Everything that depends on its
//! layout lives here so it can be replaced without touching the strategies.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{format_duration, Segment, TranscriptTrack, VideoMetadata};

const CAPTION_TRACKS_MARKER: &str = "\"captionTracks\":";
const TRANSLATION_LANGUAGES_MARKER: &str = ",\"translationLanguages\"";
const BASE_URL_MARKER: &str = "\"baseUrl\":";

/// Used when a track chunk carries no language fields.
const UNKNOWN_LANGUAGE: &str = "Unknown";
const UNKNOWN_LANGUAGE_CODE: &str = "unknown";

static BASE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""baseUrl":"([^"]+)""#).unwrap());
static LANGUAGE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""languageCode":"([^"]+)""#).unwrap());
static NAME_SIMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""name":\{"simpleText":"([^"]+)""#).unwrap());
static NAME_RUNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""name":\{"runs":\[\{"text":"([^"]+)""#).unwrap());
static KIND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""kind":"([^"]+)""#).unwrap());

static CHANNEL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""channelName":"([^"]+)""#).unwrap());
static ITEMPROP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<link itemprop="name" content="([^"]+)""#).unwrap());
static LENGTH_SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""lengthSeconds":"(\d+)""#).unwrap());

static TEXT_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text start="([\d.]+)"(?:\s+dur="([\d.]+)")?[^>]*>(.*?)</text>"#).unwrap()
});
/// Inline formatting markup YouTube puts inside caption text.
static INLINE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:font|b|i|u|c|span|br)\b[^<>]*>").unwrap());

/// Undo the JSON string escapes YouTube uses inside embedded URLs.
pub fn unescape_url(raw: &str) -> String {
    raw.replace("\\u0026", "&")
        .replace("\\u003d", "=")
        .replace("\\/", "/")
}

/// Find the caption tracks embedded in a watch page, in page order.
///
/// Fails with `NoCaptionsAvailable` when the page has no `captionTracks`
/// marker, and with a parse error when the marker is present but no track
/// carries a `baseUrl`.
pub fn extract_caption_tracks(html: &str) -> Result<Vec<TranscriptTrack>> {
    let start = html
        .find(CAPTION_TRACKS_MARKER)
        .ok_or(Error::NoCaptionsAvailable)?
        + CAPTION_TRACKS_MARKER.len();
    let region = &html[start..];
    let region = region
        .find(TRANSLATION_LANGUAGES_MARKER)
        .map_or(region, |end| &region[..end]);

    let starts: Vec<usize> = region
        .match_indices(BASE_URL_MARKER)
        .map(|(i, _)| i)
        .collect();

    let tracks: Vec<TranscriptTrack> = starts
        .iter()
        .enumerate()
        .filter_map(|(n, &from)| {
            let to = starts.get(n + 1).copied().unwrap_or(region.len());
            parse_track_chunk(&region[from..to])
        })
        .collect();

    if tracks.is_empty() {
        return Err(Error::Parse("could not find caption URL".into()));
    }
    debug!(count = tracks.len(), "found caption tracks");
    Ok(tracks)
}

fn parse_track_chunk(chunk: &str) -> Option<TranscriptTrack> {
    let base_url = unescape_url(capture(&BASE_URL_RE, chunk)?);
    let language_code = capture(&LANGUAGE_CODE_RE, chunk).unwrap_or(UNKNOWN_LANGUAGE_CODE);
    let language = capture(&NAME_SIMPLE_RE, chunk)
        .or_else(|| capture(&NAME_RUNS_RE, chunk))
        .unwrap_or(UNKNOWN_LANGUAGE);
    let is_generated = capture(&KIND_RE, chunk) == Some("asr");

    Some(TranscriptTrack {
        language: language.to_string(),
        language_code: language_code.to_string(),
        is_generated,
        base_url,
    })
}

fn capture<'h>(re: &Regex, haystack: &'h str) -> Option<&'h str> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Channel name and duration, when the page exposes them.
pub fn extract_metadata(html: &str) -> VideoMetadata {
    let channel_title = capture(&CHANNEL_NAME_RE, html)
        .or_else(|| capture(&ITEMPROP_NAME_RE, html))
        .map(|name| html_escape::decode_html_entities(name).into_owned());
    let duration = capture(&LENGTH_SECONDS_RE, html)
        .and_then(|s| s.parse::<u64>().ok())
        .map(format_duration);

    VideoMetadata {
        channel_title,
        duration,
    }
}

/// Whether a caption body is timed-text XML rather than plain text.
pub fn is_timedtext_xml(body: &str) -> bool {
    let head = body.trim_start();
    head.starts_with("<?xml") || head.starts_with("<transcript") || head.starts_with("<timedtext")
}

/// Parse `<text start=".." dur="..">..</text>` elements. Entities are decoded
/// and inline formatting tags removed.
pub fn parse_timedtext_xml(xml: &str) -> Vec<Segment> {
    TEXT_ELEMENT_RE
        .captures_iter(xml)
        .map(|cap| {
            let start = cap[1].parse().unwrap_or(0.0);
            let duration = cap
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0.0);
            // Entities can be double-encoded (`&amp;#39;`), so decode before and after stripping tags.
            let decoded = html_escape::decode_html_entities(&cap[3]);
            let stripped = INLINE_TAG_RE.replace_all(&decoded, "");
            let text = html_escape::decode_html_entities(&stripped).into_owned();
            Segment::new(text, start, duration)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: Option<String>,
}

/// Parse a `fmt=json3` caption body: one segment per event, built from the
/// `utf8` pieces of its `segs`.
pub fn parse_json3(body: &str) -> Result<Vec<Segment>> {
    let doc: Json3 = serde_json::from_str(body)?;
    Ok(doc
        .events
        .into_iter()
        .filter(|e| !e.segs.is_empty())
        .map(|e| {
            let text: String = e.segs.into_iter().filter_map(|s| s.utf8).collect();
            Segment::new(
                text,
                e.start_ms as f64 / 1000.0,
                e.duration_ms as f64 / 1000.0,
            )
        })
        .collect())
}
