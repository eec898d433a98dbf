use std::fmt;

use serde::{Serialize, Serializer};

/// Placeholder channel name when the page does not expose one.
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Placeholder duration when the page does not expose one.
pub const UNKNOWN_DURATION: &str = "N/A";

/// One available caption track for a video.
///
/// `base_url` is a locator for the caption content, never the content itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTrack {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub base_url: String,
}

impl TranscriptTrack {
    /// Whether the track is English (`en` or an `en-` regional subtag).
    pub fn is_english(&self) -> bool {
        self.language_code == "en" || self.language_code.starts_with("en-")
    }
}

/// A timed caption segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Best-effort metadata scraped alongside the captions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub channel_title: Option<String>,
    /// Already formatted, see [`format_duration`].
    pub duration: Option<String>,
}

/// Error taxonomy shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TranscriptsDisabled,
    NoTranscriptAvailable,
    NoCaptionsAvailable,
    VideoUnavailable,
    RequestBlocked,
    EmptyTranscript,
    TransportError,
    ParseError,
}

impl ErrorKind {
    /// Whether another attempt against the same egress can plausibly succeed.
    ///
    /// `RequestBlocked` is not retryable here; the primary strategy retries it
    /// only when a rotating proxy gives each attempt a new egress.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransportError | ErrorKind::EmptyTranscript)
    }

    /// HTTP status used by the server boundary for a failure of this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::TranscriptsDisabled
            | ErrorKind::NoTranscriptAvailable
            | ErrorKind::NoCaptionsAvailable
            | ErrorKind::VideoUnavailable
            | ErrorKind::EmptyTranscript => 404,
            ErrorKind::RequestBlocked => 503,
            ErrorKind::TransportError | ErrorKind::ParseError => 502,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TranscriptsDisabled => "transcripts_disabled",
            ErrorKind::NoTranscriptAvailable => "no_transcript_available",
            ErrorKind::NoCaptionsAvailable => "no_captions_available",
            ErrorKind::VideoUnavailable => "video_unavailable",
            ErrorKind::RequestBlocked => "request_blocked",
            ErrorKind::EmptyTranscript => "empty_transcript",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval method that produced (or last failed to produce) a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    CaptionsApi,
    ManualScraping,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::CaptionsApi => "youtube_transcript_api",
            Method::ManualScraping => "manual_scraping",
        }
    }
}

/// Method plus whether the request went out through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub method: Method,
    pub proxied: bool,
}

impl Source {
    pub fn new(method: Method, proxied: bool) -> Self {
        Self { method, proxied }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.proxied {
            write!(f, "{}_with_proxy", self.method.as_str())
        } else {
            f.write_str(self.method.as_str())
        }
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A successfully fetched transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub transcript: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub video_id: String,
    #[serde(rename = "channelTitle")]
    pub channel_title: String,
    pub duration: String,
    pub source: Source,
}

impl Transcript {
    /// Build a success record from the chosen track and its flattened text.
    pub fn from_track(
        video_id: &str,
        track: &TranscriptTrack,
        text: String,
        metadata: VideoMetadata,
        source: Source,
    ) -> Self {
        Self {
            transcript: text,
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            video_id: video_id.to_string(),
            channel_title: metadata
                .channel_title
                .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()),
            duration: metadata
                .duration
                .unwrap_or_else(|| UNKNOWN_DURATION.to_string()),
            source,
        }
    }

    /// Number of whitespace-separated words in the transcript.
    pub fn word_count(&self) -> usize {
        self.transcript.split_whitespace().count()
    }
}

/// A failed retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub error: String,
    pub error_kind: ErrorKind,
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods_tried: Vec<String>,
}

impl Failure {
    pub fn new(video_id: &str, error: &crate::Error, source: Option<Source>) -> Self {
        Self {
            error: error.to_string(),
            error_kind: error.kind(),
            video_id: video_id.to_string(),
            source,
            methods_tried: Vec::new(),
        }
    }
}

/// The normalized outcome of every strategy and of the resolver itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptResult {
    Success(Transcript),
    Failure(Failure),
}

impl TranscriptResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptResult::Success(_))
    }

    pub fn video_id(&self) -> &str {
        match self {
            TranscriptResult::Success(t) => &t.video_id,
            TranscriptResult::Failure(f) => &f.video_id,
        }
    }

    pub fn source(&self) -> Option<Source> {
        match self {
            TranscriptResult::Success(t) => Some(t.source),
            TranscriptResult::Failure(f) => f.source,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            TranscriptResult::Success(_) => None,
            TranscriptResult::Failure(f) => Some(f.error_kind),
        }
    }

    /// HTTP status for the server boundary: 200 on success, else per error kind.
    pub fn http_status(&self) -> u16 {
        self.error_kind().map_or(200, ErrorKind::http_status)
    }

    /// Format as JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Format as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    success: bool,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for TranscriptResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TranscriptResult::Success(body) => Tagged {
                success: true,
                body,
            }
            .serialize(serializer),
            TranscriptResult::Failure(body) => Tagged {
                success: false,
                body,
            }
            .serialize(serializer),
        }
    }
}

/// Pick the track to download: authored English, then generated English, then
/// whatever the provider listed first.
pub fn select_track(tracks: &[TranscriptTrack]) -> Option<&TranscriptTrack> {
    tracks
        .iter()
        .find(|t| t.is_english() && !t.is_generated)
        .or_else(|| tracks.iter().find(|t| t.is_english()))
        .or_else(|| tracks.first())
}

/// Full text of a segment list: trimmed segments joined by single spaces.
/// Blank segments are dropped, so an all-blank list flattens to `""`.
pub fn flatten_segments<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` from one hour up.
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
