use std::path::PathBuf;

use crate::types::ErrorKind;

/// All errors that can occur while fetching a transcript.
///
/// Strategies never let these escape: they are folded into a
/// [`Failure`](crate::types::Failure) via [`Error::kind`] at the strategy boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("no transcript available for video {0}")]
    NoTranscriptAvailable(String),

    #[error("no captions available for this video")]
    NoCaptionsAvailable,

    #[error("video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    #[error("request blocked: {0}")]
    RequestBlocked(String),

    #[error("transcript text is empty after flattening")]
    EmptyTranscript,

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not parse page data: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Classify this error into the public error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TranscriptsDisabled(_) => ErrorKind::TranscriptsDisabled,
            Error::NoTranscriptAvailable(_) => ErrorKind::NoTranscriptAvailable,
            Error::NoCaptionsAvailable => ErrorKind::NoCaptionsAvailable,
            Error::VideoUnavailable { .. } => ErrorKind::VideoUnavailable,
            Error::RequestBlocked(_) => ErrorKind::RequestBlocked,
            Error::EmptyTranscript => ErrorKind::EmptyTranscript,
            Error::HttpStatus { status: 403 | 429, .. } => ErrorKind::RequestBlocked,
            Error::HttpStatus { .. } | Error::Network(_) | Error::Io(_) | Error::Config(_) => {
                ErrorKind::TransportError
            }
            Error::Http(e) if e.is_decode() => ErrorKind::ParseError,
            Error::Http(_) => ErrorKind::TransportError,
            Error::Parse(_) | Error::Json(_) | Error::Toml(_) | Error::ConfigNotFound { .. } => {
                ErrorKind::ParseError
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_video_unavailable() {
        let e = Error::VideoUnavailable {
            video_id: "abc".into(),
            reason: "This video is private".into(),
        };
        assert_eq!(e.to_string(), "video abc is unavailable: This video is private");
    }

    #[test]
    fn test_error_display_http_status() {
        let e = Error::HttpStatus {
            status: 500,
            url: "https://www.youtube.com/watch?v=abc".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("watch?v=abc"));
    }

    #[test]
    fn test_kind_blocking_statuses() {
        for status in [403, 429] {
            let e = Error::HttpStatus {
                status,
                url: "u".into(),
            };
            assert_eq!(e.kind(), ErrorKind::RequestBlocked);
        }
        let e = Error::HttpStatus {
            status: 502,
            url: "u".into(),
        };
        assert_eq!(e.kind(), ErrorKind::TransportError);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::TranscriptsDisabled("x".into()).kind(),
            ErrorKind::TranscriptsDisabled
        );
        assert_eq!(Error::NoCaptionsAvailable.kind(), ErrorKind::NoCaptionsAvailable);
        assert_eq!(Error::EmptyTranscript.kind(), ErrorKind::EmptyTranscript);
        assert_eq!(Error::Parse("marker".into()).kind(), ErrorKind::ParseError);
        assert_eq!(Error::Network("dns".into()).kind(), ErrorKind::TransportError);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("file not found"));
        assert_eq!(e.kind(), ErrorKind::TransportError);
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Json(_)));
        assert_eq!(e.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_error_debug_impl() {
        let e = Error::RequestBlocked("HTTP 403".into());
        let debug = format!("{:?}", e);
        assert!(debug.contains("RequestBlocked"));
    }
}
