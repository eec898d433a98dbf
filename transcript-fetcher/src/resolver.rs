//! Fallback orchestration: primary strategy, then the secondary exactly once.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::api::{ApiStrategy, InnertubeApi};
use crate::config::FetchOptions;
use crate::manual::ScrapeStrategy;
use crate::transport::Transport;
use crate::types::TranscriptResult;
use crate::video_id::VideoId;

/// One way of obtaining a transcript. Implementations never fail outright:
/// every error is folded into [`TranscriptResult::Failure`].
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Identifier reported in `methods_tried`.
    fn name(&self) -> &'static str;

    async fn fetch(&self, id: &VideoId) -> TranscriptResult;
}

/// Resolves a raw video reference to a transcript.
///
/// The default configuration runs the captions API first (proxy requested)
/// and falls back to scraping the watch page. Both strategies share one
/// transport, so cookies are loaded once.
pub struct Resolver<P = ApiStrategy<InnertubeApi>, S = ScrapeStrategy> {
    primary: P,
    secondary: S,
}

impl Resolver {
    pub fn new(options: FetchOptions) -> Self {
        let api = InnertubeApi::new(options.base_url.clone());
        let transport = Transport::new(options);
        Self::with_strategies(
            ApiStrategy::new(api, transport.clone()),
            ScrapeStrategy::new(transport),
        )
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(FetchOptions::default())
    }
}

impl<P: Strategy, S: Strategy> Resolver<P, S> {
    pub fn with_strategies(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    /// Normalize `raw` (URL or bare ID) and resolve it.
    pub async fn resolve(&self, raw: &str) -> TranscriptResult {
        self.resolve_id(&VideoId::normalize(raw)).await
    }

    pub async fn resolve_id(&self, id: &VideoId) -> TranscriptResult {
        let primary = self.primary.fetch(id).await;
        if primary.is_success() {
            return primary;
        }
        info!(
            video_id = %id,
            strategy = self.primary.name(),
            kind = ?primary.error_kind(),
            "primary strategy failed, falling back to {}",
            self.secondary.name()
        );

        match self.secondary.fetch(id).await {
            TranscriptResult::Failure(mut failure) => {
                warn!(video_id = %id, kind = %failure.error_kind, "all transcript extraction methods failed");
                failure.methods_tried = vec![
                    self.primary.name().to_string(),
                    self.secondary.name().to_string(),
                ];
                TranscriptResult::Failure(failure)
            }
            success => success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CaptionsApi, TrackListing};
    use crate::error::{Error, Result};
    use crate::transport::HttpClient;
    use crate::types::{
        ErrorKind, Failure, Method, Segment, Source, Transcript, TranscriptTrack, VideoMetadata,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Strategy that returns a fixed outcome and counts calls.
    struct Scripted {
        name: &'static str,
        outcome: TranscriptResult,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: TranscriptResult) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let strategy = Self {
                name,
                outcome,
                calls: Arc::clone(&calls),
            };
            (strategy, calls)
        }
    }

    #[async_trait]
    impl Strategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _id: &VideoId) -> TranscriptResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn en_track() -> TranscriptTrack {
        TranscriptTrack {
            language: "English".into(),
            language_code: "en".into(),
            is_generated: false,
            base_url: "https://example.com/timedtext?lang=en".into(),
        }
    }

    fn success(method: Method) -> TranscriptResult {
        TranscriptResult::Success(Transcript::from_track(
            "ABCDEFGHIJK",
            &en_track(),
            "Hello world".into(),
            VideoMetadata::default(),
            Source::new(method, false),
        ))
    }

    fn failure(error: Error, method: Method) -> TranscriptResult {
        TranscriptResult::Failure(Failure::new(
            "ABCDEFGHIJK",
            &error,
            Some(Source::new(method, false)),
        ))
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let (primary, primary_calls) = Scripted::new("primary", success(Method::CaptionsApi));
        let (secondary, secondary_calls) =
            Scripted::new("secondary", success(Method::ManualScraping));
        let resolver = Resolver::with_strategies(primary, secondary);

        let result = resolver.resolve("https://youtu.be/ABCDEFGHIJK").await;
        assert_eq!(result.source(), Some(Source::new(Method::CaptionsApi, false)));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_every_primary_failure_falls_back_once() {
        let errors: [fn() -> Error; 6] = [
            || Error::TranscriptsDisabled("ABCDEFGHIJK".into()),
            || Error::NoTranscriptAvailable("ABCDEFGHIJK".into()),
            || Error::RequestBlocked("HTTP 429".into()),
            || Error::EmptyTranscript,
            || Error::Network("timeout".into()),
            || Error::Parse("missing key".into()),
        ];
        for make in errors {
            let (primary, _) = Scripted::new("primary", failure(make(), Method::CaptionsApi));
            let (secondary, secondary_calls) =
                Scripted::new("secondary", success(Method::ManualScraping));
            let resolver = Resolver::with_strategies(primary, secondary);

            let result = resolver.resolve("ABCDEFGHIJK").await;
            assert!(result.is_success());
            assert_eq!(
                result.source(),
                Some(Source::new(Method::ManualScraping, false))
            );
            assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_total_failure_reports_secondary_and_methods_tried() {
        let (primary, _) = Scripted::new(
            "youtube_transcript_api",
            failure(Error::RequestBlocked("HTTP 429".into()), Method::CaptionsApi),
        );
        let (secondary, _) = Scripted::new(
            "manual_scraping",
            failure(Error::NoCaptionsAvailable, Method::ManualScraping),
        );
        let resolver = Resolver::with_strategies(primary, secondary);

        let TranscriptResult::Failure(f) = resolver.resolve("ABCDEFGHIJK").await else {
            panic!("expected failure");
        };
        assert_eq!(f.error_kind, ErrorKind::NoCaptionsAvailable);
        assert_eq!(f.source, Some(Source::new(Method::ManualScraping, false)));
        assert_eq!(f.methods_tried, vec!["youtube_transcript_api", "manual_scraping"]);
    }

    struct FixedApi {
        segments: Vec<&'static str>,
    }

    #[async_trait]
    impl CaptionsApi for FixedApi {
        async fn list_tracks(&self, _id: &VideoId, _client: &HttpClient) -> Result<TrackListing> {
            Ok(TrackListing {
                tracks: vec![en_track()],
                metadata: VideoMetadata::default(),
            })
        }

        async fn fetch_segments(
            &self,
            _track: &TranscriptTrack,
            _client: &HttpClient,
        ) -> Result<Vec<Segment>> {
            Ok(self
                .segments
                .iter()
                .map(|s| Segment::new(*s, 0.0, 1.0))
                .collect())
        }
    }

    fn api_resolver(segments: Vec<&'static str>) -> Resolver<ApiStrategy<FixedApi>, Scripted> {
        let options = FetchOptions::new()
            .cookie_file(None)
            .retry_delay(Duration::ZERO);
        let transport = Transport::with_cookies(options, Vec::new());
        let (secondary, _) = Scripted::new(
            "manual_scraping",
            failure(Error::NoCaptionsAvailable, Method::ManualScraping),
        );
        Resolver::with_strategies(ApiStrategy::new(FixedApi { segments }, transport), secondary)
    }

    #[tokio::test]
    async fn test_end_to_end_with_mocked_api() {
        let resolver = api_resolver(vec!["Hello world "]);
        let json: serde_json::Value = serde_json::from_str(
            &resolver
                .resolve("https://www.youtube.com/watch?v=ABCDEFGHIJK")
                .await
                .to_json()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["transcript"], "Hello world");
        assert_eq!(json["language_code"], "en");
        assert_eq!(json["is_generated"], false);
        assert_eq!(json["video_id"], "ABCDEFGHIJK");
        assert!(json["source"]
            .as_str()
            .unwrap()
            .starts_with("youtube_transcript_api"));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let resolver = api_resolver(vec!["one ", " two", "three"]);
        let first = resolver.resolve("ABCDEFGHIJK").await;
        let second = resolver.resolve("ABCDEFGHIJK").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_blank_segments_end_in_failure() {
        let resolver = api_resolver(vec!["", "   "]);
        let TranscriptResult::Failure(f) = resolver.resolve("ABCDEFGHIJK").await else {
            panic!("expected failure");
        };
        assert_eq!(f.methods_tried.len(), 2);
        assert_eq!(f.error_kind, ErrorKind::NoCaptionsAvailable);
    }

    #[tokio::test]
    async fn test_blank_segments_primary_reports_empty_transcript() {
        let options = FetchOptions::new()
            .cookie_file(None)
            .retry_delay(Duration::ZERO);
        let strategy = ApiStrategy::new(
            FixedApi {
                segments: vec!["  "],
            },
            Transport::with_cookies(options, Vec::new()),
        );
        let result = strategy.fetch(&VideoId::normalize("ABCDEFGHIJK")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::EmptyTranscript));
    }
}
