//! Primary strategy: list caption tracks through a captions API and download
//! the chosen one, retrying transient failures.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::resolver::Strategy;
use crate::scrape;
use crate::transport::{HttpClient, Transport};
use crate::types::{
    flatten_segments, format_duration, select_track, ErrorKind, Failure, Method, Segment, Source,
    Transcript, TranscriptResult, TranscriptTrack, VideoMetadata,
};
use crate::video_id::VideoId;

/// Client identity sent to the player endpoint. The Android client still gets
/// caption URLs that do not require a proof-of-origin token.
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "g-recaptcha";
const BOT_CHECK_REASON: &str = "Sign in to confirm you're not a bot";
/// Caption URLs carrying this parameter only answer with a PO token.
const PO_TOKEN_MARKER: &str = "&exp=xpe";

static INNERTUBE_API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());

/// Tracks available for a video plus whatever metadata came with the listing.
#[derive(Debug, Clone, Default)]
pub struct TrackListing {
    pub tracks: Vec<TranscriptTrack>,
    pub metadata: VideoMetadata,
}

/// A provider that can list and download caption tracks.
#[async_trait]
pub trait CaptionsApi: Send + Sync {
    async fn list_tracks(&self, id: &VideoId, client: &HttpClient) -> Result<TrackListing>;

    async fn fetch_segments(
        &self,
        track: &TranscriptTrack,
        client: &HttpClient,
    ) -> Result<Vec<Segment>>;
}

/// YouTube's internal player API, the same one its mobile clients use.
#[derive(Debug, Clone)]
pub struct InnertubeApi {
    base_url: String,
}

impl InnertubeApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn player_url(&self, api_key: &str) -> String {
        format!("{}/youtubei/v1/player?key={api_key}", self.base_url)
    }
}

#[async_trait]
impl CaptionsApi for InnertubeApi {
    async fn list_tracks(&self, id: &VideoId, client: &HttpClient) -> Result<TrackListing> {
        let html = client.get_text(&id.watch_url(&self.base_url)).await?;
        check_watch_page(&html)?;
        let api_key = extract_api_key(&html)?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": id.as_str(),
        });
        let player = client.post_json(&self.player_url(&api_key), &body).await?;
        parse_player_response(id, &player)
    }

    async fn fetch_segments(
        &self,
        track: &TranscriptTrack,
        client: &HttpClient,
    ) -> Result<Vec<Segment>> {
        if track.base_url.contains(PO_TOKEN_MARKER) {
            return Err(Error::RequestBlocked(
                "caption URL requires a proof-of-origin token".into(),
            ));
        }
        let xml = client.get_text(&track.base_url).await?;
        Ok(scrape::parse_timedtext_xml(&xml))
    }
}

/// Reject consent interstitials and bot challenges before looking for data.
fn check_watch_page(html: &str) -> Result<()> {
    if html.contains(CONSENT_FORM_MARKER) {
        return Err(Error::RequestBlocked("consent wall served instead of watch page".into()));
    }
    if html.contains(RECAPTCHA_MARKER) {
        return Err(Error::RequestBlocked("reCAPTCHA challenge served".into()));
    }
    Ok(())
}

fn extract_api_key(html: &str) -> Result<String> {
    INNERTUBE_API_KEY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::Parse("INNERTUBE_API_KEY not found in watch page".into()))
}

fn check_playability(id: &VideoId, player: &Value) -> Result<()> {
    let Some(playability) = player.get("playabilityStatus") else {
        return Ok(());
    };
    let status = playability
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("");
    if status == "OK" {
        return Ok(());
    }
    let reason = playability
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or(status);

    if status == "LOGIN_REQUIRED" && reason.contains(BOT_CHECK_REASON) {
        return Err(Error::RequestBlocked(reason.to_string()));
    }
    Err(Error::VideoUnavailable {
        video_id: id.to_string(),
        reason: reason.to_string(),
    })
}

/// Turn a player response into the track listing, in provider order.
fn parse_player_response(id: &VideoId, player: &Value) -> Result<TrackListing> {
    check_playability(id, player)?;

    let renderer = player
        .pointer("/captions/playerCaptionsTracklistRenderer")
        .ok_or_else(|| Error::TranscriptsDisabled(id.to_string()))?;

    let tracks = renderer
        .get("captionTracks")
        .and_then(Value::as_array)
        .map(|tracks| tracks.iter().filter_map(parse_caption_track).collect())
        .unwrap_or_default();

    let details = player.get("videoDetails");
    let metadata = VideoMetadata {
        channel_title: details
            .and_then(|d| d.get("author"))
            .and_then(Value::as_str)
            .map(str::to_string),
        duration: details
            .and_then(|d| d.get("lengthSeconds"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u64>().ok())
            .map(format_duration),
    };

    Ok(TrackListing { tracks, metadata })
}

fn parse_caption_track(track: &Value) -> Option<TranscriptTrack> {
    let base_url = track.get("baseUrl")?.as_str()?.replace("&fmt=srv3", "");
    let language_code = track
        .get("languageCode")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let language = track
        .pointer("/name/runs/0/text")
        .or_else(|| track.pointer("/name/simpleText"))
        .and_then(Value::as_str)
        .map_or_else(|| language_code.clone(), str::to_string);
    let is_generated = track.get("kind").and_then(Value::as_str) == Some("asr");

    Some(TranscriptTrack {
        language,
        language_code,
        is_generated,
        base_url,
    })
}

/// Captions API strategy with a bounded retry loop.
pub struct ApiStrategy<A> {
    api: A,
    transport: Transport,
    use_proxy: bool,
}

impl<A: CaptionsApi> ApiStrategy<A> {
    /// Proxy use and attempt count come from the transport's options.
    pub fn new(api: A, transport: Transport) -> Self {
        let use_proxy = transport.options().use_proxy;
        Self {
            api,
            transport,
            use_proxy,
        }
    }

    async fn attempt(&self, id: &VideoId, client: &HttpClient) -> Result<Transcript> {
        let listing = self.api.list_tracks(id, client).await?;
        debug!(video_id = %id, count = listing.tracks.len(), "listed caption tracks");

        let track = select_track(&listing.tracks)
            .ok_or_else(|| Error::NoTranscriptAvailable(id.to_string()))?;
        debug!(
            video_id = %id,
            language_code = %track.language_code,
            is_generated = track.is_generated,
            "selected track"
        );

        let segments = self.api.fetch_segments(track, client).await?;
        let text = flatten_segments(segments.iter().map(|s| s.text.as_str()));
        if text.is_empty() {
            return Err(Error::EmptyTranscript);
        }

        let source = Source::new(Method::CaptionsApi, client.is_proxied());
        Ok(Transcript::from_track(
            id.as_str(),
            track,
            text,
            listing.metadata,
            source,
        ))
    }
}

#[async_trait]
impl<A: CaptionsApi> Strategy for ApiStrategy<A> {
    fn name(&self) -> &'static str {
        Method::CaptionsApi.as_str()
    }

    async fn fetch(&self, id: &VideoId) -> TranscriptResult {
        let options = self.transport.options();
        let max_attempts = options.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let (outcome, proxied) = match self.transport.client(self.use_proxy, attempt) {
                Ok(client) => (self.attempt(id, &client).await, client.is_proxied()),
                Err(e) => (Err(e), false),
            };
            let error = match outcome {
                Ok(transcript) => {
                    info!(
                        video_id = %id,
                        source = %transcript.source,
                        words = transcript.word_count(),
                        "fetched transcript via captions API"
                    );
                    return TranscriptResult::Success(transcript);
                }
                Err(e) => e,
            };

            attempt += 1;
            let kind = error.kind();
            warn!(
                video_id = %id,
                attempt,
                max_attempts,
                %kind,
                error = %error,
                "captions API attempt failed"
            );

            // A blocked egress only changes between attempts behind a rotating proxy.
            let retryable = kind.is_retryable() || (kind == ErrorKind::RequestBlocked && proxied);
            if !retryable || attempt >= max_attempts {
                let source = Source::new(Method::CaptionsApi, proxied);
                return TranscriptResult::Failure(Failure::new(id.as_str(), &error, Some(source)));
            }
            tokio::time::sleep(options.retry_delay).await;
        }
    }
}
