//! Secondary strategy: scrape caption tracks straight from the watch page.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::resolver::Strategy;
use crate::scrape;
use crate::transport::{HttpClient, Transport};
use crate::types::{
    flatten_segments, select_track, Failure, Method, Source, Transcript, TranscriptResult,
    TranscriptTrack,
};
use crate::video_id::VideoId;

/// Manual scrape of the watch page, run once with no retries.
pub struct ScrapeStrategy {
    transport: Transport,
}

impl ScrapeStrategy {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    async fn scrape(&self, id: &VideoId, client: &HttpClient) -> Result<Transcript> {
        let options = self.transport.options();
        let html = client.get_text(&id.watch_url(&options.base_url)).await?;
        debug!(video_id = %id, bytes = html.len(), "fetched watch page");

        let metadata = scrape::extract_metadata(&html);
        let tracks = scrape::extract_caption_tracks(&html)?;
        let track = select_track(&tracks).ok_or(Error::NoCaptionsAvailable)?;
        debug!(
            video_id = %id,
            language_code = %track.language_code,
            is_generated = track.is_generated,
            "selected track"
        );

        let text = self.download(track, client).await?;
        let source = Source::new(Method::ManualScraping, client.is_proxied());
        Ok(Transcript::from_track(id.as_str(), track, text, metadata, source))
    }

    /// Text delivery first; json3 when the text is missing or suspiciously short.
    async fn download(&self, track: &TranscriptTrack, client: &HttpClient) -> Result<String> {
        let min_words = self.transport.options().min_words;

        let text = match client.get_text(&with_format(&track.base_url, "txt")).await {
            Ok(body) => plain_text(&body),
            Err(e) => {
                debug!(error = %e, "text caption delivery failed");
                String::new()
            }
        };
        let words = text.split_whitespace().count();
        if words >= min_words {
            return Ok(text);
        }
        debug!(words, min_words, "text delivery too short, trying json3");

        match self.download_json3(track, client).await {
            Ok(json_text) if !json_text.is_empty() => Ok(json_text),
            Ok(_) if !text.is_empty() => Ok(text),
            Ok(_) => Err(Error::EmptyTranscript),
            Err(e) if !text.is_empty() => {
                debug!(error = %e, "json3 delivery failed, keeping text delivery");
                Ok(text)
            }
            Err(e) => Err(e),
        }
    }

    async fn download_json3(&self, track: &TranscriptTrack, client: &HttpClient) -> Result<String> {
        let body = client.get_text(&with_format(&track.base_url, "json3")).await?;
        let segments = scrape::parse_json3(&body)?;
        Ok(flatten_segments(segments.iter().map(|s| s.text.as_str())))
    }
}

#[async_trait]
impl Strategy for ScrapeStrategy {
    fn name(&self) -> &'static str {
        Method::ManualScraping.as_str()
    }

    async fn fetch(&self, id: &VideoId) -> TranscriptResult {
        let use_proxy = self.transport.options().use_proxy;
        let (outcome, proxied) = match self.transport.client(use_proxy, 0) {
            Ok(client) => (self.scrape(id, &client).await, client.is_proxied()),
            Err(e) => (Err(e), false),
        };

        match outcome {
            Ok(transcript) => {
                info!(
                    video_id = %id,
                    source = %transcript.source,
                    words = transcript.word_count(),
                    "fetched transcript via manual scraping"
                );
                TranscriptResult::Success(transcript)
            }
            Err(e) => {
                warn!(video_id = %id, kind = %e.kind(), error = %e, "manual scraping failed");
                let source = Source::new(Method::ManualScraping, proxied);
                TranscriptResult::Failure(Failure::new(id.as_str(), &e, Some(source)))
            }
        }
    }
}

/// Append a `fmt` parameter to a caption URL.
fn with_format(base_url: &str, format: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}fmt={format}")
}

/// Text delivery sometimes answers with timed-text XML; flatten that the same
/// way as the captions API, otherwise just collapse whitespace.
fn plain_text(body: &str) -> String {
    if scrape::is_timedtext_xml(body) {
        let segments = scrape::parse_timedtext_xml(body);
        flatten_segments(segments.iter().map(|s| s.text.as_str()))
    } else {
        body.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
