//! YouTube transcript retrieval: video URL or ID in, flattened caption text out.
//!
//! **transcript-fetcher** tries YouTube's captions API first (optionally through an
//! authenticated proxy and with exported browser cookies), and falls back to
//! scraping caption tracks straight out of the watch page. Every outcome is
//! normalized into a [`TranscriptResult`] that serializes to a single JSON object.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> transcript_fetcher::Result<()> {
//! let result = transcript_fetcher::resolve("https://youtu.be/dQw4w9WgXcQ").await;
//! println!("{}", result.to_json_pretty()?);
//!
//! // Or with explicit options
//! let options = transcript_fetcher::FetchOptions::new()
//!     .use_proxy(false)
//!     .max_attempts(2)?;
//! let result = transcript_fetcher::resolve_with_options("dQw4w9WgXcQ", &options).await;
//! if let transcript_fetcher::TranscriptResult::Success(t) = result {
//!     println!("{} words from {}", t.word_count(), t.source);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod cookies;
pub mod error;
pub mod manual;
pub mod resolver;
pub mod scrape;
pub mod transport;
pub mod types;
pub mod video_id;

pub use config::{FetchOptions, ProxyConfig};
pub use error::{Error, Result};
pub use resolver::{Resolver, Strategy};
pub use types::{ErrorKind, Failure, Method, Source, Transcript, TranscriptResult, TranscriptTrack};
pub use video_id::VideoId;

/// Resolve a video URL or ID with default options.
pub async fn resolve(raw: &str) -> TranscriptResult {
    resolve_with_options(raw, &FetchOptions::default()).await
}

/// Resolve a video URL or ID with custom options.
pub async fn resolve_with_options(raw: &str, options: &FetchOptions) -> TranscriptResult {
    Resolver::new(options.clone()).resolve(raw).await
}
