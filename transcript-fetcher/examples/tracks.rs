//! List the caption tracks a watch page advertises, without downloading any.
//!
//! Usage: cargo run --example tracks -- dQw4w9WgXcQ

use transcript_fetcher::scrape;
use transcript_fetcher::transport::Transport;
use transcript_fetcher::{FetchOptions, VideoId};

#[tokio::main]
async fn main() -> transcript_fetcher::Result<()> {
    let input = std::env::args()
        .nth(1)
        .expect("usage: tracks <video-url-or-id>");
    let id = VideoId::normalize(&input);

    let options = FetchOptions::new();
    let page = id.watch_url(&options.base_url);
    let client = Transport::new(options).client(false, 0)?;
    let html = client.get_text(&page).await?;

    let meta = scrape::extract_metadata(&html);
    println!(
        "{} ({})",
        meta.channel_title.as_deref().unwrap_or("?"),
        meta.duration.as_deref().unwrap_or("?")
    );
    for track in scrape::extract_caption_tracks(&html)? {
        let kind = if track.is_generated { "asr" } else { "authored" };
        println!("  {} [{}] {}", track.language_code, kind, track.language);
    }

    Ok(())
}
