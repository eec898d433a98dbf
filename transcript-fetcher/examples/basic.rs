//! Fetch a transcript and print the text.
//!
//! Usage: cargo run --example basic -- https://youtu.be/dQw4w9WgXcQ

use transcript_fetcher::TranscriptResult;

#[tokio::main]
async fn main() -> transcript_fetcher::Result<()> {
    let input = std::env::args()
        .nth(1)
        .expect("usage: basic <video-url-or-id>");

    match transcript_fetcher::resolve(&input).await {
        TranscriptResult::Success(t) => println!("{}", t.transcript),
        TranscriptResult::Failure(f) => eprintln!("{} ({})", f.error, f.error_kind),
    }

    Ok(())
}
