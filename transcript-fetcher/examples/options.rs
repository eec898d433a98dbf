//! Fetch through a proxy with fewer attempts and print the full JSON result.
//!
//! Usage: cargo run --example options -- <video-url-or-id> [proxy-host:port]

use std::time::Duration;

use transcript_fetcher::{FetchOptions, ProxyConfig};

#[tokio::main]
async fn main() -> transcript_fetcher::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = args.next().expect("usage: options <video-url-or-id> [proxy-host:port]");

    let mut opts = FetchOptions::new()
        .max_attempts(2)?
        .retry_delay(Duration::from_millis(500))
        .timeout(Duration::from_secs(15));

    if let Some((host, port)) = args.next().as_deref().and_then(|p| p.split_once(':')) {
        let port = port.parse().expect("proxy port must be a number");
        opts = opts.proxy(ProxyConfig::new(host, port));
    }

    let result = transcript_fetcher::resolve_with_options(&input, &opts).await;
    println!("{}", result.to_json_pretty()?);

    Ok(())
}
