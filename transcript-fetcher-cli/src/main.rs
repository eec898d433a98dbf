mod serve;

use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::{json, Value};
use transcript_fetcher::{ErrorKind, Failure, FetchOptions, Resolver, TranscriptResult, VideoId};

const USAGE: &str = "Missing video ID. Usage: transcript-fetcher <video-id-or-url>";

#[derive(Parser)]
#[command(
    name = "transcript-fetcher",
    about = "Fetch a YouTube transcript and print it as JSON",
    version
)]
struct Cli {
    /// Video ID or URL (watch page, youtu.be, shorts, embed).
    input: Option<String>,

    /// Verbose logging to stderr.
    #[arg(long)]
    debug: bool,

    /// Print a health check and exit without touching the network.
    #[arg(long)]
    test: bool,

    /// Config file (default: <config dir>/transcript-fetcher/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Netscape cookies.txt to send with requests.
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Never route requests through the configured proxy.
    #[arg(long)]
    no_proxy: bool,

    /// Attempts for the captions API before falling back to scraping.
    #[arg(long)]
    attempts: Option<u32>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Serve the HTTP API on this address instead of resolving one video.
    #[arg(long, value_name = "ADDR")]
    serve: Option<SocketAddr>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let directive = if cli.debug {
        "transcript_fetcher=debug"
    } else {
        "transcript_fetcher=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = match build_options(&cli) {
        Ok(o) => o,
        Err(e) => {
            emit(&json!({ "success": false, "error": e.to_string() }), cli.pretty);
            return ExitCode::FAILURE;
        }
    };

    if cli.test {
        emit(&health_payload(&options), cli.pretty);
        return ExitCode::SUCCESS;
    }

    if let Some(addr) = cli.serve {
        return match serve::run(addr, options).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let input = match cli.input.as_deref().map(str::trim) {
        Some(input) if !input.is_empty() => input.to_string(),
        _ => {
            emit(&json!({ "success": false, "error": USAGE }), cli.pretty);
            return ExitCode::FAILURE;
        }
    };

    let resolver = Resolver::new(options);
    let task_input = input.clone();
    let result = match tokio::spawn(async move { resolver.resolve(&task_input).await }).await {
        Ok(result) => result,
        Err(e) => {
            let message = if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                e.to_string()
            };
            unexpected_failure(&input, &message)
        }
    };

    let output = if cli.pretty {
        result.to_json_pretty()
    } else {
        result.to_json()
    };
    match output {
        Ok(json) => println!("{json}"),
        Err(e) => {
            emit(&json!({ "success": false, "error": e.to_string() }), cli.pretty);
            return ExitCode::FAILURE;
        }
    }

    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_options(cli: &Cli) -> transcript_fetcher::Result<FetchOptions> {
    let mut opts = FetchOptions::load(cli.config.as_deref())?;
    if let Some(path) = &cli.cookies {
        opts = opts.cookie_file(Some(path.clone()));
    }
    if cli.no_proxy {
        opts = opts.use_proxy(false);
    }
    if let Some(n) = cli.attempts {
        opts = opts.max_attempts(n)?;
    }
    Ok(opts)
}

/// Payload for `--test` and `GET /api/health`. Reports the configured proxy;
/// `--no-proxy` does not change it.
pub(crate) fn health_payload(options: &FetchOptions) -> Value {
    let proxy = options.active_proxy();
    json!({
        "success": true,
        "message": "Transcript fetcher is working correctly",
        "proxy_enabled": proxy.is_some(),
        "proxy_host": proxy.map(|p| p.host_port()),
    })
}

fn unexpected_failure(input: &str, message: &str) -> TranscriptResult {
    TranscriptResult::Failure(Failure {
        error: format!("unexpected error: {message}"),
        error_kind: ErrorKind::ParseError,
        video_id: VideoId::normalize(input).to_string(),
        source: None,
        methods_tried: Vec::new(),
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

fn emit(value: &Value, pretty: bool) {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match text {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("JSON error: {e}"),
    }
}
