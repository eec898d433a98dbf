//! Full resolution (captions API, then watch-page fallback) against a mock site.

use std::time::Duration;

use serde_json::json;
use transcript_fetcher::{ErrorKind, FetchOptions, Resolver, TranscriptResult};
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VIDEO_ID: &str = "ABCDEFGHIJK";
const API_KEY: &str = "AIzaSy-test_key";

fn options(server: &MockServer) -> FetchOptions {
    FetchOptions::new()
        .base_url(server.uri())
        .cookie_file(None)
        .retry_delay(Duration::ZERO)
        .timeout(Duration::from_secs(5))
}

fn watch_page_with_key() -> String {
    format!(r#"<html><script>ytcfg.set({{"INNERTUBE_API_KEY":"{API_KEY}","INNERTUBE_CLIENT_NAME":"WEB"}});</script></html>"#)
}

fn player_response(base: &str) -> serde_json::Value {
    json!({
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {"videoId": VIDEO_ID, "author": "Rick Astley", "lengthSeconds": "3725"},
        "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {
                "baseUrl": format!("{base}/api/timedtext?v={VIDEO_ID}&lang=en&kind=asr&fmt=srv3"),
                "name": {"runs": [{"text": "English (auto-generated)"}]},
                "languageCode": "en",
                "kind": "asr"
            },
            {
                "baseUrl": format!("{base}/api/timedtext?v={VIDEO_ID}&lang=en-GB"),
                "name": {"runs": [{"text": "English (United Kingdom)"}]},
                "languageCode": "en-GB"
            }
        ]}}
    })
}

const TIMEDTEXT: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">Hello</text><text start="1.5" dur="1">world </text></transcript>"#;

async fn mount_watch_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/watch"))
        .and(query_param("v", VIDEO_ID))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_player(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/player"))
        .and(query_param("key", API_KEY))
        .and(body_partial_json(json!({
            "context": {"client": {"clientName": "ANDROID"}},
            "videoId": VIDEO_ID
        })))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_captions_api_success() {
    let server = MockServer::start().await;
    mount_watch_page(&server, watch_page_with_key()).await;
    mount_player(
        &server,
        ResponseTemplate::new(200).set_body_json(player_response(&server.uri())),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .and(query_param("lang", "en-GB"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TIMEDTEXT))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = Resolver::new(options(&server).use_proxy(false));
    let result = resolver
        .resolve(&format!("https://www.youtube.com/watch?v={VIDEO_ID}"))
        .await;
    let TranscriptResult::Success(t) = result else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(t.transcript, "Hello world");
    assert_eq!(t.language_code, "en-GB");
    assert!(!t.is_generated);
    assert_eq!(t.channel_title, "Rick Astley");
    assert_eq!(t.duration, "01:02:05");
    assert_eq!(t.source.to_string(), "youtube_transcript_api");
}

#[tokio::test]
async fn test_srv3_format_is_stripped_from_track_url() {
    let server = MockServer::start().await;
    let mut player = player_response(&server.uri());
    player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"]
        .as_array_mut()
        .unwrap()
        .truncate(1);
    mount_watch_page(&server, watch_page_with_key()).await;
    mount_player(&server, ResponseTemplate::new(200).set_body_json(player), 1).await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .and(query_param("kind", "asr"))
        .and(query_param_is_missing("fmt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TIMEDTEXT))
        .mount(&server)
        .await;

    let result = Resolver::new(options(&server)).resolve(VIDEO_ID).await;
    let TranscriptResult::Success(t) = result else {
        panic!("expected success, got {result:?}");
    };
    assert!(t.is_generated);
    assert_eq!(t.transcript, "Hello world");
}

#[tokio::test]
async fn test_bot_check_falls_back_to_scraping() {
    let server = MockServer::start().await;
    let page = format!(
        r#"{}<script>{{"lengthSeconds":"212","channelName":"Rick Astley","captionTracks":[{{"baseUrl":"{}/scraped?v={VIDEO_ID}&lang=en","name":{{"simpleText":"English"}},"languageCode":"en"}}],"translationLanguages":[]}}</script>"#,
        watch_page_with_key(),
        server.uri()
    );
    mount_watch_page(&server, page).await;
    mount_player(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "playabilityStatus": {
                "status": "LOGIN_REQUIRED",
                "reason": "Sign in to confirm you're not a bot"
            }
        })),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/scraped"))
        .and(query_param("fmt", "txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "We're no strangers to love You know the rules and so do I",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let result = Resolver::new(options(&server)).resolve(VIDEO_ID).await;
    let TranscriptResult::Success(t) = result else {
        panic!("expected success, got {result:?}");
    };
    assert_eq!(t.source.to_string(), "manual_scraping");
    assert_eq!(t.duration, "03:32");
    assert_eq!(t.word_count(), 13);
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
    let server = MockServer::start().await;
    mount_watch_page(&server, watch_page_with_key()).await;
    mount_player(&server, ResponseTemplate::new(500), 3).await;

    let result = Resolver::new(options(&server)).resolve(VIDEO_ID).await;
    let TranscriptResult::Failure(f) = result else {
        panic!("expected failure, got {result:?}");
    };
    // the watch page has no caption tracks, so scraping fails too
    assert_eq!(f.error_kind, ErrorKind::NoCaptionsAvailable);
    assert_eq!(f.methods_tried, vec!["youtube_transcript_api", "manual_scraping"]);
}

#[tokio::test]
async fn test_total_failure_json() {
    let server = MockServer::start().await;
    mount_watch_page(&server, "<html>nothing here</html>".to_string()).await;

    let result = Resolver::new(options(&server)).resolve(VIDEO_ID).await;
    assert_eq!(result.http_status(), 404);
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["video_id"], VIDEO_ID);
    assert_eq!(json["error_kind"], "no_captions_available");
    assert_eq!(json["source"], "manual_scraping");
    assert_eq!(json["methods_tried"], json!(["youtube_transcript_api", "manual_scraping"]));
}

#[tokio::test]
async fn test_resolve_twice_is_identical() {
    let server = MockServer::start().await;
    mount_watch_page(&server, watch_page_with_key()).await;
    mount_player(
        &server,
        ResponseTemplate::new(200).set_body_json(player_response(&server.uri())),
        2,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TIMEDTEXT))
        .mount(&server)
        .await;

    let resolver = Resolver::new(options(&server));
    let first = resolver.resolve(VIDEO_ID).await;
    let second = resolver.resolve(VIDEO_ID).await;
    assert!(first.is_success());
    assert_eq!(first, second);
}
