use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::config::FetchOptions;
use crate::cookies::{self, CookieEntry};
use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Desktop browser user agents, rotated per attempt.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Shared, read-only transport configuration: options plus the cookies parsed
/// from the cookie file, loaded once. Cheap to clone.
#[derive(Clone)]
pub struct Transport {
    options: Arc<FetchOptions>,
    cookies: Arc<[CookieEntry]>,
}

impl Transport {
    /// Build the transport, loading cookies if the configured file exists.
    /// A cookie file that cannot be read downgrades to anonymous requests.
    pub fn new(options: FetchOptions) -> Self {
        let cookies = match &options.cookie_file {
            Some(path) => cookies::load_cookies(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load cookies, continuing without");
                Vec::new()
            }),
            None => Vec::new(),
        };
        Self::with_cookies(options, cookies)
    }

    pub fn with_cookies(options: FetchOptions, cookies: Vec<CookieEntry>) -> Self {
        Self {
            options: Arc::new(options),
            cookies: cookies.into(),
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Create a client for one attempt. The proxy is applied only when
    /// requested and configured; `attempt` picks the user agent.
    ///
    /// Each client gets its own jar seeded from the cookie file, so cookies
    /// set by responses live only as long as the client.
    pub fn client(&self, use_proxy: bool, attempt: u32) -> Result<HttpClient> {
        let user_agent = USER_AGENTS[attempt as usize % USER_AGENTS.len()];

        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(browser_headers())
            .timeout(self.options.timeout);

        let proxy = if use_proxy {
            self.options.active_proxy()
        } else {
            None
        };
        if let Some(p) = proxy {
            let mut reqwest_proxy = reqwest::Proxy::all(p.url())?;
            if let (Some(user), Some(pass)) = (&p.username, &p.password) {
                reqwest_proxy = reqwest_proxy.basic_auth(user, pass);
            }
            debug!(proxy = %p.host_port(), "routing through proxy");
            builder = builder.proxy(reqwest_proxy);
        }

        builder = builder.cookie_provider(Arc::new(cookies::jar_from_entries(&self.cookies)));

        Ok(HttpClient {
            client: builder.build()?,
            proxied: proxy.is_some(),
        })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// A successful HTTP response.
#[derive(Debug)]
pub struct Fetched {
    /// Body after gzip decoding.
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client for a single attempt.
pub struct HttpClient {
    client: reqwest::Client,
    proxied: bool,
}

impl HttpClient {
    /// Whether requests from this client go through the proxy.
    pub fn is_proxied(&self) -> bool {
        self.proxied
    }

    pub async fn get(&self, url: &str) -> Result<Fetched> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(network_error)?;
        read_response(url, response).await
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url).await?.text())
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        let fetched = read_response(url, response).await?;
        Ok(serde_json::from_slice(&fetched.body)?)
    }
}

async fn read_response(url: &str, response: reqwest::Response) -> Result<Fetched> {
    let status = response.status().as_u16();
    if status == 403 || status == 429 {
        return Err(Error::RequestBlocked(format!(
            "HTTP {status} from {}",
            strip_query(url)
        )));
    }
    if !response.status().is_success() {
        return Err(Error::HttpStatus {
            status,
            url: strip_query(url).to_string(),
        });
    }
    let headers = response.headers().clone();
    let raw = response.bytes().await.map_err(network_error)?;
    let body = decode_body(&headers, &raw)?;
    debug!(status, bytes = body.len(), "response");
    Ok(Fetched { body })
}

fn network_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("request timed out: {e}"))
    } else if e.is_builder() || e.is_decode() {
        Error::Http(e)
    } else {
        Error::Network(e.to_string())
    }
}

/// Logged URLs can carry signed caption parameters; keep only the path.
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Whether the body is gzip, judged by `Content-Encoding` or the magic bytes.
/// Servers sometimes omit the header, so both are checked.
pub fn is_gzip(headers: &HeaderMap, body: &[u8]) -> bool {
    let declared = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"));
    declared || body.starts_with(&GZIP_MAGIC)
}

/// Decompress gzip bodies; anything else is returned unchanged.
///
/// A body declared as gzip that lacks the magic bytes has already been decoded
/// upstream and is passed through.
pub fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<Vec<u8>> {
    if !is_gzip(headers, body) || !body.starts_with(&GZIP_MAGIC) {
        return Ok(body.to_vec());
    }
    let mut decoder = GzDecoder::new(body);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    debug!(compressed = body.len(), decompressed = out.len(), "decompressed gzip body");
    Ok(out)
}
