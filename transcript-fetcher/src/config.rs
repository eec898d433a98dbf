use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Public site root; overridable so tests can point at a mock server.
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Browser cookie export, relative to the working directory.
pub const DEFAULT_COOKIE_FILE: &str = "cookies/www.youtube.com_cookies.txt";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Below this many words a text-format caption download is not trusted.
pub const DEFAULT_MIN_WORDS: usize = 10;

/// Authenticated forward proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            enabled: true,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enabled and pointing somewhere. Anything else means "no proxy".
    pub fn is_active(&self) -> bool {
        self.enabled && !self.host.trim().is_empty()
    }

    /// Proxy endpoint without credentials.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host.trim(), self.port)
    }

    /// `host:port`, safe for logs.
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host.trim(), self.port)
    }
}

/// On-disk configuration file (TOML).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    proxy: Option<ProxyConfig>,
    cookie_file: Option<PathBuf>,
    max_attempts: Option<u32>,
    timeout_secs: Option<u64>,
    min_words: Option<usize>,
}

/// Builder for retrieval options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub proxy: Option<ProxyConfig>,
    /// Request the proxy for the captions API strategy.
    pub use_proxy: bool,
    pub cookie_file: Option<PathBuf>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub min_words: usize,
    pub base_url: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            use_proxy: true,
            cookie_file: Some(PathBuf::from(DEFAULT_COOKIE_FILE)),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_words: DEFAULT_MIN_WORDS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn use_proxy(mut self, enabled: bool) -> Self {
        self.use_proxy = enabled;
        self
    }

    /// Cookie file to load; `None` disables cookies entirely.
    pub fn cookie_file(mut self, path: Option<PathBuf>) -> Self {
        self.cookie_file = path;
        self
    }

    /// Attempts for the captions API strategy. Must be at least 1.
    pub fn max_attempts(mut self, n: u32) -> Result<Self> {
        if n == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }
        self.max_attempts = n;
        Ok(self)
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn min_words(mut self, n: usize) -> Self {
        self.min_words = n;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// The proxy to apply, if one is configured and enabled.
    pub fn active_proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref().filter(|p| p.is_active())
    }

    /// Default config location, `~/.config/transcript-fetcher/config.toml` on Linux.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("transcript-fetcher")
            .join("config.toml")
    }

    /// Load options from a TOML file and `TRANSCRIPT_*` environment variables.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    fn load_with_env(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = match path {
            Some(p) if !p.exists() => {
                return Err(Error::ConfigNotFound {
                    path: p.to_path_buf(),
                })
            }
            Some(p) => read_config_file(p)?,
            None => {
                let default = Self::default_config_path();
                if default.exists() {
                    read_config_file(&default)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let mut options = Self::default();
        if let Some(n) = file.max_attempts {
            options = options.max_attempts(n)?;
        }
        if let Some(secs) = file.timeout_secs {
            options.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = file.min_words {
            options.min_words = n;
        }
        if let Some(cookies) = file.cookie_file {
            options.cookie_file = Some(cookies);
        }
        options.proxy = file.proxy;

        apply_env_overrides(&mut options, &env)?;

        if let Some(proxy) = &options.proxy {
            if proxy.enabled && !proxy.is_active() {
                warn!("proxy enabled but host is empty, requests will go out directly");
            }
        }
        Ok(options)
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    debug!(path = %path.display(), "reading config file");
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

fn apply_env_overrides(
    options: &mut FetchOptions,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let lookup = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(host) = lookup("TRANSCRIPT_PROXY_HOST") {
        let proxy = options
            .proxy
            .get_or_insert_with(|| ProxyConfig::new(String::new(), 0));
        proxy.host = host;
    }
    if let Some(proxy) = options.proxy.as_mut() {
        if let Some(port) = lookup("TRANSCRIPT_PROXY_PORT") {
            proxy.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid TRANSCRIPT_PROXY_PORT: {port}")))?;
        }
        if let Some(user) = lookup("TRANSCRIPT_PROXY_USERNAME") {
            proxy.username = Some(user);
        }
        if let Some(pass) = lookup("TRANSCRIPT_PROXY_PASSWORD") {
            proxy.password = Some(pass);
        }
        if let Some(flag) = lookup("TRANSCRIPT_PROXY_ENABLED") {
            proxy.enabled = parse_bool(&flag).ok_or_else(|| {
                Error::Config(format!("invalid TRANSCRIPT_PROXY_ENABLED: {flag}"))
            })?;
        }
    }
    if let Some(cookies) = lookup("TRANSCRIPT_COOKIE_FILE") {
        options.cookie_file = Some(PathBuf::from(cookies));
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
