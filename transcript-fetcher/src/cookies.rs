//! Netscape `cookies.txt` loading (the format browser export extensions write).

use std::path::Path;

use reqwest::cookie::Jar;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;

/// One cookie line from a Netscape cookie file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieEntry {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

impl CookieEntry {
    /// Origin the cookie is registered against when added to a jar.
    fn origin(&self) -> Option<Url> {
        let host = self.domain.trim_start_matches('.');
        Url::parse(&format!("https://{host}/")).ok()
    }

    fn set_cookie_header(&self) -> String {
        let mut header = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// Parse Netscape cookie file contents. Comment and malformed lines are skipped.
pub fn parse_netscape(contents: &str) -> Vec<CookieEntry> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            // curl and yt-dlp mark HttpOnly cookies with this prefix instead of a column
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.trim().is_empty() || line.starts_with('#') {
                return None;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                debug!(line, "skipping malformed cookie line");
                return None;
            }
            Some(CookieEntry {
                domain: fields[0].to_string(),
                path: fields[2].to_string(),
                secure: fields[3].eq_ignore_ascii_case("TRUE"),
                name: fields[5].to_string(),
                value: fields[6].to_string(),
            })
        })
        .collect()
}

/// Build a cookie jar from parsed entries.
pub fn jar_from_entries(entries: &[CookieEntry]) -> Jar {
    let jar = Jar::default();
    for entry in entries {
        match entry.origin() {
            Some(url) => jar.add_cookie_str(&entry.set_cookie_header(), &url),
            None => debug!(domain = %entry.domain, "skipping cookie with unusable domain"),
        }
    }
    jar
}

/// Load cookie entries from `path`.
///
/// A missing file yields no entries; requests then go out anonymously.
pub fn load_cookies(path: &Path) -> Result<Vec<CookieEntry>> {
    if !path.exists() {
        debug!(path = %path.display(), "no cookie file, using anonymous session");
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let entries = parse_netscape(&contents);
    if entries.is_empty() {
        warn!(path = %path.display(), "cookie file contains no usable cookies");
    } else {
        info!(path = %path.display(), count = entries.len(), "loaded cookies");
    }
    Ok(entries)
}
