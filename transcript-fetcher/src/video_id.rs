use std::fmt;

use url::Url;

/// Path prefixes on youtube.com that carry the video ID as the next segment.
const PATH_FORMS: &[&str] = &["shorts", "embed", "live", "v"];

/// Canonical video identifier.
///
/// Treated as an opaque token: nothing checks its length or character set, so
/// garbage input surfaces later as a "not found" failure from a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Extract the identifier from a watch URL, a short link, or pass the input
    /// through verbatim.
    pub fn normalize(raw: &str) -> Self {
        let input = raw.trim();
        if input.contains("youtube.com") || input.contains("youtu.be") {
            if let Some(id) = extract_from_url(input) {
                return VideoId(id);
            }
        }
        VideoId(input.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public watch page for this video under `base` (e.g. `https://www.youtube.com`).
    pub fn watch_url(&self, base: &str) -> String {
        format!("{}/watch?v={}", base.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn extract_from_url(input: &str) -> Option<String> {
    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;

    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    if host.ends_with("youtu.be") {
        return url.path_segments()?.next().and_then(non_empty);
    }

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return non_empty(v.as_ref());
    }

    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some(prefix), Some(id)) if PATH_FORMS.contains(&prefix) => non_empty(id),
        _ => None,
    }
}
