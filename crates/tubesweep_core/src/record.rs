use std::fmt;

use serde::Serialize;
use url::Url;

/// Origin every relative feed link is resolved against.
pub const SITE_BASE: &str = "https://www.youtube.com";

/// One normalized item read from a feed container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Record {
    pub title: String,
    pub url: String,
    pub channel_name: String,
    pub channel_url: String,
    pub channel_url_short: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub titles: Vec<String>,
    /// False when no known layout variant could read the container.
    pub recognized: bool,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_substring: Option<String>,
}

impl Record {
    /// Record returned for a container no layout variant understood.
    pub fn unrecognized() -> Self {
        Self::default()
    }

    /// A record without a title only holds a position in the feed
    /// (loading tiles, removed entries) and is never matched or counted.
    pub fn is_placeholder(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Fields the filter engine searches, joined by single spaces.
    pub fn searchable_text(&self) -> String {
        [
            self.title.as_str(),
            self.text.as_str(),
            self.channel_name.as_str(),
            self.channel_url_short.as_str(),
        ]
        .join(" ")
    }

    /// Sets the channel link and derives its short (path-only) form.
    pub fn set_channel_href(&mut self, href: &str) {
        self.channel_url = full_url(href);
        self.channel_url_short = Url::parse(&self.channel_url)
            .map(|url| url_decode(url.path()))
            .unwrap_or_else(|_| url_decode(href));
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]({}) | [{}]({}) | {}",
            self.title, self.url, self.channel_name, self.channel_url, self.text
        )
    }
}

/// Percent-decodes a link, keeping the input when it is not valid UTF-8.
pub fn url_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Joins a site-relative href onto [`SITE_BASE`] and percent-decodes it.
/// Absolute links are only decoded.
pub fn full_url(href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if Url::parse(href).is_ok() {
        return url_decode(href);
    }
    let joined = Url::parse(SITE_BASE)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| format!("{SITE_BASE}{href}"));
    url_decode(&joined)
}
