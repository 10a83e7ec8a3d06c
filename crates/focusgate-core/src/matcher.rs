//! URL normalization and blocklist matching.
//!
//! Hostnames are compared after lower-casing and dropping a leading `www.`.
//! A pattern matches a URL when the URL's host equals the pattern domain or
//! is a subdomain of it (`sub.example.com` matches `example.com`,
//! `notexample.com` does not). A pattern may carry a path prefix
//! (`reddit.com/r/all`), in which case the URL path must start with it.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

/// Parse a URL leniently: a missing scheme is treated as `http://`.
fn parse_lenient(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    Url::parse(&candidate).ok()
}

fn clean_host(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Reduce a URL to a comparable hostname.
///
/// Returns `None` for anything without a usable host.
pub fn normalize(url: &str) -> Option<String> {
    let parsed = parse_lenient(url)?;
    clean_host(parsed.host_str()?)
}

/// The host as URLs report it: IDNA-encoded, lower-case, without a port.
fn canonical_host(host: &str) -> Option<String> {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    };
    Host::parse(host).ok().map(|h| h.to_string())
}

/// `host` equals `domain` or is one of its subdomains.
pub fn host_within(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/// Whether the URL is an ordinary web page (http or https with a host).
pub fn is_web_url(url: &str) -> bool {
    match Url::parse(url.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// One blocklist entry: a domain and an optional path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SitePattern {
    pub domain: String,
    pub path_prefix: Option<String>,
}

impl SitePattern {
    /// Parse an already-sanitized pattern string (`domain[/path]`).
    pub fn parse(pattern: &str) -> Option<Self> {
        let sanitized = sanitize_pattern(pattern)?;
        let (domain, path) = match sanitized.find('/') {
            Some(idx) => (&sanitized[..idx], Some(sanitized[idx..].to_string())),
            None => (sanitized.as_str(), None),
        };
        let domain = clean_host(&canonical_host(domain)?)?;
        Some(Self {
            domain,
            path_prefix: path.filter(|p| p != "/"),
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        let Some(parsed) = parse_lenient(url) else {
            return false;
        };
        let Some(host) = parsed.host_str().and_then(clean_host) else {
            return false;
        };
        if !host_within(&host, &self.domain) {
            return false;
        }
        match &self.path_prefix {
            Some(prefix) => parsed.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for SitePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path_prefix {
            Some(path) => write!(f, "{}{}", self.domain, path),
            None => f.write_str(&self.domain),
        }
    }
}

/// Clean user input into the stored pattern form.
///
/// Drops the scheme and a leading `www.`, trims whitespace and a trailing
/// slash, and lower-cases the host part. The path part keeps its case.
pub fn sanitize_pattern(input: &str) -> Option<String> {
    let mut site = input.trim();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = strip_prefix_ignore_case(site, scheme) {
            site = rest;
            break;
        }
    }
    if let Some(rest) = strip_prefix_ignore_case(site, "www.") {
        site = rest;
    }
    let site = site.trim_end_matches('/');

    let (host, path) = match site.find('/') {
        Some(idx) => (&site[..idx], &site[idx..]),
        None => (site, ""),
    };
    if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
        return None;
    }
    Some(format!("{}{}", host.to_ascii_lowercase(), path))
}

/// `prefix` must be ASCII; `text` may hold any characters.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// The user's list of blocked sites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    patterns: Vec<SitePattern>,
}

impl Blocklist {
    /// Build from stored strings, silently dropping unusable entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<SitePattern> = Vec::new();
        for entry in entries {
            match SitePattern::parse(entry.as_ref()) {
                Some(pattern) if !patterns.contains(&pattern) => patterns.push(pattern),
                Some(_) => {}
                None => tracing::warn!(entry = entry.as_ref(), "dropping unusable blocklist entry"),
            }
        }
        Self { patterns }
    }

    /// Build from a raw stored value. Anything other than an array of
    /// strings yields an empty list.
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::Array(items)) => {
                Self::from_entries(items.iter().filter_map(|v| v.as_str()))
            }
            Some(other) => {
                tracing::warn!(value = %other, "blockedSites is not an array; treating as empty");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.patterns.iter().map(ToString::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Add a pattern. Returns `false` when it was already present.
    pub fn insert(&mut self, pattern: SitePattern) -> bool {
        if self.patterns.contains(&pattern) {
            return false;
        }
        self.patterns.push(pattern);
        true
    }

    /// Remove by stored string form. Returns `false` when absent.
    pub fn remove(&mut self, entry: &str) -> bool {
        let Some(target) = SitePattern::parse(entry) else {
            return false;
        };
        let before = self.patterns.len();
        self.patterns.retain(|p| *p != target);
        before != self.patterns.len()
    }

    /// The first pattern matching `url`, if any.
    pub fn matching(&self, url: &str) -> Option<&SitePattern> {
        self.patterns.iter().find(|p| p.matches(url))
    }

    pub fn is_blocked(&self, url: &str) -> bool {
        self.matching(url).is_some()
    }
}
