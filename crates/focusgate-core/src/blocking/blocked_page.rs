//! Blocked page addressing.
//!
//! The redirect carries `url`, `mode`, `timerRunning` and `phase` as query
//! parameters. They are for display only; the page never feeds them back
//! into a decision.

use url::Url;

use crate::error::ValidationError;
use crate::timer::{BlockingMode, Phase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedPageParams {
    pub url: Option<String>,
    pub mode: BlockingMode,
    pub timer_running: bool,
    pub phase: Phase,
}

impl BlockedPageParams {
    /// Read the parameters back from a blocked page address, with the
    /// page's own fallbacks for missing values.
    pub fn from_url(address: &str) -> Option<Self> {
        let parsed = Url::parse(address).ok()?;
        let mut params = Self {
            url: None,
            mode: BlockingMode::FocusOnly,
            timer_running: false,
            phase: Phase::Focus,
        };
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "url" => params.url = Some(value.into_owned()),
                "mode" => params.mode = BlockingMode::parse(&value).unwrap_or_default(),
                "timerRunning" => params.timer_running = value == "true",
                "phase" => params.phase = Phase::parse(&value).unwrap_or_default(),
                _ => {}
            }
        }
        Some(params)
    }
}

/// Build the redirect target for a blocked navigation.
pub fn blocked_page_url(
    base: &str,
    original_url: &str,
    mode: BlockingMode,
    timer_running: bool,
    phase: Phase,
) -> String {
    let pairs = [
        ("url", original_url),
        ("mode", mode.as_str()),
        ("timerRunning", if timer_running { "true" } else { "false" }),
        ("phase", phase.as_str()),
    ];
    match Url::parse(base) {
        Ok(mut url) => {
            url.set_query(None);
            url.query_pairs_mut().extend_pairs(pairs);
            url.to_string()
        }
        Err(e) => {
            tracing::warn!(base, error = %e, "blocked page base is not a URL; appending query");
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            format!("{base}?{query}")
        }
    }
}

/// Whether `url` already points at the blocked page.
pub fn is_blocked_page(base: &str, url: &str) -> bool {
    let strip = |s: &str| s.split(['?', '#']).next().unwrap_or_default().to_string();
    !base.is_empty() && strip(url) == strip(base)
}

/// Accept an original URL for redirect only if it is http(s) with a host.
pub fn validate_redirect_url(url: &str) -> Result<Url, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidUrl {
        url: url.to_string(),
        message: message.to_string(),
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https can be reopened"));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "focusgate://extension/blocked.html";

    #[test]
    fn redirect_carries_display_params() {
        let address = blocked_page_url(
            BASE,
            "https://example.com/a?b=c&d=e",
            BlockingMode::FocusOnly,
            true,
            Phase::Focus,
        );
        assert!(address.starts_with(BASE));
        assert!(is_blocked_page(BASE, &address));

        let params = BlockedPageParams::from_url(&address).unwrap();
        assert_eq!(params.url.as_deref(), Some("https://example.com/a?b=c&d=e"));
        assert_eq!(params.mode, BlockingMode::FocusOnly);
        assert!(params.timer_running);
        assert_eq!(params.phase, Phase::Focus);
    }

    #[test]
    fn missing_params_use_page_defaults() {
        let params = BlockedPageParams::from_url(BASE).unwrap();
        assert_eq!(params.url, None);
        assert_eq!(params.mode, BlockingMode::FocusOnly);
        assert!(!params.timer_running);
        assert_eq!(params.phase, Phase::Focus);
    }

    #[test]
    fn redirect_validation() {
        assert!(validate_redirect_url("https://example.com/page").is_ok());
        assert!(validate_redirect_url("javascript:alert(1)").is_err());
        assert!(validate_redirect_url("file:///etc/passwd").is_err());
        assert!(validate_redirect_url("not a url").is_err());
    }

    #[test]
    fn other_pages_are_not_the_blocked_page() {
        assert!(!is_blocked_page(BASE, "https://example.com"));
        assert!(!is_blocked_page("", "https://example.com"));
    }
}
