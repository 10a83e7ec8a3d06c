use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matcher::{host_within, normalize};
use crate::platform::TabId;

/// A granted temporary access window.
///
/// The domain is authoritative. `tab_id` only says which tab to notify,
/// inject into and redirect, and lets the service notice the tab closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideState {
    /// Epoch ms at which access ends.
    pub until_ms: u64,
    /// Normalized hostname.
    pub domain: String,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub tab_id: Option<TabId>,
    pub grant_id: Uuid,
}

impl OverrideState {
    pub fn new(domain: String, duration_ms: u64, tab_id: Option<TabId>, now_ms: u64) -> Self {
        Self {
            until_ms: now_ms.saturating_add(duration_ms),
            domain,
            start_ms: now_ms,
            duration_ms,
            tab_id,
            grant_id: Uuid::new_v4(),
        }
    }

    /// `duration - (now - start)`. Negative once the window has passed.
    pub fn authoritative_remaining_ms(&self, now_ms: u64) -> i64 {
        let elapsed = now_ms as i64 - self.start_ms as i64;
        self.duration_ms as i64 - elapsed
    }

    /// Inside both the `until` deadline and the duration budget.
    pub fn is_live(&self, now_ms: u64) -> bool {
        now_ms < self.until_ms && self.authoritative_remaining_ms(now_ms) > 0
    }

    /// The URL's host is the override domain or one of its subdomains.
    pub fn covers(&self, url: &str) -> bool {
        normalize(url).is_some_and(|host| host_within(&host, &self.domain))
    }
}

/// Why an override ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// The window ran out.
    Elapsed,
    /// The tab left the override domain.
    NavigatedAway,
    TabClosed,
    TimerReset,
    /// Cleared at timer start because it had already run out.
    TimerStarted,
    /// Found stale when state was reloaded.
    Stale,
    /// Removed by an explicit request.
    Revoked,
}

impl ExpiryReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpiryReason::Elapsed => "elapsed",
            ExpiryReason::NavigatedAway => "navigated_away",
            ExpiryReason::TabClosed => "tab_closed",
            ExpiryReason::TimerReset => "timer_reset",
            ExpiryReason::TimerStarted => "timer_started",
            ExpiryReason::Stale => "stale",
            ExpiryReason::Revoked => "revoked",
        }
    }
}
