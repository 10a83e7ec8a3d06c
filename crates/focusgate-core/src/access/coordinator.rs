//! Temporary access bookkeeping.
//!
//! ## State Transitions
//!
//! ```text
//! Inactive -> Active(domain, until) -> Inactive
//! ```
//!
//! The coordinator only holds state and answers questions about it. The
//! service performs the side effects of a transition (persisting, arming
//! the expiry check, redirecting the tab, notifying).

use super::state::OverrideState;
use crate::error::ValidationError;
use crate::matcher::normalize;
use crate::platform::TabId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted(OverrideState),
    /// An override is already running; nothing changed.
    AlreadyActive { domain: String, remaining_secs: u64 },
}

/// Result of comparing the countdown widget's display with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncVerdict {
    NoOverride,
    /// Authoritative remaining time is used up.
    Expired,
    InSync { remaining_secs: u64 },
    /// The display drifted past tolerance; push this value to it.
    Correct { remaining_secs: u64 },
}

#[derive(Debug, Clone)]
pub struct OverrideCoordinator {
    current: Option<OverrideState>,
    drift_tolerance_ms: u64,
}

impl OverrideCoordinator {
    pub fn new(drift_tolerance_secs: u64) -> Self {
        Self {
            current: None,
            drift_tolerance_ms: drift_tolerance_secs.saturating_mul(1000),
        }
    }

    /// Adopt a record loaded from the store, replacing any current one.
    pub fn restore(&mut self, state: Option<OverrideState>) {
        self.current = state;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> Option<&OverrideState> {
        self.current.as_ref()
    }

    pub fn is_active(&self, now_ms: u64) -> bool {
        self.current.as_ref().is_some_and(|s| s.is_live(now_ms))
    }

    pub fn is_active_for(&self, url: &str, now_ms: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.is_live(now_ms) && s.covers(url))
    }

    /// A record exists but its window has passed.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.current.as_ref().is_some_and(|s| !s.is_live(now_ms))
    }

    /// Authoritative remaining time, clamped at zero.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.current
            .as_ref()
            .map(|s| s.authoritative_remaining_ms(now_ms).max(0) as u64)
            .unwrap_or(0)
    }

    /// Remaining whole seconds, rounded up.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        self.remaining_ms(now_ms).div_ceil(1000)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Open a window for the host of `url`.
    ///
    /// A running override is left untouched. An expired record that was not
    /// cleared yet is replaced.
    pub fn grant(
        &mut self,
        url: &str,
        duration_ms: u64,
        tab_id: Option<TabId>,
        now_ms: u64,
    ) -> Result<GrantOutcome, ValidationError> {
        if let Some(active) = self.current.as_ref().filter(|s| s.is_live(now_ms)) {
            return Ok(GrantOutcome::AlreadyActive {
                domain: active.domain.clone(),
                remaining_secs: self.remaining_secs(now_ms),
            });
        }
        let domain = normalize(url).ok_or_else(|| ValidationError::InvalidUrl {
            url: url.to_string(),
            message: "no hostname".into(),
        })?;
        let state = OverrideState::new(domain, duration_ms, tab_id, now_ms);
        self.current = Some(state.clone());
        Ok(GrantOutcome::Granted(state))
    }

    /// Check the widget's displayed seconds against the record.
    pub fn sync(&self, display_secs: u64, now_ms: u64) -> SyncVerdict {
        let Some(state) = self.current.as_ref() else {
            return SyncVerdict::NoOverride;
        };
        if !state.is_live(now_ms) {
            return SyncVerdict::Expired;
        }
        let authoritative = self.remaining_ms(now_ms);
        let remaining_secs = authoritative.div_ceil(1000);
        let display_ms = display_secs.saturating_mul(1000);
        if display_ms.abs_diff(authoritative) > self.drift_tolerance_ms {
            SyncVerdict::Correct { remaining_secs }
        } else {
            SyncVerdict::InSync { remaining_secs }
        }
    }

    /// Point the override at a different tab.
    pub fn retarget(&mut self, tab_id: TabId) {
        if let Some(state) = self.current.as_mut() {
            state.tab_id = Some(tab_id);
        }
    }

    /// Drop the record, returning it. Safe when nothing is active.
    pub fn take(&mut self) -> Option<OverrideState> {
        self.current.take()
    }
}
