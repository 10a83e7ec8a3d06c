use super::blocked_page::{blocked_page_url, is_blocked_page};
use super::decision::{decide, enforcement_required, Decision, DecisionInputs};
use super::enforcement::{EnforcementStrategy, StrategyKind};
use crate::error::EnforcementError;
use crate::matcher::is_web_url;
use crate::platform::TabInfo;

/// Answers "block this navigation?" and keeps the enforcement hook in line
/// with the answer.
///
/// Reads timer, mode, blocklist and override state through
/// [`DecisionInputs`] and never changes any of them.
pub struct BlockingDecisionEngine {
    strategy: Box<dyn EnforcementStrategy>,
    blocked_page: String,
}

impl BlockingDecisionEngine {
    pub fn new(strategy: Box<dyn EnforcementStrategy>, blocked_page: impl Into<String>) -> Self {
        Self {
            strategy,
            blocked_page: blocked_page.into(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn is_engaged(&self) -> bool {
        self.strategy.is_engaged()
    }

    pub fn blocked_page(&self) -> &str {
        &self.blocked_page
    }

    pub fn decide(&self, url: &str, inputs: &DecisionInputs<'_>) -> Decision {
        decide(url, inputs)
    }

    pub fn should_block(&self, url: &str, inputs: &DecisionInputs<'_>) -> bool {
        self.decide(url, inputs).is_blocked()
    }

    /// Blocked page address for `url` under the current state.
    pub fn redirect_for(&self, url: &str, inputs: &DecisionInputs<'_>) -> String {
        blocked_page_url(
            &self.blocked_page,
            url,
            inputs.mode,
            inputs.timer.is_running,
            inputs.timer.current_phase,
        )
    }

    pub fn is_blocked_page(&self, url: &str) -> bool {
        is_blocked_page(&self.blocked_page, url)
    }

    // ── Enforcement ──────────────────────────────────────────────────

    /// Re-derive whether enforcement is required and apply it.
    pub fn update_enforcement(&mut self, inputs: &DecisionInputs<'_>) -> Result<(), EnforcementError> {
        let required = enforcement_required(inputs);
        self.strategy.apply(required)
    }

    /// Watchdog pass; rebuilds a hook the platform lost.
    pub fn verify(&mut self, inputs: &DecisionInputs<'_>) -> Result<bool, EnforcementError> {
        let required = enforcement_required(inputs);
        self.strategy.verify(required)
    }

    /// Remove the hook regardless of state.
    pub fn shutdown(&mut self) -> Result<(), EnforcementError> {
        self.strategy.apply(false)
    }

    /// Pre-navigation listener body. Returns the redirect target for a
    /// navigation that must not proceed.
    pub fn on_before_request(&self, url: &str, inputs: &DecisionInputs<'_>) -> Option<String> {
        if !is_web_url(url) || self.is_blocked_page(url) {
            return None;
        }
        match self.decide(url, inputs) {
            Decision::Blocked { pattern } => {
                tracing::debug!(url, pattern = %pattern, "redirecting navigation");
                Some(self.redirect_for(url, inputs))
            }
            _ => None,
        }
    }

    /// After-the-fact check of a tab's current page. Only screens when the
    /// strategy calls for it, or when `force` is set.
    pub fn screen_tab(
        &self,
        tab: &TabInfo,
        inputs: &DecisionInputs<'_>,
        force: bool,
    ) -> Option<String> {
        if !force && !self.strategy.screens_after_navigation() {
            return None;
        }
        self.on_before_request(&tab.url, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::OverrideCoordinator;
    use crate::blocking::enforcement::{probe, ReactiveStrategy};
    use crate::matcher::Blocklist;
    use crate::platform::HeadlessPlatform;
    use crate::timer::{BlockingMode, Settings, TimerState};

    const PAGE: &str = "focusgate://extension/blocked.html";

    fn focusing() -> TimerState {
        TimerState {
            is_running: true,
            ..TimerState::fresh(&Settings::default())
        }
    }

    #[test]
    fn listener_follows_required_state() {
        let browser = HeadlessPlatform::new();
        let mut platform = browser.platform(true);
        let mut engine = BlockingDecisionEngine::new(probe(&mut platform), PAGE);
        let blocklist = Blocklist::from_entries(["example.com"]);
        let overrides = OverrideCoordinator::new(2);
        let running = focusing();

        let inputs = DecisionInputs::new(&running, BlockingMode::FocusOnly, &blocklist, &overrides, 0);
        engine.update_enforcement(&inputs).unwrap();
        assert!(engine.is_engaged());
        assert_eq!(browser.listener_count(), 1);

        let idle = TimerState::fresh(&Settings::default());
        let inputs = DecisionInputs::new(&idle, BlockingMode::FocusOnly, &blocklist, &overrides, 0);
        engine.update_enforcement(&inputs).unwrap();
        assert!(!engine.is_engaged());
        assert_eq!(browser.listener_count(), 0);
    }

    #[test]
    fn before_request_redirects_blocked_pages_only() {
        let engine = BlockingDecisionEngine::new(Box::new(ReactiveStrategy::default()), PAGE);
        let blocklist = Blocklist::from_entries(["example.com"]);
        let overrides = OverrideCoordinator::new(2);
        let running = focusing();
        let inputs = DecisionInputs::new(&running, BlockingMode::FocusOnly, &blocklist, &overrides, 0);

        let redirect = engine
            .on_before_request("https://example.com/feed", &inputs)
            .unwrap();
        assert!(engine.is_blocked_page(&redirect));
        assert!(redirect.contains("timerRunning=true"));
        assert!(engine.on_before_request("https://other.com", &inputs).is_none());
        assert!(engine.on_before_request(&redirect, &inputs).is_none());
        assert!(engine.on_before_request("about:blank", &inputs).is_none());
    }

    #[test]
    fn screening_depends_on_strategy() {
        let browser = HeadlessPlatform::new();
        let mut platform = browser.platform(true);
        let mut engine = BlockingDecisionEngine::new(probe(&mut platform), PAGE);
        let blocklist = Blocklist::from_entries(["example.com"]);
        let overrides = OverrideCoordinator::new(2);
        let running = focusing();
        let inputs = DecisionInputs::new(&running, BlockingMode::FocusOnly, &blocklist, &overrides, 0);
        engine.update_enforcement(&inputs).unwrap();

        let tab = TabInfo {
            id: 1,
            url: "https://example.com".into(),
            loaded: true,
        };
        assert!(engine.screen_tab(&tab, &inputs, false).is_none());
        assert!(engine.screen_tab(&tab, &inputs, true).is_some());

        browser.drop_listeners();
        assert!(engine.screen_tab(&tab, &inputs, false).is_some());
        assert!(engine.verify(&inputs).unwrap());
        assert!(engine.screen_tab(&tab, &inputs, false).is_none());
    }
}
