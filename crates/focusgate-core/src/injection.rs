//! Countdown widget delivery.
//!
//! After a grant the countdown is pushed into the override tab. The tab may
//! still be loading the page the user was sent back to, so a delivery waits
//! for the tab to be loaded and on the override domain, retries transient
//! failures with exponential backoff, and falls back to a notification when
//! it runs out of attempts or time.

use crate::access::OverrideCoordinator;
use crate::error::TabError;
use crate::platform::{CountdownCommand, TabController, TabId};
use crate::storage::InjectionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Job {
    tab: TabId,
    domain: String,
    failures: u32,
    next_attempt_ms: u64,
    deadline_ms: u64,
}

/// What became of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionOutcome {
    Delivered { tab: TabId, initial_time: u64 },
    /// Show the remaining time some other way.
    Fallback {
        tab: TabId,
        domain: String,
        remaining_secs: u64,
    },
    /// The override or the tab went away first.
    Abandoned { tab: TabId },
}

#[derive(Debug, Clone)]
pub struct InjectionQueue {
    policy: InjectionConfig,
    jobs: Vec<Job>,
}

impl InjectionQueue {
    pub fn new(policy: InjectionConfig) -> Self {
        Self {
            policy,
            jobs: Vec::new(),
        }
    }

    /// Queue a delivery to `tab`, replacing any pending one for it.
    pub fn schedule(&mut self, tab: TabId, domain: &str, now_ms: u64) {
        self.cancel_tab(tab);
        self.jobs.push(Job {
            tab,
            domain: domain.to_string(),
            failures: 0,
            next_attempt_ms: now_ms,
            deadline_ms: now_ms.saturating_add(self.policy.timeout_ms),
        });
    }

    pub fn cancel_tab(&mut self, tab: TabId) {
        self.jobs.retain(|job| job.tab != tab);
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn is_pending(&self, tab: TabId) -> bool {
        self.jobs.iter().any(|job| job.tab == tab)
    }

    pub fn next_due(&self) -> Option<u64> {
        self.jobs.iter().map(|job| job.next_attempt_ms).min()
    }

    fn backoff_ms(&self, failures: u32) -> u64 {
        let shift = failures.saturating_sub(1).min(16);
        self.policy.initial_backoff_ms.max(1).saturating_mul(1 << shift)
    }

    /// Attempt every due delivery.
    pub fn run_due(
        &mut self,
        now_ms: u64,
        tabs: &mut dyn TabController,
        overrides: &OverrideCoordinator,
    ) -> Vec<InjectionOutcome> {
        let (due, waiting): (Vec<Job>, Vec<Job>) = std::mem::take(&mut self.jobs)
            .into_iter()
            .partition(|job| job.next_attempt_ms <= now_ms);
        self.jobs = waiting;

        let mut outcomes = Vec::new();
        for job in due {
            if let Some(outcome) = self.attempt(job, now_ms, tabs, overrides) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn attempt(
        &mut self,
        mut job: Job,
        now_ms: u64,
        tabs: &mut dyn TabController,
        overrides: &OverrideCoordinator,
    ) -> Option<InjectionOutcome> {
        let live = overrides
            .state()
            .is_some_and(|s| s.domain == job.domain && s.is_live(now_ms));
        if !live {
            return Some(InjectionOutcome::Abandoned { tab: job.tab });
        }
        let remaining_secs = overrides.remaining_secs(now_ms);
        let fallback = |job: &Job| InjectionOutcome::Fallback {
            tab: job.tab,
            domain: job.domain.clone(),
            remaining_secs,
        };

        let info = match tabs.get(job.tab) {
            Ok(info) => info,
            Err(TabError::Closed(_)) => return Some(InjectionOutcome::Abandoned { tab: job.tab }),
            Err(e) => {
                tracing::debug!(tab = job.tab, error = %e, "tab lookup failed");
                return self.retry_or_fallback(job, now_ms, fallback);
            }
        };

        let on_domain = overrides.is_active_for(&info.url, now_ms);
        if !info.loaded || !on_domain {
            if now_ms >= job.deadline_ms {
                tracing::info!(tab = job.tab, "tab never settled on override domain");
                return Some(fallback(&job));
            }
            job.next_attempt_ms = now_ms + self.policy.initial_backoff_ms.max(1);
            self.jobs.push(job);
            return None;
        }

        let command = CountdownCommand::Start {
            initial_time: remaining_secs,
        };
        match tabs.send_countdown(job.tab, command) {
            Ok(()) => {
                tracing::debug!(tab = job.tab, remaining_secs, "countdown delivered");
                Some(InjectionOutcome::Delivered {
                    tab: job.tab,
                    initial_time: remaining_secs,
                })
            }
            Err(TabError::Closed(_)) => Some(InjectionOutcome::Abandoned { tab: job.tab }),
            Err(e) if e.is_transient() => {
                tracing::debug!(tab = job.tab, error = %e, "countdown delivery failed");
                self.retry_or_fallback(job, now_ms, fallback)
            }
            Err(e) => {
                tracing::info!(tab = job.tab, error = %e, "countdown cannot be shown in tab");
                Some(fallback(&job))
            }
        }
    }

    fn retry_or_fallback(
        &mut self,
        mut job: Job,
        now_ms: u64,
        fallback: impl Fn(&Job) -> InjectionOutcome,
    ) -> Option<InjectionOutcome> {
        job.failures += 1;
        if job.failures >= self.policy.max_attempts || now_ms >= job.deadline_ms {
            tracing::warn!(tab = job.tab, failures = job.failures, "giving up on countdown");
            return Some(fallback(&job));
        }
        job.next_attempt_ms = now_ms + self.backoff_ms(job.failures);
        self.jobs.push(job);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPlatform;

    fn policy() -> InjectionConfig {
        InjectionConfig {
            max_attempts: 3,
            initial_backoff_ms: 100,
            timeout_ms: 5_000,
        }
    }

    fn active(url: &str) -> OverrideCoordinator {
        let mut overrides = OverrideCoordinator::new(2);
        overrides.grant(url, 60_000, None, 0).unwrap();
        overrides
    }

    #[test]
    fn delivers_once_tab_is_ready() {
        let mut browser = HeadlessPlatform::new();
        let tab = browser.open_tab("https://example.com/");
        browser.set_tab_url(tab, "https://example.com/", false);
        let overrides = active("https://example.com");
        let mut queue = InjectionQueue::new(policy());

        queue.schedule(tab, "example.com", 0);
        assert!(queue.run_due(0, &mut browser, &overrides).is_empty());
        assert_eq!(queue.next_due(), Some(100));

        browser.set_tab_url(tab, "https://example.com/", true);
        let outcomes = queue.run_due(1_000, &mut browser, &overrides);
        assert_eq!(
            outcomes,
            vec![InjectionOutcome::Delivered {
                tab,
                initial_time: 59
            }]
        );
        assert!(!queue.is_pending(tab));
    }

    #[test]
    fn transient_failures_back_off_then_fall_back() {
        let mut browser = HeadlessPlatform::new();
        let tab = browser.open_tab("https://example.com/");
        browser.fail_countdown(10);
        let overrides = active("https://example.com");
        let mut queue = InjectionQueue::new(policy());

        queue.schedule(tab, "example.com", 0);
        assert!(queue.run_due(0, &mut browser, &overrides).is_empty());
        assert_eq!(queue.next_due(), Some(100));
        assert!(queue.run_due(100, &mut browser, &overrides).is_empty());
        assert_eq!(queue.next_due(), Some(300));
        let outcomes = queue.run_due(300, &mut browser, &overrides);
        assert!(matches!(
            outcomes.as_slice(),
            [InjectionOutcome::Fallback { remaining_secs: 60, .. }]
        ));
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn restricted_tab_falls_back_immediately() {
        let mut browser = HeadlessPlatform::new();
        let tab = browser.open_tab("ftp://example.com/pub");
        let overrides = active("https://example.com");
        let mut queue = InjectionQueue::new(policy());
        queue.schedule(tab, "example.com", 0);
        let outcomes = queue.run_due(0, &mut browser, &overrides);
        assert!(matches!(outcomes.as_slice(), [InjectionOutcome::Fallback { .. }]));
    }

    #[test]
    fn tab_off_domain_falls_back_at_deadline() {
        let mut browser = HeadlessPlatform::new();
        let tab = browser.open_tab("https://other.com/");
        let overrides = active("https://example.com");
        let mut queue = InjectionQueue::new(policy());
        queue.schedule(tab, "example.com", 0);
        assert!(queue.run_due(0, &mut browser, &overrides).is_empty());
        assert!(queue.run_due(4_900, &mut browser, &overrides).is_empty());
        let outcomes = queue.run_due(5_000, &mut browser, &overrides);
        assert!(matches!(outcomes.as_slice(), [InjectionOutcome::Fallback { .. }]));
    }

    #[test]
    fn closed_tab_or_ended_override_abandons() {
        let mut browser = HeadlessPlatform::new();
        let tab = browser.open_tab("https://example.com/");
        let mut overrides = active("https://example.com");
        let mut queue = InjectionQueue::new(policy());

        queue.schedule(tab, "example.com", 0);
        browser.close_tab(tab);
        assert_eq!(
            queue.run_due(0, &mut browser, &overrides),
            vec![InjectionOutcome::Abandoned { tab }]
        );

        let tab = browser.open_tab("https://example.com/");
        queue.schedule(tab, "example.com", 0);
        overrides.take();
        assert_eq!(
            queue.run_due(0, &mut browser, &overrides),
            vec![InjectionOutcome::Abandoned { tab }]
        );
    }
}
