//! Integration tests for the focus service.
//!
//! Drives a full service over the headless browser model with a manual
//! clock: blocking during focus, override grant and expiry, restart
//! recovery, enforcement self-healing and countdown delivery.

use focusgate_core::alarms::Alarm;
use focusgate_core::platform::CountdownCommand;
use focusgate_core::storage::keys;
use focusgate_core::{
    BlockingMode, Config, FocusService, HeadlessPlatform, Lifecycle, ManualClock, MemoryStore,
    Phase, Request, SettingsPatch, StateStore, StrategyKind,
};
use serde_json::json;

const T0: u64 = 1_700_000_000_000;
const BLOCKED_PAGE: &str = "focusgate://extension/blocked.html";

struct Harness {
    browser: HeadlessPlatform,
    store: MemoryStore,
    clock: ManualClock,
    service: FocusService,
}

impl Harness {
    fn new(store: MemoryStore, interception: bool) -> Self {
        let mut harness = Self::uninitialized(HeadlessPlatform::new(), store, interception);
        harness.service.initialize().unwrap();
        harness
    }

    fn uninitialized(browser: HeadlessPlatform, store: MemoryStore, interception: bool) -> Self {
        let clock = ManualClock::at(T0);
        let service = FocusService::new(
            Config::default(),
            browser.platform(interception),
            Box::new(store.clone()),
            Box::new(clock.clone()),
        );
        Self {
            browser,
            store,
            clock,
            service,
        }
    }

    fn blocking(sites: &[&str]) -> Self {
        Self::new(
            MemoryStore::with_values([(keys::BLOCKED_SITES, json!(sites))]),
            true,
        )
    }

    /// Move time forward one second at a time, serving alarms as a driver would.
    fn run_for(&mut self, secs: u64) {
        for _ in 0..secs {
            self.clock.advance(1_000);
            self.service.poll();
        }
    }

    /// Open a tab on `url`, let the service send it to the blocked page and
    /// grant an override from there.
    fn grant_from_blocked_page(&mut self, url: &str) -> i64 {
        let redirect = self.service.on_before_request(url).expect("url should be blocked");
        let tab = self.browser.open_tab(&redirect);
        let response = self.service.handle(Request::OverrideBlock {
            tab_id: Some(tab),
            original_url: None,
        });
        assert!(response.success, "grant failed: {:?}", response.error);
        // The blocked page sends itself back to the original address.
        self.browser.set_tab_url(tab, url, true);
        self.service.on_navigation_completed(tab, url);
        tab
    }

    fn notice_titles(&self) -> Vec<String> {
        self.browser
            .recorded()
            .notices
            .into_iter()
            .map(|n| n.title)
            .collect()
    }
}

#[test]
fn test_focus_only_blocking_end_to_end() {
    let mut h = Harness::blocking(&["example.com"]);
    assert!(!h.service.should_block("https://example.com/"));

    h.service.start_timer();
    assert!(h.service.should_block("https://sub.example.com/page"));
    assert!(!h.service.should_block("https://other.com/"));
    assert!(h.service.is_enforcing());
    assert_eq!(h.browser.listener_count(), 1);

    let redirect = h
        .service
        .on_before_request("https://sub.example.com/page")
        .unwrap();
    assert!(redirect.starts_with(BLOCKED_PAGE));
    assert!(redirect.contains("phase=focus"));

    h.service.pause_timer();
    assert!(!h.service.should_block("https://example.com/"));
    assert_eq!(h.browser.listener_count(), 0);
    assert_eq!(h.store.get(keys::IS_PAUSED).unwrap(), Some(json!(true)));
}

#[test]
fn test_always_mode_blocks_while_idle() {
    let mut h = Harness::blocking(&["example.com"]);
    let response = h.service.handle(Request::UpdateBlockingMode {
        blocking_mode: BlockingMode::Always,
    });
    assert!(response.success);
    assert!(h.service.should_block("https://example.com/"));
    assert_eq!(h.store.get(keys::BLOCKING_MODE).unwrap(), Some(json!("always")));
}

#[test]
fn test_override_expires_through_periodic_check() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let tab = h.grant_from_blocked_page("https://example.com/");

    assert!(!h.service.should_block("https://example.com/"));
    assert!(!h.service.should_block("https://www.example.com/feed"));
    assert!(h.service.is_armed(Alarm::OverrideCheck));
    assert!(h
        .browser
        .recorded()
        .countdown
        .contains(&(tab, CountdownCommand::Start { initial_time: 60 })));

    // No widget messages at all; only the periodic check runs.
    h.clock.set(T0 + 61_000);
    h.service.poll();

    assert!(h.service.override_state().is_none());
    assert!(h.service.should_block("https://example.com/"));
    assert_eq!(h.store.get(keys::OVERRIDE_UNTIL).unwrap(), None);
    assert!(h
        .browser
        .tab_url(tab)
        .is_some_and(|url| url.starts_with(BLOCKED_PAGE)));
    assert!(h
        .browser
        .recorded()
        .countdown
        .contains(&(tab, CountdownCommand::Stop)));
    assert_eq!(h.service.timer_state().time_left, 25 * 60 - 61);
    assert!(h.notice_titles().contains(&"Temporary access ended".to_string()));
}

#[test]
fn test_second_grant_reports_remaining_time() {
    let mut h = Harness::blocking(&["example.com", "news.site"]);
    h.service.start_timer();
    h.grant_from_blocked_page("https://example.com/");

    h.clock.advance(20_000);
    let response = h.service.handle(Request::OverrideBlock {
        tab_id: None,
        original_url: Some("https://news.site/".into()),
    });
    assert!(response.success);
    assert_eq!(response.override_seconds, Some(40));
    assert_eq!(h.service.override_state().unwrap().domain, "example.com");
    assert!(h.service.should_block("https://news.site/"));
}

#[test]
fn test_grant_rejects_unusable_urls() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let response = h.service.handle(Request::OverrideBlock {
        tab_id: None,
        original_url: Some("javascript:alert(1)".into()),
    });
    assert!(!response.success);
    assert!(response.error.is_some());

    let response = h.service.handle(Request::OverrideBlock {
        tab_id: Some(42),
        original_url: None,
    });
    assert!(!response.success);
    assert!(h.service.override_state().is_none());
}

#[test]
fn test_restart_drops_expired_override() {
    let store = MemoryStore::with_values([
        (keys::BLOCKED_SITES, json!(["example.com"])),
        (keys::OVERRIDE_UNTIL, json!(T0 - 1_000)),
        (keys::OVERRIDE_DOMAIN, json!("example.com")),
        (keys::OVERRIDE_START_TIME, json!(T0 - 61_000)),
        (keys::OVERRIDE_DURATION, json!(60_000)),
    ]);
    let h = Harness::new(store, true);
    assert!(h.service.override_state().is_none());
    assert!(!h.service.is_armed(Alarm::OverrideCheck));
    for key in keys::OVERRIDE_KEYS {
        assert_eq!(h.store.get(key).unwrap(), None, "{key} left behind");
    }
}

#[test]
fn test_restart_keeps_live_override_on_open_tab() {
    let browser = HeadlessPlatform::new();
    let tab = browser.open_tab("https://example.com/");
    let store = MemoryStore::with_values([
        (keys::BLOCKED_SITES, json!(["example.com"])),
        (keys::CURRENT_PHASE, json!("focus")),
        (keys::TIME_LEFT, json!(900)),
        (keys::IS_RUNNING, json!(true)),
        (keys::OVERRIDE_UNTIL, json!(T0 + 30_000)),
        (keys::OVERRIDE_DOMAIN, json!("example.com")),
        (keys::OVERRIDE_START_TIME, json!(T0 - 30_000)),
        (keys::OVERRIDE_DURATION, json!(60_000)),
        (keys::OVERRIDE_TAB_ID, json!(tab)),
    ]);
    let mut h = Harness::uninitialized(browser, store, true);
    h.service.initialize().unwrap();

    let state = h.service.override_state().unwrap();
    assert_eq!(state.domain, "example.com");
    assert_eq!(state.tab_id, Some(tab));
    assert!(h.service.is_armed(Alarm::OverrideCheck));
    assert!(h.service.is_armed(Alarm::PhaseTick));
    assert!(!h.service.should_block("https://example.com/"));

    h.run_for(31);
    assert!(h.service.override_state().is_none());
    assert!(h.service.should_block("https://example.com/"));
}

#[test]
fn test_restart_drops_override_whose_tab_is_gone() {
    let store = MemoryStore::with_values([
        (keys::OVERRIDE_UNTIL, json!(T0 + 30_000)),
        (keys::OVERRIDE_DOMAIN, json!("example.com")),
        (keys::OVERRIDE_START_TIME, json!(T0 - 30_000)),
        (keys::OVERRIDE_DURATION, json!(60_000)),
        (keys::OVERRIDE_TAB_ID, json!(99)),
    ]);
    let h = Harness::new(store, true);
    assert!(h.service.override_state().is_none());
    assert_eq!(h.store.get(keys::OVERRIDE_DOMAIN).unwrap(), None);
}

#[test]
fn test_incomplete_override_record_is_discarded() {
    let store = MemoryStore::with_values([
        (keys::OVERRIDE_DOMAIN, json!("example.com")),
        (keys::OVERRIDE_TAB_ID, json!(3)),
    ]);
    let h = Harness::new(store, true);
    assert!(h.service.override_state().is_none());
    assert_eq!(h.store.get(keys::OVERRIDE_DOMAIN).unwrap(), None);
    assert_eq!(h.store.get(keys::OVERRIDE_TAB_ID).unwrap(), None);
}

#[test]
fn test_watchdog_rebuilds_lost_listener() {
    let mut h = Harness::blocking(&["example.com"]);
    assert_eq!(h.service.strategy_kind(), StrategyKind::Interception);
    h.service.start_timer();
    assert_eq!(h.browser.listener_count(), 1);

    h.browser.drop_listeners();
    assert!(!h.service.is_enforcing());

    // Until the watchdog runs, completed navigations are screened.
    let tab = h.browser.open_tab("https://example.com/");
    h.service.on_navigation_completed(tab, "https://example.com/");
    assert!(h
        .browser
        .tab_url(tab)
        .is_some_and(|url| url.starts_with(BLOCKED_PAGE)));

    h.run_for(5);
    assert_eq!(h.browser.listener_count(), 1);
    assert!(h.service.is_enforcing());
}

#[test]
fn test_reactive_strategy_redirects_after_navigation() {
    let mut h = Harness::new(
        MemoryStore::with_values([(keys::BLOCKED_SITES, json!(["example.com"]))]),
        false,
    );
    assert_eq!(h.service.strategy_kind(), StrategyKind::Reactive);
    assert!(!h.service.is_armed(Alarm::EnforcementWatchdog));

    let tab = h.browser.open_tab("https://example.com/");
    h.service.on_navigation_completed(tab, "https://example.com/");
    assert_eq!(h.browser.tab_url(tab).as_deref(), Some("https://example.com/"));

    h.service.start_timer();
    h.service.on_tab_activated(tab);
    let url = h.browser.tab_url(tab).unwrap();
    assert!(url.starts_with(BLOCKED_PAGE));
    assert!(url.contains("timerRunning=true"));

    let other = h.browser.open_tab("https://other.com/");
    h.service.on_navigation_completed(other, "https://other.com/");
    assert_eq!(h.browser.tab_url(other).as_deref(), Some("https://other.com/"));
}

#[test]
fn test_countdown_falls_back_to_notice() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    h.browser.fail_countdown(10);
    h.grant_from_blocked_page("https://example.com/");

    for _ in 0..20 {
        h.clock.advance(100);
        h.service.poll();
    }
    assert!(h.notice_titles().contains(&"Temporary access active".to_string()));
    assert!(h.browser.recorded().countdown.is_empty());
    assert!(h.service.override_state().is_some());
}

#[test]
fn test_requests_before_ready_are_replayed() {
    let mut h = Harness::uninitialized(
        HeadlessPlatform::new(),
        MemoryStore::with_values([(keys::BLOCKED_SITES, json!(["example.com"]))]),
        true,
    );
    assert_eq!(h.service.lifecycle(), Lifecycle::Initializing);

    let response = h.service.handle(Request::Start);
    assert!(response.success);
    assert!(response.deferred);
    assert_eq!(h.service.deferred_len(), 1);
    assert!(h.service.on_before_request("https://example.com/").is_none());

    let replies = h.service.initialize().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].success && !replies[0].deferred);
    assert!(h.service.timer_state().is_running);
    assert!(h.service.should_block("https://example.com/"));
    assert!(h.service.initialize().is_err());
}

#[test]
fn test_leaving_domain_ends_override_without_redirect() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let tab = h.grant_from_blocked_page("https://example.com/");
    h.browser.clear_recorded();

    h.browser.set_tab_url(tab, "https://other.com/", true);
    h.service.on_navigation_completed(tab, "https://other.com/");

    assert!(h.service.override_state().is_none());
    assert!(h.browser.recorded().navigations.is_empty());
    assert!(h.service.should_block("https://example.com/"));
}

#[test]
fn test_closing_override_tab_ends_override() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let tab = h.grant_from_blocked_page("https://example.com/");

    h.browser.close_tab(tab);
    h.service.on_tab_removed(tab);
    assert!(h.service.override_state().is_none());
    assert!(!h.service.is_armed(Alarm::OverrideCheck));
}

#[test]
fn test_reset_clears_override_and_start_clears_expired_one() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    h.grant_from_blocked_page("https://example.com/");
    h.service.reset_timer();
    assert!(h.service.override_state().is_none());
    assert!(h.service.timer_state().is_idle());

    h.service.start_timer();
    h.grant_from_blocked_page("https://example.com/");
    h.service.pause_timer();
    h.clock.advance(61_000);
    // Not polled, so the stale record is still there.
    assert!(h.service.override_state().is_some());
    h.service.start_timer();
    assert!(h.service.override_state().is_none());
    assert!(h.service.should_block("https://example.com/"));
}

#[test]
fn test_widget_drift_is_corrected() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let tab = h.grant_from_blocked_page("https://example.com/");

    h.clock.advance(10_000);
    let response = h.service.handle(Request::TimerTick {
        tab_id: Some(tab),
        time_remaining: 40,
    });
    assert!(response.success);
    assert!(h
        .browser
        .recorded()
        .countdown
        .contains(&(tab, CountdownCommand::Sync { time_remaining: 50 })));

    let response = h.service.handle(Request::RequestTimerSync {
        tab_id: Some(tab),
        current_time: 49,
    });
    assert_eq!(response.time_remaining, Some(50));

    // A widget that reports zero early is corrected, not obeyed.
    h.service.handle(Request::TimerExpired { tab_id: Some(tab) });
    assert!(h.service.override_state().is_some());

    h.clock.advance(51_000);
    h.service.handle(Request::TimerTick {
        tab_id: Some(tab),
        time_remaining: 0,
    });
    assert!(h.service.override_state().is_none());
}

#[test]
fn test_session_cycle_through_alarms() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.update_settings(&SettingsPatch {
        focus_time: Some(1),
        break_time: Some(1),
        long_break_time: Some(2),
        sessions_count: Some(4),
        auto_start: Some(true),
        ..Default::default()
    });
    h.service.start_timer();

    let mut phases = vec![h.service.timer_state().current_phase];
    let mut blocked_in_break = false;
    for _ in 0..600 {
        h.run_for(1);
        let state = h.service.timer_state();
        if !state.is_running {
            break;
        }
        if phases.last() != Some(&state.current_phase) {
            phases.push(state.current_phase);
        }
        if state.current_phase.is_break() && h.service.should_block("https://example.com/") {
            blocked_in_break = true;
        }
    }

    assert_eq!(
        phases,
        vec![
            Phase::Focus,
            Phase::ShortBreak,
            Phase::Focus,
            Phase::ShortBreak,
            Phase::Focus,
            Phase::ShortBreak,
            Phase::Focus,
            Phase::LongBreak,
        ]
    );
    assert!(!blocked_in_break);
    assert!(h.service.timer_state().is_idle());
    assert_eq!(h.service.timer_state().current_session, 1);
    assert!(!h.service.is_armed(Alarm::PhaseTick));
    assert!(h
        .notice_titles()
        .contains(&"🏆 All sessions completed!".to_string()));
}

#[test]
fn test_external_blocklist_change_is_observed() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let mut writer = h.store.clone();
    writer
        .set(keys::BLOCKED_SITES, json!(["example.com", "news.site"]))
        .unwrap();
    assert!(!h.service.should_block("https://news.site/"));

    h.service.on_storage_changed(&[keys::BLOCKED_SITES]);
    assert!(h.service.should_block("https://news.site/"));
}

#[test]
fn test_status_snapshot_and_dispose() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    h.grant_from_blocked_page("https://example.com/");

    let response = h.service.handle(Request::GetStatus);
    let status = response.status.unwrap();
    assert_eq!(status.lifecycle, Lifecycle::Ready);
    assert!(status.timer.is_running);
    assert_eq!(status.blocked_sites, vec!["example.com".to_string()]);
    assert_eq!(status.override_status.unwrap().remaining_secs, 60);
    assert_eq!(status.badge.text, "25");

    h.service.dispose();
    assert_eq!(h.service.lifecycle(), Lifecycle::Disposed);
    assert_eq!(h.browser.listener_count(), 0);
    assert!(h.service.next_wakeup_ms().is_none());
    assert!(!h.service.handle(Request::Start).success);
}

#[test]
fn test_expiry_returns_every_tab_on_the_domain() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let granted = h.grant_from_blocked_page("https://example.com/");

    // Opened while access was granted, so never intercepted.
    let second = h.browser.open_tab("https://sub.example.com/other");
    h.service
        .on_navigation_completed(second, "https://sub.example.com/other");
    let unrelated = h.browser.open_tab("https://other.com/");
    assert_eq!(
        h.browser.tab_url(second).as_deref(),
        Some("https://sub.example.com/other")
    );

    h.run_for(61);
    assert!(h.service.override_state().is_none());
    for tab in [granted, second] {
        let url = h.browser.tab_url(tab).unwrap();
        assert!(url.starts_with(BLOCKED_PAGE), "tab {tab} left on {url}");
    }
    assert_eq!(h.browser.tab_url(unrelated).as_deref(), Some("https://other.com/"));
    let stops: Vec<_> = h
        .browser
        .recorded()
        .countdown
        .into_iter()
        .filter(|(_, command)| *command == CountdownCommand::Stop)
        .collect();
    assert_eq!(stops, vec![(granted, CountdownCommand::Stop)]);
}

#[test]
fn test_expiry_of_untabbed_override_still_reblocks() {
    let mut h = Harness::blocking(&["example.com"]);
    h.service.start_timer();
    let response = h.service.handle(Request::OverrideBlock {
        tab_id: None,
        original_url: Some("https://example.com/".into()),
    });
    assert!(response.success);
    let tab = h.browser.open_tab("https://example.com/feed");
    h.service.on_navigation_completed(tab, "https://example.com/feed");

    h.run_for(61);
    assert!(h
        .browser
        .tab_url(tab)
        .is_some_and(|url| url.starts_with(BLOCKED_PAGE)));
}

#[test]
fn test_grant_after_unnoticed_expiry_ends_old_override() {
    let mut h = Harness::blocking(&["example.com", "other.com"]);
    h.service.start_timer();
    let first = h.grant_from_blocked_page("https://example.com/");
    assert_eq!(h.store.get(keys::OVERRIDE_TAB_ID).unwrap(), Some(json!(first)));

    // Past the deadline, before the periodic check notices.
    h.clock.advance(60_500);
    assert!(h.service.override_state().is_some());

    let response = h.service.handle(Request::OverrideBlock {
        tab_id: None,
        original_url: Some("https://other.com/".into()),
    });
    assert!(response.success);
    assert_eq!(response.override_seconds, Some(60));

    assert_eq!(h.service.override_state().unwrap().domain, "other.com");
    assert!(h
        .browser
        .tab_url(first)
        .is_some_and(|url| url.starts_with(BLOCKED_PAGE)));
    assert_eq!(h.store.get(keys::OVERRIDE_TAB_ID).unwrap(), None);
    assert_eq!(h.store.get(keys::OVERRIDE_DOMAIN).unwrap(), Some(json!("other.com")));
    assert_eq!(
        h.notice_titles()
            .into_iter()
            .filter(|title| title.starts_with("Temporary access"))
            .collect::<Vec<_>>(),
        vec![
            "Temporary access granted",
            "Temporary access ended",
            "Temporary access granted",
        ]
    );
}

#[test]
fn test_non_ascii_blocklist_entries_survive_startup() {
    let mut h = Harness::blocking(&["日本語.jp", "example.com"]);
    assert_eq!(h.service.lifecycle(), Lifecycle::Ready);
    assert_eq!(h.service.blocklist().len(), 2);

    assert!(h.service.add_site("https://www.münchen.de/").unwrap());
    h.service.start_timer();
    assert!(h.service.should_block("https://日本語.jp/page"));
    assert!(h.service.should_block("https://münchen.de/"));
    assert!(!h.service.should_block("https://example.jp/"));
}
