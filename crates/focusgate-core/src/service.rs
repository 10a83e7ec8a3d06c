//! The focus service.
//!
//! One owned [`FocusService`] holds the phase clock, blocklist, override
//! coordinator, enforcement engine and alarms. Every input (request,
//! browser event, alarm) is handled to completion before the next one; the
//! state change and its persistence write happen inside the same call.
//!
//! ## Lifecycle
//!
//! ```text
//! Initializing -> Ready -> Disposed
//! ```
//!
//! Requests that arrive while initializing are queued and replayed in order
//! once [`FocusService::initialize`] has loaded the store.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::access::{ExpiryReason, GrantOutcome, OverrideCoordinator, OverrideState, SyncVerdict};
use crate::alarms::{Alarm, AlarmSchedule};
use crate::blocking::{
    probe, validate_redirect_url, BlockedPageParams, BlockingDecisionEngine, Decision,
    DecisionInputs, StrategyKind,
};
use crate::clock::Clock;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::injection::{InjectionOutcome, InjectionQueue};
use crate::matcher::{sanitize_pattern, Blocklist, SitePattern};
use crate::message::{OverrideStatus, Request, Response, StatusSnapshot};
use crate::platform::{CountdownCommand, NotificationSink, Platform, TabController, TabId, TabInfo};
use crate::storage::{keys, persist, Config, StateStore};
use crate::timer::{Badge, BlockingMode, PhaseClock, Settings, SettingsPatch, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    Initializing,
    Ready,
    Disposed,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Initializing => "initializing",
            Lifecycle::Ready => "ready",
            Lifecycle::Disposed => "disposed",
        }
    }
}

/// Build a [`DecisionInputs`] from disjoint service fields, so the engine
/// can be borrowed mutably alongside.
macro_rules! inputs {
    ($svc:expr, $now:expr) => {
        DecisionInputs::new(
            $svc.phase.state(),
            $svc.phase.blocking_mode(),
            &$svc.blocklist,
            &$svc.overrides,
            $now,
        )
    };
}

pub struct FocusService {
    lifecycle: Lifecycle,
    config: Config,
    clock: Box<dyn Clock>,
    store: Box<dyn StateStore>,
    tabs: Box<dyn TabController>,
    notifier: Box<dyn NotificationSink>,
    engine: BlockingDecisionEngine,
    phase: PhaseClock,
    blocklist: Blocklist,
    overrides: OverrideCoordinator,
    alarms: AlarmSchedule,
    injection: InjectionQueue,
    deferred: VecDeque<Request>,
    last_badge: Option<Badge>,
}

impl FocusService {
    /// Wire up the service. Nothing is read from the store until
    /// [`initialize`](Self::initialize).
    pub fn new(
        config: Config,
        mut platform: Platform,
        store: Box<dyn StateStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let strategy = probe(&mut platform);
        let engine = BlockingDecisionEngine::new(strategy, config.blocked_page_url.clone());
        let overrides = OverrideCoordinator::new(config.timing.drift_tolerance_secs);
        let injection = InjectionQueue::new(config.injection.clone());
        Self {
            lifecycle: Lifecycle::Initializing,
            config,
            clock,
            store,
            tabs: platform.tabs,
            notifier: platform.notifier,
            engine,
            phase: PhaseClock::new(Settings::default()),
            blocklist: Blocklist::default(),
            overrides,
            alarms: AlarmSchedule::new(),
            injection,
            deferred: VecDeque::new(),
            last_badge: None,
        }
    }

    /// Load persisted state, recover any override, install enforcement and
    /// replay deferred requests.
    ///
    /// # Errors
    /// Returns an error if the service is not in the `Initializing` state.
    pub fn initialize(&mut self) -> Result<Vec<Response>> {
        if self.lifecycle != Lifecycle::Initializing {
            return Err(CoreError::Lifecycle(self.lifecycle.as_str()));
        }
        let attempts = self.attempts();
        let now = self.now();

        let settings = persist::load_settings(self.store.as_ref(), attempts);
        self.phase = match persist::load_timer(self.store.as_ref(), &settings, attempts) {
            Some(state) => PhaseClock::restore(settings, state),
            None => PhaseClock::new(settings),
        };
        self.blocklist = persist::load_blocklist(self.store.as_ref(), attempts);
        self.recover_override(now);

        self.lifecycle = Lifecycle::Ready;
        tracing::info!(
            strategy = self.engine.strategy_kind().as_str(),
            sites = self.blocklist.len(),
            running = self.phase.state().is_running,
            "focus service ready"
        );

        if self.phase.state().is_running {
            self.alarms
                .arm(Alarm::PhaseTick, self.config.timing.tick_interval_ms, now);
        }
        if self.engine.strategy_kind() == StrategyKind::Interception {
            self.alarms.arm(
                Alarm::EnforcementWatchdog,
                self.config.timing.watchdog_interval_ms,
                now,
            );
        }
        self.refresh_enforcement();
        self.publish_badge();

        let mut replies = Vec::with_capacity(self.deferred.len());
        while let Some(request) = self.deferred.pop_front() {
            tracing::debug!(action = request.action(), "replaying deferred request");
            replies.push(self.handle(request));
        }
        Ok(replies)
    }

    /// Stop all alarms, drop the enforcement hook and refuse further input.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        self.alarms.cancel_all();
        self.injection.clear();
        self.deferred.clear();
        if let Err(e) = self.engine.shutdown() {
            tracing::warn!(error = %e, "failed to remove enforcement hook");
        }
        self.lifecycle = Lifecycle::Disposed;
        tracing::info!("focus service disposed");
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timer_state(&self) -> &TimerState {
        self.phase.state()
    }

    pub fn settings(&self) -> &Settings {
        self.phase.settings()
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn override_state(&self) -> Option<&OverrideState> {
        self.overrides.state()
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.engine.strategy_kind()
    }

    /// The enforcement hook is installed (interception) or armed (reactive).
    pub fn is_enforcing(&self) -> bool {
        self.engine.is_engaged()
    }

    pub fn is_armed(&self, alarm: Alarm) -> bool {
        self.alarms.is_armed(alarm)
    }

    /// The service clock's current time.
    pub fn now_ms(&self) -> u64 {
        self.now()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn decide(&self, url: &str) -> Decision {
        let now = self.now();
        self.engine.decide(url, &inputs!(self, now))
    }

    pub fn should_block(&self, url: &str) -> bool {
        self.decide(url).is_blocked()
    }

    /// Earliest epoch-ms at which [`poll`](Self::poll) has work to do.
    pub fn next_wakeup_ms(&self) -> Option<u64> {
        match (self.alarms.next_due(), self.injection.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let now = self.now();
        StatusSnapshot {
            lifecycle: self.lifecycle,
            timer: self.phase.state().clone(),
            settings: self.phase.settings().clone(),
            blocked_sites: self.blocklist.entries(),
            enforcement: self.engine.strategy_kind(),
            enforcing: self.engine.is_engaged(),
            override_status: self
                .overrides
                .state()
                .filter(|s| s.is_live(now))
                .map(|s| OverrideStatus::new(s, self.overrides.remaining_secs(now))),
            badge: Badge::from_state(self.phase.state()),
        }
    }

    // ── Requests ─────────────────────────────────────────────────────

    pub fn handle(&mut self, request: Request) -> Response {
        match self.lifecycle {
            Lifecycle::Initializing => {
                tracing::debug!(action = request.action(), "deferring request until ready");
                self.deferred.push_back(request);
                Response::deferred()
            }
            Lifecycle::Disposed => Response::failure(CoreError::Lifecycle("disposed")),
            Lifecycle::Ready => {
                let action = request.action();
                self.dispatch(request).unwrap_or_else(|e| {
                    tracing::warn!(action, error = %e, "request failed");
                    Response::failure(e)
                })
            }
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Start => {
                self.start_timer();
                Ok(Response::ok())
            }
            Request::Pause => {
                self.pause_timer();
                Ok(Response::ok())
            }
            Request::Reset => {
                self.reset_timer();
                Ok(Response::ok())
            }
            Request::UpdateSettings { settings } => {
                self.update_settings(&settings);
                Ok(Response::ok())
            }
            Request::UpdateBlocklist => {
                self.reload_blocklist();
                Ok(Response::ok())
            }
            Request::UpdateBlockingMode { blocking_mode } => {
                self.set_blocking_mode(blocking_mode);
                Ok(Response::ok())
            }
            Request::OverrideBlock {
                tab_id,
                original_url,
            } => {
                let secs = self.grant_override(tab_id, original_url.as_deref())?;
                Ok(Response::ok().with_override_seconds(secs))
            }
            Request::TimerTick {
                tab_id,
                time_remaining,
            } => {
                self.widget_tick(tab_id, time_remaining);
                Ok(Response::ok())
            }
            Request::RequestTimerSync {
                tab_id,
                current_time,
            } => {
                let remaining = self.widget_sync(tab_id, current_time);
                Ok(Response::ok().with_time_remaining(remaining))
            }
            Request::TimerExpired { tab_id } => {
                self.widget_expired(tab_id);
                Ok(Response::ok())
            }
            Request::GetStatus => Ok(Response::ok().with_status(self.status())),
        }
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start_timer(&mut self) {
        let now = self.now();
        if self.overrides.is_expired(now) {
            self.end_override(ExpiryReason::TimerStarted);
        }
        let events: Vec<Event> = self.phase.start().into_iter().collect();
        self.after_timer_change(events);
    }

    pub fn pause_timer(&mut self) {
        let events: Vec<Event> = self.phase.pause().into_iter().collect();
        self.after_timer_change(events);
    }

    pub fn reset_timer(&mut self) {
        let event = self.phase.reset();
        if self.overrides.state().is_some() {
            self.end_override(ExpiryReason::TimerReset);
        }
        self.after_timer_change(vec![event]);
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) {
        let event = self.phase.update_settings(patch);
        let attempts = self.attempts();
        if let Err(e) = persist::save_settings(self.store.as_mut(), self.phase.settings(), attempts)
        {
            tracing::error!(error = %e, "failed to persist settings");
        }
        self.after_timer_change(vec![event]);
    }

    pub fn set_blocking_mode(&mut self, mode: BlockingMode) {
        self.phase.set_blocking_mode(mode);
        let attempts = self.attempts();
        if let Err(e) = persist::set_with_retry(
            self.store.as_mut(),
            keys::BLOCKING_MODE,
            serde_json::json!(mode.as_str()),
            attempts,
        ) {
            tracing::error!(error = %e, "failed to persist blocking mode");
        }
        tracing::info!(mode = mode.as_str(), "blocking mode updated");
        self.refresh_enforcement();
    }

    /// Persist, re-arm the tick, re-derive enforcement and publish.
    fn after_timer_change(&mut self, events: Vec<Event>) {
        self.persist_timer();
        let now = self.now();
        if self.phase.state().is_running {
            self.alarms
                .arm(Alarm::PhaseTick, self.config.timing.tick_interval_ms, now);
        } else {
            self.alarms.cancel(Alarm::PhaseTick);
        }
        self.refresh_enforcement();
        self.publish(events);
        self.publish_badge();
    }

    fn persist_timer(&mut self) {
        let attempts = self.attempts();
        if let Err(e) = persist::save_timer(self.store.as_mut(), self.phase.state(), attempts) {
            tracing::error!(error = %e, "failed to persist timer state");
        }
    }

    // ── Blocklist ────────────────────────────────────────────────────

    /// Add a site. Returns `false` if it was already listed.
    ///
    /// # Errors
    /// Returns a validation error when the input has no usable host.
    pub fn add_site(&mut self, input: &str) -> Result<bool> {
        let pattern = sanitize_pattern(input)
            .and_then(|s| SitePattern::parse(&s))
            .ok_or_else(|| ValidationError::InvalidPattern(input.to_string()))?;
        let added = self.blocklist.insert(pattern);
        if added {
            self.persist_blocklist()?;
            self.refresh_enforcement();
        }
        Ok(added)
    }

    /// Remove a site by its listed form. Returns `false` if it was not listed.
    ///
    /// # Errors
    /// Returns an error when the updated list cannot be persisted.
    pub fn remove_site(&mut self, entry: &str) -> Result<bool> {
        let removed = self.blocklist.remove(entry);
        if removed {
            self.persist_blocklist()?;
            self.refresh_enforcement();
        }
        Ok(removed)
    }

    fn persist_blocklist(&mut self) -> Result<()> {
        let attempts = self.attempts();
        persist::save_blocklist(self.store.as_mut(), &self.blocklist, attempts)?;
        Ok(())
    }

    fn reload_blocklist(&mut self) {
        self.blocklist = persist::load_blocklist(self.store.as_ref(), self.attempts());
        tracing::debug!(sites = self.blocklist.len(), "blocklist reloaded");
        self.refresh_enforcement();
    }

    /// React to writes made to the store by someone else.
    pub fn on_storage_changed(&mut self, changed: &[&str]) {
        if self.lifecycle != Lifecycle::Ready {
            return;
        }
        let attempts = self.attempts();
        let mut dirty = false;
        for key in changed {
            match *key {
                keys::BLOCKED_SITES => {
                    self.blocklist = persist::load_blocklist(self.store.as_ref(), attempts);
                    dirty = true;
                }
                keys::BLOCKING_MODE => {
                    let mode = persist::load_blocking_mode(self.store.as_ref(), attempts);
                    self.phase.set_blocking_mode(mode);
                    dirty = true;
                }
                keys::OVERRIDE_TIME => {
                    let minutes = persist::load_override_minutes(self.store.as_ref(), attempts);
                    self.phase.set_override_minutes(minutes);
                }
                _ => {}
            }
        }
        if dirty {
            self.refresh_enforcement();
        }
    }

    // ── Override ─────────────────────────────────────────────────────

    /// Grant temporary access for the domain of `original_url`, or of the
    /// blocked page shown in `tab`. Returns the seconds granted, or the
    /// seconds left on an override that is already running.
    ///
    /// # Errors
    /// Returns a validation error when no usable http(s) URL is available.
    pub fn grant_override(&mut self, tab: Option<TabId>, original_url: Option<&str>) -> Result<u64> {
        let url = match original_url {
            Some(url) => url.to_string(),
            None => self.blocked_url_in(tab).ok_or_else(|| ValidationError::InvalidValue {
                field: "originalUrl".into(),
                message: "missing and not recoverable from the tab".into(),
            })?,
        };
        let url = validate_redirect_url(&url)?;

        let now = self.now();
        if self.overrides.is_expired(now) {
            self.end_override(ExpiryReason::Elapsed);
        }
        let duration_ms = self.phase.settings().override_duration_ms();
        match self.overrides.grant(url.as_str(), duration_ms, tab, now)? {
            GrantOutcome::AlreadyActive {
                domain,
                remaining_secs,
            } => {
                tracing::info!(domain = %domain, remaining_secs, "override already active");
                Ok(remaining_secs)
            }
            GrantOutcome::Granted(state) => {
                tracing::info!(
                    domain = %state.domain,
                    duration_ms,
                    tab = ?state.tab_id,
                    grant = %state.grant_id,
                    "override granted"
                );
                self.persist_override();
                self.alarms.arm(
                    Alarm::OverrideCheck,
                    self.config.timing.override_check_interval_ms,
                    now,
                );
                self.refresh_enforcement();
                if let Some(tab) = state.tab_id {
                    self.injection.schedule(tab, &state.domain, now);
                    self.run_injections(now);
                }
                self.publish(vec![Event::OverrideStarted {
                    domain: state.domain.clone(),
                    duration_secs: duration_ms / 1000,
                    at: chrono::Utc::now(),
                }]);
                Ok(duration_ms / 1000)
            }
        }
    }

    /// Revoke the current override. Returns whether one existed.
    pub fn clear_override(&mut self) -> bool {
        let existed = self.overrides.state().is_some();
        self.end_override(ExpiryReason::Revoked);
        existed
    }

    fn blocked_url_in(&self, tab: Option<TabId>) -> Option<String> {
        let info = self.tabs.get(tab?).ok()?;
        BlockedPageParams::from_url(&info.url)?.url
    }

    fn persist_override(&mut self) {
        let attempts = self.attempts();
        if let Err(e) = persist::save_override(self.store.as_mut(), self.overrides.state(), attempts)
        {
            tracing::error!(error = %e, "failed to persist override");
        }
    }

    /// Restart recovery: keep a live override whose tab still exists.
    fn recover_override(&mut self, now: u64) {
        let attempts = self.attempts();
        let Some(state) = persist::load_override(self.store.as_mut(), attempts) else {
            return;
        };
        let tab_gone = state.tab_id.is_some_and(|tab| !self.tabs.exists(tab));
        let live = state.is_live(now);
        self.overrides.restore(Some(state));
        if !live {
            tracing::info!("persisted override has expired");
            self.end_override(ExpiryReason::Stale);
        } else if tab_gone {
            tracing::info!("override tab no longer exists");
            self.end_override(ExpiryReason::TabClosed);
        } else {
            tracing::info!(
                remaining_secs = self.overrides.remaining_secs(now),
                "override restored"
            );
            self.alarms.arm(
                Alarm::OverrideCheck,
                self.config.timing.override_check_interval_ms,
                now,
            );
        }
    }

    /// Clear the override and everything hanging off it. Idempotent and
    /// tolerant of missing tabs.
    fn end_override(&mut self, reason: ExpiryReason) {
        self.alarms.cancel(Alarm::OverrideCheck);
        let Some(state) = self.overrides.take() else {
            return;
        };
        if let Some(tab) = state.tab_id {
            self.injection.cancel_tab(tab);
        }
        self.persist_override();
        self.refresh_enforcement();
        tracing::info!(domain = %state.domain, reason = reason.as_str(), "override ended");

        self.return_tabs_to_block(&state);
        self.publish(vec![Event::OverrideEnded {
            domain: state.domain,
            reason,
            at: chrono::Utc::now(),
        }]);
    }

    /// Send every tab still on the override domain back to the blocked page
    /// when that domain is now blocked. The override tab also gets its
    /// countdown stopped.
    fn return_tabs_to_block(&mut self, state: &OverrideState) {
        let covered: Vec<TabInfo> = self
            .tabs
            .list()
            .into_iter()
            .filter(|info| state.covers(&info.url))
            .collect();
        if covered.is_empty() {
            return;
        }

        let now = self.now();
        let redirects: Vec<(TabId, String)> = {
            let inputs = inputs!(self, now);
            covered
                .iter()
                .filter(|info| self.engine.should_block(&info.url, &inputs))
                .map(|info| (info.id, self.engine.redirect_for(&info.url, &inputs)))
                .collect()
        };

        if let Some(tab) = state.tab_id.filter(|tab| covered.iter().any(|i| i.id == *tab)) {
            if let Err(e) = self.tabs.send_countdown(tab, CountdownCommand::Stop) {
                tracing::debug!(tab, error = %e, "could not stop countdown");
            }
        }
        for (tab, redirect) in redirects {
            if let Err(e) = self.tabs.navigate(tab, &redirect) {
                tracing::warn!(tab, error = %e, "could not return tab to blocked page");
            }
        }
    }

    fn override_tab(&self, requested: Option<TabId>) -> Option<TabId> {
        requested.or_else(|| self.overrides.state().and_then(|s| s.tab_id))
    }

    fn widget_tick(&mut self, tab: Option<TabId>, display_secs: u64) {
        let now = self.now();
        match self.overrides.sync(display_secs, now) {
            SyncVerdict::Expired => self.end_override(ExpiryReason::Elapsed),
            SyncVerdict::Correct { remaining_secs } => {
                tracing::debug!(display_secs, remaining_secs, "correcting countdown drift");
                self.send_to_widget(tab, CountdownCommand::Sync {
                    time_remaining: remaining_secs,
                });
            }
            SyncVerdict::InSync { .. } => {}
            SyncVerdict::NoOverride => self.send_to_widget(tab, CountdownCommand::Stop),
        }
    }

    fn widget_sync(&mut self, tab: Option<TabId>, display_secs: u64) -> u64 {
        let now = self.now();
        match self.overrides.sync(display_secs, now) {
            SyncVerdict::Expired => {
                self.end_override(ExpiryReason::Elapsed);
                0
            }
            SyncVerdict::InSync { remaining_secs } | SyncVerdict::Correct { remaining_secs } => {
                remaining_secs
            }
            SyncVerdict::NoOverride => {
                self.send_to_widget(tab, CountdownCommand::Stop);
                0
            }
        }
    }

    fn widget_expired(&mut self, tab: Option<TabId>) {
        let now = self.now();
        if self.overrides.is_active(now) {
            // The widget ran fast; the record decides.
            let remaining = self.overrides.remaining_secs(now);
            self.send_to_widget(tab, CountdownCommand::Sync {
                time_remaining: remaining,
            });
        } else {
            self.end_override(ExpiryReason::Elapsed);
        }
    }

    fn send_to_widget(&mut self, tab: Option<TabId>, command: CountdownCommand) {
        let Some(tab) = self.override_tab(tab) else {
            return;
        };
        if let Err(e) = self.tabs.send_countdown(tab, command) {
            tracing::debug!(tab, error = %e, "countdown message not delivered");
        }
    }

    fn run_injections(&mut self, now: u64) {
        let outcomes = self
            .injection
            .run_due(now, self.tabs.as_mut(), &self.overrides);
        for outcome in outcomes {
            match outcome {
                InjectionOutcome::Delivered { .. } | InjectionOutcome::Abandoned { .. } => {}
                InjectionOutcome::Fallback {
                    domain,
                    remaining_secs,
                    ..
                } => self.publish(vec![Event::CountdownUnavailable {
                    domain,
                    remaining_secs,
                    at: chrono::Utc::now(),
                }]),
            }
        }
    }

    // ── Browser events ───────────────────────────────────────────────

    /// Pre-navigation listener body. Returns the redirect target when the
    /// navigation must not proceed.
    pub fn on_before_request(&mut self, url: &str) -> Option<String> {
        if self.lifecycle != Lifecycle::Ready {
            return None;
        }
        let now = self.now();
        self.engine.on_before_request(url, &inputs!(self, now))
    }

    pub fn on_navigation_completed(&mut self, tab: TabId, url: &str) {
        if self.lifecycle != Lifecycle::Ready {
            return;
        }
        let now = self.now();
        if self.overrides.is_expired(now) {
            self.end_override(ExpiryReason::Elapsed);
        }
        if let Some(state) = self.overrides.state().cloned() {
            if state.tab_id == Some(tab) {
                if state.covers(url) {
                    // The page reloaded or moved within the domain; the widget is gone.
                    self.injection.schedule(tab, &state.domain, now);
                    self.run_injections(now);
                } else {
                    self.end_override(ExpiryReason::NavigatedAway);
                }
            }
        }
        let info = TabInfo {
            id: tab,
            url: url.to_string(),
            loaded: true,
        };
        self.screen(&info, false);
    }

    pub fn on_tab_activated(&mut self, tab: TabId) {
        if self.lifecycle != Lifecycle::Ready {
            return;
        }
        self.verify_enforcement();
        match self.tabs.get(tab) {
            Ok(info) => self.screen(&info, false),
            Err(e) => tracing::debug!(tab, error = %e, "activated tab unavailable"),
        }
    }

    pub fn on_tab_removed(&mut self, tab: TabId) {
        if self.lifecycle != Lifecycle::Ready {
            return;
        }
        self.injection.cancel_tab(tab);
        if self.overrides.state().and_then(|s| s.tab_id) == Some(tab) {
            self.end_override(ExpiryReason::TabClosed);
        }
    }

    pub fn on_focus_changed(&mut self) {
        if self.lifecycle != Lifecycle::Ready {
            return;
        }
        self.verify_enforcement();
    }

    fn screen(&mut self, tab: &TabInfo, force: bool) {
        let now = self.now();
        let redirect = self.engine.screen_tab(tab, &inputs!(self, now), force);
        if let Some(redirect) = redirect {
            tracing::info!(tab = tab.id, url = %tab.url, "sending tab to blocked page");
            if let Err(e) = self.tabs.navigate(tab.id, &redirect) {
                tracing::warn!(tab = tab.id, error = %e, "could not redirect tab");
            }
        }
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// Run every alarm and injection that is due. Returns how many alarms fired.
    pub fn poll(&mut self) -> usize {
        if self.lifecycle != Lifecycle::Ready {
            return 0;
        }
        let now = self.now();
        let fired = self.alarms.take_due(now);
        for firing in &fired {
            // Handling an earlier alarm may have cancelled this one.
            if !self.alarms.is_armed(firing.alarm) {
                continue;
            }
            match firing.alarm {
                Alarm::PhaseTick => self.run_ticks(firing.count),
                Alarm::OverrideCheck => self.check_override(now),
                Alarm::EnforcementWatchdog => self.verify_enforcement(),
            }
        }
        self.run_injections(now);
        fired.len()
    }

    fn run_ticks(&mut self, count: u32) {
        let mut events = Vec::new();
        for _ in 0..count {
            if !self.phase.state().is_running {
                break;
            }
            let transition = self.phase.tick();
            if !transition.is_empty() {
                events.extend(transition);
                if !self.phase.state().is_running {
                    break;
                }
            }
        }
        if events.is_empty() {
            self.persist_timer();
            self.publish_badge();
        } else {
            self.after_timer_change(events);
        }
    }

    fn check_override(&mut self, now: u64) {
        if self.overrides.state().is_none() {
            self.alarms.cancel(Alarm::OverrideCheck);
        } else if !self.overrides.is_active(now) {
            self.end_override(ExpiryReason::Elapsed);
        }
    }

    // ── Enforcement ──────────────────────────────────────────────────

    fn refresh_enforcement(&mut self) {
        let now = self.now();
        let result = self.engine.update_enforcement(&inputs!(self, now));
        if let Err(e) = result {
            tracing::warn!(error = %e, "enforcement hook not installed; screening tabs until the watchdog succeeds");
        }
    }

    fn verify_enforcement(&mut self) {
        let now = self.now();
        match self.engine.verify(&inputs!(self, now)) {
            Ok(true) => tracing::info!("enforcement hook rebuilt"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "enforcement hook rebuild failed"),
        }
    }

    // ── Publishing ───────────────────────────────────────────────────

    fn publish(&mut self, events: Vec<Event>) {
        for event in events {
            tracing::info!(event = ?event, "event");
            self.notifier.notify(&event.notice());
        }
    }

    fn publish_badge(&mut self) {
        let badge = Badge::from_state(self.phase.state());
        if self.last_badge.as_ref() != Some(&badge) {
            self.notifier.set_badge(&badge);
            self.last_badge = Some(badge);
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn attempts(&self) -> u32 {
        self.config.storage.write_attempts
    }
}

impl Drop for FocusService {
    fn drop(&mut self) {
        self.dispose();
    }
}
