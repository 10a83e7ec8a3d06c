//! In-process browser model.
//!
//! Keeps tabs, listeners and everything the core sent to them in memory.
//! The CLI runs the service on it, and the test suites use it to play the
//! part of the browser. Clones share the same state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    CountdownCommand, ListenerId, NavigationInterceptor, NotificationSink, Platform, TabController,
    TabId, TabInfo,
};
use crate::error::{EnforcementError, TabError};
use crate::events::Notice;
use crate::matcher::is_web_url;
use crate::timer::Badge;

/// Everything the core asked the platform to do, in order.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub notices: Vec<Notice>,
    pub badges: Vec<Badge>,
    pub navigations: Vec<(TabId, String)>,
    pub countdown: Vec<(TabId, CountdownCommand)>,
}

#[derive(Debug, Default)]
struct Inner {
    tabs: BTreeMap<TabId, TabInfo>,
    next_tab: TabId,
    listeners: BTreeSet<ListenerId>,
    next_listener: u64,
    /// Listener ids the platform accepts but immediately forgets.
    drop_new_listeners: bool,
    /// Countdown deliveries that fail transiently before one succeeds.
    countdown_failures: u32,
    recorded: Recorded,
    echo: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessPlatform {
    inner: Arc<Mutex<Inner>>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print notices to stdout as they arrive.
    pub fn echoing() -> Self {
        let platform = Self::default();
        platform.lock().echo = true;
        platform
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bundle clones of this model as the service's collaborators.
    pub fn platform(&self, interception: bool) -> Platform {
        Platform {
            tabs: Box::new(self.clone()),
            notifier: Box::new(self.clone()),
            interceptor: if interception {
                Some(Box::new(self.clone()))
            } else {
                None
            },
        }
    }

    // ── Browser side ─────────────────────────────────────────────────

    pub fn open_tab(&self, url: &str) -> TabId {
        let mut inner = self.lock();
        inner.next_tab += 1;
        let id = inner.next_tab;
        inner.tabs.insert(
            id,
            TabInfo {
                id,
                url: url.to_string(),
                loaded: true,
            },
        );
        id
    }

    pub fn close_tab(&self, tab: TabId) {
        self.lock().tabs.remove(&tab);
    }

    /// Move a tab to `url` as the user would; `loaded` is false while the page is still loading.
    pub fn set_tab_url(&self, tab: TabId, url: &str, loaded: bool) {
        if let Some(info) = self.lock().tabs.get_mut(&tab) {
            info.url = url.to_string();
            info.loaded = loaded;
        }
    }

    pub fn tab_url(&self, tab: TabId) -> Option<String> {
        self.lock().tabs.get(&tab).map(|t| t.url.clone())
    }

    /// Forget every registered listener, as a platform occasionally does.
    pub fn drop_listeners(&self) {
        self.lock().listeners.clear();
    }

    pub fn drop_new_listeners(&self, drop: bool) {
        self.lock().drop_new_listeners = drop;
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn fail_countdown(&self, times: u32) {
        self.lock().countdown_failures = times;
    }

    pub fn recorded(&self) -> Recorded {
        self.lock().recorded.clone()
    }

    pub fn clear_recorded(&self) {
        self.lock().recorded = Recorded::default();
    }
}

impl TabController for HeadlessPlatform {
    fn get(&self, tab: TabId) -> Result<TabInfo, TabError> {
        self.lock().tabs.get(&tab).cloned().ok_or(TabError::Closed(tab))
    }

    fn navigate(&mut self, tab: TabId, url: &str) -> Result<(), TabError> {
        let mut inner = self.lock();
        let info = inner.tabs.get_mut(&tab).ok_or(TabError::Closed(tab))?;
        info.url = url.to_string();
        info.loaded = true;
        inner.recorded.navigations.push((tab, url.to_string()));
        Ok(())
    }

    fn list(&self) -> Vec<TabInfo> {
        self.lock().tabs.values().cloned().collect()
    }

    fn send_countdown(&mut self, tab: TabId, command: CountdownCommand) -> Result<(), TabError> {
        let mut inner = self.lock();
        let url = inner
            .tabs
            .get(&tab)
            .map(|t| t.url.clone())
            .ok_or(TabError::Closed(tab))?;
        if !is_web_url(&url) {
            return Err(TabError::Restricted {
                tab,
                reason: format!("cannot script {url}"),
            });
        }
        if inner.countdown_failures > 0 {
            inner.countdown_failures -= 1;
            return Err(TabError::Transient {
                tab,
                reason: "content script not ready".into(),
            });
        }
        inner.recorded.countdown.push((tab, command));
        Ok(())
    }
}

impl NotificationSink for HeadlessPlatform {
    fn notify(&mut self, notice: &Notice) {
        let mut inner = self.lock();
        if inner.echo {
            println!("[{}] {}", notice.title, notice.message);
        }
        inner.recorded.notices.push(notice.clone());
    }

    fn set_badge(&mut self, badge: &Badge) {
        self.lock().recorded.badges.push(badge.clone());
    }
}

impl NavigationInterceptor for HeadlessPlatform {
    fn add_listener(&mut self) -> Result<ListenerId, EnforcementError> {
        let mut inner = self.lock();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        if !inner.drop_new_listeners {
            inner.listeners.insert(id);
        }
        Ok(id)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.lock().listeners.remove(&id);
    }

    fn has_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.contains(&id)
    }
}
