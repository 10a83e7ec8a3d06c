//! Browser-facing surfaces the core drives but does not own.
//!
//! Every call here is fire-and-forget from the core's point of view: a
//! failure is logged and, where it matters, retried or answered with the
//! blocking side of the decision.

mod headless;

pub use headless::{HeadlessPlatform, Recorded};

use serde::{Deserialize, Serialize};

use crate::error::{EnforcementError, TabError};
use crate::events::Notice;
use crate::timer::Badge;

pub type TabId = i64;

/// Identifier of an installed pre-navigation listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    /// The page finished loading.
    pub loaded: bool,
}

/// Commands understood by the on-page countdown widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CountdownCommand {
    #[serde(rename = "startTimer", rename_all = "camelCase")]
    Start { initial_time: u64 },
    #[serde(rename = "syncTimer", rename_all = "camelCase")]
    Sync { time_remaining: u64 },
    #[serde(rename = "stopTimer")]
    Stop,
}

pub trait TabController: Send {
    fn get(&self, tab: TabId) -> Result<TabInfo, TabError>;

    fn navigate(&mut self, tab: TabId, url: &str) -> Result<(), TabError>;

    /// Every open tab.
    fn list(&self) -> Vec<TabInfo>;

    /// Deliver a command to the countdown widget, injecting it if needed.
    fn send_countdown(&mut self, tab: TabId, command: CountdownCommand) -> Result<(), TabError>;

    fn exists(&self, tab: TabId) -> bool {
        self.get(tab).is_ok()
    }
}

pub trait NotificationSink: Send {
    fn notify(&mut self, notice: &Notice);

    fn set_badge(&mut self, badge: &Badge);
}

/// Pre-navigation request interception, where the platform offers it.
pub trait NavigationInterceptor: Send {
    fn add_listener(&mut self) -> Result<ListenerId, EnforcementError>;

    /// Safe to call for unknown ids.
    fn remove_listener(&mut self, id: ListenerId);

    fn has_listener(&self, id: ListenerId) -> bool;
}

/// The collaborators handed to the service at construction.
///
/// `interceptor` doubles as the capability probe: platforms without
/// request interception pass `None` and get the reactive strategy.
pub struct Platform {
    pub tabs: Box<dyn TabController>,
    pub notifier: Box<dyn NotificationSink>,
    pub interceptor: Option<Box<dyn NavigationInterceptor>>,
}
