//! Requests from the settings panel, blocked page and countdown widget,
//! and the responses sent back.
//!
//! Wire format is JSON with an `action` tag:
//!
//! ```json
//! {"action": "overrideBlock", "tabId": 12, "originalUrl": "https://example.com/"}
//! ```

use serde::{Deserialize, Serialize};

use crate::access::OverrideState;
use crate::blocking::StrategyKind;
use crate::platform::TabId;
use crate::service::Lifecycle;
use crate::timer::{Badge, BlockingMode, Settings, SettingsPatch, TimerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename = "startTimer", alias = "start")]
    Start,
    #[serde(rename = "pauseTimer", alias = "pause")]
    Pause,
    #[serde(rename = "resetTimer", alias = "reset")]
    Reset,
    UpdateSettings {
        #[serde(default)]
        settings: SettingsPatch,
    },
    /// Reload `blockedSites` from the store.
    UpdateBlocklist,
    #[serde(rename_all = "camelCase")]
    UpdateBlockingMode { blocking_mode: BlockingMode },
    #[serde(rename_all = "camelCase")]
    OverrideBlock {
        #[serde(default)]
        tab_id: Option<TabId>,
        /// Falls back to the `url` parameter of the tab's blocked page.
        #[serde(default)]
        original_url: Option<String>,
    },
    /// Countdown widget heartbeat.
    #[serde(rename_all = "camelCase")]
    TimerTick {
        #[serde(default)]
        tab_id: Option<TabId>,
        time_remaining: u64,
    },
    #[serde(rename_all = "camelCase")]
    RequestTimerSync {
        #[serde(default)]
        tab_id: Option<TabId>,
        current_time: u64,
    },
    /// The widget's own countdown reached zero.
    #[serde(rename_all = "camelCase")]
    TimerExpired {
        #[serde(default)]
        tab_id: Option<TabId>,
    },
    GetStatus,
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::Start => "startTimer",
            Request::Pause => "pauseTimer",
            Request::Reset => "resetTimer",
            Request::UpdateSettings { .. } => "updateSettings",
            Request::UpdateBlocklist => "updateBlocklist",
            Request::UpdateBlockingMode { .. } => "updateBlockingMode",
            Request::OverrideBlock { .. } => "overrideBlock",
            Request::TimerTick { .. } => "timerTick",
            Request::RequestTimerSync { .. } => "requestTimerSync",
            Request::TimerExpired { .. } => "timerExpired",
            Request::GetStatus => "getStatus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideStatus {
    pub domain: String,
    pub remaining_secs: u64,
    pub tab_id: Option<TabId>,
    pub until_ms: u64,
}

impl OverrideStatus {
    pub fn new(state: &OverrideState, remaining_secs: u64) -> Self {
        Self {
            domain: state.domain.clone(),
            remaining_secs,
            tab_id: state.tab_id,
            until_ms: state.until_ms,
        }
    }
}

/// Everything the popup shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub lifecycle: Lifecycle,
    #[serde(flatten)]
    pub timer: TimerState,
    pub settings: Settings,
    pub blocked_sites: Vec<String>,
    pub enforcement: StrategyKind,
    /// The enforcement hook is in place right now.
    pub enforcing: bool,
    #[serde(rename = "override")]
    pub override_status: Option<OverrideStatus>,
    pub badge: Badge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Box<StatusSnapshot>>,
    /// Accepted before the service was ready; applied once it is.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn deferred() -> Self {
        Self {
            success: true,
            deferred: true,
            ..Self::default()
        }
    }

    pub fn with_override_seconds(mut self, secs: u64) -> Self {
        self.override_seconds = Some(secs);
        self
    }

    pub fn with_time_remaining(mut self, secs: u64) -> Self {
        self.time_remaining = Some(secs);
        self
    }

    pub fn with_status(mut self, status: StatusSnapshot) -> Self {
        self.status = Some(Box::new(status));
        self
    }
}
