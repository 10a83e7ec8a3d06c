//! Flat key names shared with the settings panel and blocked page.

pub const FOCUS_TIME: &str = "focusTime";
pub const BREAK_TIME: &str = "breakTime";
pub const LONG_BREAK_TIME: &str = "longBreakTime";
pub const SESSIONS_COUNT: &str = "sessionsCount";
pub const AUTO_START: &str = "autoStart";
pub const BLOCKING_MODE: &str = "blockingMode";
pub const OVERRIDE_TIME: &str = "overrideTime";

pub const CURRENT_PHASE: &str = "currentPhase";
pub const CURRENT_SESSION: &str = "currentSession";
pub const TOTAL_SESSIONS: &str = "totalSessions";
pub const TIME_LEFT: &str = "timeLeft";
pub const IS_RUNNING: &str = "isRunning";
pub const IS_PAUSED: &str = "isPaused";

pub const BLOCKED_SITES: &str = "blockedSites";

pub const OVERRIDE_UNTIL: &str = "overrideUntil";
pub const OVERRIDE_DOMAIN: &str = "overrideDomain";
pub const OVERRIDE_START_TIME: &str = "overrideStartTime";
pub const OVERRIDE_DURATION: &str = "overrideDuration";
pub const OVERRIDE_TAB_ID: &str = "overrideTabId";
pub const OVERRIDE_GRANT_ID: &str = "overrideGrantId";

pub const OVERRIDE_KEYS: [&str; 6] = [
    OVERRIDE_UNTIL,
    OVERRIDE_DOMAIN,
    OVERRIDE_START_TIME,
    OVERRIDE_DURATION,
    OVERRIDE_TAB_ID,
    OVERRIDE_GRANT_ID,
];
