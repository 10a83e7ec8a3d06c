//! User settings read by the phase clock and the blocking engine.
//!
//! Stored under flat camelCase keys in the state store. Values that are
//! missing, zero or of the wrong type fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_OVERRIDE_MINUTES: u32 = 1;
pub const MAX_OVERRIDE_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BlockingMode {
    /// Block only while a focus phase is running.
    #[default]
    #[serde(rename = "focus-only")]
    FocusOnly,
    /// Block regardless of the timer.
    #[serde(rename = "always")]
    Always,
}

impl BlockingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockingMode::FocusOnly => "focus-only",
            BlockingMode::Always => "always",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "focus-only" => Some(BlockingMode::FocusOnly),
            "always" => Some(BlockingMode::Always),
            _ => None,
        }
    }
}

impl fmt::Display for BlockingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Focus phase length in minutes.
    pub focus_time: u32,
    /// Short break length in minutes.
    pub break_time: u32,
    /// Long break length in minutes.
    pub long_break_time: u32,
    pub sessions_count: u32,
    pub auto_start: bool,
    pub blocking_mode: BlockingMode,
    /// Temporary access length in minutes, within [1, 60].
    pub override_time: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_time: 25,
            break_time: 5,
            long_break_time: 15,
            sessions_count: 4,
            auto_start: false,
            blocking_mode: BlockingMode::FocusOnly,
            override_time: 1,
        }
    }
}

impl Settings {
    pub fn override_duration_ms(&self) -> u64 {
        u64::from(clamp_override_minutes(self.override_time)) * 60 * 1000
    }

    /// Apply a partial update. Non-positive durations are ignored.
    pub fn merge(&mut self, patch: &SettingsPatch) {
        fn positive(target: &mut u32, value: Option<u32>) {
            if let Some(v) = value.filter(|v| *v > 0) {
                *target = v;
            }
        }
        positive(&mut self.focus_time, patch.focus_time);
        positive(&mut self.break_time, patch.break_time);
        positive(&mut self.long_break_time, patch.long_break_time);
        positive(&mut self.sessions_count, patch.sessions_count);
        if let Some(auto_start) = patch.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(mode) = patch.blocking_mode {
            self.blocking_mode = mode;
        }
        if let Some(minutes) = patch.override_time {
            self.override_time = clamp_override_minutes(minutes);
        }
    }
}

pub fn clamp_override_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_OVERRIDE_MINUTES, MAX_OVERRIDE_MINUTES)
}

/// Partial settings update as sent by the settings panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub focus_time: Option<u32>,
    pub break_time: Option<u32>,
    pub long_break_time: Option<u32>,
    pub sessions_count: Option<u32>,
    pub auto_start: Option<bool>,
    pub blocking_mode: Option<BlockingMode>,
    pub override_time: Option<u32>,
}
