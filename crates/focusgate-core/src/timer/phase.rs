use serde::{Deserialize, Serialize};

use super::settings::Settings;

/// Completed focus sessions between long breaks.
pub const LONG_BREAK_EVERY: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Focus)
    }

    /// Wire name, as stored and as passed to the blocked page.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::ShortBreak => "shortBreak",
            Phase::LongBreak => "longBreak",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "focus" => Some(Phase::Focus),
            "shortBreak" => Some(Phase::ShortBreak),
            "longBreak" => Some(Phase::LongBreak),
            _ => None,
        }
    }

    /// Phase length in seconds under the given settings.
    pub fn duration_secs(self, settings: &Settings) -> u64 {
        let minutes = match self {
            Phase::Focus => settings.focus_time,
            Phase::ShortBreak => settings.break_time,
            Phase::LongBreak => settings.long_break_time,
        };
        u64::from(minutes).saturating_mul(60)
    }
}

/// Persisted progress through the session cycle.
///
/// `is_running` and `is_paused` are never both true; both false means idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub current_phase: Phase,
    pub current_session: u32,
    pub total_sessions: u32,
    /// Seconds left in the current phase.
    pub time_left: u64,
    pub is_running: bool,
    pub is_paused: bool,
}

impl TimerState {
    /// Idle at session 1 with a full focus phase.
    pub fn fresh(settings: &Settings) -> Self {
        Self {
            current_phase: Phase::Focus,
            current_session: 1,
            total_sessions: settings.sessions_count,
            time_left: Phase::Focus.duration_secs(settings),
            is_running: false,
            is_paused: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.is_running && !self.is_paused
    }

    /// Running and in a focus phase.
    pub fn is_focusing(&self) -> bool {
        self.is_running && self.current_phase == Phase::Focus
    }

    /// Repair values that would break the cycle arithmetic.
    pub(crate) fn sanitize(&mut self, settings: &Settings) {
        if self.total_sessions == 0 {
            self.total_sessions = settings.sessions_count;
        }
        self.current_session = self.current_session.clamp(1, self.total_sessions.max(1));
        if self.is_running && self.is_paused {
            // Prefer the state that keeps blocking in force.
            self.is_paused = false;
        }
        if self.time_left == 0 {
            self.time_left = self.current_phase.duration_secs(settings);
        }
    }
}
