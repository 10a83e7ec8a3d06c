use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::ExpiryReason;
use crate::timer::Phase;

/// Every user-visible state change produces an Event.
/// The service turns them into notices and log lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        session: u32,
        total_sessions: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        time_left: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    FocusCompleted {
        session: u32,
        at: DateTime<Utc>,
    },
    BreakFinished {
        phase: Phase,
        at: DateTime<Utc>,
    },
    AllSessionsCompleted {
        total_sessions: u32,
        at: DateTime<Utc>,
    },
    /// A phase ended and the next one waits for a manual start.
    ReadyForNext {
        phase: Phase,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        at: DateTime<Utc>,
    },
    OverrideStarted {
        domain: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    OverrideEnded {
        domain: String,
        reason: ExpiryReason,
        at: DateTime<Utc>,
    },
    /// The on-page countdown could not be shown; the notice carries the time instead.
    CountdownUnavailable {
        domain: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
}

/// A title/message pair for the notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

fn minutes_label(secs: u64) -> String {
    let minutes = secs.div_ceil(60).max(1);
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

impl Event {
    pub fn notice(&self) -> Notice {
        match self {
            Event::PhaseStarted {
                phase,
                session,
                total_sessions,
                ..
            } => {
                let title = if phase.is_break() {
                    "Break time started!"
                } else {
                    "Focus session started!"
                };
                Notice::new(title, format!("Session {session} of {total_sessions}"))
            }
            Event::TimerPaused { .. } => Notice::new("Timer paused", "Click to resume when ready"),
            Event::TimerReset { .. } => Notice::new("Timer reset", "Ready for a new session"),
            Event::FocusCompleted { session, .. } => Notice::new(
                "🎉 Focus session completed!",
                format!("Great job! Session {session} done."),
            ),
            Event::BreakFinished { phase, .. } => {
                let title = if *phase == Phase::LongBreak {
                    "Long break finished!"
                } else {
                    "Short break finished!"
                };
                Notice::new(title, "Ready for the next session?")
            }
            Event::AllSessionsCompleted { total_sessions, .. } => Notice::new(
                "🏆 All sessions completed!",
                format!("Congratulations! You completed {total_sessions} focus sessions."),
            ),
            Event::ReadyForNext { phase, .. } => {
                let next = if phase.is_break() {
                    "break"
                } else {
                    "next focus session"
                };
                Notice::new(format!("Time for your {next}!"), "Click start when ready")
            }
            Event::SettingsUpdated { .. } => Notice::new(
                "Settings updated!",
                "Timer has been updated with new settings",
            ),
            Event::OverrideStarted {
                domain,
                duration_secs,
                ..
            } => Notice::new(
                "Temporary access granted",
                format!("You have {} on {domain}", minutes_label(*duration_secs)),
            ),
            Event::OverrideEnded { domain, .. } => {
                Notice::new("Temporary access ended", format!("{domain} is blocked again"))
            }
            Event::CountdownUnavailable {
                domain,
                remaining_secs,
                ..
            } => Notice::new(
                "Temporary access active",
                format!(
                    "{}:{:02} left on {domain}",
                    remaining_secs / 60,
                    remaining_secs % 60
                ),
            ),
        }
    }
}
