//! Phase clock implementation.
//!
//! The phase clock is a tick-driven state machine. It does not own a
//! thread or a timer: the caller invokes `tick()` once per second while
//! the clock is running, and arms/cancels that tick based on
//! `state().is_running` after every command.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Focus -> (ShortBreak | LongBreak) -> Focus -> ... -> Completed (reset to Idle)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut clock = PhaseClock::new(Settings::default());
//! clock.start();
//! // once per second:
//! let events = clock.tick();
//! ```

use chrono::Utc;

use super::phase::{Phase, TimerState, LONG_BREAK_EVERY};
use super::settings::{BlockingMode, Settings, SettingsPatch};
use crate::events::Event;

#[derive(Debug, Clone)]
pub struct PhaseClock {
    settings: Settings,
    state: TimerState,
}

impl PhaseClock {
    /// Idle clock at session 1 with a full focus phase.
    pub fn new(settings: Settings) -> Self {
        let state = TimerState::fresh(&settings);
        Self { settings, state }
    }

    /// Resume from persisted state, repairing inconsistent values.
    pub fn restore(settings: Settings, mut state: TimerState) -> Self {
        state.sanitize(&settings);
        Self { settings, state }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn blocking_mode(&self) -> BlockingMode {
        self.settings.blocking_mode
    }

    pub fn phase_total_secs(&self) -> u64 {
        self.state.current_phase.duration_secs(&self.settings)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin or resume ticking. No-op when already running.
    pub fn start(&mut self) -> Option<Event> {
        if self.state.is_running {
            return None;
        }
        self.state.is_running = true;
        self.state.is_paused = false;
        Some(self.started_event())
    }

    /// Stop ticking and keep `time_left`. No-op when not running.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.is_running = false;
        self.state.is_paused = true;
        Some(Event::TimerPaused {
            time_left: self.state.time_left,
            at: Utc::now(),
        })
    }

    /// Back to session 1, idle, with a full focus phase.
    pub fn reset(&mut self) -> Event {
        self.state = TimerState::fresh(&self.settings);
        Event::TimerReset { at: Utc::now() }
    }

    /// Advance one second. Returns the events of a phase transition, if any.
    pub fn tick(&mut self) -> Vec<Event> {
        if !self.state.is_running {
            return Vec::new();
        }
        self.state.time_left = self.state.time_left.saturating_sub(1);
        if self.state.time_left == 0 {
            return self.complete_phase();
        }
        Vec::new()
    }

    /// Merge new settings. While not running, the current phase is resized
    /// to the new duration.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Event {
        self.settings.merge(patch);
        self.state.total_sessions = self.settings.sessions_count;
        if !self.state.is_running {
            self.state.time_left = self.phase_total_secs();
        }
        if self.state.current_session > self.settings.sessions_count {
            self.state.current_session = self.settings.sessions_count;
        }
        Event::SettingsUpdated { at: Utc::now() }
    }

    pub fn set_blocking_mode(&mut self, mode: BlockingMode) {
        self.settings.blocking_mode = mode;
    }

    pub fn set_override_minutes(&mut self, minutes: u32) {
        self.settings.override_time = super::settings::clamp_override_minutes(minutes);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn started_event(&self) -> Event {
        Event::PhaseStarted {
            phase: self.state.current_phase,
            session: self.state.current_session,
            total_sessions: self.state.total_sessions,
            at: Utc::now(),
        }
    }

    fn complete_phase(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        match self.state.current_phase {
            Phase::Focus => {
                events.push(Event::FocusCompleted {
                    session: self.state.current_session,
                    at: Utc::now(),
                });
                let next = if self.state.current_session % LONG_BREAK_EVERY == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                };
                self.state.current_phase = next;
                self.state.time_left = next.duration_secs(&self.settings);
            }
            finished @ (Phase::ShortBreak | Phase::LongBreak) => {
                events.push(Event::BreakFinished {
                    phase: finished,
                    at: Utc::now(),
                });
                self.state.current_session += 1;
                if self.state.current_session > self.state.total_sessions {
                    events.push(Event::AllSessionsCompleted {
                        total_sessions: self.state.total_sessions,
                        at: Utc::now(),
                    });
                    events.push(self.reset());
                    return events;
                }
                self.state.current_phase = Phase::Focus;
                self.state.time_left = Phase::Focus.duration_secs(&self.settings);
            }
        }

        self.state.is_paused = false;
        if self.settings.auto_start {
            self.state.is_running = true;
            events.push(self.started_event());
        } else {
            self.state.is_running = false;
            events.push(Event::ReadyForNext {
                phase: self.state.current_phase,
                at: Utc::now(),
            });
        }
        events
    }
}
