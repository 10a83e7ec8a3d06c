//! Periodic alarms owned by the service.
//!
//! Alarms are absolute epoch-ms deadlines with a period. Nothing here
//! sleeps: the driver asks for [`AlarmSchedule::next_due`], waits, then
//! collects what is due with [`AlarmSchedule::take_due`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alarm {
    /// One phase clock second.
    PhaseTick,
    /// Override expiry check.
    OverrideCheck,
    /// Enforcement hook verification.
    EnforcementWatchdog,
}

impl Alarm {
    /// Most missed periods delivered after a stall. Ticks catch up so the
    /// phase clock keeps pace with the wall clock; checks are idempotent
    /// and fire once.
    fn max_catch_up(self) -> u32 {
        match self {
            Alarm::PhaseTick => 3_600,
            Alarm::OverrideCheck | Alarm::EnforcementWatchdog => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    period_ms: u64,
    next_due_ms: u64,
}

/// A firing: the alarm and how many periods elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub alarm: Alarm,
    pub count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct AlarmSchedule {
    entries: BTreeMap<Alarm, Entry>,
}

impl AlarmSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `alarm` to fire every `period_ms`, first at `now_ms + period_ms`.
    /// Already armed with the same period: left as is.
    pub fn arm(&mut self, alarm: Alarm, period_ms: u64, now_ms: u64) {
        let period_ms = period_ms.max(1);
        if self
            .entries
            .get(&alarm)
            .is_some_and(|e| e.period_ms == period_ms)
        {
            return;
        }
        tracing::trace!(?alarm, period_ms, "alarm armed");
        self.entries.insert(
            alarm,
            Entry {
                period_ms,
                next_due_ms: now_ms.saturating_add(period_ms),
            },
        );
    }

    /// Disarm. Returns whether it was armed; safe either way.
    pub fn cancel(&mut self, alarm: Alarm) -> bool {
        let was = self.entries.remove(&alarm).is_some();
        if was {
            tracing::trace!(?alarm, "alarm cancelled");
        }
        was
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_armed(&self, alarm: Alarm) -> bool {
        self.entries.contains_key(&alarm)
    }

    /// Earliest deadline among armed alarms.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.values().map(|e| e.next_due_ms).min()
    }

    /// Collect due alarms and advance their deadlines past `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<Fired> {
        let mut fired = Vec::new();
        for (alarm, entry) in self.entries.iter_mut() {
            if entry.next_due_ms > now_ms {
                continue;
            }
            let periods = (now_ms - entry.next_due_ms) / entry.period_ms + 1;
            entry.next_due_ms += periods * entry.period_ms;
            let count = u32::try_from(periods)
                .unwrap_or(u32::MAX)
                .min(alarm.max_catch_up());
            if u64::from(count) < periods {
                tracing::debug!(alarm = ?alarm, periods, count, "alarm catch-up capped");
            }
            fired.push(Fired {
                alarm: *alarm,
                count,
            });
        }
        fired
    }
}
