//! Typed reads and writes over the flat key namespace.
//!
//! Loads never fail: missing, zero or mistyped values fall back to their
//! defaults. Writes are retried up to `attempts` times and the last error
//! is returned for the caller to log.

use serde_json::{json, Value};
use uuid::Uuid;

use super::keys;
use super::StateStore;
use crate::access::OverrideState;
use crate::error::StoreError;
use crate::matcher::Blocklist;
use crate::timer::{clamp_override_minutes, BlockingMode, Phase, Settings, TimerState};

fn read(store: &dyn StateStore, key: &str, attempts: u32) -> Option<Value> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match store.get(key) {
            Ok(value) => return value,
            Err(e) if attempt < attempts => {
                tracing::debug!(key, attempt, error = %e, "store read failed, retrying");
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "store read failed; using default");
            }
        }
    }
    None
}

/// Write one key, retrying transient failures.
pub fn set_with_retry(
    store: &mut dyn StateStore,
    key: &str,
    value: Value,
    attempts: u32,
) -> Result<(), StoreError> {
    let attempts = attempts.max(1);
    let mut last = None;
    for attempt in 1..=attempts {
        match store.set(key, value.clone()) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!(key, attempt, error = %e, "store write failed");
                last = Some(e);
            }
        }
    }
    Err(last.unwrap_or(StoreError::WriteFailed {
        key: key.to_string(),
        message: "no attempt made".into(),
    }))
}

fn remove_with_retry(store: &mut dyn StateStore, key: &str, attempts: u32) -> Result<(), StoreError> {
    let attempts = attempts.max(1);
    let mut last = None;
    for _ in 0..attempts {
        match store.remove(key) {
            Ok(()) => return Ok(()),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or(StoreError::WriteFailed {
        key: key.to_string(),
        message: "no attempt made".into(),
    }))
}

/// Write every pair, continuing past failures. Returns the first error.
fn write_all(
    store: &mut dyn StateStore,
    pairs: Vec<(&str, Value)>,
    attempts: u32,
) -> Result<(), StoreError> {
    let mut first = None;
    for (key, value) in pairs {
        if let Err(e) = set_with_retry(store, key, value, attempts) {
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

fn positive_u32(value: Option<Value>) -> Option<u32> {
    value
        .and_then(|v| v.as_u64())
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

// ── Settings ─────────────────────────────────────────────────────────

pub fn load_settings(store: &dyn StateStore, attempts: u32) -> Settings {
    let defaults = Settings::default();
    let get = |key: &str| read(store, key, attempts);
    Settings {
        focus_time: positive_u32(get(keys::FOCUS_TIME)).unwrap_or(defaults.focus_time),
        break_time: positive_u32(get(keys::BREAK_TIME)).unwrap_or(defaults.break_time),
        long_break_time: positive_u32(get(keys::LONG_BREAK_TIME))
            .unwrap_or(defaults.long_break_time),
        sessions_count: positive_u32(get(keys::SESSIONS_COUNT))
            .unwrap_or(defaults.sessions_count),
        auto_start: get(keys::AUTO_START)
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.auto_start),
        blocking_mode: load_blocking_mode(store, attempts),
        override_time: load_override_minutes(store, attempts),
    }
}

pub fn load_blocking_mode(store: &dyn StateStore, attempts: u32) -> BlockingMode {
    read(store, keys::BLOCKING_MODE, attempts)
        .and_then(|v| v.as_str().and_then(BlockingMode::parse))
        .unwrap_or_default()
}

pub fn load_override_minutes(store: &dyn StateStore, attempts: u32) -> u32 {
    match read(store, keys::OVERRIDE_TIME, attempts).and_then(|v| v.as_u64()) {
        Some(minutes) => clamp_override_minutes(u32::try_from(minutes).unwrap_or(u32::MAX)),
        None => Settings::default().override_time,
    }
}

pub fn save_settings(
    store: &mut dyn StateStore,
    settings: &Settings,
    attempts: u32,
) -> Result<(), StoreError> {
    write_all(
        store,
        vec![
            (keys::FOCUS_TIME, json!(settings.focus_time)),
            (keys::BREAK_TIME, json!(settings.break_time)),
            (keys::LONG_BREAK_TIME, json!(settings.long_break_time)),
            (keys::SESSIONS_COUNT, json!(settings.sessions_count)),
            (keys::AUTO_START, json!(settings.auto_start)),
            (keys::BLOCKING_MODE, json!(settings.blocking_mode.as_str())),
            (keys::OVERRIDE_TIME, json!(settings.override_time)),
        ],
        attempts,
    )
}

// ── Timer ────────────────────────────────────────────────────────────

/// Persisted timer state, or `None` when nothing usable was stored.
pub fn load_timer(store: &dyn StateStore, settings: &Settings, attempts: u32) -> Option<TimerState> {
    let get = |key: &str| read(store, key, attempts);
    let phase = get(keys::CURRENT_PHASE).and_then(|v| v.as_str().and_then(Phase::parse))?;
    let fresh = TimerState::fresh(settings);
    let mut state = TimerState {
        current_phase: phase,
        current_session: positive_u32(get(keys::CURRENT_SESSION)).unwrap_or(1),
        total_sessions: positive_u32(get(keys::TOTAL_SESSIONS)).unwrap_or(fresh.total_sessions),
        time_left: get(keys::TIME_LEFT).and_then(|v| v.as_u64()).unwrap_or(0),
        is_running: get(keys::IS_RUNNING).and_then(|v| v.as_bool()).unwrap_or(false),
        is_paused: get(keys::IS_PAUSED).and_then(|v| v.as_bool()).unwrap_or(false),
    };
    state.sanitize(settings);
    Some(state)
}

pub fn save_timer(
    store: &mut dyn StateStore,
    state: &TimerState,
    attempts: u32,
) -> Result<(), StoreError> {
    write_all(
        store,
        vec![
            (keys::CURRENT_PHASE, json!(state.current_phase.as_str())),
            (keys::CURRENT_SESSION, json!(state.current_session)),
            (keys::TOTAL_SESSIONS, json!(state.total_sessions)),
            (keys::TIME_LEFT, json!(state.time_left)),
            (keys::IS_RUNNING, json!(state.is_running)),
            (keys::IS_PAUSED, json!(state.is_paused)),
        ],
        attempts,
    )
}

// ── Blocklist ────────────────────────────────────────────────────────

pub fn load_blocklist(store: &dyn StateStore, attempts: u32) -> Blocklist {
    Blocklist::from_value(read(store, keys::BLOCKED_SITES, attempts).as_ref())
}

pub fn save_blocklist(
    store: &mut dyn StateStore,
    blocklist: &Blocklist,
    attempts: u32,
) -> Result<(), StoreError> {
    set_with_retry(store, keys::BLOCKED_SITES, json!(blocklist.entries()), attempts)
}

// ── Override ─────────────────────────────────────────────────────────

/// Persisted override, if `overrideUntil` and `overrideDomain` are both present.
///
/// Stray override fields without them are removed.
pub fn load_override(store: &mut dyn StateStore, attempts: u32) -> Option<OverrideState> {
    let get = |store: &dyn StateStore, key: &str| read(store, key, attempts);
    let until = get(store, keys::OVERRIDE_UNTIL).and_then(|v| v.as_u64());
    let domain = get(store, keys::OVERRIDE_DOMAIN)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|d| !d.is_empty());

    let (Some(until_ms), Some(domain)) = (until, domain) else {
        let stray = keys::OVERRIDE_KEYS
            .iter()
            .any(|key| get(store, *key).is_some());
        if stray {
            tracing::info!("discarding incomplete override record");
            if let Err(e) = save_override(store, None, attempts) {
                tracing::warn!(error = %e, "failed to clear incomplete override record");
            }
        }
        return None;
    };

    let start = get(store, keys::OVERRIDE_START_TIME).and_then(|v| v.as_u64());
    let duration = get(store, keys::OVERRIDE_DURATION).and_then(|v| v.as_u64());
    let (start_ms, duration_ms) = match (start, duration) {
        (Some(start), Some(duration)) => (start, duration),
        (Some(start), None) => (start, until_ms.saturating_sub(start)),
        (None, Some(duration)) => (until_ms.saturating_sub(duration), duration),
        (None, None) => (until_ms, 0),
    };
    let tab_id = get(store, keys::OVERRIDE_TAB_ID).and_then(|v| v.as_i64());
    let grant_id = get(store, keys::OVERRIDE_GRANT_ID)
        .and_then(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()))
        .unwrap_or_else(Uuid::new_v4);

    Some(OverrideState {
        until_ms,
        domain,
        start_ms,
        duration_ms,
        tab_id,
        grant_id,
    })
}

/// Write an override record, or remove every override key for `None`.
pub fn save_override(
    store: &mut dyn StateStore,
    state: Option<&OverrideState>,
    attempts: u32,
) -> Result<(), StoreError> {
    let Some(state) = state else {
        let mut first = None;
        for key in keys::OVERRIDE_KEYS {
            if let Err(e) = remove_with_retry(store, key, attempts) {
                first.get_or_insert(e);
            }
        }
        return first.map_or(Ok(()), Err);
    };

    let mut pairs = vec![
        (keys::OVERRIDE_DOMAIN, json!(state.domain)),
        (keys::OVERRIDE_START_TIME, json!(state.start_ms)),
        (keys::OVERRIDE_DURATION, json!(state.duration_ms)),
        (keys::OVERRIDE_GRANT_ID, json!(state.grant_id.to_string())),
    ];
    match state.tab_id {
        Some(tab) => pairs.push((keys::OVERRIDE_TAB_ID, json!(tab))),
        None => remove_with_retry(store, keys::OVERRIDE_TAB_ID, attempts)?,
    }
    // Presence of overrideUntil marks the record valid, so it goes last.
    pairs.push((keys::OVERRIDE_UNTIL, json!(state.until_ms)));
    write_all(store, pairs, attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    /// Fails the first `failures` writes, then delegates.
    struct FlakyStore {
        inner: MemoryStore,
        failures: u32,
    }

    impl StateStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(StoreError::Locked);
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.inner.keys()
        }
    }

    fn sample_override() -> OverrideState {
        OverrideState {
            until_ms: 160_000,
            domain: "example.com".into(),
            start_ms: 100_000,
            duration_ms: 60_000,
            tab_id: Some(7),
            grant_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn settings_fall_back_on_bad_values() {
        let store = MemoryStore::with_values([
            (keys::FOCUS_TIME, json!(0)),
            (keys::BREAK_TIME, json!("ten")),
            (keys::LONG_BREAK_TIME, json!(20)),
            (keys::BLOCKING_MODE, json!("sometimes")),
            (keys::OVERRIDE_TIME, json!(500)),
        ]);
        let settings = load_settings(&store, 1);
        assert_eq!(settings.focus_time, 25);
        assert_eq!(settings.break_time, 5);
        assert_eq!(settings.long_break_time, 20);
        assert_eq!(settings.blocking_mode, BlockingMode::FocusOnly);
        assert_eq!(settings.override_time, 60);
    }

    #[test]
    fn timer_roundtrip_through_flat_keys() {
        let mut store = MemoryStore::new();
        let settings = Settings::default();
        assert!(load_timer(&store, &settings, 1).is_none());

        let state = TimerState {
            current_phase: Phase::ShortBreak,
            current_session: 2,
            total_sessions: 4,
            time_left: 200,
            is_running: false,
            is_paused: true,
        };
        save_timer(&mut store, &state, 1).unwrap();
        assert_eq!(store.get(keys::CURRENT_PHASE).unwrap(), Some(json!("shortBreak")));
        assert_eq!(load_timer(&store, &settings, 1), Some(state));
    }

    #[test]
    fn non_array_blocklist_is_empty() {
        let store = MemoryStore::with_values([(keys::BLOCKED_SITES, json!("example.com"))]);
        assert!(load_blocklist(&store, 1).is_empty());
    }

    #[test]
    fn override_without_until_is_discarded() {
        let mut store = MemoryStore::with_values([
            (keys::OVERRIDE_DOMAIN, json!("example.com")),
            (keys::OVERRIDE_TAB_ID, json!(3)),
        ]);
        assert!(load_override(&mut store, 1).is_none());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn override_roundtrip_and_clear() {
        let mut store = MemoryStore::new();
        let state = sample_override();
        save_override(&mut store, Some(&state), 1).unwrap();
        assert_eq!(load_override(&mut store, 1), Some(state));

        save_override(&mut store, None, 1).unwrap();
        assert!(load_override(&mut store, 1).is_none());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn override_without_tab_drops_previous_tab_id() {
        let mut store = MemoryStore::new();
        save_override(&mut store, Some(&sample_override()), 1).unwrap();
        let untabbed = OverrideState {
            tab_id: None,
            ..sample_override()
        };
        save_override(&mut store, Some(&untabbed), 1).unwrap();
        assert_eq!(store.get(keys::OVERRIDE_TAB_ID).unwrap(), None);
        assert_eq!(load_override(&mut store, 1).unwrap().tab_id, None);
    }

    #[test]
    fn writes_retry_then_report() {
        let mut store = FlakyStore {
            inner: MemoryStore::new(),
            failures: 2,
        };
        set_with_retry(&mut store, keys::FOCUS_TIME, json!(30), 3).unwrap();
        assert_eq!(store.get(keys::FOCUS_TIME).unwrap(), Some(json!(30)));

        store.failures = 5;
        let err = set_with_retry(&mut store, keys::FOCUS_TIME, json!(40), 3).unwrap_err();
        assert!(matches!(err, StoreError::Locked));
        assert_eq!(store.get(keys::FOCUS_TIME).unwrap(), Some(json!(30)));
    }
}
