//! # Focusgate Core Library
//!
//! This library provides the core logic for focusgate, a focus timer that
//! blocks distracting sites while a session runs. Everything is driven by a
//! single owned [`FocusService`]; the CLI and any browser embedding are thin
//! layers that feed it requests and browser events.
//!
//! ## Architecture
//!
//! - **Phase clock**: A tick-driven focus/break state machine that the
//!   service advances from its own alarm schedule
//! - **Blocking**: Site pattern matching, blocking decisions and an
//!   enforcement strategy chosen from what the platform supports
//! - **Access**: Temporary per-domain overrides with an authoritative expiry
//! - **Storage**: A flat JSON key-value store (SQLite or in-memory) and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`FocusService`]: Owns all state and handles every input
//! - [`Driver`]: Runs the service inside a tokio task
//! - [`StateStore`]: Persistence surface
//! - [`Platform`]: Browser surfaces the service drives

pub mod access;
pub mod alarms;
pub mod blocking;
pub mod clock;
pub mod error;
pub mod events;
pub mod injection;
pub mod matcher;
pub mod message;
pub mod platform;
pub mod runtime;
pub mod service;
pub mod storage;
pub mod timer;

pub use access::{ExpiryReason, OverrideCoordinator, OverrideState};
pub use blocking::{BlockingDecisionEngine, Decision, StrategyKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, EnforcementError, Result, StoreError, TabError, ValidationError,
};
pub use events::{Event, Notice};
pub use matcher::{Blocklist, SitePattern};
pub use message::{Request, Response, StatusSnapshot};
pub use platform::{HeadlessPlatform, Platform, TabId};
pub use runtime::{Driver, DriverHandle};
pub use service::{FocusService, Lifecycle};
pub use storage::{Config, MemoryStore, SqliteStore, StateStore};
pub use timer::{Badge, BlockingMode, Phase, PhaseClock, Settings, SettingsPatch, TimerState};
