//! How a "block" decision is made to stick.
//!
//! Two strategies, picked once at startup by [`probe`]:
//!
//! - **Interception**: one pre-navigation listener, installed while
//!   enforcement is required and removed otherwise. The listener id is held
//!   in an [`EnforcementHandle`]; installs are checked against the platform
//!   and a listener the platform lost is rebuilt by [`EnforcementStrategy::verify`].
//! - **Reactive**: no hook at all. Completed navigations and tab
//!   activations are screened after the fact and the tab is sent to the
//!   blocked page.

use serde::{Deserialize, Serialize};

use crate::error::EnforcementError;
use crate::platform::{ListenerId, NavigationInterceptor, Platform};

/// Installs per listener before giving up on verification.
const INSTALL_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Interception,
    Reactive,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Interception => "interception",
            StrategyKind::Reactive => "reactive",
        }
    }
}

pub trait EnforcementStrategy: Send {
    fn kind(&self) -> StrategyKind;

    /// Bring the hook in line with `required`. Calling it again with the
    /// same value changes nothing.
    fn apply(&mut self, required: bool) -> Result<(), EnforcementError>;

    /// Watchdog pass. Returns `true` when a lost hook had to be rebuilt.
    fn verify(&mut self, required: bool) -> Result<bool, EnforcementError>;

    /// Whether the hook is installed and known to the platform.
    fn is_engaged(&self) -> bool;

    /// Whether completed navigations must be screened after the fact.
    fn screens_after_navigation(&self) -> bool {
        !self.is_engaged()
    }
}

/// Pick the strategy the platform can support. Takes the interceptor out
/// of `platform` when there is one.
pub fn probe(platform: &mut Platform) -> Box<dyn EnforcementStrategy> {
    match platform.interceptor.take() {
        Some(interceptor) => {
            tracing::info!("request interception available");
            Box::new(InterceptionStrategy::new(interceptor))
        }
        None => {
            tracing::info!("no request interception; screening tabs after navigation");
            Box::new(ReactiveStrategy::default())
        }
    }
}

/// An installed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcementHandle {
    id: ListenerId,
}

impl EnforcementHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

pub struct InterceptionStrategy {
    interceptor: Box<dyn NavigationInterceptor>,
    handle: Option<EnforcementHandle>,
}

impl InterceptionStrategy {
    pub fn new(interceptor: Box<dyn NavigationInterceptor>) -> Self {
        Self {
            interceptor,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<EnforcementHandle> {
        self.handle
    }

    fn install(&mut self) -> Result<EnforcementHandle, EnforcementError> {
        let mut last = 0;
        for attempt in 1..=INSTALL_ATTEMPTS {
            let id = self.interceptor.add_listener()?;
            if self.interceptor.has_listener(id) {
                tracing::debug!(listener = id.0, attempt, "navigation listener installed");
                return Ok(EnforcementHandle { id });
            }
            tracing::warn!(listener = id.0, attempt, "navigation listener missing after install");
            self.interceptor.remove_listener(id);
            last = id.0;
        }
        Err(EnforcementError::VerificationFailed(last))
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.interceptor.remove_listener(handle.id);
            tracing::debug!(listener = handle.id.0, "navigation listener removed");
        }
    }
}

impl EnforcementStrategy for InterceptionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Interception
    }

    fn apply(&mut self, required: bool) -> Result<(), EnforcementError> {
        if !required {
            self.teardown();
            return Ok(());
        }
        if self.is_engaged() {
            return Ok(());
        }
        // A stale handle whose listener the platform dropped.
        self.teardown();
        self.handle = Some(self.install()?);
        Ok(())
    }

    fn verify(&mut self, required: bool) -> Result<bool, EnforcementError> {
        if required && !self.is_engaged() {
            tracing::warn!("navigation listener lost; rebuilding");
            self.apply(true)?;
            return Ok(true);
        }
        if !required && self.handle.is_some() {
            self.teardown();
        }
        Ok(false)
    }

    fn is_engaged(&self) -> bool {
        self.handle
            .is_some_and(|handle| self.interceptor.has_listener(handle.id))
    }
}

/// Screens tabs after navigation; there is no hook to manage.
#[derive(Debug, Default)]
pub struct ReactiveStrategy {
    armed: bool,
}

impl EnforcementStrategy for ReactiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Reactive
    }

    fn apply(&mut self, required: bool) -> Result<(), EnforcementError> {
        self.armed = required;
        Ok(())
    }

    fn verify(&mut self, required: bool) -> Result<bool, EnforcementError> {
        self.armed = required;
        Ok(false)
    }

    fn is_engaged(&self) -> bool {
        self.armed
    }

    fn screens_after_navigation(&self) -> bool {
        true
    }
}
