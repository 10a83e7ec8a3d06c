//! The pure block/allow decision.

use serde::{Deserialize, Serialize};

use crate::access::OverrideCoordinator;
use crate::matcher::Blocklist;
use crate::timer::{BlockingMode, TimerState};

/// Everything a decision reads. Built fresh for each question.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub timer: &'a TimerState,
    pub mode: BlockingMode,
    pub blocklist: &'a Blocklist,
    pub overrides: &'a OverrideCoordinator,
    pub now_ms: u64,
}

impl<'a> DecisionInputs<'a> {
    pub fn new(
        timer: &'a TimerState,
        mode: BlockingMode,
        blocklist: &'a Blocklist,
        overrides: &'a OverrideCoordinator,
        now_ms: u64,
    ) -> Self {
        Self {
            timer,
            mode,
            blocklist,
            overrides,
            now_ms,
        }
    }
}

/// Outcome of [`decide`], with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    AllowedOverride,
    AllowedEmptyBlocklist,
    AllowedNoMatch,
    /// Matched, but the mode does not block right now.
    AllowedByMode,
    Blocked { pattern: String },
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Blocked { .. })
    }
}

/// Whether the mode and timer call for blocking at all.
pub fn mode_blocks(timer: &TimerState, mode: BlockingMode) -> bool {
    match mode {
        BlockingMode::Always => true,
        BlockingMode::FocusOnly => timer.is_focusing(),
    }
}

/// Rules in order: active override for the host, empty blocklist, no
/// matching pattern, then the mode.
pub fn decide(url: &str, inputs: &DecisionInputs<'_>) -> Decision {
    if inputs.overrides.is_active_for(url, inputs.now_ms) {
        return Decision::AllowedOverride;
    }
    if inputs.blocklist.is_empty() {
        return Decision::AllowedEmptyBlocklist;
    }
    let Some(pattern) = inputs.blocklist.matching(url) else {
        return Decision::AllowedNoMatch;
    };
    if mode_blocks(inputs.timer, inputs.mode) {
        Decision::Blocked {
            pattern: pattern.to_string(),
        }
    } else {
        Decision::AllowedByMode
    }
}

pub fn should_block(url: &str, inputs: &DecisionInputs<'_>) -> bool {
    decide(url, inputs).is_blocked()
}

/// Whether the enforcement hook must be in place.
///
/// An active override does not lift enforcement: the override domain is
/// exempted per decision and every other site stays blocked.
pub fn enforcement_required(inputs: &DecisionInputs<'_>) -> bool {
    !inputs.blocklist.is_empty() && mode_blocks(inputs.timer, inputs.mode)
}
