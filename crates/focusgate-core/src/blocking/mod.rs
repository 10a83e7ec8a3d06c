//! Blocking decisions and their enforcement.

mod blocked_page;
mod decision;
mod engine;
mod enforcement;

pub use blocked_page::{blocked_page_url, is_blocked_page, validate_redirect_url, BlockedPageParams};
pub use decision::{
    decide, enforcement_required, mode_blocks, should_block, Decision, DecisionInputs,
};
pub use engine::BlockingDecisionEngine;
pub use enforcement::{
    probe, EnforcementHandle, EnforcementStrategy, InterceptionStrategy, ReactiveStrategy,
    StrategyKind,
};
