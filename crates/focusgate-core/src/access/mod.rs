//! Temporary access ("override") windows.

mod coordinator;
mod state;

pub use coordinator::{GrantOutcome, OverrideCoordinator, SyncVerdict};
pub use state::{ExpiryReason, OverrideState};
