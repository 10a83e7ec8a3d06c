mod badge;
mod engine;
mod phase;
mod settings;

pub use badge::Badge;
pub use engine::PhaseClock;
pub use phase::{Phase, TimerState, LONG_BREAK_EVERY};
pub use settings::{
    clamp_override_minutes, BlockingMode, Settings, SettingsPatch, MAX_OVERRIDE_MINUTES,
    MIN_OVERRIDE_MINUTES,
};
