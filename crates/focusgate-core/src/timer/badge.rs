use serde::{Deserialize, Serialize};

use super::phase::{Phase, TimerState};

const FOCUS_COLOR: &str = "#e74c3c";
const BREAK_COLOR: &str = "#27ae60";
const PAUSED_COLOR: &str = "#f39c12";
const IDLE_COLOR: &str = "#3498db";

/// Toolbar badge: at most two characters and a background color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub color: String,
}

impl Badge {
    pub fn from_state(state: &TimerState) -> Self {
        if state.is_running {
            let minutes = state.time_left / 60;
            let text = if minutes > 9 {
                minutes.to_string()
            } else if minutes > 0 {
                format!("{minutes}m")
            } else {
                (state.time_left % 60).to_string()
            };
            let color = if state.current_phase == Phase::Focus {
                FOCUS_COLOR
            } else {
                BREAK_COLOR
            };
            Self {
                text: text.chars().take(2).collect(),
                color: color.into(),
            }
        } else if state.is_paused {
            Self {
                text: "❚❚".into(),
                color: PAUSED_COLOR.into(),
            }
        } else {
            Self {
                text: "▶".into(),
                color: IDLE_COLOR.into(),
            }
        }
    }
}
