use clap::Subcommand;
use focusgate_core::{Request, Response, SettingsPatch};

use super::open_service;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current phase
    Start,
    /// Pause the current phase
    Pause,
    /// Reset to session 1, idle
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Update timer settings
    Settings {
        /// Focus length in minutes
        #[arg(long)]
        focus: Option<u32>,
        /// Short break length in minutes
        #[arg(long = "break")]
        short_break: Option<u32>,
        /// Long break length in minutes
        #[arg(long)]
        long_break: Option<u32>,
        /// Focus sessions per cycle
        #[arg(long)]
        sessions: Option<u32>,
        /// Start the next phase automatically
        #[arg(long)]
        auto_start: Option<bool>,
        /// Temporary access length in minutes (1-60)
        #[arg(long)]
        override_minutes: Option<u32>,
    },
}

fn check(response: Response) -> Result<(), Box<dyn std::error::Error>> {
    if response.success {
        Ok(())
    } else {
        Err(response.error.unwrap_or_else(|| "request failed".into()).into())
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = open_service()?;

    let request = match action {
        TimerAction::Start => Request::Start,
        TimerAction::Pause => Request::Pause,
        TimerAction::Reset => Request::Reset,
        TimerAction::Status => Request::GetStatus,
        TimerAction::Settings {
            focus,
            short_break,
            long_break,
            sessions,
            auto_start,
            override_minutes,
        } => Request::UpdateSettings {
            settings: SettingsPatch {
                focus_time: focus,
                break_time: short_break,
                long_break_time: long_break,
                sessions_count: sessions,
                auto_start,
                blocking_mode: None,
                override_time: override_minutes,
            },
        },
    };
    check(service.handle(request))?;

    let status = service.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
