use clap::Subcommand;
use focusgate_core::BlockingMode;

use super::open_service;

#[derive(Subcommand)]
pub enum ModeAction {
    /// Print the blocking mode
    Get,
    /// Set the blocking mode
    Set {
        /// "focus-only" or "always"
        mode: String,
    },
}

pub fn run(action: ModeAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = open_service()?;

    match action {
        ModeAction::Get => println!("{}", service.settings().blocking_mode),
        ModeAction::Set { mode } => {
            let mode = BlockingMode::parse(&mode)
                .ok_or_else(|| format!("unknown mode '{mode}' (expected focus-only or always)"))?;
            service.set_blocking_mode(mode);
            println!("{mode}");
        }
    }
    Ok(())
}
