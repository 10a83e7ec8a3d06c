use clap::Subcommand;

use super::open_service;

#[derive(Subcommand)]
pub enum OverrideAction {
    /// Print the active override as JSON, or "none"
    Status,
    /// End the active override now
    Clear,
}

pub fn run(action: OverrideAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = open_service()?;

    match action {
        OverrideAction::Status => match service.status().override_status {
            Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
            None => println!("none"),
        },
        OverrideAction::Clear => {
            if service.clear_override() {
                println!("cleared");
            } else {
                println!("none");
            }
        }
    }
    Ok(())
}
