use clap::Subcommand;

use super::open_service;

#[derive(Subcommand)]
pub enum BlocklistAction {
    /// Add a site (domain or URL)
    Add {
        /// Site to block, e.g. "example.com"
        site: String,
    },
    /// Remove a site
    Remove {
        /// Site as listed
        site: String,
    },
    /// List blocked sites
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: BlocklistAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = open_service()?;

    match action {
        BlocklistAction::Add { site } => {
            if service.add_site(&site)? {
                println!("added");
            } else {
                println!("already listed");
            }
        }
        BlocklistAction::Remove { site } => {
            if !service.remove_site(&site)? {
                return Err(format!("not listed: {site}").into());
            }
            println!("removed");
        }
        BlocklistAction::List { json } => {
            let entries = service.blocklist().entries();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!("{entry}");
                }
            }
        }
    }
    Ok(())
}
