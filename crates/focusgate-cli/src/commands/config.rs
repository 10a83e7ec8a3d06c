use clap::Subcommand;
use focusgate_core::Config;
use serde_json::Value;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dotted key (e.g. "timing.drift_tolerance_secs")
    Get { key: String },
    /// Change one value and write the file
    Set { key: String, value: String },
    /// Print every key as `key = value`
    List {
        /// Print the whole document as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            let before = config.get(&key).unwrap_or_default();
            config.set(&key, &value)?;
            config.save()?;
            let after = config.get(&key).unwrap_or_default();
            println!("{key}: {before} -> {after}");
        }
        ConfigAction::List { json } => {
            let tree = serde_json::to_value(Config::load()?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                let mut lines = Vec::new();
                flatten("", &tree, &mut lines);
                for line in lines {
                    println!("{line}");
                }
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

fn flatten(prefix: &str, node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Object(table) => {
            for (name, child) in table {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                flatten(&key, child, out);
            }
        }
        Value::String(text) => out.push(format!("{prefix} = {text}")),
        other => out.push(format!("{prefix} = {other}")),
    }
}
