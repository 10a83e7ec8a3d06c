use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusgate-cli", version, about = "focusgate CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Blocked site management
    Blocklist {
        #[command(subcommand)]
        action: commands::blocklist::BlocklistAction,
    },
    /// Blocking mode
    Mode {
        #[command(subcommand)]
        action: commands::mode::ModeAction,
    },
    /// Show whether a URL would be blocked right now
    Check {
        /// URL to check
        url: String,
    },
    /// Temporary access override
    Override {
        #[command(subcommand)]
        action: commands::override_cmd::OverrideAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the service in the foreground, printing notifications
    Watch {
        /// Stop after this many seconds
        #[arg(long, default_value = "60")]
        seconds: u64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FOCUSGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Blocklist { action } => commands::blocklist::run(action),
        Commands::Mode { action } => commands::mode::run(action),
        Commands::Check { url } => commands::check::run(&url),
        Commands::Override { action } => commands::override_cmd::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Watch { seconds } => commands::watch::run(seconds),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
