pub mod blocklist;
pub mod check;
pub mod config;
pub mod mode;
pub mod override_cmd;
pub mod timer;
pub mod watch;

use focusgate_core::{Config, FocusService, HeadlessPlatform, SqliteStore, SystemClock};

/// Service over the on-disk store, not yet initialized.
pub fn build_service(platform: &HeadlessPlatform) -> Result<FocusService, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = SqliteStore::open()?;
    Ok(FocusService::new(
        config,
        platform.platform(true),
        Box::new(store),
        Box::new(SystemClock),
    ))
}

/// Service over the on-disk store, loaded and ready for one command.
pub fn open_service() -> Result<FocusService, Box<dyn std::error::Error>> {
    let mut service = build_service(&HeadlessPlatform::new())?;
    service.initialize()?;
    Ok(service)
}
