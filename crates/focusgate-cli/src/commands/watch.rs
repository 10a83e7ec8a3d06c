use std::time::Duration;

use focusgate_core::{Driver, HeadlessPlatform};

use super::build_service;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the driver for `seconds`, echoing notifications, then print the
/// final status.
pub fn run(seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    let platform = HeadlessPlatform::echoing();
    let service = build_service(&platform)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let (handle, task) = Driver::spawn(service, REPLY_TIMEOUT);
        tracing::info!(seconds, "watching");
        tokio::time::sleep(Duration::from_secs(seconds)).await;

        let status = handle.status().await?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        handle.shutdown().await?;
        task.await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
