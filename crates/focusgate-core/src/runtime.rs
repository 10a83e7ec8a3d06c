//! Async driver.
//!
//! The [`Driver`] owns the [`FocusService`] inside a single tokio task.
//! Inputs arrive on an mpsc channel and alarms are served by sleeping until
//! [`FocusService::next_wakeup_ms`], so the service is never shared and
//! needs no locks. Callers talk to it through a cloneable [`DriverHandle`].

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{CoreError, Result};
use crate::message::{Request, Response, StatusSnapshot};
use crate::platform::TabId;
use crate::service::FocusService;

const CHANNEL_CAPACITY: usize = 64;
/// Upper bound on a single idle wait, so a clock jump is noticed.
const MAX_IDLE: Duration = Duration::from_secs(60);

/// Everything the service can be asked or told.
#[derive(Debug)]
pub enum Input {
    Request(Request, oneshot::Sender<Response>),
    BeforeRequest {
        url: String,
        reply: oneshot::Sender<Option<String>>,
    },
    NavigationCompleted {
        tab: TabId,
        url: String,
    },
    TabActivated(TabId),
    TabRemoved(TabId),
    FocusChanged,
    StorageChanged(Vec<String>),
    Status(oneshot::Sender<StatusSnapshot>),
    Shutdown,
}

pub struct Driver {
    service: FocusService,
    inputs: mpsc::Receiver<Input>,
}

impl Driver {
    /// Start the driver task. The service is initialized inside the task
    /// before the first input is read, so early inputs simply wait.
    pub fn spawn(service: FocusService, reply_timeout: Duration) -> (DriverHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let driver = Self {
            service,
            inputs: rx,
        };
        let task = tokio::spawn(driver.run());
        (
            DriverHandle {
                tx,
                timeout: reply_timeout,
            },
            task,
        )
    }

    async fn run(mut self) {
        match self.service.initialize() {
            Ok(replayed) if !replayed.is_empty() => {
                tracing::debug!(count = replayed.len(), "replayed deferred requests");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "service failed to initialize"),
        }

        loop {
            let wait = self.until_next_wakeup();
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(Input::Shutdown) | None => break,
                    Some(input) => self.dispatch(input),
                },
                _ = tokio::time::sleep(wait) => {
                    self.service.poll();
                }
            }
        }

        self.service.dispose();
        tracing::debug!("driver stopped");
    }

    fn until_next_wakeup(&self) -> Duration {
        match self.service.next_wakeup_ms() {
            Some(due) => Duration::from_millis(due.saturating_sub(self.service.now_ms())).min(MAX_IDLE),
            None => MAX_IDLE,
        }
    }

    fn dispatch(&mut self, input: Input) {
        // Catch up on anything that fell due while waiting for this input.
        self.service.poll();
        match input {
            Input::Request(request, reply) => {
                reply_to(reply, self.service.handle(request));
            }
            Input::BeforeRequest { url, reply } => {
                reply_to(reply, self.service.on_before_request(&url));
            }
            Input::NavigationCompleted { tab, url } => {
                self.service.on_navigation_completed(tab, &url);
            }
            Input::TabActivated(tab) => self.service.on_tab_activated(tab),
            Input::TabRemoved(tab) => self.service.on_tab_removed(tab),
            Input::FocusChanged => self.service.on_focus_changed(),
            Input::StorageChanged(keys) => {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                self.service.on_storage_changed(&keys);
            }
            Input::Status(reply) => reply_to(reply, self.service.status()),
            Input::Shutdown => {}
        }
    }
}

fn reply_to<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        tracing::debug!("requester went away before the reply");
    }
}

/// Cloneable sender side of a running [`Driver`].
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Input>,
    timeout: Duration,
}

impl DriverHandle {
    async fn send(&self, input: Input) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| CoreError::Driver("driver has stopped".into()))
    }

    async fn ask<T>(&self, input: Input, rx: oneshot::Receiver<T>) -> Result<T> {
        self.send(input).await?;
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(CoreError::Driver("driver dropped the reply".into())),
            Err(_) => Err(CoreError::Driver(format!(
                "no reply within {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    pub async fn request(&self, request: Request) -> Result<Response> {
        let (tx, rx) = oneshot::channel();
        self.ask(Input::Request(request, tx), rx).await
    }

    /// Redirect target for a navigation, if it must be blocked.
    pub async fn before_request(&self, url: impl Into<String>) -> Result<Option<String>> {
        let (tx, rx) = oneshot::channel();
        let input = Input::BeforeRequest {
            url: url.into(),
            reply: tx,
        };
        self.ask(input, rx).await
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.ask(Input::Status(tx), rx).await
    }

    pub async fn navigation_completed(&self, tab: TabId, url: impl Into<String>) -> Result<()> {
        self.send(Input::NavigationCompleted {
            tab,
            url: url.into(),
        })
        .await
    }

    pub async fn tab_activated(&self, tab: TabId) -> Result<()> {
        self.send(Input::TabActivated(tab)).await
    }

    pub async fn tab_removed(&self, tab: TabId) -> Result<()> {
        self.send(Input::TabRemoved(tab)).await
    }

    pub async fn focus_changed(&self) -> Result<()> {
        self.send(Input::FocusChanged).await
    }

    pub async fn storage_changed(&self, keys: Vec<String>) -> Result<()> {
        self.send(Input::StorageChanged(keys)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Input::Shutdown).await
    }
}
