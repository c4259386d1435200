//! Desktop notifications.

use anyhow::Result;
use notify_rust::{Notification, Timeout};
use tracing::debug;

pub const APP_NAME: &str = "Productivity Tracker";

/// Shows short messages to the user. Implementations must not block for long, the tracker calls
/// them from its polling loop.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn notify(&mut self, title: &str, message: &str, timeout_seconds: u32) -> Result<()>;
}

/// Sends notifications through the desktop's notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier {}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {}
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&mut self, title: &str, message: &str, timeout_seconds: u32) -> Result<()> {
        debug!("Showing notification '{title}'");
        Notification::new()
            .summary(title)
            .body(message)
            .appname(APP_NAME)
            .timeout(Timeout::Milliseconds(timeout_seconds.saturating_mul(1000)))
            .show()?;
        Ok(())
    }
}
