//! User-facing alerts.
//!
//! Notifications are fire-and-forget: a notifier never fails the
//! operation that raised it.

use std::cell::RefCell;
use std::rc::Rc;

/// A single alert shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Alert channel
pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

/// Emits notifications as log events
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notification: Notification) {
        match notification.description {
            Some(description) => tracing::info!("{}: {}", notification.title, description),
            None => tracing::info!("{}", notification.title),
        }
    }
}

/// Prints notifications to stdout
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notification: Notification) {
        println!("\n✓ {}", notification.title);
        if let Some(description) = notification.description {
            println!("  {}", description);
        }
    }
}

/// Keeps every notification for later inspection
///
/// Clones share the same buffer, so a test can hand one clone to the
/// state machine and read from the other.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.borrow().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|n| n.title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notification: Notification) {
        self.sent.borrow_mut().push(notification);
    }
}
