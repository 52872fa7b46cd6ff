// User-facing notifications raised at the storefront boundary

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

// Failure classes every service error maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    // Missing or malformed input
    Validation,
    // The room is taken for the requested dates, or the email is in use
    Conflict,
    // The record is no longer in a status that allows the operation
    State,
    // Storage or hashing failed
    Internal,
}

// Implemented by every service error so the storefront can report it uniformly
pub trait Classify {
    fn kind(&self) -> FailureKind;
}

impl Classify for crate::store::StoreError {
    fn kind(&self) -> FailureKind {
        FailureKind::Internal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.variant == Variant::Destructive
    }
}

#[derive(Debug, Default)]
pub struct Notifier {
    pending: Mutex<Vec<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        match notification.variant {
            Variant::Default => info!(title = %notification.title, "{}", notification.description),
            Variant::Destructive => {
                warn!(title = %notification.title, "{}", notification.description)
            }
        }
        self.pending.lock().push(notification);
    }

    pub fn latest(&self) -> Option<Notification> {
        self.pending.lock().last().cloned()
    }

    // Takes everything raised since the last drain, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_in_order_and_empties() {
        let notifier = Notifier::new();
        notifier.push(Notification::success("Booked", "Room reserved"));
        notifier.push(Notification::failure("Booking Failed", "Room unavailable"));

        assert!(notifier.latest().unwrap().is_failure());

        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].title, "Booked");
        assert_eq!(drained[1].variant, Variant::Destructive);
        assert!(notifier.drain().is_empty());
        assert!(notifier.latest().is_none());
    }
}
