//! Boundary between the monitor and whatever notifies the user

use crate::analysis::AlertEvent;

/// Receives alerts as they are raised.
///
/// Implementations must return promptly and must swallow their own failures:
/// the tick that raised the alert never waits on playback and never sees an
/// error from it.
pub trait AlertDispatcher: Send {
    fn dispatch(&self, event: &AlertEvent);
}

/// Drops every alert
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl AlertDispatcher for NullDispatcher {
    fn dispatch(&self, _event: &AlertEvent) {}
}
