//! Platform-agnostic traits for traffic interception
//!
//! These traits define the interface that traffic-source implementations
//! must follow. Event emission is the only side channel: sources never
//! return events from calls, they push them into the [`EventSink`] the
//! session controller hands to `start`.

use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use vigil_core::event::Event;

/// Destination for events emitted by a traffic source
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

/// A source of DNS/connection events
///
/// Implemented by the native capture adapter and the synthetic generator.
pub trait TrafficSource: Send + Sync {
    /// Begin emitting events into `sink`
    ///
    /// Returns immediately; event production happens on the source's own
    /// execution context. Calling `start` on a running source is an
    /// idempotent success.
    fn start(&self, sink: EventSink) -> Result<()>;

    /// Stop emitting events
    ///
    /// Idempotent; succeeds even when the source is not running. After
    /// `stop` returns, no further events reach the sink.
    fn stop(&self) -> Result<()>;

    /// Whether the source is currently emitting
    fn is_active(&self) -> bool;

    /// Source name for logging/diagnostics
    fn name(&self) -> &'static str;
}

/// The platform packet/DNS interception facility backing native capture
///
/// The real implementation lives outside this repository; this trait pins
/// down the start/stop/status/event contract the adapter relies on. Any
/// call may fail with a platform error (permission revoked, service crash,
/// unsupported OS version).
pub trait CaptureBackend: Send + Sync {
    /// Start interception, pushing events into `sink`
    fn start(&self, sink: EventSink) -> Result<()>;

    /// Stop interception
    fn stop(&self) -> Result<()>;

    /// Whether interception is active
    fn is_active(&self) -> bool;
}

/// Platform permission/consent facility
///
/// `request` is the only operation permitted to open a consent UI on the
/// caller's behalf; `check` never prompts.
pub trait PermissionBroker: Send + Sync {
    /// Whether the interception permission is currently granted
    fn check(&self) -> Result<bool>;

    /// Request the permission, possibly prompting the user
    fn request(&self) -> Result<bool>;
}

/// Fixed-outcome permission broker
///
/// Used by the CLI (local capture needs no consent prompt) and by tests
/// that drive the permission handshake.
pub struct StaticPermissions {
    granted: Mutex<bool>,
}

impl StaticPermissions {
    /// A broker that reports the permission as granted
    pub fn granted() -> Self {
        Self {
            granted: Mutex::new(true),
        }
    }

    /// A broker that reports the permission as denied until `request`
    pub fn denied() -> Self {
        Self {
            granted: Mutex::new(false),
        }
    }

    /// Flip the stored grant state
    pub fn set_granted(&self, granted: bool) {
        *self.granted.lock() = granted;
    }
}

impl PermissionBroker for StaticPermissions {
    fn check(&self) -> Result<bool> {
        Ok(*self.granted.lock())
    }

    fn request(&self) -> Result<bool> {
        // Requesting grants the permission; a denied broker models a user
        // accepting the consent prompt.
        let mut granted = self.granted.lock();
        *granted = true;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_permissions_granted() {
        let broker = StaticPermissions::granted();
        assert!(broker.check().unwrap());
    }

    #[test]
    fn test_static_permissions_request_grants() {
        let broker = StaticPermissions::denied();
        assert!(!broker.check().unwrap());
        assert!(broker.request().unwrap());
        assert!(broker.check().unwrap());
    }

    #[test]
    fn test_set_granted() {
        let broker = StaticPermissions::granted();
        broker.set_granted(false);
        assert!(!broker.check().unwrap());
    }
}
