//! Session controller
//!
//! `MonitorService` is the single owner of the capture session: all state
//! transitions, counter updates and event forwarding run through it. The
//! state machine is
//! `Disconnected -> Connecting -> Connected -> Disconnected` (stop) or
//! `-> Error` (failure), and `Error` recovers through a later start.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

use vigil_core::config::Config;
use vigil_core::dispatcher::{EventDispatcher, SubscriptionHandle};
use vigil_core::event::{Event, EventKind, StateChangeEvent, VpnState};
use vigil_core::session::{Session, VpnStatus};
use vigil_platform::{
    CapabilitySelector, EventSink, PermissionBroker, Result as PlatformResult, StaticPermissions,
};

/// Result of a start request
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    /// Whether the session is (now) running
    pub success: bool,
    /// The interception permission must be granted before starting
    pub requires_permission: bool,
    /// Failure cause, when `success` is false for another reason
    pub error_message: Option<String>,
}

impl StartOutcome {
    fn started() -> Self {
        Self {
            success: true,
            requires_permission: false,
            error_message: None,
        }
    }

    fn needs_permission() -> Self {
        Self {
            success: false,
            requires_permission: true,
            error_message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            requires_permission: false,
            error_message: Some(message.into()),
        }
    }
}

/// Result of a stop request
#[derive(Debug, Clone, Serialize)]
pub struct StopOutcome {
    /// Whether the session is (now) stopped
    pub success: bool,
    /// Failure cause, when `success` is false
    pub error_message: Option<String>,
}

impl StopOutcome {
    fn stopped() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// The session controller
///
/// Exactly one session exists per service instance; start/stop are
/// idempotent and status reads are consistent snapshots.
pub struct MonitorService {
    session: Arc<RwLock<Session>>,
    dispatcher: Arc<EventDispatcher>,
    selector: CapabilitySelector,
    permissions: Arc<dyn PermissionBroker>,
}

impl MonitorService {
    /// Build a service over an explicit source selector and permission broker
    pub fn new(selector: CapabilitySelector, permissions: Arc<dyn PermissionBroker>) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            dispatcher: Arc::new(EventDispatcher::new()),
            selector,
            permissions,
        }
    }

    /// Build a service from configuration
    ///
    /// Uses platform capability detection for the traffic source and a
    /// granted permission broker, which fits local single-user capture; a
    /// platform integration substitutes its own broker via [`Self::new`].
    pub fn from_config(config: &Config) -> Self {
        let selector =
            CapabilitySelector::detect(config.general.capture, config.generator.clone());
        Self::new(selector, Arc::new(StaticPermissions::granted()))
    }

    /// Start the capture session
    ///
    /// Idempotent: starting a connected session succeeds without resetting
    /// counters or the start time. When the permission is missing the
    /// session stays untouched and the caller is told to request consent.
    pub fn start_vpn(&self) -> StartOutcome {
        if self.session.read().is_connected() {
            return StartOutcome::started();
        }

        match self.permissions.check() {
            Ok(true) => {}
            Ok(false) => {
                info!("Start refused: interception permission not granted");
                return StartOutcome::needs_permission();
            }
            Err(e) => {
                warn!(error = %e, "Permission check failed");
                return StartOutcome::failed(e.to_string());
            }
        }

        {
            let mut session = self.session.write();
            session.state = VpnState::Connecting;
            session.reset_for_start(SystemTime::now());
        }

        self.session.write().state = VpnState::Connected;
        self.dispatcher
            .publish(&Event::StateChange(StateChangeEvent::new(
                VpnState::Connected,
            )));

        if let Err(e) = self.selector.start(self.event_sink()) {
            let message = e.to_string();
            warn!(error = %message, "Traffic source failed to start");
            self.session.write().state = VpnState::Error;
            self.dispatcher
                .publish(&Event::StateChange(StateChangeEvent::error(message.as_str())));
            return StartOutcome::failed(message);
        }

        info!(
            native = self.selector.is_native_backed(),
            "Capture session connected"
        );
        StartOutcome::started()
    }

    /// Stop the capture session
    ///
    /// Idempotent: stopping a session that is not connected succeeds
    /// immediately. After this returns, no further events reach
    /// subscribers.
    pub fn stop_vpn(&self) -> StopOutcome {
        if !self.session.read().is_connected() {
            return StopOutcome::stopped();
        }

        if let Err(e) = self.selector.stop() {
            let message = e.to_string();
            warn!(error = %message, "Traffic source failed to stop");
            self.session.write().state = VpnState::Error;
            self.dispatcher
                .publish(&Event::StateChange(StateChangeEvent::error(message.as_str())));
            return StopOutcome::failed(message);
        }

        self.session.write().clear_on_stop();
        self.dispatcher
            .publish(&Event::StateChange(StateChangeEvent::new(
                VpnState::Disconnected,
            )));

        info!("Capture session disconnected");
        StopOutcome::stopped()
    }

    /// Consistent snapshot of the session status
    pub fn vpn_status(&self) -> VpnStatus {
        self.session.read().status()
    }

    /// Whether the interception permission is currently granted
    pub fn check_permission(&self) -> PlatformResult<bool> {
        self.permissions.check()
    }

    /// Request the interception permission, possibly prompting the user
    ///
    /// The only operation permitted to open a consent UI on the caller's
    /// behalf.
    pub fn request_permission(&self) -> PlatformResult<bool> {
        self.permissions.request()
    }

    /// Register a handler for an event kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(kind, handler)
    }

    /// Remove a single subscription
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.dispatcher.unsubscribe(handle)
    }

    /// Remove every subscription
    pub fn unsubscribe_all(&self) {
        self.dispatcher.unsubscribe_all();
    }

    /// Whether the session prefers native capture (diagnostic)
    pub fn is_native_backed(&self) -> bool {
        self.selector.is_native_backed()
    }

    /// The sink handed to traffic sources: counts, then forwards
    fn event_sink(&self) -> EventSink {
        let session = Arc::clone(&self.session);
        let dispatcher = Arc::clone(&self.dispatcher);

        Arc::new(move |event: Event| {
            {
                let mut session = session.write();
                // Events are only attributable to a connected session.
                if !session.is_connected() {
                    return;
                }
                session.record_event(event.kind());
            }
            dispatcher.publish(&event);
        })
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        let _ = self.selector.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::config::GeneratorConfig;

    fn fast_selector() -> CapabilitySelector {
        CapabilitySelector::with_sources(
            None,
            GeneratorConfig {
                min_delay_ms: 5,
                max_delay_ms: 15,
                ..GeneratorConfig::default()
            },
        )
    }

    #[test]
    fn test_initial_status_disconnected() {
        let service = MonitorService::new(fast_selector(), Arc::new(StaticPermissions::granted()));
        let status = service.vpn_status();
        assert!(!status.connected);
        assert!(status.start_time.is_none());
        assert_eq!(status.packets_processed, 0);
    }

    #[test]
    fn test_start_requires_permission() {
        let service = MonitorService::new(fast_selector(), Arc::new(StaticPermissions::denied()));
        let outcome = service.start_vpn();
        assert!(!outcome.success);
        assert!(outcome.requires_permission);
        assert!(!service.vpn_status().connected);
    }

    #[test]
    fn test_request_permission_then_start() {
        let service = MonitorService::new(fast_selector(), Arc::new(StaticPermissions::denied()));
        assert!(!service.check_permission().unwrap());
        assert!(service.request_permission().unwrap());

        let outcome = service.start_vpn();
        assert!(outcome.success);
        service.stop_vpn();
    }

    #[test]
    fn test_stop_when_disconnected_is_noop_success() {
        let service = MonitorService::new(fast_selector(), Arc::new(StaticPermissions::granted()));
        let outcome = service.stop_vpn();
        assert!(outcome.success);
        assert!(outcome.error_message.is_none());
    }
}
