//! Capture session state and counters
//!
//! Exactly one [`Session`] exists per running process. It is created by the
//! session controller on the first start, mutated only by the controller,
//! and reset (not destroyed) on stop.

use crate::event::{EventKind, VpnState};
use serde::Serialize;
use std::time::SystemTime;

/// The single logical capture session
///
/// Counters never decrease while the session is connected; both reset to
/// zero only at a fresh start transition. Every DNS event also counts as a
/// packet, so `packets_processed >= dns_queries_intercepted` holds at all
/// times.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Current state machine position
    pub state: VpnState,
    /// When the current session was started
    pub start_time: Option<SystemTime>,
    /// Total events processed since the last start
    pub packets_processed: u64,
    /// DNS queries intercepted since the last start
    pub dns_queries_intercepted: u64,
}

impl Session {
    /// Create a fresh disconnected session
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one intercepted event
    ///
    /// This is the only place counters are mutated. DNS events bump both
    /// counters, which keeps `packets_processed >= dns_queries_intercepted`
    /// structurally true.
    pub fn record_event(&mut self, kind: EventKind) {
        self.packets_processed = self.packets_processed.saturating_add(1);
        if kind == EventKind::DnsRequest {
            self.dns_queries_intercepted = self.dns_queries_intercepted.saturating_add(1);
        }
    }

    /// Reset for a fresh start transition
    ///
    /// Zeroes both counters and stamps the start time. Not called on the
    /// idempotent start-while-connected path.
    pub fn reset_for_start(&mut self, now: SystemTime) {
        self.packets_processed = 0;
        self.dns_queries_intercepted = 0;
        self.start_time = Some(now);
    }

    /// Return to disconnected on stop
    ///
    /// Clears the start time but leaves the final counter values readable
    /// until the next start.
    pub fn clear_on_stop(&mut self) {
        self.state = VpnState::Disconnected;
        self.start_time = None;
    }

    /// Whether the session is currently connected
    pub fn is_connected(&self) -> bool {
        self.state == VpnState::Connected
    }

    /// Take a consistent status snapshot
    pub fn status(&self) -> VpnStatus {
        VpnStatus {
            connected: self.is_connected(),
            start_time: self.start_time,
            packets_processed: self.packets_processed,
            dns_queries_intercepted: self.dns_queries_intercepted,
        }
    }
}

/// Point-in-time session status, as returned by `getVpnStatus`
#[derive(Debug, Clone, Serialize)]
pub struct VpnStatus {
    /// Whether the session is connected
    pub connected: bool,
    /// When the session was started, if connected
    pub start_time: Option<SystemTime>,
    /// Total events processed since the last start
    pub packets_processed: u64,
    /// DNS queries intercepted since the last start
    pub dns_queries_intercepted: u64,
}
