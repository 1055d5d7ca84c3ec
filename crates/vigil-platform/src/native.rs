//! Native capture adapter
//!
//! Wraps the platform packet/DNS interception facility behind the
//! [`TrafficSource`] contract. The facility itself is an external
//! collaborator reached through [`CaptureBackend`]; this adapter adds
//! logging and keeps the session controller insulated from backend types.

use crate::error::Result;
use crate::traits::{CaptureBackend, EventSink, TrafficSource};
use std::sync::Arc;
use tracing::{info, warn};

/// Traffic source backed by real platform interception
pub struct NativeCapture {
    backend: Arc<dyn CaptureBackend>,
}

impl NativeCapture {
    /// Create an adapter over a specific backend
    pub fn with_backend(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    /// The platform's default capture facility, if one exists
    ///
    /// Platforms with an interception facility mount it here; everywhere
    /// else native capture is unavailable and the capability selector
    /// falls through to the synthetic generator.
    pub fn platform_default() -> Option<Self> {
        // No interception facility is linked into this build on any
        // platform; the facility ships with the platform integration.
        #[cfg(any(target_os = "android", target_os = "ios"))]
        {
            // Would wrap the OS VPN/packet-tunnel facility here.
            None
        }
        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        {
            None
        }
    }
}

impl TrafficSource for NativeCapture {
    fn start(&self, sink: EventSink) -> Result<()> {
        if self.backend.is_active() {
            return Ok(());
        }

        info!("Starting native capture");
        self.backend.start(sink).map_err(|e| {
            warn!(error = %e, "Native capture failed to start");
            e
        })
    }

    fn stop(&self) -> Result<()> {
        if !self.backend.is_active() {
            return Ok(());
        }

        info!("Stopping native capture");
        self.backend.stop().map_err(|e| {
            warn!(error = %e, "Native capture failed to stop");
            e
        })
    }

    fn is_active(&self) -> bool {
        self.backend.is_active()
    }

    fn name(&self) -> &'static str {
        "native-capture"
    }
}
