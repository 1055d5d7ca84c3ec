//! Capability selection and failover
//!
//! Decides at construction time whether session operations route to native
//! capture or the synthetic generator, and falls back to a lazily built
//! generator when a native call fails. Failover is per call, not sticky:
//! every start attempt tries native capture first, so a recovered platform
//! facility is picked up again on the next call.

use crate::error::Result;
use crate::native::NativeCapture;
use crate::synthetic::SyntheticGenerator;
use crate::traits::{EventSink, TrafficSource};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};
use vigil_core::config::{CaptureMode, GeneratorConfig};

/// Routes session operations to the best available traffic source
pub struct CapabilitySelector {
    native: Option<Arc<NativeCapture>>,
    /// `CaptureMode::Native` disables synthetic failover
    require_native: bool,
    generator_config: GeneratorConfig,
    fallback: Mutex<Option<Arc<SyntheticGenerator>>>,
}

impl CapabilitySelector {
    /// Inspect the runtime platform and pick a source
    ///
    /// Native capture is chosen only when the platform provides an
    /// interception facility (and the mode allows it); otherwise every
    /// call goes straight to the synthetic generator.
    pub fn detect(mode: CaptureMode, generator_config: GeneratorConfig) -> Self {
        let native = match mode {
            CaptureMode::Synthetic => None,
            CaptureMode::Auto | CaptureMode::Native => {
                NativeCapture::platform_default().map(Arc::new)
            }
        };

        if let Some(ref native) = native {
            info!(source = native.name(), "Selected native traffic source");
        } else {
            info!("No native capture facility; using synthetic traffic source");
        }

        Self {
            native,
            require_native: mode == CaptureMode::Native,
            generator_config,
            fallback: Mutex::new(None),
        }
    }

    /// Build a selector over explicit sources with per-call failover
    pub fn with_sources(native: Option<NativeCapture>, generator_config: GeneratorConfig) -> Self {
        Self {
            native: native.map(Arc::new),
            require_native: false,
            generator_config,
            fallback: Mutex::new(None),
        }
    }

    /// Build a selector that requires native capture (no failover)
    pub fn native_only(native: NativeCapture, generator_config: GeneratorConfig) -> Self {
        Self {
            native: Some(Arc::new(native)),
            require_native: true,
            generator_config,
            fallback: Mutex::new(None),
        }
    }

    /// Whether this session prefers native capture
    ///
    /// Diagnostic only; individual calls may still have fallen back.
    pub fn is_native_backed(&self) -> bool {
        self.native.is_some()
    }

    /// The lazily constructed synthetic fallback
    fn fallback_generator(&self) -> Arc<SyntheticGenerator> {
        let mut slot = self.fallback.lock();
        Arc::clone(slot.get_or_insert_with(|| {
            Arc::new(SyntheticGenerator::new(self.generator_config.clone()))
        }))
    }

    /// Start the selected source, failing over for this call if needed
    ///
    /// With `CaptureMode::Native` the failure is surfaced instead of
    /// falling back.
    pub fn start(&self, sink: EventSink) -> Result<()> {
        if let Some(ref native) = self.native {
            match native.start(Arc::clone(&sink)) {
                Ok(()) => return Ok(()),
                Err(e) if self.require_native => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Native capture failed; falling back to synthetic generation for this call");
                }
            }
        } else if self.require_native {
            return Err(crate::PlatformError::Unsupported(
                "native capture required but no facility is available".to_string(),
            ));
        }

        self.fallback_generator().start(sink)
    }

    /// Stop every source that may be emitting
    ///
    /// Both the native source and the synthetic fallback are stopped so the
    /// no-events-after-stop guarantee holds across any failover history.
    /// Native stop failures are logged and tolerated as long as the
    /// fallback stops cleanly.
    pub fn stop(&self) -> Result<()> {
        if let Some(ref native) = self.native {
            if let Err(e) = native.stop() {
                warn!(error = %e, "Native capture failed to stop");
            }
        }

        let fallback = self.fallback.lock().clone();
        if let Some(generator) = fallback {
            generator.stop()?;
        }
        Ok(())
    }

    /// Whether any routed source is currently emitting
    pub fn is_active(&self) -> bool {
        if self.native.as_ref().is_some_and(|n| n.is_active()) {
            return true;
        }
        self.fallback
            .lock()
            .as_ref()
            .is_some_and(|g| g.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::traits::CaptureBackend;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    /// Backend fake whose start can be toggled between failing and working
    #[derive(Default)]
    struct FlakyBackend {
        fail_start: AtomicBool,
        start_attempts: AtomicU32,
        active: AtomicBool,
    }

    impl CaptureBackend for FlakyBackend {
        fn start(&self, _sink: EventSink) -> Result<()> {
            self.start_attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(PlatformError::Capture("permission revoked".to_string()));
            }
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    fn fast_config() -> GeneratorConfig {
        GeneratorConfig {
            min_delay_ms: 5,
            max_delay_ms: 15,
            ..GeneratorConfig::default()
        }
    }

    fn null_sink() -> EventSink {
        Arc::new(|_| {})
    }

    #[test]
    fn test_detect_without_facility_is_synthetic() {
        let selector = CapabilitySelector::detect(CaptureMode::Auto, fast_config());
        assert!(!selector.is_native_backed());

        selector.start(null_sink()).unwrap();
        assert!(selector.is_active());
        selector.stop().unwrap();
        assert!(!selector.is_active());
    }

    #[test]
    fn test_failover_on_native_failure() {
        let backend = Arc::new(FlakyBackend::default());
        backend.fail_start.store(true, Ordering::SeqCst);

        let native = NativeCapture::with_backend(Arc::clone(&backend) as Arc<dyn CaptureBackend>);
        let selector = CapabilitySelector::with_sources(Some(native), fast_config());
        assert!(selector.is_native_backed());

        // Native start fails; the call lands on the synthetic fallback
        selector.start(null_sink()).unwrap();
        assert!(selector.is_active());
        assert!(!backend.is_active());
        assert_eq!(backend.start_attempts.load(Ordering::SeqCst), 1);

        selector.stop().unwrap();
        assert!(!selector.is_active());
    }

    #[test]
    fn test_native_retried_on_next_call() {
        let backend = Arc::new(FlakyBackend::default());
        backend.fail_start.store(true, Ordering::SeqCst);

        let native = NativeCapture::with_backend(Arc::clone(&backend) as Arc<dyn CaptureBackend>);
        let selector = CapabilitySelector::with_sources(Some(native), fast_config());

        selector.start(null_sink()).unwrap();
        selector.stop().unwrap();
        assert_eq!(backend.start_attempts.load(Ordering::SeqCst), 1);

        // The platform recovered; the next call must retry native first
        backend.fail_start.store(false, Ordering::SeqCst);
        selector.start(null_sink()).unwrap();
        assert_eq!(backend.start_attempts.load(Ordering::SeqCst), 2);
        assert!(backend.is_active());

        selector.stop().unwrap();
        assert!(!backend.is_active());
    }

    #[test]
    fn test_native_only_surfaces_failure() {
        let backend = Arc::new(FlakyBackend::default());
        backend.fail_start.store(true, Ordering::SeqCst);

        let native = NativeCapture::with_backend(Arc::clone(&backend) as Arc<dyn CaptureBackend>);
        let selector = CapabilitySelector::native_only(native, fast_config());

        assert!(selector.start(null_sink()).is_err());
        assert!(!selector.is_active());

        // After the backend recovers, the same selector starts cleanly
        backend.fail_start.store(false, Ordering::SeqCst);
        selector.start(null_sink()).unwrap();
        assert!(selector.is_active());
        selector.stop().unwrap();
    }

    #[test]
    fn test_stop_covers_fallback_after_failover() {
        let backend = Arc::new(FlakyBackend::default());
        backend.fail_start.store(true, Ordering::SeqCst);

        let native = NativeCapture::with_backend(Arc::clone(&backend) as Arc<dyn CaptureBackend>);
        let selector = CapabilitySelector::with_sources(Some(native), fast_config());

        selector.start(null_sink()).unwrap();
        selector.stop().unwrap();

        // One scheduling interval later the fallback must be silent
        std::thread::sleep(Duration::from_millis(50));
        assert!(!selector.is_active());
    }
}
