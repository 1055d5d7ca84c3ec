//! Synthetic traffic generator
//!
//! Produces randomized but structurally valid DNS/connection events for
//! environments without a capture facility. Generation runs on a dedicated
//! worker thread paced by a condvar wait, which makes cancellation
//! synchronous: `stop()` flags the worker, wakes it and joins it, so no
//! event can be delivered after `stop` returns.

pub mod sampler;
pub use sampler::EventSampler;

use crate::error::Result;
use crate::traits::{EventSink, TrafficSource};
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};
use vigil_core::config::GeneratorConfig;
use vigil_core::event::Event;

/// Worker state guarded by the pacing lock
#[derive(Default)]
struct WorkerState {
    stop: bool,
}

/// Shared between the generator handle and its worker thread
#[derive(Default)]
struct Shared {
    state: Mutex<WorkerState>,
    wakeup: Condvar,
}

/// Traffic source that simulates interception
pub struct SyntheticGenerator {
    sampler: Arc<EventSampler>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyntheticGenerator {
    /// Create a generator with the given distribution settings
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            sampler: Arc::new(EventSampler::new(config)),
            shared: Arc::new(Shared::default()),
            worker: Mutex::new(None),
        }
    }

    /// Generator with the documented default distributions
    pub fn with_defaults() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TrafficSource for SyntheticGenerator {
    fn start(&self, sink: EventSink) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }

        self.shared.state.lock().stop = false;

        let shared = Arc::clone(&self.shared);
        let sampler = Arc::clone(&self.sampler);

        info!(
            min_delay_ms = sampler.config().min_delay_ms,
            max_delay_ms = sampler.config().max_delay_ms,
            "Starting synthetic traffic generation"
        );

        let handle = std::thread::Builder::new()
            .name("vigil-synthetic".to_string())
            .spawn(move || {
                let mut rng = StdRng::from_entropy();
                let mut guard = shared.state.lock();
                loop {
                    let delay = sampler.next_delay(&mut rng);
                    let _ = shared.wakeup.wait_for(&mut guard, delay);
                    if guard.stop {
                        break;
                    }

                    // Emit while holding the pacing lock: stop() takes the
                    // same lock before joining, so it can never return in
                    // the middle of a delivery.
                    let dns = sampler.next_dns(&mut rng);
                    let connection = sampler.maybe_connection(&mut rng, &dns);
                    debug!(domain = %dns.domain, query_type = %dns.query_type, "Generated DNS event");
                    sink(Event::DnsRequest(dns));
                    if let Some(conn) = connection {
                        sink(Event::Connection(conn));
                    }
                }
                debug!("Synthetic generation worker exited");
            })?;

        *worker = Some(handle);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return Ok(());
        };

        self.shared.state.lock().stop = true;
        self.shared.wakeup.notify_all();

        // Joining is the no-events-after-stop guarantee: the pending tick
        // is revoked, not merely ignored.
        let _ = handle.join();
        info!("Stopped synthetic traffic generation");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn name(&self) -> &'static str {
        "synthetic-generator"
    }
}

impl Drop for SyntheticGenerator {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
