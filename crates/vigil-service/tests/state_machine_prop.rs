//! Property test: the session state machine
//!
//! For all sequences of start/stop/status calls, the observable state
//! follows the documented machine: idempotent start/stop, status always
//! consistent with the last effective transition, and exactly one state
//! change published per effective transition.

use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

use vigil_core::config::GeneratorConfig;
use vigil_core::event::{Event, EventKind, VpnState};
use vigil_platform::{CapabilitySelector, StaticPermissions};
use vigil_service::MonitorService;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Stop,
    Status,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Start), Just(Op::Stop), Just(Op::Status)]
}

/// Intervals far beyond the test horizon, so no traffic events interleave
fn quiet_config() -> GeneratorConfig {
    GeneratorConfig {
        min_delay_ms: 60_000,
        max_delay_ms: 120_000,
        ..GeneratorConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn state_machine_follows_documented_transitions(
        ops in prop::collection::vec(op_strategy(), 1..30)
    ) {
        let service = MonitorService::new(
            CapabilitySelector::with_sources(None, quiet_config()),
            Arc::new(StaticPermissions::granted()),
        );

        let observed = Arc::new(Mutex::new(Vec::new()));
        let observed_clone = Arc::clone(&observed);
        service.subscribe(EventKind::VpnStateChange, move |event| {
            if let Event::StateChange(change) = event {
                observed_clone.lock().push(change.state);
            }
        });

        let mut connected = false;
        let mut expected = Vec::new();

        for op in ops {
            match op {
                Op::Start => {
                    let outcome = service.start_vpn();
                    prop_assert!(outcome.success);
                    prop_assert!(!outcome.requires_permission);
                    if !connected {
                        expected.push(VpnState::Connected);
                        connected = true;
                    }
                }
                Op::Stop => {
                    let outcome = service.stop_vpn();
                    prop_assert!(outcome.success);
                    if connected {
                        expected.push(VpnState::Disconnected);
                        connected = false;
                    }
                }
                Op::Status => {
                    let status = service.vpn_status();
                    prop_assert_eq!(status.connected, connected);
                    prop_assert_eq!(status.start_time.is_some(), connected);
                    prop_assert!(status.packets_processed >= status.dns_queries_intercepted);
                }
            }
        }

        // Idempotent calls publish nothing; effective transitions publish
        // exactly once, in order.
        prop_assert_eq!(observed.lock().clone(), expected);

        service.stop_vpn();
    }
}
