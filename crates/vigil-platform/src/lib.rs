//! Vigil Platform Abstraction Layer
//!
//! This crate provides the traffic-source side of the detection pipeline:
//! the [`TrafficSource`] contract, the native capture adapter over a
//! platform interception facility, the synthetic generator used where no
//! such facility exists, and the capability selector that picks between
//! them with per-call failover.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod error;
pub use error::{PlatformError, Result};

mod traits;
pub use traits::{CaptureBackend, EventSink, PermissionBroker, StaticPermissions, TrafficSource};

pub mod native;
pub use native::NativeCapture;

pub mod synthetic;
pub use synthetic::SyntheticGenerator;

mod selector;
pub use selector::CapabilitySelector;
