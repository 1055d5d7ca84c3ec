//! # Vigil Service
//!
//! The session controller that drives traffic interception: it owns the
//! connected/disconnected state machine, the permission handshake, the
//! session counters and the event fan-out to subscribers.
//!
//! ## Example
//!
//! ```rust
//! use vigil_core::config::Config;
//! use vigil_core::event::EventKind;
//! use vigil_service::MonitorService;
//!
//! let service = MonitorService::from_config(&Config::default());
//! let _handle = service.subscribe(EventKind::DnsRequest, |event| {
//!     println!("intercepted: {event:?}");
//! });
//!
//! let outcome = service.start_vpn();
//! assert!(outcome.success);
//! service.stop_vpn();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod service;

pub use service::{MonitorService, StartOutcome, StopOutcome};
