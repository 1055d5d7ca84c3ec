//! # Vigil Core
//!
//! Platform-independent core library for stalkerware traffic detection.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Event model** - DNS query, connection and state-change events
//! - **Event dispatcher** - Typed publish/subscribe hub with handler isolation
//! - **Indicator store** - Read-only lookup of known stalkerware indicators
//! - **Session model** - Capture session state and counters
//! - **Configuration** - TOML-backed configuration system
//!
//! ## Example
//!
//! ```rust
//! use vigil_core::dispatcher::EventDispatcher;
//! use vigil_core::event::{Event, EventKind, StateChangeEvent, VpnState};
//!
//! let dispatcher = EventDispatcher::new();
//! let _handle = dispatcher.subscribe(EventKind::VpnStateChange, |event| {
//!     if let Event::StateChange(change) = event {
//!         println!("state is now {:?}", change.state);
//!     }
//! });
//!
//! dispatcher.publish(&Event::StateChange(StateChangeEvent::new(VpnState::Connected)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod indicators;
pub mod session;

// Re-exports for convenience
pub use config::Config;
pub use dispatcher::{EventDispatcher, SubscriptionHandle};
pub use error::{Error, Result};
pub use event::{Event, EventKind, VpnState};
pub use indicators::IndicatorStore;
pub use session::{Session, VpnStatus};
