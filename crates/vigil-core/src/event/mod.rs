//! Event model for intercepted traffic
//!
//! Everything the traffic sources emit is expressed as one of three
//! immutable event payloads: DNS query events, connection events and
//! session state-change events. Events are ephemeral - they are handed to
//! subscribers and never persisted by the core.

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::time::SystemTime;

/// DNS query type as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    /// IPv4 host address
    A,
    /// IPv6 host address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchange
    Mx,
    /// Text record
    Txt,
    /// Reverse lookup
    Ptr,
    /// Any query type not modeled above
    Other,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ptr => "PTR",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Transport protocol of a connection event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// Transmission Control Protocol
    Tcp,
    /// User Datagram Protocol
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("TCP"),
            Self::Udp => f.write_str("UDP"),
        }
    }
}

/// Capture session state
///
/// The session only ever moves through
/// `Disconnected -> Connecting -> Connected -> Disconnected` (via stop) or
/// `-> Error` (on failure). `Error` is not terminal - a later start attempt
/// may re-enter `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VpnState {
    /// No capture session is active
    #[default]
    Disconnected,
    /// Session start is in progress
    Connecting,
    /// Capture session is established and events flow
    Connected,
    /// The session failed; a subsequent start attempts recovery
    Error,
}

impl VpnState {
    /// Human-readable state label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

/// An intercepted DNS query
#[derive(Debug, Clone, Serialize)]
pub struct DnsRequestEvent {
    /// When the query was observed
    pub timestamp: SystemTime,
    /// Queried domain name, lowercase
    pub domain: String,
    /// Query type
    pub query_type: QueryType,
    /// Application identifier the query was attributed to, if known
    pub source_app: Option<String>,
    /// Source port of the query
    pub source_port: u16,
    /// Resolver the query was sent to
    pub destination_ip: IpAddr,
    /// Whether the interception layer blocked the query
    pub blocked: bool,
}

/// An intercepted TCP/UDP connection
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionEvent {
    /// When the connection was observed
    pub timestamp: SystemTime,
    /// Transport protocol
    pub protocol: Protocol,
    /// Local source address
    pub source_ip: IpAddr,
    /// Local source port
    pub source_port: u16,
    /// Remote destination address
    pub dest_ip: IpAddr,
    /// Remote destination port
    pub dest_port: u16,
    /// Application identifier the connection was attributed to, if known
    pub source_app: Option<String>,
    /// Bytes received over the connection so far
    pub bytes_in: u64,
    /// Bytes sent over the connection so far
    pub bytes_out: u64,
}

/// A session state transition
#[derive(Debug, Clone, Serialize)]
pub struct StateChangeEvent {
    /// The state entered
    pub state: VpnState,
    /// When the transition happened
    pub timestamp: SystemTime,
    /// Failure cause; present exactly when `state` is [`VpnState::Error`]
    pub error_message: Option<String>,
}

impl StateChangeEvent {
    /// Create a state-change event for a non-error transition
    pub fn new(state: VpnState) -> Self {
        debug_assert!(state != VpnState::Error, "error transitions need a cause");
        Self {
            state,
            timestamp: SystemTime::now(),
            error_message: None,
        }
    }

    /// Create an error transition carrying its cause
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: VpnState::Error,
            timestamp: SystemTime::now(),
            error_message: Some(message.into()),
        }
    }
}

/// The event kinds subscribers can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Intercepted DNS queries
    DnsRequest,
    /// Intercepted TCP/UDP connections
    Connection,
    /// Session state transitions
    VpnStateChange,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsRequest => f.write_str("dnsRequest"),
            Self::Connection => f.write_str("connectionEvent"),
            Self::VpnStateChange => f.write_str("vpnStateChange"),
        }
    }
}

/// Envelope over the three event payloads
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Event {
    /// An intercepted DNS query
    DnsRequest(DnsRequestEvent),
    /// An intercepted connection
    Connection(ConnectionEvent),
    /// A session state transition
    StateChange(StateChangeEvent),
}

impl Event {
    /// The kind of this event, used for dispatch routing
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DnsRequest(_) => EventKind::DnsRequest,
            Self::Connection(_) => EventKind::Connection,
            Self::StateChange(_) => EventKind::VpnStateChange,
        }
    }

    /// Timestamp of the wrapped payload
    pub fn timestamp(&self) -> SystemTime {
        match self {
            Self::DnsRequest(e) => e.timestamp,
            Self::Connection(e) => e.timestamp,
            Self::StateChange(e) => e.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_query_type_display() {
        assert_eq!(QueryType::Aaaa.to_string(), "AAAA");
        assert_eq!(QueryType::Other.to_string(), "OTHER");
    }

    #[test]
    fn test_default_state_is_disconnected() {
        assert_eq!(VpnState::default(), VpnState::Disconnected);
    }

    #[test]
    fn test_state_change_error_carries_message() {
        let event = StateChangeEvent::error("capture backend crashed");
        assert_eq!(event.state, VpnState::Error);
        assert_eq!(event.error_message.as_deref(), Some("capture backend crashed"));

        let event = StateChangeEvent::new(VpnState::Connected);
        assert!(event.error_message.is_none());
    }

    #[test]
    fn test_event_kind_routing() {
        let dns = Event::DnsRequest(DnsRequestEvent {
            timestamp: SystemTime::now(),
            domain: "example.com".to_string(),
            query_type: QueryType::A,
            source_app: None,
            source_port: 52044,
            destination_ip: IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
            blocked: false,
        });
        assert_eq!(dns.kind(), EventKind::DnsRequest);

        let change = Event::StateChange(StateChangeEvent::new(VpnState::Disconnected));
        assert_eq!(change.kind(), EventKind::VpnStateChange);
    }

    #[test]
    fn test_event_kind_display_matches_wire_names() {
        assert_eq!(EventKind::DnsRequest.to_string(), "dnsRequest");
        assert_eq!(EventKind::Connection.to_string(), "connectionEvent");
        assert_eq!(EventKind::VpnStateChange.to_string(), "vpnStateChange");
    }
}
