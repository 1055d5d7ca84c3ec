//! Event sampling distributions
//!
//! The pure random-draw half of the synthetic generator, split from the
//! scheduling loop so distributions can be tested with a seeded RNG and no
//! real-time delays.

use rand::seq::SliceRandom;
use rand::Rng;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, SystemTime};
use vigil_core::config::GeneratorConfig;
use vigil_core::event::{ConnectionEvent, DnsRequestEvent, Protocol, QueryType};

/// Destination ports used for simulated connections
const CONNECTION_PORTS: [u16; 3] = [80, 443, 8080];

/// Resolvers simulated queries are addressed to
const RESOLVERS: [Ipv4Addr; 4] = [
    Ipv4Addr::new(8, 8, 8, 8),
    Ipv4Addr::new(8, 8, 4, 4),
    Ipv4Addr::new(1, 1, 1, 1),
    Ipv4Addr::new(9, 9, 9, 9),
];

/// A `(domain, source app)` pool entry
#[derive(Debug, Clone)]
pub struct PoolEntry {
    /// Queried domain
    pub domain: &'static str,
    /// Application the query is attributed to
    pub app: Option<&'static str>,
}

const fn entry(domain: &'static str, app: Option<&'static str>) -> PoolEntry {
    PoolEntry { domain, app }
}

/// Stalkerware pool: domains and apps matching the built-in indicator table
const INDICATOR_POOL: [PoolEntry; 7] = [
    entry("mspyonline.com", Some("com.mspy.lite")),
    entry("portal.flexispy.com", Some("com.flexispy.android")),
    entry("cocospy.com", Some("com.cocospy.android")),
    entry("spyzie.com", Some("com.spyzie.client")),
    entry("hoverwatch.com", Some("com.hoverwatch.android")),
    entry("my.thetruthspy.com", Some("com.thetruthspy.app")),
    entry("cp.xnspy.com", Some("com.xnspy.client")),
];

/// Benign pool: ordinary app traffic
const BENIGN_POOL: [PoolEntry; 10] = [
    entry("www.google.com", Some("com.android.chrome")),
    entry("cdn.whatsapp.net", Some("com.whatsapp")),
    entry("graph.instagram.com", Some("com.instagram.android")),
    entry("api.spotify.com", Some("com.spotify.music")),
    entry("mobile.twitter.com", Some("com.twitter.android")),
    entry("i.ytimg.com", Some("com.google.android.youtube")),
    entry("api.github.com", None),
    entry("ocsp.digicert.com", None),
    entry("connectivitycheck.gstatic.com", Some("com.android.settings")),
    entry("time.android.com", None),
];

/// Draws DNS and connection events per the documented distributions
///
/// Each DNS event is taken from the stalkerware pool with probability
/// `indicator_ratio`, else from the benign pool; `connection_ratio` of DNS
/// events get a companion connection for the same source app.
pub struct EventSampler {
    config: GeneratorConfig,
}

impl EventSampler {
    /// Create a sampler with the given distribution settings
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// The distribution settings in use
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Draw the next inter-event delay, uniform in `[min, max)`
    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let millis = rng.gen_range(self.config.min_delay_ms..self.config.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Draw one DNS query event
    pub fn next_dns<R: Rng>(&self, rng: &mut R) -> DnsRequestEvent {
        let from_indicator_pool = rng.gen_bool(self.config.indicator_ratio);
        let pool: &[PoolEntry] = if from_indicator_pool {
            &INDICATOR_POOL
        } else {
            &BENIGN_POOL
        };
        let entry = pool.choose(rng).expect("pools are non-empty");

        let query_type = *[QueryType::A, QueryType::Aaaa, QueryType::Cname]
            .choose(rng)
            .expect("query types are non-empty");

        DnsRequestEvent {
            timestamp: SystemTime::now(),
            domain: entry.domain.to_string(),
            query_type,
            source_app: entry.app.map(str::to_string),
            source_port: rng.gen_range(1024..=u16::MAX),
            destination_ip: IpAddr::V4(*RESOLVERS.choose(rng).expect("resolvers are non-empty")),
            blocked: false,
        }
    }

    /// Possibly draw a companion connection event for a DNS query
    ///
    /// Emitted for `connection_ratio` of DNS events, attributed to the same
    /// source app; TCP at `tcp_ratio`, destination port from {80, 443, 8080}.
    pub fn maybe_connection<R: Rng>(
        &self,
        rng: &mut R,
        dns: &DnsRequestEvent,
    ) -> Option<ConnectionEvent> {
        if !rng.gen_bool(self.config.connection_ratio) {
            return None;
        }

        let protocol = if rng.gen_bool(self.config.tcp_ratio) {
            Protocol::Tcp
        } else {
            Protocol::Udp
        };

        Some(ConnectionEvent {
            timestamp: SystemTime::now(),
            protocol,
            source_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, rng.gen_range(2..=250))),
            source_port: rng.gen_range(1024..=u16::MAX),
            dest_ip: IpAddr::V4(Ipv4Addr::new(
                rng.gen_range(1..=223),
                rng.gen(),
                rng.gen(),
                rng.gen(),
            )),
            dest_port: *CONNECTION_PORTS.choose(rng).expect("ports are non-empty"),
            source_app: dns.source_app.clone(),
            bytes_in: u64::from(rng.gen_range(128u32..65_536)),
            bytes_out: u64::from(rng.gen_range(64u32..16_384)),
        })
    }
}
