//! Engine configuration.
use crate::wire::{EthernetAddress, Ipv4Address};

/// The configuration of an [`Engine`].
///
/// All counts of time are in seconds, the granularity of the engine's clock.
///
/// [`Engine`]: ../struct.Engine.html
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Our link address.
    pub hardware_addr: EthernetAddress,
    /// Our network address, the unspecified address while none is assigned.
    pub ip_addr: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Ipv4Address,
    /// The TTL of outbound datagrams.
    pub hop_limit: u8,
    /// Seconds an address cache entry lives.
    pub arp_lifetime: u8,
    /// Requests sent per address resolution before giving up, one per second with a clock attached.
    pub arp_requests: u8,
    /// Link polls after each request while waiting for the answer, when no clock is attached.
    pub arp_polls: u16,
    /// The port of the server role.
    pub server_port: u16,
    /// Retransmissions of an unacknowledged segment.
    pub tcp_retries: u8,
    /// Timeout before the first retransmission.
    pub tcp_timeout: u8,
    /// Idle seconds before a connection is reaped.
    pub tcp_max_age: u8,
    /// Drop segments with contradictory flags.
    pub filter_flags: bool,
    /// Seed of the initial sequence number generator, must not be zero.
    pub isn_seed: u32,
}

impl Config {
    /// The default configuration for an interface with hardware address `hardware_addr`.
    pub fn new(hardware_addr: EthernetAddress) -> Self {
        Config {
            hardware_addr,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hardware_addr: EthernetAddress([0x02, 0, 0, 0, 0, 0x01]),
            ip_addr: Ipv4Address::UNSPECIFIED,
            netmask: Ipv4Address::new(255, 255, 255, 0),
            gateway: Ipv4Address::UNSPECIFIED,
            hop_limit: 64,
            arp_lifetime: 120,
            arp_requests: 3,
            arp_polls: 64,
            server_port: 80,
            tcp_retries: 3,
            tcp_timeout: 1,
            tcp_max_age: 5,
            filter_flags: true,
            isn_seed: 0x2d5a_91c3,
        }
    }
}
