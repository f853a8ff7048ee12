//! The engine, owner of all protocol state and the receive buffer.
use crate::config::Config;
use crate::layer::{arp, icmp, ip, tcp, udp};
use crate::layer::{Handler, Result};
use crate::nic::{Checksums, Link};
use crate::time::Clock;
use crate::wire::{ethernet_frame, EthernetRepr, EtherType, ipv4_packet, IpProtocol};
use crate::wire::{DataSource, Ipv4Address, Source, ETHERNET_HEADER_LEN};

/// The size of the receive buffer.
///
/// Large enough for the headers of any frame plus a 536 byte segment, the rest of a larger frame
/// stays with the link.
pub const BUFFER_LEN: usize = 590;

/// Packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Frames taken from the link.
    pub received: u32,
    /// Frames that were malformed or failed a checksum.
    pub dropped: u32,
    /// Valid frames not addressed to us, or not handled in the current address state.
    pub filtered: u32,
    /// Frames that reached a protocol but were not wanted, such as datagrams to unbound ports.
    pub unhandled: u32,
    pub arp: u32,
    pub icmp: u32,
    pub udp: u32,
    pub tcp: u32,
}

/// What became of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Arp,
    Icmp,
    Udp,
    Tcp,
    Unhandled,
    Filtered,
    Dropped,
}

/// A network interface.
///
/// Holds every piece of protocol state and the single receive buffer. Frames are handled one at a
/// time and to completion, nothing received is kept once `poll` returns.
pub struct Engine {
    config: Config,
    ip: ip::Endpoint,
    udp: udp::Endpoint,
    tcp: tcp::Endpoint,
    stats: Stats,
    buffer: [u8; BUFFER_LEN],
    last_second: Option<u32>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let addresses = ip::Addresses {
            hardware_addr: config.hardware_addr,
            ip_addr: config.ip_addr,
            netmask: config.netmask,
            gateway: config.gateway,
        };
        let arp = arp::Endpoint::new(config.arp_lifetime, config.arp_requests, config.arp_polls);
        let settings = tcp::Settings {
            server_port: config.server_port,
            retries: config.tcp_retries,
            timeout: config.tcp_timeout,
            max_age: config.tcp_max_age,
            filter_flags: config.filter_flags,
        };

        Engine {
            config,
            ip: ip::Endpoint::new(addresses, arp, config.hop_limit),
            udp: udp::Endpoint::new(),
            tcp: tcp::Endpoint::new(settings, config.isn_seed),
            stats: Stats::default(),
            buffer: [0; BUFFER_LEN],
            last_second: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn ip(&self) -> &ip::Endpoint {
        &self.ip
    }

    pub fn udp(&self) -> &udp::Endpoint {
        &self.udp
    }

    pub fn tcp(&self) -> &tcp::Endpoint {
        &self.tcp
    }

    /// Assign a new network address, netmask and gateway.
    ///
    /// The unspecified address returns the interface to the unassigned state.
    pub fn set_address(&mut self, ip_addr: Ipv4Address, netmask: Ipv4Address, gateway: Ipv4Address) {
        self.config.ip_addr = ip_addr;
        self.config.netmask = netmask;
        self.config.gateway = gateway;
        self.ip.set_addresses(ip_addr, netmask, gateway);
    }

    /// Whether another host claimed our address since it was last set.
    pub fn address_conflict(&self) -> bool {
        self.ip.arp().address_conflict()
    }

    /// Use `clock` to time the wait for address resolution.
    ///
    /// Links whose `receive_header` returns at once when nothing is queued need this, otherwise a
    /// resolution gives up before any answer could have arrived.
    pub fn attach_clock(&mut self, clock: &'static Clock) {
        self.ip.arp_mut().attach_clock(clock);
    }

    /// Run `tick` once for every second that passed since the last update.
    ///
    /// The first call only records the time.
    pub fn update(&mut self, clock: &Clock) {
        let now = clock.seconds();
        if let Some(last) = self.last_second {
            // Every countdown is a u8, more ticks than that change nothing.
            let elapsed = now.wrapping_sub(last).min(256);
            for _ in 0..elapsed {
                self.tick();
            }
        }
        self.last_second = Some(now);
    }

    /// Advance all countdowns by one second.
    pub fn tick(&mut self) {
        self.ip.arp_mut().tick();
        self.tcp.tick();
    }

    /// Resend due segments and reap idle connections.
    pub fn service<L: Link>(&mut self, link: &mut L) {
        self.tcp.service(&mut self.ip, link);
    }

    /// Receive and handle at most one frame.
    ///
    /// Returns whether a frame was taken from the link.
    pub fn poll<L: Link, H: Handler + ?Sized>(&mut self, link: &mut L, handler: &mut H) -> bool {
        let Engine { ip, udp, tcp, stats, buffer, .. } = self;
        let header = match link.receive_header(&mut buffer[..]) {
            Some(header) => header,
            None => return false,
        };
        stats.received += 1;

        let frame = &mut buffer[..header.length.min(BUFFER_LEN)];
        match dispatch(ip, udp, tcp, link, handler, frame, header.checksums) {
            Verdict::Arp => stats.arp += 1,
            Verdict::Icmp => stats.icmp += 1,
            Verdict::Udp => stats.udp += 1,
            Verdict::Tcp => stats.tcp += 1,
            Verdict::Unhandled => stats.unhandled += 1,
            Verdict::Filtered => stats.filtered += 1,
            Verdict::Dropped => stats.dropped += 1,
        }
        link.done();
        true
    }

    /// One pass of the main loop: timers, retransmissions, then one received frame.
    pub fn run_once<L: Link, H: Handler + ?Sized>(
        &mut self,
        clock: &Clock,
        link: &mut L,
        handler: &mut H,
    ) -> bool {
        self.update(clock);
        self.service(link);
        self.poll(link, handler)
    }

    /// Find the link address for `dst_addr`, waiting for an ARP reply if needed.
    pub fn resolve<L: Link>(&mut self, link: &mut L, dst_addr: Ipv4Address) -> Result<crate::wire::EthernetAddress> {
        self.ip.resolve(link, dst_addr)
    }

    pub fn udp_register(&mut self, local_port: u16, remote_port: Option<u16>) -> Result<udp::Binding> {
        self.udp.register(local_port, remote_port)
    }

    pub fn udp_unregister(&mut self, binding: udp::Binding) -> Result<()> {
        self.udp.unregister(binding)
    }

    /// Send a datagram whose `length` payload bytes are produced by `source`.
    pub fn udp_send<L: Link>(
        &mut self,
        link: &mut L,
        src_port: u16,
        dst_port: u16,
        dst_addr: Ipv4Address,
        length: usize,
        source: &mut dyn DataSource,
    ) -> Result<()> {
        udp::send(&mut self.ip, link, src_port, dst_port, dst_addr, length, source)
    }

    /// A local port not used by any binding or connection.
    pub fn new_port(&mut self) -> u16 {
        let tcp = &self.tcp;
        self.udp.new_port(|port| tcp.port_in_use(port))
    }

    pub fn tcp_connect<L: Link>(
        &mut self,
        link: &mut L,
        role: tcp::Role,
        local_port: u16,
        remote_port: u16,
        remote_addr: Ipv4Address,
    ) -> Result<()> {
        self.tcp.connect(&mut self.ip, link, role, local_port, remote_port, remote_addr)
    }

    pub fn tcp_listen(&mut self, port: u16) -> Result<()> {
        self.tcp.listen(port)
    }

    pub fn tcp_send<L: Link>(
        &mut self,
        link: &mut L,
        role: tcp::Role,
        source: Source<'_>,
        retransmit: bool,
    ) -> Result<usize> {
        self.tcp.send(&mut self.ip, link, role, source, retransmit)
    }

    pub fn tcp_close<L: Link>(&mut self, link: &mut L, role: tcp::Role) -> Result<()> {
        self.tcp.close(&mut self.ip, link, role)
    }

    pub fn tcp_abort<L: Link>(&mut self, link: &mut L, role: tcp::Role) -> Result<()> {
        self.tcp.abort(&mut self.ip, link, role)
    }

    pub fn tcp_status(&self, role: tcp::Role) -> tcp::State {
        self.tcp.status(role)
    }
}

/// Route a received frame through the layers.
fn dispatch<L: Link, H: Handler + ?Sized>(
    ip: &mut ip::Endpoint,
    udp: &mut udp::Endpoint,
    tcp: &mut tcp::Endpoint,
    link: &mut L,
    handler: &mut H,
    frame: &mut [u8],
    checksums: Checksums,
) -> Verdict {
    let eth = match ethernet_frame::new_checked(frame).and_then(EthernetRepr::parse) {
        Ok(eth) => eth,
        Err(err) => {
            net_trace!("engine: bad frame: {:?}", err);
            return Verdict::Dropped;
        }
    };
    if !ip.addresses().accepts_frame(eth.dst_addr) {
        return Verdict::Filtered;
    }

    match eth.ethertype {
        EtherType::Arp => return match ip.receive_arp(link, &frame[ETHERNET_HEADER_LEN..]) {
            Ok(()) => Verdict::Arp,
            Err(err) => {
                net_trace!("engine: bad ARP packet: {:?}", err);
                Verdict::Dropped
            }
        },
        EtherType::Ipv4 => (),
        _ => {
            net_trace!("engine: ignoring {}", eth);
            return Verdict::Filtered;
        }
    }

    let (repr, destination) = match ip.verify_and_classify(&frame[ETHERNET_HEADER_LEN..], checksums) {
        Ok(classified) => classified,
        Err(err) => {
            net_trace!("engine: bad datagram: {:?}", err);
            return Verdict::Dropped;
        }
    };
    let assigned = ip.addresses().is_assigned();
    if assigned && destination == ip::Destination::NotOurs {
        return Verdict::Filtered;
    }
    ip.learn_source(repr.src_addr, eth.src_addr);

    let header_len = ipv4_packet::new_unchecked(&frame[ETHERNET_HEADER_LEN..]).header_len();
    let offset = ETHERNET_HEADER_LEN + usize::from(header_len);

    let delivered = match repr.protocol {
        IpProtocol::Udp => {
            match udp.receive(handler, link, frame, offset, &repr, destination, checksums) {
                Ok(true) => return Verdict::Udp,
                other => other,
            }
        }
        _ if !assigned => return Verdict::Filtered,
        IpProtocol::Icmp => {
            if !checksums.contains(Checksums::ICMP) {
                net_trace!("engine: bad ICMP checksum from {}", repr.src_addr);
                return Verdict::Dropped;
            }
            match icmp::answer(ip, link, frame, &repr, destination) {
                Ok(true) => return Verdict::Icmp,
                Ok(false) => Ok(false),
                Err(err) => {
                    net_trace!("engine: no echo reply: {}", err);
                    return Verdict::Dropped;
                }
            }
        }
        IpProtocol::Tcp if destination == ip::Destination::Unicast => {
            match tcp.receive(ip, link, handler, frame, offset, &repr, checksums) {
                Ok(true) => return Verdict::Tcp,
                other => other,
            }
        }
        _ => Ok(false),
    };

    match delivered {
        Ok(_) => Verdict::Unhandled,
        Err(err) => {
            net_trace!("engine: dropped {}: {:?}", repr.protocol, err);
            Verdict::Dropped
        }
    }
}
