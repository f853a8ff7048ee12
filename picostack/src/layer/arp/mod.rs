//! The address resolution layer.
//!
//! Resolution is synchronous. On a cache miss the endpoint broadcasts a request and then polls
//! the link for frames, learning from every ARP packet it sees and discarding everything else,
//! until the answer arrives. The frames polled in the meantime never touch the engine's receive
//! buffer, they are read into a scratch buffer just large enough for an ARP packet.
//!
//! The wait is bounded: after a configurable number of requests resolution fails with
//! `Error::Unreachable`. With a clock attached each request is given one second to be answered.
//! Without one, each request is followed by a fixed number of polls, which only suits links that
//! block in `receive_header` until a frame arrives.
mod cache;

#[cfg(test)]
mod tests;

use crate::nic::{Checksums, Link};
use crate::time::Clock;
use crate::wire::{arp_packet, ArpOperation, ArpRepr, ethernet_frame, EthernetAddress, EthernetRepr};
use crate::wire::{EtherType, Ipv4Address, ARP_PACKET_LEN, ETHERNET_HEADER_LEN};

use super::ip::Addresses;
use super::{Error, Result};

pub use self::cache::{Cache, Entry, CAPACITY};

/// The length of an Ethernet frame carrying an ARP packet.
pub const FRAME_LEN: usize = ETHERNET_HEADER_LEN + ARP_PACKET_LEN;

/// The resolution state of the interface.
#[derive(Debug, Clone)]
pub struct Endpoint {
    cache: Cache,
    requests: u8,
    polls: u16,
    conflict: bool,
    clock: Option<&'static Clock>,
}

impl Endpoint {
    /// Create an endpoint.
    ///
    /// Cache entries live `lifetime` ticks. A resolution sends up to `requests` requests and, until
    /// a clock is attached, polls the link `polls` times after each.
    pub fn new(lifetime: u8, requests: u8, polls: u16) -> Self {
        Endpoint {
            cache: Cache::new(lifetime),
            requests,
            polls,
            conflict: false,
            clock: None,
        }
    }

    /// Measure the wait for answers with `clock` instead of counting polls.
    pub fn attach_clock(&mut self, clock: &'static Clock) {
        self.clock = Some(clock);
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Whether another host was seen using our address since the last `clear_conflict`.
    pub fn address_conflict(&self) -> bool {
        self.conflict
    }

    pub fn clear_conflict(&mut self) {
        self.conflict = false;
    }

    /// Count down the cache entries.
    pub fn tick(&mut self) {
        self.cache.tick()
    }

    /// Find the link address to which a datagram for `target` must be sent.
    ///
    /// Broadcast and the two responder multicast groups map to fixed addresses. Destinations off
    /// our subnet are reached through the gateway.
    pub fn resolve<L: Link>(
        &mut self,
        link: &mut L,
        local: &Addresses,
        target: Ipv4Address,
    ) -> Result<EthernetAddress> {
        if target.is_unspecified() || target.is_broadcast() {
            return Ok(EthernetAddress::BROADCAST);
        }
        if target == Ipv4Address::MDNS {
            return Ok(EthernetAddress::MDNS_MULTICAST);
        }
        if target == Ipv4Address::LLMNR {
            return Ok(EthernetAddress::LLMNR_MULTICAST);
        }
        if local.is_assigned() && target == local.subnet_broadcast() {
            return Ok(EthernetAddress::BROADCAST);
        }

        let next_hop = local.next_hop(target).ok_or(Error::Unreachable)?;
        if let Some(hardware_addr) = self.cache.lookup(next_hop) {
            return Ok(hardware_addr);
        }

        net_debug!("arp: resolving {}", next_hop);
        for _ in 0..self.requests {
            self.request(link, local, next_hop)?;
            if let Some(hardware_addr) = self.wait(link, local, next_hop) {
                return Ok(hardware_addr);
            }
        }

        net_debug!("arp: {} unreachable", next_hop);
        Err(Error::Unreachable)
    }

    /// Process an ARP packet received by the engine.
    pub fn receive<L: Link>(&mut self, link: &mut L, local: &Addresses, packet: &[u8]) -> Result<()> {
        let repr = ArpRepr::parse(arp_packet::new_checked(packet)?)?;
        self.process(link, local, &repr)
    }

    fn process<L: Link>(&mut self, link: &mut L, local: &Addresses, repr: &ArpRepr) -> Result<()> {
        net_trace!("arp: {}", repr);
        if repr.source_hardware_addr == local.hardware_addr {
            return Ok(());
        }

        if local.is_assigned() && repr.source_protocol_addr == local.ip_addr {
            net_debug!("arp: address conflict with {}", repr.source_hardware_addr);
            self.conflict = true;
            return Ok(());
        }

        match repr.operation {
            ArpOperation::Request if local.is_assigned()
                && repr.target_protocol_addr == local.ip_addr =>
            {
                self.cache.learn(repr.source_protocol_addr, repr.source_hardware_addr);
                let answer = repr.answer(local.hardware_addr);
                send(link, repr.source_hardware_addr, &answer)
            }
            ArpOperation::Reply => {
                self.cache.learn(repr.source_protocol_addr, repr.source_hardware_addr);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn request<L: Link>(&mut self, link: &mut L, local: &Addresses, target: Ipv4Address) -> Result<()> {
        let request = ArpRepr::request(local.hardware_addr, local.ip_addr, target);
        send(link, EthernetAddress::BROADCAST, &request)
    }

    /// Poll the link until `target` is known or the wait for one request is over.
    fn wait<L: Link>(
        &mut self,
        link: &mut L,
        local: &Addresses,
        target: Ipv4Address,
    ) -> Option<EthernetAddress> {
        match self.clock {
            Some(clock) => {
                let start = clock.ticks();
                let second = u64::from(clock.ticks_per_second());
                while clock.ticks().wrapping_sub(start) < second {
                    self.poll(link, local);
                    if let Some(hardware_addr) = self.cache.lookup(target) {
                        return Some(hardware_addr);
                    }
                }
            }
            None => for _ in 0..self.polls {
                self.poll(link, local);
                if let Some(hardware_addr) = self.cache.lookup(target) {
                    return Some(hardware_addr);
                }
            },
        }
        None
    }

    /// Receive one frame into a scratch buffer, handle it if it is ARP, and discard it.
    fn poll<L: Link>(&mut self, link: &mut L, local: &Addresses) {
        let mut scratch = [0u8; FRAME_LEN];
        let header = match link.receive_header(&mut scratch) {
            Some(header) => header,
            None => return,
        };
        let resident = &scratch[..header.length.min(FRAME_LEN)];

        let result = ethernet_frame::new_checked(resident)
            .and_then(EthernetRepr::parse)
            .map_err(Error::from)
            .and_then(|eth| match eth.ethertype {
                EtherType::Arp => self.receive(link, local, &resident[ETHERNET_HEADER_LEN..]),
                _ => {
                    net_trace!("arp: discarding {} while resolving", eth);
                    Ok(())
                }
            });
        if let Err(err) = result {
            net_trace!("arp: dropped frame while resolving: {:?}", err);
        }
        link.done();
    }
}

fn send<L: Link>(link: &mut L, dst_addr: EthernetAddress, repr: &ArpRepr) -> Result<()> {
    let mut frame = [0u8; FRAME_LEN];
    let eth = EthernetRepr {
        src_addr: repr.source_hardware_addr,
        dst_addr,
        ethertype: EtherType::Arp,
    };
    eth.emit(ethernet_frame::new_unchecked_mut(&mut frame[..]));
    repr.emit(arp_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]));
    link.transmit(&frame, FRAME_LEN, Checksums::NONE, None)
}
