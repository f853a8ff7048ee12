//! The IPv4 layer.
//!
//! Owns the interface addresses and the address resolution state. Inbound, it validates headers
//! and classifies destinations so that the engine can decide which datagrams concern us. Outbound,
//! it writes the Ethernet and IPv4 headers of every datagram and hands the frame to the link.

use crate::nic::{Appended, Checksums, Link};
use crate::wire::{ethernet_frame, EthernetAddress, EthernetRepr, EtherType};
use crate::wire::{ipv4_packet, IpProtocol, Ipv4Address, Ipv4Repr};
use crate::wire::{Checksum, ETHERNET_HEADER_LEN, IPV4_HEADER_LEN};
use crate::wire::Error as WireError;

use super::arp;
use super::Result;

/// The length of the Ethernet and IPv4 headers in front of each transport header.
pub const HEADERS_LEN: usize = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN;

/// The addresses of our interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addresses {
    pub hardware_addr: EthernetAddress,
    /// Our address, unspecified while none is assigned.
    pub ip_addr: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Ipv4Address,
}

/// How a datagram's destination relates to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Our own address.
    Unicast,
    /// The directed broadcast address of our subnet.
    SubnetBroadcast,
    /// 255.255.255.255
    LimitedBroadcast,
    /// The mDNS responder group.
    Mdns,
    /// The LLMNR responder group.
    Llmnr,
    NotOurs,
}

impl Addresses {
    /// Whether an address has been assigned to the interface.
    pub fn is_assigned(&self) -> bool {
        !self.ip_addr.is_unspecified()
    }

    pub fn on_subnet(&self, addr: Ipv4Address) -> bool {
        self.is_assigned() && self.ip_addr.same_subnet(addr, self.netmask)
    }

    pub fn subnet_broadcast(&self) -> Ipv4Address {
        self.ip_addr.subnet_broadcast(self.netmask)
    }

    /// The address to resolve for reaching `dst_addr`.
    ///
    /// Without an assigned address every destination is assumed to be on the link.
    pub fn next_hop(&self, dst_addr: Ipv4Address) -> Option<Ipv4Address> {
        if !self.is_assigned() || self.on_subnet(dst_addr) {
            Some(dst_addr)
        } else if self.gateway.is_unspecified() {
            None
        } else {
            Some(self.gateway)
        }
    }

    /// Classify the destination address of a received datagram.
    pub fn classify(&self, dst_addr: Ipv4Address) -> Destination {
        if dst_addr.is_broadcast() {
            Destination::LimitedBroadcast
        } else if dst_addr == Ipv4Address::MDNS {
            Destination::Mdns
        } else if dst_addr == Ipv4Address::LLMNR {
            Destination::Llmnr
        } else if !self.is_assigned() {
            Destination::NotOurs
        } else if dst_addr == self.ip_addr {
            Destination::Unicast
        } else if dst_addr == self.subnet_broadcast() {
            Destination::SubnetBroadcast
        } else {
            Destination::NotOurs
        }
    }

    /// Whether a frame sent to `dst_addr` reaches us.
    pub fn accepts_frame(&self, dst_addr: EthernetAddress) -> bool {
        dst_addr == self.hardware_addr
            || dst_addr.is_broadcast()
            || dst_addr == EthernetAddress::MDNS_MULTICAST
            || dst_addr == EthernetAddress::LLMNR_MULTICAST
    }
}

/// The IPv4 state of the interface.
#[derive(Debug, Clone)]
pub struct Endpoint {
    addresses: Addresses,
    arp: arp::Endpoint,
    ident: u16,
    hop_limit: u8,
}

impl Endpoint {
    pub fn new(addresses: Addresses, arp: arp::Endpoint, hop_limit: u8) -> Self {
        Endpoint {
            addresses,
            arp,
            ident: 0,
            hop_limit,
        }
    }

    pub fn addresses(&self) -> &Addresses {
        &self.addresses
    }

    /// Change our network address, netmask and gateway.
    pub fn set_addresses(&mut self, ip_addr: Ipv4Address, netmask: Ipv4Address, gateway: Ipv4Address) {
        net_debug!("ip: address {} mask {} gateway {}", ip_addr, netmask, gateway);
        self.addresses.ip_addr = ip_addr;
        self.addresses.netmask = netmask;
        self.addresses.gateway = gateway;
        self.arp.clear_conflict();
    }

    /// The TTL of our datagrams.
    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    pub fn arp(&self) -> &arp::Endpoint {
        &self.arp
    }

    pub fn arp_mut(&mut self) -> &mut arp::Endpoint {
        &mut self.arp
    }

    /// Handle an ARP packet.
    pub fn receive_arp<L: Link>(&mut self, link: &mut L, packet: &[u8]) -> Result<()> {
        let Endpoint { addresses, arp, .. } = self;
        arp.receive(link, addresses, packet)
    }

    /// Resolve the link address for `dst_addr`.
    pub fn resolve<L: Link>(&mut self, link: &mut L, dst_addr: Ipv4Address) -> Result<EthernetAddress> {
        let Endpoint { addresses, arp, .. } = self;
        arp.resolve(link, addresses, dst_addr)
    }

    /// Validate a received datagram and classify its destination.
    ///
    /// The link must have validated the header checksum. The header is always resident so it is
    /// verified once more.
    pub fn verify_and_classify(
        &self,
        packet: &[u8],
        checksums: Checksums,
    ) -> core::result::Result<(Ipv4Repr, Destination), WireError> {
        if !checksums.contains(Checksums::IPV4) {
            return Err(WireError::WrongChecksum);
        }
        let repr = Ipv4Repr::parse(ipv4_packet::new_checked(packet)?, Checksum::Manual)?;
        match repr.protocol {
            IpProtocol::Icmp | IpProtocol::Udp | IpProtocol::Tcp => (),
            IpProtocol::Unknown(_) => return Err(WireError::Unrecognized),
        }
        Ok((repr, self.addresses.classify(repr.dst_addr)))
    }

    /// Remember the link address of an accepted datagram's sender.
    ///
    /// Only neighbors on our subnet are learned, anything else arrived through the gateway.
    pub fn learn_source(&mut self, src_addr: Ipv4Address, hardware_addr: EthernetAddress) {
        if self.addresses.on_subnet(src_addr) && hardware_addr.is_unicast() {
            self.arp.cache_mut().learn(src_addr, hardware_addr);
        }
    }

    /// Write the IPv4 header of an outbound datagram into `frame`.
    ///
    /// The frame must have room for the Ethernet header in front. The header checksum is left for
    /// `launch`.
    pub fn build_header(
        &mut self,
        frame: &mut [u8],
        payload_len: usize,
        dst_addr: Ipv4Address,
        protocol: IpProtocol,
    ) -> Ipv4Repr {
        let repr = Ipv4Repr {
            src_addr: self.addresses.ip_addr,
            dst_addr,
            protocol,
            payload_len,
            hop_limit: self.hop_limit,
        };
        self.ident = self.ident.wrapping_add(1);
        let packet = ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..HEADERS_LEN]);
        repr.emit(packet, self.ident, Checksum::Ignored);
        repr
    }

    /// Address and transmit a frame prepared with `build_header`.
    ///
    /// `frame` holds the headers, `length` is the length of the complete frame. The link adds the
    /// appended payload and fills in the requested transport checksums.
    pub fn launch<L: Link>(
        &mut self,
        link: &mut L,
        frame: &mut [u8],
        length: usize,
        checksums: Checksums,
        appended: Option<Appended<'_>>,
    ) -> Result<()> {
        let dst_addr = ipv4_packet::new_unchecked(&frame[ETHERNET_HEADER_LEN..]).dst_addr();
        let hardware_addr = self.resolve(link, dst_addr)?;
        let eth = EthernetRepr {
            src_addr: self.addresses.hardware_addr,
            dst_addr: hardware_addr,
            ethertype: EtherType::Ipv4,
        };
        eth.emit(ethernet_frame::new_unchecked_mut(frame));
        ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]).fill_checksum();
        link.transmit(frame, length, checksums, appended)
    }
}
