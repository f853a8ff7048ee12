use crate::layer::fixtures::*;
use crate::layer::ip::Addresses;
use crate::layer::{Error, Result};
use crate::nic::{Appended, Checksums, Header, Link, Loopback, Stream};
use crate::time::Clock;
use crate::wire::{arp_packet, ArpOperation, ArpRepr, EthernetAddress, EthernetRepr, ethernet_frame};
use crate::wire::{EtherType, IpProtocol, Ipv4Address, ETHERNET_HEADER_LEN};

use super::{Cache, Endpoint};

const NETMASK: Ipv4Address = Ipv4Address::new(255, 255, 255, 0);

fn local() -> Addresses {
    Addresses {
        hardware_addr: OUR_MAC,
        ip_addr: OUR_IP,
        netmask: NETMASK,
        gateway: GATEWAY_IP,
    }
}

/// A link that stays silent for some polls before handing out its frames.
///
/// Each silent poll takes one timer tick.
struct Delayed {
    inner: Loopback,
    silent: usize,
    clock: &'static Clock,
}

impl Stream for Delayed {
    fn seek(&mut self, offset: usize) {
        self.inner.seek(offset)
    }

    fn next_byte(&mut self) -> Option<u8> {
        self.inner.next_byte()
    }
}

impl Link for Delayed {
    fn receive_header(&mut self, buf: &mut [u8]) -> Option<Header> {
        if self.silent > 0 {
            self.silent -= 1;
            self.clock.interrupt();
            return None;
        }
        self.inner.receive_header(buf)
    }

    fn done(&mut self) {
        self.inner.done()
    }

    fn transmit(
        &mut self,
        frame: &[u8],
        length: usize,
        checksums: Checksums,
        appended: Option<Appended<'_>>,
    ) -> Result<()> {
        self.inner.transmit(frame, length, checksums, appended)
    }

    fn packets_available(&self) -> usize {
        if self.silent > 0 { 0 } else { self.inner.packets_available() }
    }
}

fn parse_arp(frame: &[u8]) -> (EthernetRepr, ArpRepr) {
    let eth = EthernetRepr::parse(ethernet_frame::new_checked(frame).unwrap()).unwrap();
    assert_eq!(eth.ethertype, EtherType::Arp);
    let arp = ArpRepr::parse(arp_packet::new_checked(&frame[ETHERNET_HEADER_LEN..]).unwrap()).unwrap();
    (eth, arp)
}

fn reply_from(hardware_addr: EthernetAddress, protocol_addr: Ipv4Address) -> Vec<u8> {
    let reply = ArpRepr {
        operation: ArpOperation::Reply,
        source_hardware_addr: hardware_addr,
        source_protocol_addr: protocol_addr,
        target_hardware_addr: OUR_MAC,
        target_protocol_addr: OUR_IP,
    };
    arp_frame(&reply, OUR_MAC)
}

#[test]
fn cache_refresh_and_evict() {
    let first = Ipv4Address::new(10, 0, 0, 1);
    let second = Ipv4Address::new(10, 0, 0, 2);
    let third = Ipv4Address::new(10, 0, 0, 3);
    let fourth = Ipv4Address::new(10, 0, 0, 4);
    let mut cache = Cache::new(10);

    assert!(cache.learn(first, PEER_MAC));
    cache.tick();
    assert!(cache.learn(second, PEER_MAC));
    cache.tick();
    assert!(cache.learn(third, PEER_MAC));
    assert_eq!(cache.len(), 3);

    // Refreshing keeps the entry and restores its lifetime.
    assert!(cache.learn(first, GATEWAY_MAC));
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.entry(first).unwrap().ticks, 10);
    assert_eq!(cache.lookup(first), Some(GATEWAY_MAC));

    // Now `second` is closest to expiry.
    assert!(cache.learn(fourth, PEER_MAC));
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.lookup(second), None);
    assert!(cache.lookup(first).is_some());
    assert!(cache.lookup(third).is_some());
    assert!(cache.lookup(fourth).is_some());
}

#[test]
fn cache_expiry() {
    let mut cache = Cache::new(2);
    assert!(!cache.learn(Ipv4Address::UNSPECIFIED, PEER_MAC));
    assert!(!cache.learn(Ipv4Address::BROADCAST, PEER_MAC));
    assert!(cache.is_empty());

    cache.learn(PEER_IP, PEER_MAC);
    cache.tick();
    assert_eq!(cache.lookup(PEER_IP), Some(PEER_MAC));
    cache.tick();
    assert_eq!(cache.lookup(PEER_IP), None);
    assert!(cache.is_empty());
}

#[test]
fn fixed_mappings() {
    let mut link = Loopback::new();
    let mut arp = Endpoint::new(120, 3, 4);
    let local = local();

    let cases = [
        (Ipv4Address::BROADCAST, EthernetAddress::BROADCAST),
        (Ipv4Address::UNSPECIFIED, EthernetAddress::BROADCAST),
        (Ipv4Address::new(192, 168, 1, 255), EthernetAddress::BROADCAST),
        (Ipv4Address::MDNS, EthernetAddress::MDNS_MULTICAST),
        (Ipv4Address::LLMNR, EthernetAddress::LLMNR_MULTICAST),
    ];
    for &(addr, expected) in cases.iter() {
        assert_eq!(arp.resolve(&mut link, &local, addr), Ok(expected));
    }
    assert!(link.sent().is_empty());
}

#[test]
fn bounded_resolution() {
    let mut link = Loopback::new();
    let mut arp = Endpoint::new(120, 3, 4);
    let local = local();

    assert_eq!(arp.resolve(&mut link, &local, PEER_IP), Err(Error::Unreachable));

    let sent = link.take_sent();
    assert_eq!(sent.len(), 3);
    for frame in sent.iter() {
        let (eth, request) = parse_arp(frame);
        assert_eq!(eth.dst_addr, EthernetAddress::BROADCAST);
        assert_eq!(request, ArpRepr::request(OUR_MAC, OUR_IP, PEER_IP));
    }
}

#[test]
fn wait_for_late_reply() {
    static CLOCK: Clock = Clock::new(100);
    let mut link = Delayed { inner: Loopback::new(), silent: 200, clock: &CLOCK };
    link.inner.push_inbound(reply_from(PEER_MAC, PEER_IP));
    let mut arp = Endpoint::new(120, 3, 64);
    arp.attach_clock(&CLOCK);

    assert_eq!(arp.resolve(&mut link, &local(), PEER_IP), Ok(PEER_MAC));
    // One request per silent second, the third one is answered.
    assert_eq!(link.inner.take_sent().len(), 3);
    assert_eq!(CLOCK.seconds(), 2);
}

#[test]
fn give_up_after_silent_seconds() {
    static CLOCK: Clock = Clock::new(10);
    let mut link = Delayed { inner: Loopback::new(), silent: usize::max_value(), clock: &CLOCK };
    // The poll count no longer matters with a clock.
    let mut arp = Endpoint::new(120, 3, 1);
    arp.attach_clock(&CLOCK);

    assert_eq!(arp.resolve(&mut link, &local(), PEER_IP), Err(Error::Unreachable));
    assert_eq!(link.inner.take_sent().len(), 3);
    assert_eq!(CLOCK.seconds(), 3);
}

#[test]
fn send_waits_for_resolution() {
    static CLOCK: Clock = Clock::new(100);
    let mut link = Delayed { inner: Loopback::new(), silent: 150, clock: &CLOCK };
    link.inner.push_inbound(reply_from(PEER_MAC, PEER_IP));
    let mut engine = crate::Engine::new(config());
    engine.attach_clock(&CLOCK);

    engine.udp_send(&mut link, 0xc080, 53, PEER_IP, 5, &mut &b"query"[..]).unwrap();

    let sent = link.inner.take_sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(parse_arp(&sent[0]).1, ArpRepr::request(OUR_MAC, OUR_IP, PEER_IP));
    assert_eq!(parse_arp(&sent[1]).1, ArpRepr::request(OUR_MAC, OUR_IP, PEER_IP));
    let (eth, ip) = parse_ipv4(&sent[2]);
    assert_eq!(eth.dst_addr, PEER_MAC);
    assert_eq!(ip.dst_addr, PEER_IP);
}

#[test]
fn resolution_skips_other_frames() {
    let mut link = Loopback::new();
    let mut arp = Endpoint::new(120, 3, 4);
    let local = local();

    link.push_inbound(udp_frame(OUR_IP, 1234, 5678, b"not the answer"));
    link.push_inbound(reply_from(PEER_MAC, PEER_IP));

    assert_eq!(arp.resolve(&mut link, &local, PEER_IP), Ok(PEER_MAC));
    assert_eq!(link.packets_available(), 0);
    assert_eq!(link.take_sent().len(), 1);

    // Known now, no more requests.
    assert_eq!(arp.resolve(&mut link, &local, PEER_IP), Ok(PEER_MAC));
    assert!(link.sent().is_empty());
}

#[test]
fn off_subnet_through_gateway() {
    let mut link = Loopback::new();
    let mut arp = Endpoint::new(120, 1, 1);
    let remote = Ipv4Address::new(8, 8, 8, 8);

    arp.cache_mut().learn(GATEWAY_IP, GATEWAY_MAC);
    assert_eq!(arp.resolve(&mut link, &local(), remote), Ok(GATEWAY_MAC));

    let no_gateway = Addresses { gateway: Ipv4Address::UNSPECIFIED, ..local() };
    assert_eq!(arp.resolve(&mut link, &no_gateway, remote), Err(Error::Unreachable));
    assert!(link.sent().is_empty());
}

#[test]
fn answer_request() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    let request = ArpRepr::request(PEER_MAC, PEER_IP, OUR_IP);
    link.push_inbound(arp_frame(&request, EthernetAddress::BROADCAST));
    assert!(engine.poll(&mut link, &mut ()));
    assert_eq!(engine.stats().arp, 1);

    let (eth, reply) = parse_arp(&single_sent(&mut link));
    assert_eq!(eth.dst_addr, PEER_MAC);
    assert_eq!(eth.src_addr, OUR_MAC);
    assert_eq!(reply.operation, ArpOperation::Reply);
    assert_eq!(reply.source_hardware_addr, OUR_MAC);
    assert_eq!(reply.source_protocol_addr, OUR_IP);
    assert_eq!(reply.target_hardware_addr, PEER_MAC);
    assert_eq!(reply.target_protocol_addr, PEER_IP);

    assert_eq!(engine.ip().arp().cache().lookup(PEER_IP), Some(PEER_MAC));
}

#[test]
fn ignore_request_for_others() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    let request = ArpRepr::request(PEER_MAC, PEER_IP, Ipv4Address::new(192, 168, 1, 99));
    link.push_inbound(arp_frame(&request, EthernetAddress::BROADCAST));
    assert!(engine.poll(&mut link, &mut ()));
    assert!(link.sent().is_empty());
}

#[test]
fn address_conflict() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());
    assert!(!engine.address_conflict());

    link.push_inbound(reply_from(PEER_MAC, OUR_IP));
    engine.poll(&mut link, &mut ());
    assert!(engine.address_conflict());
    assert_eq!(engine.ip().arp().cache().lookup(OUR_IP), None);

    let other = Ipv4Address::new(192, 168, 1, 11);
    engine.set_address(other, NETMASK, GATEWAY_IP);
    assert!(!engine.address_conflict());
    assert_eq!(engine.ip().addresses().ip_addr, other);
}

#[test]
fn no_conflict_while_unassigned() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(crate::Config::new(OUR_MAC));

    // Probes carry the unspecified sender address.
    let probe = ArpRepr::request(PEER_MAC, Ipv4Address::UNSPECIFIED, OUR_IP);
    link.push_inbound(arp_frame(&probe, EthernetAddress::BROADCAST));
    engine.poll(&mut link, &mut ());
    assert!(!engine.address_conflict());
    assert!(link.sent().is_empty());
}

#[test]
fn learn_from_datagrams() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    link.push_inbound(ipv4_frame(OUR_IP, IpProtocol::Udp, &[0; 8]));
    engine.poll(&mut link, &mut ());
    assert_eq!(engine.ip().arp().cache().lookup(PEER_IP), Some(PEER_MAC));
}
