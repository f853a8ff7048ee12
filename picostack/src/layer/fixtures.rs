//! Frames and engines shared by the layer tests.
use alloc::vec::Vec;

use crate::config::Config;
use crate::engine::Engine;
use crate::nic::Loopback;
use crate::wire::{arp_packet, ArpOperation, ArpRepr, Checksum, ethernet_frame};
use crate::wire::{EthernetAddress, EthernetRepr, EtherType, icmpv4_packet, ipv4_packet};
use crate::wire::{IpProtocol, Ipv4Address, Ipv4Repr, tcp_packet, TcpRepr, udp_packet, UdpRepr};
use crate::wire::{ARP_PACKET_LEN, ETHERNET_HEADER_LEN, IPV4_HEADER_LEN, UDP_HEADER_LEN};

pub const OUR_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const OUR_IP: Ipv4Address = Ipv4Address::new(192, 168, 1, 10);
pub const PEER_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
pub const PEER_IP: Ipv4Address = Ipv4Address::new(192, 168, 1, 20);
pub const GATEWAY_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0xfe]);
pub const GATEWAY_IP: Ipv4Address = Ipv4Address::new(192, 168, 1, 1);

pub fn config() -> Config {
    Config {
        ip_addr: OUR_IP,
        gateway: GATEWAY_IP,
        ..Config::new(OUR_MAC)
    }
}

/// An engine that already knows the peer's link address.
pub fn engine_with_peer(link: &mut Loopback) -> Engine {
    let mut engine = Engine::new(config());
    let reply = ArpRepr {
        operation: ArpOperation::Reply,
        source_hardware_addr: PEER_MAC,
        source_protocol_addr: PEER_IP,
        target_hardware_addr: OUR_MAC,
        target_protocol_addr: OUR_IP,
    };
    link.push_inbound(arp_frame(&reply, OUR_MAC));
    assert!(engine.poll(link, &mut ()));
    assert_eq!(engine.ip().arp().cache().lookup(PEER_IP), Some(PEER_MAC));
    engine
}

pub fn arp_frame(repr: &ArpRepr, dst_addr: EthernetAddress) -> Vec<u8> {
    let mut frame = vec![0; ETHERNET_HEADER_LEN + ARP_PACKET_LEN];
    EthernetRepr {
        src_addr: repr.source_hardware_addr,
        dst_addr,
        ethertype: EtherType::Arp,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    repr.emit(arp_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]));
    frame
}

/// A datagram from the peer to `dst_addr`, with a valid header checksum.
pub fn ipv4_frame(dst_addr: Ipv4Address, protocol: IpProtocol, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0; ETHERNET_HEADER_LEN + IPV4_HEADER_LEN];
    EthernetRepr {
        src_addr: PEER_MAC,
        dst_addr: OUR_MAC,
        ethertype: EtherType::Ipv4,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    let repr = Ipv4Repr {
        src_addr: PEER_IP,
        dst_addr,
        protocol,
        payload_len: payload.len(),
        hop_limit: 64,
    };
    repr.emit(ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]), 1, Checksum::Manual);
    frame.extend_from_slice(payload);
    frame
}

pub fn echo_request(ident: u16, seq_no: u16, data: &[u8]) -> Vec<u8> {
    let mut icmp = vec![0x08, 0x00, 0, 0];
    icmp.extend_from_slice(&ident.to_be_bytes());
    icmp.extend_from_slice(&seq_no.to_be_bytes());
    icmp.extend_from_slice(data);
    icmpv4_packet::new_unchecked_mut(&mut icmp).fill_checksum();
    ipv4_frame(OUR_IP, IpProtocol::Icmp, &icmp)
}

pub fn udp_frame(dst_addr: Ipv4Address, src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut udp = vec![0; UDP_HEADER_LEN];
    let repr = UdpRepr { src_port, dst_port, payload_len: payload.len() };
    repr.emit(udp_packet::new_unchecked_mut(&mut udp));
    udp.extend_from_slice(payload);
    udp_packet::new_unchecked_mut(&mut udp).fill_checksum(PEER_IP, dst_addr);
    ipv4_frame(dst_addr, IpProtocol::Udp, &udp)
}

pub fn tcp_frame(repr: &TcpRepr, payload: &[u8]) -> Vec<u8> {
    let repr = TcpRepr { payload_len: payload.len(), ..*repr };
    let mut tcp = vec![0; repr.header_len()];
    repr.emit(tcp_packet::new_unchecked_mut(&mut tcp));
    tcp.extend_from_slice(payload);
    tcp_packet::new_unchecked_mut(&mut tcp).fill_checksum(PEER_IP, OUR_IP);
    ipv4_frame(OUR_IP, IpProtocol::Tcp, &tcp)
}

/// The headers of a sent frame.
pub fn parse_ipv4(frame: &[u8]) -> (EthernetRepr, Ipv4Repr) {
    let eth = EthernetRepr::parse(ethernet_frame::new_checked(frame).unwrap()).unwrap();
    let packet = ipv4_packet::new_checked(&frame[ETHERNET_HEADER_LEN..]).unwrap();
    let ip = Ipv4Repr::parse(packet, Checksum::Manual).unwrap();
    (eth, ip)
}

/// The TCP header of a sent segment and its payload, with checksums verified.
pub fn parse_tcp(frame: &[u8]) -> (TcpRepr, Vec<u8>) {
    let (_, ip) = parse_ipv4(frame);
    assert_eq!(ip.protocol, IpProtocol::Tcp);
    let segment = &frame[ETHERNET_HEADER_LEN + IPV4_HEADER_LEN..];
    let packet = tcp_packet::new_checked(segment).unwrap();
    let repr = TcpRepr::parse(packet, &ip, Checksum::Manual).unwrap();
    (repr, packet.payload_slice().to_vec())
}

/// Take the only frame sent since the last call.
pub fn single_sent(link: &mut Loopback) -> Vec<u8> {
    let mut sent = link.take_sent();
    assert_eq!(sent.len(), 1, "expected exactly one frame");
    sent.remove(0)
}
