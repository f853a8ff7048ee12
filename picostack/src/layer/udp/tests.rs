use crate::layer::fixtures::*;
use crate::layer::tcp::Role;
use crate::layer::{Error, Handler};
use crate::nic::Loopback;
use crate::wire::{udp_packet, FnSource, Ipv4Address, UdpRepr, Checksum};
use crate::wire::{IPV4_HEADER_LEN, ETHERNET_HEADER_LEN, UDP_HEADER_LEN};

use super::{Binding, Datagram, Endpoint, BINDINGS, EPHEMERAL_START, MAX_PAYLOAD};

struct Received {
    binding: Binding,
    src_addr: Ipv4Address,
    src_port: u16,
    dhcp: bool,
    resident: usize,
    data: Vec<u8>,
}

#[derive(Default)]
struct Collect {
    received: Vec<Received>,
}

impl Handler for Collect {
    fn udp(&mut self, binding: Binding, mut datagram: Datagram<'_>) {
        let mut data = vec![0; datagram.payload.len()];
        let read = datagram.payload.read_at(0, &mut data);
        assert_eq!(read, data.len());
        self.received.push(Received {
            binding,
            src_addr: datagram.src_addr,
            src_port: datagram.src_port,
            dhcp: datagram.dhcp,
            resident: datagram.payload.resident().len(),
            data,
        });
    }
}

#[test]
fn binding_table() {
    let mut udp = Endpoint::new();
    let dns = udp.register(0xc100, Some(53)).unwrap();
    assert_eq!(udp.register(0xc100, Some(53)), Err(Error::Illegal));
    // Same port, other remote is a different binding.
    let any = udp.register(0xc100, None).unwrap();
    udp.register(68, Some(67)).unwrap();
    udp.register(123, None).unwrap();
    assert_eq!(udp.register(124, None), Err(Error::Exhausted));

    assert_eq!(udp.local_port(dns), Some(0xc100));
    assert_eq!(udp.lookup(0xc100, 53), Some(dns));
    assert_eq!(udp.lookup(0xc100, 54), Some(any));
    assert_eq!(udp.lookup(0xc101, 53), None);

    udp.unregister(dns).unwrap();
    assert_eq!(udp.unregister(dns), Err(Error::Illegal));
    assert_eq!(udp.local_port(dns), None);
    assert_eq!(udp.lookup(0xc100, 53), Some(any));
    assert!(udp.register(124, None).is_ok());
    assert_eq!(BINDINGS, 4);
}

#[test]
fn ephemeral_ports() {
    let mut udp = Endpoint::new();
    assert_eq!(udp.new_port(|_| false), EPHEMERAL_START);
    udp.register(EPHEMERAL_START + 1, None).unwrap();
    assert_eq!(udp.new_port(|port| port == EPHEMERAL_START + 2), EPHEMERAL_START + 3);
}

#[test]
fn ephemeral_ports_skip_connections() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);

    engine.tcp_connect(&mut link, Role::Client, EPHEMERAL_START, 80, PEER_IP).unwrap();
    assert_eq!(engine.new_port(), EPHEMERAL_START + 1);
}

#[test]
fn dispatch() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);
    let binding = engine.udp_register(5000, None).unwrap();
    let mut handler = Collect::default();

    link.push_inbound(udp_frame(OUR_IP, 1234, 5000, b"payload"));
    link.push_inbound(udp_frame(OUR_IP, 1234, 5001, b"unbound"));
    engine.poll(&mut link, &mut handler);
    engine.poll(&mut link, &mut handler);

    assert_eq!(handler.received.len(), 1);
    let received = &handler.received[0];
    assert_eq!(received.binding, binding);
    assert_eq!(received.src_addr, PEER_IP);
    assert_eq!(received.src_port, 1234);
    assert!(!received.dhcp);
    assert_eq!(received.data, b"payload");
    assert_eq!(engine.stats().udp, 1);
    assert_eq!(engine.stats().unhandled, 1);
}

#[test]
fn dispatch_partially_resident() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);
    engine.udp_register(5000, None).unwrap();
    let mut handler = Collect::default();

    let payload: Vec<u8> = (0..1200u16).map(|i| (i % 251) as u8).collect();
    link.push_inbound(udp_frame(OUR_IP, 1234, 5000, &payload));
    engine.poll(&mut link, &mut handler);

    let received = &handler.received[0];
    assert_eq!(received.resident, crate::BUFFER_LEN - super::FRAME_HEADERS_LEN);
    assert_eq!(received.data, payload);
}

#[test]
fn dhcp_flag() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(crate::Config::new(OUR_MAC));
    engine.udp_register(68, Some(67)).unwrap();
    let mut handler = Collect::default();

    link.push_inbound(udp_frame(Ipv4Address::new(192, 168, 1, 77), 67, 68, b"offer"));
    engine.poll(&mut link, &mut handler);

    assert_eq!(handler.received.len(), 1);
    assert!(handler.received[0].dhcp);
}

#[test]
fn drop_bad_checksum() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);
    engine.udp_register(5000, None).unwrap();
    let mut handler = Collect::default();

    let mut frame = udp_frame(OUR_IP, 1234, 5000, b"payload");
    let last = frame.len() - 1;
    frame[last] ^= 0x5a;
    link.push_inbound(frame);
    engine.poll(&mut link, &mut handler);

    assert!(handler.received.is_empty());
    assert_eq!(engine.stats().dropped, 1);
}

#[test]
fn zero_checksum_accepted() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);
    engine.udp_register(5000, None).unwrap();
    let mut handler = Collect::default();

    let mut frame = udp_frame(OUR_IP, 1234, 5000, b"unchecked");
    let udp = &mut frame[ETHERNET_HEADER_LEN + IPV4_HEADER_LEN..];
    udp_packet::new_unchecked_mut(udp).set_checksum(0);
    link.push_inbound(frame);
    engine.poll(&mut link, &mut handler);

    assert_eq!(handler.received.len(), 1);
}

#[test]
fn send() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);

    engine.udp_send(&mut link, 0xc080, 53, PEER_IP, 5, &mut &b"query"[..]).unwrap();

    let frame = single_sent(&mut link);
    assert_eq!(frame.len(), super::FRAME_HEADERS_LEN + 5);
    let (eth, ip) = parse_ipv4(&frame);
    assert_eq!(eth.dst_addr, PEER_MAC);
    assert_eq!(ip.payload_len, UDP_HEADER_LEN + 5);

    let packet = udp_packet::new_checked(&frame[ETHERNET_HEADER_LEN + IPV4_HEADER_LEN..]).unwrap();
    assert_ne!(packet.checksum(), 0);
    assert_eq!(packet.verify_checksum(OUR_IP, PEER_IP), Ok(true));
    let repr = UdpRepr::parse(packet, &ip, Checksum::Manual).unwrap();
    assert_eq!(repr, UdpRepr { src_port: 0xc080, dst_port: 53, payload_len: 5 });
    assert_eq!(packet.payload_slice(), b"query");
}

#[test]
fn send_generated() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);

    let mut counter = FnSource(|offset: usize, out: &mut [u8]| {
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = (offset + i) as u8;
        }
        300
    });
    engine.udp_send(&mut link, 0xc080, 9, PEER_IP, 300, &mut counter).unwrap();

    let frame = single_sent(&mut link);
    let payload = &frame[super::FRAME_HEADERS_LEN..];
    assert_eq!(payload.len(), 300);
    assert!(payload.iter().enumerate().all(|(i, &byte)| byte == i as u8));
}

#[test]
fn send_bad_size() {
    let mut link = Loopback::new();
    let mut engine = engine_with_peer(&mut link);

    let short = engine.udp_send(&mut link, 0xc080, 53, PEER_IP, 6, &mut &b"query"[..]);
    assert_eq!(short, Err(Error::BadSize));

    let large = vec![0u8; MAX_PAYLOAD + 1];
    let result = engine.udp_send(&mut link, 0xc080, 53, PEER_IP, large.len(), &mut &large[..]);
    assert_eq!(result, Err(Error::BadSize));
    assert!(link.sent().is_empty());

    engine.udp_send(&mut link, 0xc080, 53, PEER_IP, MAX_PAYLOAD, &mut &large[..]).unwrap();
    assert_eq!(single_sent(&mut link).len(), 1514);
}
