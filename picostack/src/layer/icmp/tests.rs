use crate::layer::fixtures::*;
use crate::nic::Loopback;
use crate::wire::{icmpv4_packet, Icmpv4Message, ipv4_packet, Ipv4Address};
use crate::wire::{ETHERNET_HEADER_LEN, ICMPV4_HEADER_LEN, IPV4_HEADER_LEN};
use crate::BUFFER_LEN;

const ICMP_START: usize = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN;

#[test]
fn echo() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    link.push_inbound(echo_request(0x1234, 7, b"hello"));
    assert!(engine.poll(&mut link, &mut ()));
    assert_eq!(engine.stats().icmp, 1);

    let reply = single_sent(&mut link);
    assert_eq!(reply.len(), ICMP_START + ICMPV4_HEADER_LEN + 5);
    let (eth, ip) = parse_ipv4(&reply);
    assert_eq!(eth.src_addr, OUR_MAC);
    assert_eq!(eth.dst_addr, PEER_MAC);
    assert_eq!(ip.src_addr, OUR_IP);
    assert_eq!(ip.dst_addr, PEER_IP);

    let icmp = icmpv4_packet::new_checked(&reply[ICMP_START..]).unwrap();
    assert_eq!(icmp.msg_type(), Icmpv4Message::EchoReply);
    assert_eq!(icmp.echo_ident(), 0x1234);
    assert_eq!(icmp.echo_seq_no(), 7);
    assert_eq!(icmp.data(), b"hello");
    assert!(icmp.verify_checksum());
}

#[test]
fn truncated_to_buffer() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    let data: Vec<u8> = (0..1000u16).map(|i| i as u8).collect();
    link.push_inbound(echo_request(1, 1, &data));
    engine.poll(&mut link, &mut ());

    let reply = single_sent(&mut link);
    assert_eq!(reply.len(), BUFFER_LEN);
    let ip = ipv4_packet::new_checked(&reply[ETHERNET_HEADER_LEN..]).unwrap();
    assert_eq!(usize::from(ip.total_len()), BUFFER_LEN - ETHERNET_HEADER_LEN);
    assert!(ip.verify_checksum());

    let icmp = icmpv4_packet::new_checked(&reply[ICMP_START..]).unwrap();
    assert!(icmp.verify_checksum());
    let echoed = BUFFER_LEN - ICMP_START - ICMPV4_HEADER_LEN;
    assert_eq!(icmp.data(), &data[..echoed]);
}

#[test]
fn ignore_broadcast_echo() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    let mut frame = echo_request(1, 1, b"anyone");
    let packet = ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]);
    packet.set_dst_addr(Ipv4Address::BROADCAST);
    packet.fill_checksum();
    link.push_inbound(frame);

    engine.poll(&mut link, &mut ());
    assert!(link.sent().is_empty());
    assert_eq!(engine.stats().unhandled, 1);
}

#[test]
fn ignore_echo_reply() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    let mut frame = echo_request(1, 1, b"pong");
    let icmp = icmpv4_packet::new_unchecked_mut(&mut frame[ICMP_START..]);
    icmp.set_msg_type(Icmpv4Message::EchoReply);
    icmp.fill_checksum();
    link.push_inbound(frame);

    engine.poll(&mut link, &mut ());
    assert!(link.sent().is_empty());
}

#[test]
fn drop_bad_checksum() {
    let mut link = Loopback::new();
    let mut engine = crate::Engine::new(config());

    let mut frame = echo_request(1, 1, b"ping");
    let last = frame.len() - 1;
    frame[last] ^= 0xff;
    link.push_inbound(frame);

    engine.poll(&mut link, &mut ());
    assert!(link.sent().is_empty());
    assert_eq!(engine.stats().dropped, 1);
}
