//! Implementation of a software link.
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::layer::{Error, Result};
use crate::wire::checksum;
use crate::wire::{ethernet_frame, EtherType, ipv4_packet, IpProtocol};
use crate::wire::{icmpv4_packet, tcp_packet, udp_packet, ETHERNET_HEADER_LEN};

use super::{Appended, Checksums, Header, Link, Stream};

/// The largest frame we assemble, an Ethernet frame without its trailer.
pub const MAX_FRAME: usize = 1514;

/// The chunk size in which appended payloads are pulled from their source.
const CHUNK: usize = 64;

/// A software link keeping frames in memory.
///
/// Inbound frames are queued with `push_inbound`, transmitted frames are recorded and can be
/// inspected with `take_sent` or fed back as inbound with `loop_back`. Checksums are treated the
/// way a streaming device would: computed while the frame passes through, never by looking at a
/// fully buffered packet twice.
#[derive(Debug, Default)]
pub struct Loopback {
    inbound: VecDeque<Vec<u8>>,
    current: Option<Vec<u8>>,
    cursor: usize,
    sent: Vec<Vec<u8>>,
}

impl Loopback {
    pub fn new() -> Self {
        Loopback::default()
    }

    /// Queue a frame for reception.
    pub fn push_inbound(&mut self, frame: Vec<u8>) {
        self.inbound.push_back(frame);
    }

    /// Remove and return all frames transmitted so far.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        core::mem::replace(&mut self.sent, Vec::new())
    }

    /// Frames transmitted so far.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Move all transmitted frames to the inbound queue.
    pub fn loop_back(&mut self) {
        let sent = self.take_sent();
        self.inbound.extend(sent);
    }
}

impl Stream for Loopback {
    fn seek(&mut self, offset: usize) {
        self.cursor = offset;
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.current.as_ref()?.get(self.cursor)?;
        self.cursor += 1;
        Some(byte)
    }
}

impl Link for Loopback {
    fn receive_header(&mut self, buf: &mut [u8]) -> Option<Header> {
        let frame = self.inbound.pop_front()?;
        let resident = frame.len().min(buf.len());
        buf[..resident].copy_from_slice(&frame[..resident]);
        let header = Header {
            length: frame.len(),
            checksums: received_checksums(&frame),
        };
        self.cursor = resident;
        self.current = Some(frame);
        Some(header)
    }

    fn done(&mut self) {
        self.current = None;
        self.cursor = 0;
    }

    fn transmit(
        &mut self,
        frame: &[u8],
        length: usize,
        checksums: Checksums,
        appended: Option<Appended<'_>>,
    ) -> Result<()> {
        if length > MAX_FRAME || frame.len() > length {
            return Err(Error::BadSize);
        }

        let mut assembled = Vec::with_capacity(length);
        assembled.extend_from_slice(frame);
        if let Some(Appended { source, offset }) = appended {
            let mut chunk = [0u8; CHUNK];
            while assembled.len() < length {
                let want = (length - assembled.len()).min(CHUNK);
                let produced = assembled.len() - frame.len();
                let total = source.produce(offset + produced, &mut chunk[..want]);
                let available = total.saturating_sub(offset + produced).min(want);
                if available == 0 {
                    return Err(Error::BadSize);
                }
                assembled.extend_from_slice(&chunk[..available]);
            }
        } else if frame.len() != length {
            return Err(Error::BadSize);
        }

        fill_checksums(&mut assembled, checksums);
        self.sent.push(assembled);
        Ok(())
    }

    fn packets_available(&self) -> usize {
        self.inbound.len()
    }
}

/// The IPv4 datagram within a frame, bounded by its total length.
fn datagram(frame: &[u8]) -> Option<&[u8]> {
    let eth = ethernet_frame::new_checked(frame).ok()?;
    if eth.ethertype() != EtherType::Ipv4 {
        return None;
    }
    let ip = ipv4_packet::new_checked(eth.payload_slice()).ok()?;
    let total = usize::from(ip.total_len());
    eth.payload_slice().get(..total)
}

fn received_checksums(frame: &[u8]) -> Checksums {
    let mut valid = Checksums::NONE;
    let datagram = match datagram(frame) {
        Some(datagram) => datagram,
        None => return valid,
    };
    let ip = ipv4_packet::new_unchecked(datagram);
    if ip.verify_checksum() {
        valid.insert(Checksums::IPV4);
    }

    let payload = ip.payload_slice();
    let (src_addr, dst_addr) = (ip.src_addr(), ip.dst_addr());
    match ip.protocol() {
        IpProtocol::Icmp => {
            if checksum::data(payload) == !0 {
                valid.insert(Checksums::ICMP);
            }
        }
        IpProtocol::Udp => {
            if let Ok(udp) = udp_packet::new_checked(payload) {
                if udp.verify_checksum(src_addr, dst_addr) == Ok(true) {
                    valid.insert(Checksums::UDP);
                    if udp.src_port() == 67 && udp.dst_port() == 68 {
                        valid.insert(Checksums::DHCP);
                    }
                }
            }
        }
        IpProtocol::Tcp => {
            // Streamed in the odd-sized pieces a device FIFO would hand out.
            let mut accum = checksum::with_pseudo_header(
                src_addr, dst_addr, IpProtocol::Tcp, payload.len() as u16);
            for piece in payload.chunks(CHUNK - 1) {
                accum.accumulate(piece);
            }
            if accum.resolve() == 0 {
                valid.insert(Checksums::TCP);
            }
        }
        IpProtocol::Unknown(_) => (),
    }

    valid
}

fn fill_checksums(frame: &mut [u8], checksums: Checksums) {
    let total = match datagram(frame) {
        Some(datagram) => datagram.len(),
        None => return,
    };
    let datagram = &mut frame[ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + total];
    let ip = ipv4_packet::new_unchecked_mut(datagram);
    let (src_addr, dst_addr, protocol) = (ip.src_addr(), ip.dst_addr(), ip.protocol());
    if checksums.contains(Checksums::IPV4) {
        ip.fill_checksum();
    }

    let payload = ip.payload_mut_slice();
    match protocol {
        IpProtocol::Icmp if checksums.contains(Checksums::ICMP) => {
            icmpv4_packet::new_unchecked_mut(payload).fill_checksum()
        }
        IpProtocol::Udp if checksums.contains(Checksums::UDP) => {
            udp_packet::new_unchecked_mut(payload).fill_checksum(src_addr, dst_addr)
        }
        IpProtocol::Tcp if checksums.contains(Checksums::TCP) => {
            tcp_packet::new_unchecked_mut(payload).set_checksum(0);
            let mut accum = checksum::with_pseudo_header(
                src_addr, dst_addr, IpProtocol::Tcp, payload.len() as u16);
            for piece in payload.chunks(CHUNK + 1) {
                accum.accumulate(piece);
            }
            tcp_packet::new_unchecked_mut(payload).set_checksum(accum.resolve());
        }
        _ => (),
    }
}
