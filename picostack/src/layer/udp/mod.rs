//! The UDP layer.
//!
//! Datagrams are dispatched to a small fixed table of bindings. A binding names a local port and
//! optionally the remote port it accepts datagrams from, e.g. DHCP (68 from 67) or DNS (a fresh
//! ephemeral port from 53).
#[cfg(test)]
mod tests;

use crate::nic::{Appended, Checksums, Link, Stream};
use crate::wire::{Checksum, DataSource, IpProtocol, Ipv4Address, Ipv4Repr};
use crate::wire::{udp_packet, UdpRepr, UDP_HEADER_LEN};

use super::ip::{self, Destination, HEADERS_LEN};
use super::{Error, Handler, Payload, Result};

/// The number of bindings.
pub const BINDINGS: usize = 4;

/// The largest payload of a datagram that fits an unfragmented Ethernet frame.
pub const MAX_PAYLOAD: usize = 1500 - 20 - UDP_HEADER_LEN;

/// The first port handed out by `new_port`.
pub const EPHEMERAL_START: u16 = 0xc080;

/// The length of the headers of an outbound datagram.
pub const FRAME_HEADERS_LEN: usize = HEADERS_LEN + UDP_HEADER_LEN;

/// A handle to a registered binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    local_port: u16,
    remote_port: Option<u16>,
}

/// A datagram delivered to a binding.
pub struct Datagram<'a> {
    pub src_addr: Ipv4Address,
    pub dst_addr: Ipv4Address,
    pub src_port: u16,
    pub dst_port: u16,
    /// How the destination address relates to us.
    pub destination: Destination,
    /// The link recognized a reply from a DHCP server.
    pub dhcp: bool,
    pub payload: Payload<'a>,
}

/// The binding table.
#[derive(Debug, Clone)]
pub struct Endpoint {
    bindings: [Option<Entry>; BINDINGS],
    next_port: u16,
}

impl Endpoint {
    pub fn new() -> Self {
        Endpoint {
            bindings: [None; BINDINGS],
            next_port: EPHEMERAL_START,
        }
    }

    /// Accept datagrams to `local_port`, from `remote_port` or from any port.
    pub fn register(&mut self, local_port: u16, remote_port: Option<u16>) -> Result<Binding> {
        let new = Entry { local_port, remote_port };
        if self.bindings.iter().flatten().any(|entry| *entry == new) {
            return Err(Error::Illegal);
        }
        let index = self.bindings.iter()
            .position(Option::is_none)
            .ok_or(Error::Exhausted)?;
        self.bindings[index] = Some(new);
        Ok(Binding(index))
    }

    /// Free a binding.
    pub fn unregister(&mut self, binding: Binding) -> Result<()> {
        match self.bindings.get_mut(binding.0) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(Error::Illegal),
        }
    }

    /// The local port of a binding.
    pub fn local_port(&self, binding: Binding) -> Option<u16> {
        self.bindings.get(binding.0)
            .copied()
            .flatten()
            .map(|entry| entry.local_port)
    }

    /// Whether a binding uses `port` as its local port.
    pub fn in_use(&self, port: u16) -> bool {
        self.bindings.iter().flatten().any(|entry| entry.local_port == port)
    }

    /// Pick a fresh ephemeral port.
    ///
    /// Ports count upwards from 0xc080 and wrap back to it, skipping those in use by a binding or
    /// by any port `also_used` reports.
    pub fn new_port(&mut self, also_used: impl Fn(u16) -> bool) -> u16 {
        loop {
            let port = self.next_port;
            self.next_port = match port.checked_add(1) {
                Some(next) => next,
                None => EPHEMERAL_START,
            };
            if !self.in_use(port) && !also_used(port) {
                return port;
            }
        }
    }

    /// Find the binding for a datagram, preferring one that names the source port.
    pub fn lookup(&self, dst_port: u16, src_port: u16) -> Option<Binding> {
        let exact = self.bindings.iter().position(|slot| match slot {
            Some(entry) => entry.local_port == dst_port && entry.remote_port == Some(src_port),
            None => false,
        });
        let any = || self.bindings.iter().position(|slot| match slot {
            Some(entry) => entry.local_port == dst_port && entry.remote_port.is_none(),
            None => false,
        });
        exact.or_else(any).map(Binding)
    }

    /// Dispatch a received datagram.
    ///
    /// `frame` is the resident frame and `offset` the start of the UDP header within it. Returns
    /// whether a binding took the datagram.
    pub fn receive<H: Handler + ?Sized>(
        &self,
        handler: &mut H,
        stream: &mut dyn Stream,
        frame: &[u8],
        offset: usize,
        ip_repr: &Ipv4Repr,
        destination: Destination,
        checksums: Checksums,
    ) -> crate::wire::Result<bool> {
        if !checksums.contains(Checksums::UDP) {
            return Err(crate::wire::Error::WrongChecksum);
        }
        let packet = udp_packet::new_checked(&frame[offset..])?;
        let repr = UdpRepr::parse(packet, ip_repr, Checksum::Ignored)?;
        let binding = match self.lookup(repr.dst_port, repr.src_port) {
            Some(binding) => binding,
            None => {
                net_trace!("udp: no binding for {}", repr);
                return Ok(false);
            }
        };

        let payload_offset = offset + UDP_HEADER_LEN;
        let datagram = Datagram {
            src_addr: ip_repr.src_addr,
            dst_addr: ip_repr.dst_addr,
            src_port: repr.src_port,
            dst_port: repr.dst_port,
            destination,
            dhcp: checksums.contains(Checksums::DHCP),
            payload: Payload::new(
                packet.payload_slice(), repr.payload_len, payload_offset, stream),
        };
        handler.udp(binding, datagram);
        Ok(true)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::new()
    }
}

/// Send a datagram of `length` bytes produced by `source`.
///
/// The payload is pulled from the source while the link transmits, the link also computes the
/// checksum.
pub fn send<L: Link>(
    ip: &mut ip::Endpoint,
    link: &mut L,
    src_port: u16,
    dst_port: u16,
    dst_addr: Ipv4Address,
    length: usize,
    source: &mut dyn DataSource,
) -> Result<()> {
    if length > MAX_PAYLOAD || length > source.total_len() {
        return Err(Error::BadSize);
    }

    let mut frame = [0u8; FRAME_HEADERS_LEN];
    let repr = UdpRepr { src_port, dst_port, payload_len: length };
    ip.build_header(&mut frame, UDP_HEADER_LEN + length, dst_addr, IpProtocol::Udp);
    repr.emit(udp_packet::new_unchecked_mut(&mut frame[HEADERS_LEN..]));
    net_trace!("udp: send {} to {}", repr, dst_addr);

    let appended = Appended { source, offset: 0 };
    ip.launch(link, &mut frame, FRAME_HEADERS_LEN + length, Checksums::UDP, Some(appended))
}
