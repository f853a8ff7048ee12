/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two levels of
functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens in the lowercase structures e.g. [`ethernet_frame`] or
   [`udp_packet`]. They are dynamically sized wrappers around `[u8]`, so the one receive buffer of
   the engine can be viewed as each protocol layer in turn without copying or reinterpreting it.
 * Second, it provides a compact, high-level representation of header data that can be created
   from parsing and emitted into a sequence of octets. This happens through the `Repr` family of
   structs and enums, e.g. [`ArpRepr`] or [`Ipv4Repr`].

[`ethernet_frame`]: struct.ethernet_frame.html
[`udp_packet`]: struct.udp_packet.html
[`ArpRepr`]: struct.ArpRepr.html
[`Ipv4Repr`]: struct.Ipv4Repr.html

Every multi-byte field goes through a `NetworkEndian` accessor, at parse and at emit. Values held
by a `Repr` are always in host order.

Unlike most packet libraries, a packet is usually *not* fully resident. The link delivers only as
many bytes as fit the receive buffer and keeps the rest in device memory. Hence `check_len` only
demands the headers, length fields are compared against the datagram that carries the packet and
checksums over the full packet are left to the link.

# Examples

To emit an IP packet header into an octet buffer, and then parse it back:

```rust
use picostack::wire::*;
let repr = Ipv4Repr {
    src_addr:    Ipv4Address::new(10, 0, 0, 1),
    dst_addr:    Ipv4Address::new(10, 0, 0, 2),
    protocol:    IpProtocol::Tcp,
    payload_len: 10,
    hop_limit:   64,
};
let mut buffer = vec![0; repr.buffer_len() + repr.payload_len];
{ // emission
    let packet = ipv4_packet::new_unchecked_mut(&mut buffer);
    repr.emit(packet, 1, Checksum::Manual);
}
{ // parsing
    let packet = ipv4_packet::new_checked(&buffer)
        .expect("truncated packet");
    let parsed = Ipv4Repr::parse(packet, Checksum::Manual)
        .expect("malformed packet");
    assert_eq!(repr, parsed);
}
```
*/

pub(crate) mod field {
    pub type Field = ::core::ops::Range<usize>;
}

mod error;
pub mod checksum;
mod payload;
mod ethernet;
mod arp;
mod ipv4;
mod icmpv4;
mod udp;
mod tcp;

/// Whether a checksum is to be computed or checked by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked by the link.
    Ignored,
}

impl Checksum {
    pub fn manual(self) -> bool {
        self == Checksum::Manual
    }
}

pub use self::error::{Error, Result};

pub use self::payload::{
    DataSource,
    FnSource,
    Generator,
    Source};

pub use self::ethernet::{
    Address as EthernetAddress,
    EtherType,
    ethernet_frame,
    Repr as EthernetRepr,
    HEADER_LEN as ETHERNET_HEADER_LEN};

pub use self::arp::{
    Hardware as ArpHardware,
    Operation as ArpOperation,
    arp_packet,
    Repr as ArpRepr,
    PACKET_LEN as ARP_PACKET_LEN};

pub use self::ipv4::{
    Address as Ipv4Address,
    Protocol as IpProtocol,
    ipv4_packet,
    Repr as Ipv4Repr,
    HEADER_LEN as IPV4_HEADER_LEN};

pub use self::icmpv4::{
    Message as Icmpv4Message,
    icmpv4_packet,
    Repr as Icmpv4Repr,
    HEADER_LEN as ICMPV4_HEADER_LEN};

pub use self::udp::{
    udp_packet,
    Repr as UdpRepr,
    HEADER_LEN as UDP_HEADER_LEN};

pub use self::tcp::{
    Flags as TcpFlags,
    SeqNumber as TcpSeqNumber,
    tcp_packet,
    Repr as TcpRepr,
    HEADER_LEN as TCP_HEADER_LEN,
    MSS_OPTION_LEN as TCP_MSS_OPTION_LEN};

