use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, Result};
use super::checksum;

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        Icmp = 0x01,
        Tcp  = 0x06,
        Udp  = 0x11,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Tcp  => write!(f, "TCP"),
            Protocol::Udp  => write!(f, "UDP"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id)
        }
    }
}

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// The unspecified address, also the marker of an interface without address.
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    /// The limited broadcast address.
    pub const BROADCAST: Address = Address([0xff; 4]);

    /// The mDNS responder group.
    pub const MDNS: Address = Address([224, 0, 0, 251]);

    /// The LLMNR responder group.
    pub const LLMNR: Address = Address([224, 0, 0, 252]);

    /// Construct an IPv4 address from parts.
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address([a0, a1, a2, a3])
    }

    /// Construct an IPv4 address from a sequence of octets.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return the address as a sequence of octets.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The address as a host order integer.
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Construct an address from a host order integer.
    pub fn from_u32(value: u32) -> Self {
        Address(value.to_be_bytes())
    }

    /// Query whether the address is the limited broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the address is a multicast address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0xf0 == 224
    }

    /// Query whether the address is the unspecified address.
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }

    /// Query whether both addresses lie in the same subnet under `netmask`.
    pub fn same_subnet(self, other: Address, netmask: Address) -> bool {
        self.to_u32() & netmask.to_u32() == other.to_u32() & netmask.to_u32()
    }

    /// The directed broadcast address of the subnet of `self`.
    pub fn subnet_broadcast(self, netmask: Address) -> Address {
        Address::from_u32(self.to_u32() | !netmask.to_u32())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

byte_wrapper! {
    /// A byte sequence representing an IPv4 datagram.
    pub struct ipv4_packet([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub const VER_IHL:  usize = 0;
    pub const DSCP_ECN: usize = 1;
    pub const LENGTH:   Field = 2..4;
    pub const IDENT:    Field = 4..6;
    pub const FLG_OFF:  Field = 6..8;
    pub const TTL:      usize = 8;
    pub const PROTOCOL: usize = 9;
    pub const CHECKSUM: Field = 10..12;
    pub const SRC_ADDR: Field = 12..16;
    pub const DST_ADDR: Field = 16..20;
}

/// The length of a header without options, the only kind we emit.
pub const HEADER_LEN: usize = field::DST_ADDR.end;

impl ipv4_packet {
    /// Imbue a raw octet buffer with IPv4 packet structure.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// Mutable version of `new_unchecked`.
    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// Shorthand for a combination of `new_unchecked` and `check_len`.
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    /// Mutable version of `new_checked`.
    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut Self> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    /// Ensure that no header accessor will panic.
    ///
    /// Only the header has to be resident. The payload may extend beyond the buffer since the
    /// link delivers partial packets, the total length field is only checked for consistency
    /// with the header length.
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < HEADER_LEN {
            return Err(Error::Truncated);
        }
        let header_len = usize::from(self.header_len());
        if header_len < HEADER_LEN {
            Err(Error::Malformed)
        } else if len < header_len {
            Err(Error::Truncated)
        } else if usize::from(self.total_len()) < header_len {
            Err(Error::Malformed)
        } else {
            Ok(())
        }
    }

    pub fn version(&self) -> u8 {
        self.0[field::VER_IHL] >> 4
    }

    /// The header length in octets.
    pub fn header_len(&self) -> u8 {
        (self.0[field::VER_IHL] & 0x0f) * 4
    }

    pub fn total_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::IDENT])
    }

    pub fn more_frags(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x2000 != 0
    }

    /// The fragment offset, in octets.
    pub fn frag_offset(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) << 3
    }

    pub fn hop_limit(&self) -> u8 {
        self.0[field::TTL]
    }

    pub fn protocol(&self) -> Protocol {
        self.0[field::PROTOCOL].into()
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC_ADDR])
    }

    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST_ADDR])
    }

    /// Validate the header checksum.
    pub fn verify_checksum(&self) -> bool {
        let header_len = usize::from(self.header_len());
        checksum::data(&self.0[..header_len]) == !0
    }

    /// Set the version to 4 and the header length in octets.
    pub fn set_version_and_header_len(&mut self, header_len: u8) {
        self.0[field::VER_IHL] = 0x40 | (header_len / 4);
    }

    pub fn set_total_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    pub fn set_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::IDENT], value)
    }

    pub fn set_hop_limit(&mut self, value: u8) {
        self.0[field::TTL] = value
    }

    pub fn set_protocol(&mut self, value: Protocol) {
        self.0[field::PROTOCOL] = value.into()
    }

    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SRC_ADDR].copy_from_slice(value.as_bytes())
    }

    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DST_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Compute and fill in the header checksum.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let header_len = usize::from(self.header_len());
        let checksum = !checksum::data(&self.0[..header_len]);
        self.set_checksum(checksum)
    }

    /// The resident bytes following the header.
    pub fn payload_slice(&self) -> &[u8] {
        let header_len = usize::from(self.header_len());
        &self.0[header_len..]
    }

    /// The mutable resident bytes following the header.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let header_len = usize::from(self.header_len());
        &mut self.0[header_len..]
    }
}

/// A high-level representation of an IPv4 header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_addr:    Address,
    pub dst_addr:    Address,
    pub protocol:    Protocol,
    pub payload_len: usize,
    pub hop_limit:   u8,
}

impl Repr {
    /// Parse an IPv4 header.
    ///
    /// The payload itself need not be resident, `payload_len` is derived from the total length.
    pub fn parse(packet: &ipv4_packet, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;
        if packet.version() != 4 { return Err(Error::Unrecognized) }
        if checksum.manual() && !packet.verify_checksum() { return Err(Error::WrongChecksum) }
        // Reassembly is not something a single buffer can do.
        if packet.more_frags() || packet.frag_offset() != 0 { return Err(Error::Unsupported) }

        let payload_len = usize::from(packet.total_len()) - usize::from(packet.header_len());
        Ok(Repr {
            src_addr:    packet.src_addr(),
            dst_addr:    packet.dst_addr(),
            protocol:    packet.protocol(),
            payload_len,
            hop_limit:   packet.hop_limit(),
        })
    }

    /// Return the length of the header emitted from this representation.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit the header with the datagram identification `ident`.
    ///
    /// No options, no fragmentation flags, zero type of service.
    pub fn emit(&self, packet: &mut ipv4_packet, ident: u16, checksum: Checksum) {
        packet.set_version_and_header_len(HEADER_LEN as u8);
        packet.0[field::DSCP_ECN] = 0;
        packet.set_total_len((HEADER_LEN + self.payload_len) as u16);
        packet.set_ident(ident);
        NetworkEndian::write_u16(&mut packet.0[field::FLG_OFF], 0);
        packet.set_hop_limit(self.hop_limit);
        packet.set_protocol(self.protocol);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);

        if checksum.manual() {
            packet.fill_checksum();
        } else {
            packet.set_checksum(0);
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IPv4 src={} dst={} proto={} len={}",
               self.src_addr, self.dst_addr, self.protocol, self.payload_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static PACKET_BYTES: [u8; 24] =
        [0x45, 0x00, 0x00, 0x18,
         0x00, 0x07, 0x00, 0x00,
         0x40, 0x11, 0x12, 0x63,
         0x11, 0x12, 0x13, 0x14,
         0x21, 0x22, 0x23, 0x24,
         0xaa, 0x00, 0x00, 0xff];

    fn packet_repr() -> Repr {
        Repr {
            src_addr: Address([0x11, 0x12, 0x13, 0x14]),
            dst_addr: Address([0x21, 0x22, 0x23, 0x24]),
            protocol: Protocol::Udp,
            payload_len: 4,
            hop_limit: 64,
        }
    }

    #[test]
    fn emit_then_verify() {
        let mut bytes = [0xa5; 24];
        packet_repr().emit(ipv4_packet::new_unchecked_mut(&mut bytes[..]), 7, Checksum::Manual);
        bytes[20..].copy_from_slice(&[0xaa, 0x00, 0x00, 0xff]);
        let packet = ipv4_packet::new_checked(&bytes[..]).unwrap();
        assert!(packet.verify_checksum());
        assert_eq!(packet.ident(), 7);
        assert_eq!(Repr::parse(packet, Checksum::Manual), Ok(packet_repr()));
    }

    #[test]
    fn known_checksum() {
        let packet = ipv4_packet::new_unchecked(&PACKET_BYTES[..]);
        assert!(packet.verify_checksum());
    }

    #[test]
    fn wrong_checksum() {
        let mut bytes = PACKET_BYTES;
        bytes[11] ^= 1;
        let packet = ipv4_packet::new_unchecked(&bytes[..]);
        assert_eq!(Repr::parse(packet, Checksum::Manual), Err(Error::WrongChecksum));
        assert!(Repr::parse(packet, Checksum::Ignored).is_ok());
    }

    #[test]
    fn payload_not_resident() {
        // Total length claims 1000 bytes, only the header arrived.
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&PACKET_BYTES[..20]);
        ipv4_packet::new_unchecked_mut(&mut bytes[..]).set_total_len(1000);
        let repr = Repr::parse(ipv4_packet::new_checked(&bytes[..]).unwrap(), Checksum::Ignored)
            .unwrap();
        assert_eq!(repr.payload_len, 980);
    }

    #[test]
    fn fragments_unsupported() {
        let mut bytes = PACKET_BYTES;
        bytes[6] = 0x20;
        let packet = ipv4_packet::new_unchecked(&bytes[..]);
        assert_eq!(Repr::parse(packet, Checksum::Ignored), Err(Error::Unsupported));
    }

    #[test]
    fn subnets() {
        let mask = Address::new(255, 255, 255, 0);
        let addr = Address::new(192, 168, 1, 20);
        assert!(addr.same_subnet(Address::new(192, 168, 1, 1), mask));
        assert!(!addr.same_subnet(Address::new(192, 168, 2, 1), mask));
        assert_eq!(addr.subnet_broadcast(mask), Address::new(192, 168, 1, 255));
        assert!(Address::MDNS.is_multicast());
    }
}
