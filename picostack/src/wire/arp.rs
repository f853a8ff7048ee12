use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
use super::{EthernetAddress, EtherType, Ipv4Address};

enum_with_unknown! {
    /// ARP hardware type.
    pub enum Hardware(u16) {
        Ethernet = 1,
    }
}

enum_with_unknown! {
    /// ARP operation type.
    pub enum Operation(u16) {
        Request = 1,
        Reply = 2,
    }
}

byte_wrapper! {
    /// A byte sequence representing an ARP packet for IPv4 over Ethernet.
    pub struct arp_packet([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub const HTYPE: Field = 0..2;
    pub const PTYPE: Field = 2..4;
    pub const HLEN:  usize = 4;
    pub const PLEN:  usize = 5;
    pub const OPER:  Field = 6..8;
    pub const SHA:   Field = 8..14;
    pub const SPA:   Field = 14..18;
    pub const THA:   Field = 18..24;
    pub const TPA:   Field = 24..28;
}

/// The length of an ARP packet mapping IPv4 to Ethernet addresses.
pub const PACKET_LEN: usize = field::TPA.end;

impl arp_packet {
    /// Imbue a raw octet buffer with ARP packet structure.
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

    /// Ensure that no accessor method will panic if called.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < PACKET_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn hardware_type(&self) -> Hardware {
        NetworkEndian::read_u16(&self.0[field::HTYPE]).into()
    }

    pub fn protocol_type(&self) -> EtherType {
        NetworkEndian::read_u16(&self.0[field::PTYPE]).into()
    }

    pub fn hardware_len(&self) -> u8 {
        self.0[field::HLEN]
    }

    pub fn protocol_len(&self) -> u8 {
        self.0[field::PLEN]
    }

    pub fn operation(&self) -> Operation {
        NetworkEndian::read_u16(&self.0[field::OPER]).into()
    }

    pub fn source_hardware_addr(&self) -> EthernetAddress {
        EthernetAddress::from_bytes(&self.0[field::SHA])
    }

    pub fn source_protocol_addr(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.0[field::SPA])
    }

    pub fn target_hardware_addr(&self) -> EthernetAddress {
        EthernetAddress::from_bytes(&self.0[field::THA])
    }

    pub fn target_protocol_addr(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.0[field::TPA])
    }

    fn set_layout(&mut self) {
        NetworkEndian::write_u16(&mut self.0[field::HTYPE], Hardware::Ethernet.into());
        NetworkEndian::write_u16(&mut self.0[field::PTYPE], EtherType::Ipv4.into());
        self.0[field::HLEN] = 6;
        self.0[field::PLEN] = 4;
    }

    pub fn set_operation(&mut self, value: Operation) {
        NetworkEndian::write_u16(&mut self.0[field::OPER], value.into())
    }

    pub fn set_source_hardware_addr(&mut self, value: EthernetAddress) {
        self.0[field::SHA].copy_from_slice(value.as_bytes())
    }

    pub fn set_source_protocol_addr(&mut self, value: Ipv4Address) {
        self.0[field::SPA].copy_from_slice(value.as_bytes())
    }

    pub fn set_target_hardware_addr(&mut self, value: EthernetAddress) {
        self.0[field::THA].copy_from_slice(value.as_bytes())
    }

    pub fn set_target_protocol_addr(&mut self, value: Ipv4Address) {
        self.0[field::TPA].copy_from_slice(value.as_bytes())
    }
}

/// A high-level representation of an ARP packet for IPv4 over Ethernet.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub operation: Operation,
    pub source_hardware_addr: EthernetAddress,
    pub source_protocol_addr: Ipv4Address,
    pub target_hardware_addr: EthernetAddress,
    pub target_protocol_addr: Ipv4Address,
}

impl Repr {
    /// Parse an ARP packet.
    ///
    /// Only Ethernet to IPv4 mappings with a request or reply operation are recognized.
    pub fn parse(packet: &arp_packet) -> Result<Repr> {
        packet.check_len()?;
        match (
            packet.hardware_type(),
            packet.protocol_type(),
            packet.hardware_len(),
            packet.protocol_len(),
            packet.operation(),
        ) {
            (Hardware::Ethernet, EtherType::Ipv4, 6, 4, operation @ Operation::Request)
            | (Hardware::Ethernet, EtherType::Ipv4, 6, 4, operation @ Operation::Reply) => Ok(Repr {
                operation,
                source_hardware_addr: packet.source_hardware_addr(),
                source_protocol_addr: packet.source_protocol_addr(),
                target_hardware_addr: packet.target_hardware_addr(),
                target_protocol_addr: packet.target_protocol_addr(),
            }),
            _ => Err(Error::Unrecognized),
        }
    }

    /// A request asking who has `target`.
    pub fn request(
        source_hardware_addr: EthernetAddress,
        source_protocol_addr: Ipv4Address,
        target: Ipv4Address,
    ) -> Self {
        Repr {
            operation: Operation::Request,
            source_hardware_addr,
            source_protocol_addr,
            target_hardware_addr: EthernetAddress::UNSPECIFIED,
            target_protocol_addr: target,
        }
    }

    /// The reply answering this request on behalf of `hardware_addr`.
    ///
    /// Source and target swap places, the requested protocol address becomes the source.
    pub fn answer(&self, hardware_addr: EthernetAddress) -> Self {
        Repr {
            operation: Operation::Reply,
            source_hardware_addr: hardware_addr,
            source_protocol_addr: self.target_protocol_addr,
            target_hardware_addr: self.source_hardware_addr,
            target_protocol_addr: self.source_protocol_addr,
        }
    }

    /// Return the length of a packet that will be emitted from this representation.
    pub fn buffer_len(&self) -> usize {
        PACKET_LEN
    }

    /// Emit the representation into a packet of at least `PACKET_LEN` bytes.
    pub fn emit(&self, packet: &mut arp_packet) {
        packet.set_layout();
        packet.set_operation(self.operation);
        packet.set_source_hardware_addr(self.source_hardware_addr);
        packet.set_source_protocol_addr(self.source_protocol_addr);
        packet.set_target_hardware_addr(self.target_hardware_addr);
        packet.set_target_protocol_addr(self.target_protocol_addr);
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ARP type={:?} src={}/{} tgt={}/{}",
               self.operation,
               self.source_hardware_addr, self.source_protocol_addr,
               self.target_hardware_addr, self.target_protocol_addr)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static PACKET_BYTES: [u8; 28] =
        [0x00, 0x01,
         0x08, 0x00,
         0x06,
         0x04,
         0x00, 0x01,
         0x11, 0x12, 0x13, 0x14, 0x15, 0x16,
         0x21, 0x22, 0x23, 0x24,
         0x31, 0x32, 0x33, 0x34, 0x35, 0x36,
         0x41, 0x42, 0x43, 0x44];

    fn packet_repr() -> Repr {
        Repr {
            operation: Operation::Request,
            source_hardware_addr: EthernetAddress([0x11, 0x12, 0x13, 0x14, 0x15, 0x16]),
            source_protocol_addr: Ipv4Address([0x21, 0x22, 0x23, 0x24]),
            target_hardware_addr: EthernetAddress([0x31, 0x32, 0x33, 0x34, 0x35, 0x36]),
            target_protocol_addr: Ipv4Address([0x41, 0x42, 0x43, 0x44]),
        }
    }

    #[test]
    fn parse() {
        let packet = arp_packet::new_checked(&PACKET_BYTES[..]).unwrap();
        assert_eq!(Repr::parse(packet), Ok(packet_repr()));
    }

    #[test]
    fn emit() {
        let mut bytes = [0xa5; 28];
        packet_repr().emit(arp_packet::new_unchecked_mut(&mut bytes[..]));
        assert_eq!(bytes, PACKET_BYTES);
    }

    #[test]
    fn answer_swaps() {
        let ours = EthernetAddress([0x02, 0, 0, 0, 0, 1]);
        let reply = packet_repr().answer(ours);
        assert_eq!(reply.operation, Operation::Reply);
        assert_eq!(reply.source_hardware_addr, ours);
        assert_eq!(reply.source_protocol_addr, Ipv4Address([0x41, 0x42, 0x43, 0x44]));
        assert_eq!(reply.target_protocol_addr, Ipv4Address([0x21, 0x22, 0x23, 0x24]));
    }

    #[test]
    fn unknown_operation() {
        let mut bytes = PACKET_BYTES;
        bytes[7] = 9;
        let packet = arp_packet::new_unchecked(&bytes[..]);
        assert_eq!(Repr::parse(packet), Err(Error::Unrecognized));
    }
}
