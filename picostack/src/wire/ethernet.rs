use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

enum_with_unknown! {
    /// Ethernet protocol type.
    pub enum EtherType(u16) {
        Ipv4 = 0x0800,
        Arp  = 0x0806,
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EtherType::Ipv4 => write!(f, "IPv4"),
            EtherType::Arp  => write!(f, "ARP"),
            EtherType::Unknown(id) => write!(f, "0x{:04x}", id)
        }
    }
}

/// A six-octet Ethernet II address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// The all-zero address, used as the unknown target of ARP requests.
    pub const UNSPECIFIED: Address = Address([0; 6]);

    /// The multicast address of the mDNS group 224.0.0.251.
    pub const MDNS_MULTICAST: Address = Address([0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb]);

    /// The multicast address of the LLMNR group 224.0.0.252.
    pub const LLMNR_MULTICAST: Address = Address([0x01, 0x00, 0x5e, 0x00, 0x00, 0xfc]);

    /// Construct an Ethernet address from a sequence of octets.
    ///
    /// # Panics
    /// The function panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return the address as a sequence of octets.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the "multicast" bit in the OUI is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Query whether the address is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
               bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5])
    }
}

byte_wrapper! {
    /// A byte sequence representing an Ethernet II frame.
    pub struct ethernet_frame([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub const DESTINATION: Field = 0..6;
    pub const SOURCE:      Field = 6..12;
    pub const ETHERTYPE:   Field = 12..14;
    pub const PAYLOAD:     usize = 14;
}

/// The length of the Ethernet II header.
pub const HEADER_LEN: usize = field::PAYLOAD;

impl ethernet_frame {
    /// Imbue a raw octet buffer with Ethernet frame structure.
    ///
    /// Accessors may panic unless the buffer is at least `HEADER_LEN` long.
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

    /// Ensure that no accessor method will panic if called.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the destination address field.
    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DESTINATION])
    }

    /// Return the source address field.
    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SOURCE])
    }

    /// Return the EtherType field.
    pub fn ethertype(&self) -> EtherType {
        NetworkEndian::read_u16(&self.0[field::ETHERTYPE]).into()
    }

    /// Set the destination address field.
    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DESTINATION].copy_from_slice(value.as_bytes())
    }

    /// Set the source address field.
    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SOURCE].copy_from_slice(value.as_bytes())
    }

    /// Set the EtherType field.
    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.0[field::ETHERTYPE], value.into())
    }

    /// Exchange source and destination address in place.
    pub fn swap_addrs(&mut self) {
        let (dst, src) = (self.dst_addr(), self.src_addr());
        self.set_dst_addr(src);
        self.set_src_addr(dst);
    }

    /// The bytes following the header.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[field::PAYLOAD..]
    }

    /// The mutable bytes following the header.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[field::PAYLOAD..]
    }
}

/// A high-level representation of an Ethernet II header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_addr:  Address,
    pub dst_addr:  Address,
    pub ethertype: EtherType,
}

impl Repr {
    /// Parse an Ethernet II frame header.
    pub fn parse(frame: &ethernet_frame) -> Result<Repr> {
        frame.check_len()?;
        Ok(Repr {
            src_addr: frame.src_addr(),
            dst_addr: frame.dst_addr(),
            ethertype: frame.ethertype(),
        })
    }

    /// The length of the header this representation emits.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit the header into a frame of at least `HEADER_LEN` bytes.
    pub fn emit(&self, frame: &mut ethernet_frame) {
        frame.set_src_addr(self.src_addr);
        frame.set_dst_addr(self.dst_addr);
        frame.set_ethertype(self.ethertype);
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EthernetII src={} dst={} type={}",
               self.src_addr, self.dst_addr, self.ethertype)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static FRAME_BYTES: [u8; 18] =
        [0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb,
         0x02, 0x12, 0x34, 0x56, 0x78, 0x9a,
         0x08, 0x06,
         0xaa, 0x00, 0x00, 0xff];

    #[test]
    fn deconstruct() {
        let frame = ethernet_frame::new_checked(&FRAME_BYTES[..]).unwrap();
        assert_eq!(frame.dst_addr(), Address::MDNS_MULTICAST);
        assert!(frame.dst_addr().is_multicast());
        assert_eq!(frame.src_addr(), Address([0x02, 0x12, 0x34, 0x56, 0x78, 0x9a]));
        assert_eq!(frame.ethertype(), EtherType::Arp);
        assert_eq!(frame.payload_slice(), &[0xaa, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn swap() {
        let mut bytes = FRAME_BYTES;
        let frame = ethernet_frame::new_unchecked_mut(&mut bytes[..]);
        frame.swap_addrs();
        assert_eq!(frame.src_addr(), Address::MDNS_MULTICAST);
        assert_eq!(&bytes[0..6], &FRAME_BYTES[6..12]);
    }

    #[test]
    fn truncated() {
        assert_eq!(ethernet_frame::new_checked(&FRAME_BYTES[..13]).err(), Some(Error::Truncated));
    }
}
