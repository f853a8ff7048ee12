use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, IpProtocol, Ipv4Address, Ipv4Repr, Result};
use super::checksum;

byte_wrapper! {
    /// A byte sequence representing a UDP datagram.
    pub struct udp_packet([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub const SRC_PORT: Field = 0..2;
    pub const DST_PORT: Field = 2..4;
    pub const LENGTH:   Field = 4..6;
    pub const CHECKSUM: Field = 6..8;
}

/// The length of the UDP header.
pub const HEADER_LEN: usize = field::CHECKSUM.end;

impl udp_packet {
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut Self> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    /// Ensure that no accessor method will panic if called.
    ///
    /// Returns `Err(Error::Truncated)` if the header is not resident and `Err(Error::Malformed)`
    /// if the length field is smaller than the header. The payload may be partially resident.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else if usize::from(self.len()) < HEADER_LEN {
            Err(Error::Malformed)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the length field, covering header and payload.
    #[inline]
    pub fn len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    #[inline]
    pub fn set_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Validate the checksum, which requires the whole datagram to be resident.
    ///
    /// A zero checksum field means the sender did not compute one and always verifies.
    pub fn verify_checksum(&self, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> Result<bool> {
        if self.checksum() == 0 {
            return Ok(true);
        }
        let len = self.len();
        let data = self.0.get(..usize::from(len)).ok_or(Error::Truncated)?;
        let sum = checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Udp, len),
            checksum::data(data),
        ]);
        Ok(sum == !0)
    }

    /// Compute and fill in the checksum over the resident datagram.
    pub fn fill_checksum(&mut self, src_addr: Ipv4Address, dst_addr: Ipv4Address) {
        self.set_checksum(0);
        let len = self.len();
        let end = usize::from(len).min(self.0.len());
        let checksum = !checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Udp, len),
            checksum::data(&self.0[..end]),
        ]);
        self.set_checksum(transmitted(checksum))
    }

    /// The resident payload bytes.
    pub fn payload_slice(&self) -> &[u8] {
        let end = usize::from(self.len()).min(self.0.len());
        &self.0[HEADER_LEN..end]
    }
}

/// The value of a computed checksum as written to the wire.
///
/// Zero is reserved to mean 'not computed', its ones-complement equivalent is sent instead.
pub fn transmitted(checksum: u16) -> u16 {
    if checksum == 0 { 0xffff } else { checksum }
}

/// A high-level representation of a UDP header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
    /// The payload length, without the header.
    pub payload_len: usize,
}

impl Repr {
    /// Parse a UDP header carried by the datagram described in `ip`.
    pub fn parse(packet: &udp_packet, ip: &Ipv4Repr, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;
        if usize::from(packet.len()) > ip.payload_len {
            return Err(Error::Truncated);
        }
        // Destination port 0 is reserved, source port 0 means 'no reply'.
        if packet.dst_port() == 0 {
            return Err(Error::Malformed);
        }
        if checksum.manual() && !packet.verify_checksum(ip.src_addr, ip.dst_addr)? {
            return Err(Error::WrongChecksum);
        }

        Ok(Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            payload_len: usize::from(packet.len()) - HEADER_LEN,
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit the header with a zero checksum.
    ///
    /// The checksum is filled in by whoever sees the complete payload, which is usually the link.
    pub fn emit(&self, packet: &mut udp_packet) {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_len((HEADER_LEN + self.payload_len) as u16);
        packet.set_checksum(0);
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UDP src={} dst={} len={}", self.src_port, self.dst_port, self.payload_len)
    }
}
