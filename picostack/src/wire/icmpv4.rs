use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, Result};
use super::checksum;

enum_with_unknown! {
    /// Internet protocol control message type.
    pub enum Message(u8) {
        EchoReply = 0,
        DstUnreachable = 3,
        EchoRequest = 8,
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::EchoReply => write!(f, "echo reply"),
            Message::DstUnreachable => write!(f, "destination unreachable"),
            Message::EchoRequest => write!(f, "echo request"),
            Message::Unknown(id) => write!(f, "{}", id),
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing an ICMPv4 message.
    pub struct icmpv4_packet([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub const TYPE:       usize = 0;
    pub const CODE:       usize = 1;
    pub const CHECKSUM:   Field = 2..4;
    pub const ECHO_IDENT: Field = 4..6;
    pub const ECHO_SEQNO: Field = 6..8;
}

/// The length of an echo header.
pub const HEADER_LEN: usize = field::ECHO_SEQNO.end;

impl icmpv4_packet {
    /// Imbue a raw octet buffer with ICMPv4 structure.
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

    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    pub fn msg_type(&self) -> Message {
        self.0[field::TYPE].into()
    }

    pub fn msg_code(&self) -> u8 {
        self.0[field::CODE]
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    pub fn echo_ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_IDENT])
    }

    pub fn echo_seq_no(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_SEQNO])
    }

    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into()
    }

    pub fn set_msg_code(&mut self, value: u8) {
        self.0[field::CODE] = value
    }

    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Validate the checksum over the whole message.
    ///
    /// The message must be entirely contained in the slice.
    pub fn verify_checksum(&self) -> bool {
        checksum::data(&self.0) == !0
    }

    /// Compute and fill the checksum over the whole slice.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = !checksum::data(&self.0);
        self.set_checksum(checksum)
    }

    /// The bytes after the echo header.
    pub fn data(&self) -> &[u8] {
        &self.0[HEADER_LEN..]
    }
}

/// A parsed echo message, the only kind this stack interprets.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    EchoRequest {
        ident: u16,
        seq_no: u16,
    },
    EchoReply {
        ident: u16,
        seq_no: u16,
    },
}

impl Repr {
    /// Parse an echo request or reply.
    pub fn parse(packet: &icmpv4_packet, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;
        if checksum.manual() && !packet.verify_checksum() {
            return Err(Error::WrongChecksum);
        }

        match (packet.msg_type(), packet.msg_code()) {
            (Message::EchoRequest, 0) => Ok(Repr::EchoRequest {
                ident: packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
            }),
            (Message::EchoReply, 0) => Ok(Repr::EchoReply {
                ident: packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
            }),
            _ => Err(Error::Unrecognized),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static ECHO_BYTES: [u8; 12] =
        [0x08, 0x00, 0x8e, 0xfe,
         0x12, 0x34, 0xab, 0xcd,
         0xaa, 0x00, 0x00, 0xff];

    #[test]
    fn echo_request() {
        let packet = icmpv4_packet::new_checked(&ECHO_BYTES[..]).unwrap();
        assert!(packet.verify_checksum());
        assert_eq!(packet.data(), &[0xaa, 0x00, 0x00, 0xff]);
        assert_eq!(Repr::parse(packet, Checksum::Manual), Ok(Repr::EchoRequest {
            ident: 0x1234,
            seq_no: 0xabcd,
        }));
    }

    #[test]
    fn turn_into_reply() {
        let mut bytes = ECHO_BYTES;
        let packet = icmpv4_packet::new_unchecked_mut(&mut bytes[..]);
        packet.set_msg_type(Message::EchoReply);
        packet.fill_checksum();
        assert!(packet.verify_checksum());
        assert_eq!(Repr::parse(packet, Checksum::Manual), Ok(Repr::EchoReply {
            ident: 0x1234,
            seq_no: 0xabcd,
        }));
    }

    #[test]
    fn unreachable_not_interpreted() {
        let mut bytes = ECHO_BYTES;
        bytes[0] = 3;
        let packet = icmpv4_packet::new_unchecked(&bytes[..]);
        assert_eq!(Repr::parse(packet, Checksum::Ignored), Err(Error::Unrecognized));
    }
}
