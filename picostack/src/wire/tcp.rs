use core::{cmp, fmt, ops};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, IpProtocol, Ipv4Address, Ipv4Repr, Result};
use super::checksum;

/// A TCP sequence number.
///
/// A sequence number is a monotonically advancing integer modulo 2<sup>32</sup>.
/// Sequence numbers do not have a discontiguity when compared pairwise across a signed overflow.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub i32);

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0 as u32)
    }
}

impl ops::Add<usize> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: usize) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs as i32))
    }
}

impl ops::Sub<usize> for SeqNumber {
    type Output = SeqNumber;

    fn sub(self, rhs: usize) -> SeqNumber {
        SeqNumber(self.0.wrapping_sub(rhs as i32))
    }
}

impl ops::AddAssign<usize> for SeqNumber {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

/// The signed distance between two sequence numbers.
///
/// Unlike a plain integer subtraction this never overflows, a number just past the wrap around is
/// still considered 'after' one just before it.
impl ops::Sub for SeqNumber {
    type Output = i32;

    fn sub(self, rhs: SeqNumber) -> i32 {
        self.0.wrapping_sub(rhs.0)
    }
}

impl cmp::PartialOrd for SeqNumber {
    fn partial_cmp(&self, other: &SeqNumber) -> Option<cmp::Ordering> {
        (*self - *other).partial_cmp(&0)
    }
}

/// A set of tcp flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags(pub u16);

mod field {
    use crate::wire::field::Field;

    pub const SRC_PORT: Field = 0..2;
    pub const DST_PORT: Field = 2..4;
    pub const SEQ_NUM:  Field = 4..8;
    pub const ACK_NUM:  Field = 8..12;
    pub const FLAGS:    Field = 12..14;
    pub const WIN_SIZE: Field = 14..16;
    pub const CHECKSUM: Field = 16..18;
    pub const URGENT:   Field = 18..20;

    pub const FLG_FIN: u16 = 0x001;
    pub const FLG_SYN: u16 = 0x002;
    pub const FLG_RST: u16 = 0x004;
    pub const FLG_PSH: u16 = 0x008;
    pub const FLG_ACK: u16 = 0x010;
    pub const FLG_URG: u16 = 0x020;

    pub const OPT_END: u8 = 0x00;
    pub const OPT_NOP: u8 = 0x01;
    pub const OPT_MSS: u8 = 0x02;
}

/// The length of a header without options.
pub const HEADER_LEN: usize = field::URGENT.end;

/// The length of the maximum segment size option.
pub const MSS_OPTION_LEN: usize = 4;

impl Flags {
    pub const FIN: Flags = Flags(field::FLG_FIN);
    pub const SYN: Flags = Flags(field::FLG_SYN);
    pub const RST: Flags = Flags(field::FLG_RST);
    pub const PSH: Flags = Flags(field::FLG_PSH);
    pub const ACK: Flags = Flags(field::FLG_ACK);
    pub const URG: Flags = Flags(field::FLG_URG);

    /// The six flags of RFC 793 that the filter looks at.
    pub const ALL: Flags = Flags(0x03f);

    #[inline]
    pub fn fin(&self) -> bool {
        self.0 & field::FLG_FIN != 0
    }

    #[inline]
    pub fn syn(&self) -> bool {
        self.0 & field::FLG_SYN != 0
    }

    #[inline]
    pub fn rst(&self) -> bool {
        self.0 & field::FLG_RST != 0
    }

    #[inline]
    pub fn psh(&self) -> bool {
        self.0 & field::FLG_PSH != 0
    }

    #[inline]
    pub fn ack(&self) -> bool {
        self.0 & field::FLG_ACK != 0
    }

    #[inline]
    pub fn urg(&self) -> bool {
        self.0 & field::FLG_URG != 0
    }

    /// Test whether all flags of `other` are set.
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The flags restricted to the six of RFC 793.
    pub fn classic(self) -> Flags {
        Flags(self.0 & Self::ALL.0)
    }

    /// The sequence space occupied by the control flags, SYN and FIN each take one number.
    pub fn sequence_len(self) -> usize {
        usize::from(self.syn()) + usize::from(self.fin())
    }
}

impl ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (self.syn(), "SYN"), (self.fin(), "FIN"), (self.rst(), "RST"),
            (self.psh(), "PSH"), (self.ack(), "ACK"), (self.urg(), "URG"),
        ];
        let mut first = true;
        for &(set, name) in names.iter() {
            if set {
                if !first { f.write_str("|")?; }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

byte_wrapper! {
    /// A byte sequence representing a TCP segment.
    pub struct tcp_packet([u8]);
}

impl tcp_packet {
    /// Imbue a raw octet buffer with TCP packet structure.
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
    ///
    /// The header including its options must be resident, the payload need not be.
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

    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.0[field::SEQ_NUM]))
    }

    #[inline]
    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.0[field::ACK_NUM]))
    }

    /// Return the flags, without the data offset.
    #[inline]
    pub fn flags(&self) -> Flags {
        Flags(NetworkEndian::read_u16(&self.0[field::FLAGS]) & 0x01ff)
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        ((raw >> 12) * 4) as u8
    }

    #[inline]
    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::WIN_SIZE])
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// The option bytes of the header.
    pub fn options(&self) -> &[u8] {
        &self.0[HEADER_LEN..usize::from(self.header_len())]
    }

    /// Find the maximum segment size option.
    ///
    /// Unknown options are skipped by their length byte. An option running past the header
    /// ends the search.
    pub fn max_seg_size(&self) -> Option<u16> {
        let mut options = self.options();
        while let Some((&kind, rest)) = options.split_first() {
            match kind {
                field::OPT_END => return None,
                field::OPT_NOP => options = rest,
                _ => {
                    let len = usize::from(*rest.first()?);
                    if len < 2 || len > options.len() {
                        return None;
                    }
                    if kind == field::OPT_MSS && len == MSS_OPTION_LEN {
                        return Some(NetworkEndian::read_u16(&options[2..4]));
                    }
                    options = &options[len..];
                }
            }
        }
        None
    }

    /// The resident payload bytes.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[usize::from(self.header_len())..]
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
    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.0[field::SEQ_NUM], value.0)
    }

    #[inline]
    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.0[field::ACK_NUM], value.0)
    }

    /// Set the flags and the header length at once, they share a field.
    pub fn set_flags_and_header_len(&mut self, flags: Flags, header_len: u8) {
        let raw = (u16::from(header_len / 4) << 12) | (flags.0 & 0x01ff);
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw)
    }

    #[inline]
    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::WIN_SIZE], value)
    }

    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    #[inline]
    pub fn set_urgent_at(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::URGENT], value)
    }

    /// Validate the checksum of a segment of `tcp_len` bytes, all of which must be resident.
    pub fn verify_checksum(
        &self,
        src_addr: Ipv4Address,
        dst_addr: Ipv4Address,
        tcp_len: usize,
    ) -> Result<bool> {
        let data = self.0.get(..tcp_len).ok_or(Error::Truncated)?;
        let sum = checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Tcp, tcp_len as u16),
            checksum::data(data),
        ]);
        Ok(sum == !0)
    }

    /// Compute and fill in the checksum over the whole slice.
    pub fn fill_checksum(&mut self, src_addr: Ipv4Address, dst_addr: Ipv4Address) {
        self.set_checksum(0);
        let checksum = !checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Tcp, self.0.len() as u16),
            checksum::data(&self.0),
        ]);
        self.set_checksum(checksum)
    }
}

/// A high-level representation of a TCP header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_port:     u16,
    pub dst_port:     u16,
    pub seq_number:   SeqNumber,
    pub ack_number:   SeqNumber,
    pub flags:        Flags,
    pub window_len:   u16,
    pub max_seg_size: Option<u16>,
    /// The payload length, including bytes that are not resident.
    pub payload_len:  usize,
}

impl Repr {
    /// Parse a TCP header carried by the datagram described in `ip`.
    pub fn parse(packet: &tcp_packet, ip: &Ipv4Repr, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;
        let header_len = usize::from(packet.header_len());
        if header_len > ip.payload_len {
            return Err(Error::Truncated);
        }
        if packet.src_port() == 0 || packet.dst_port() == 0 {
            return Err(Error::Malformed);
        }
        if checksum.manual()
            && !packet.verify_checksum(ip.src_addr, ip.dst_addr, ip.payload_len)?
        {
            return Err(Error::WrongChecksum);
        }

        Ok(Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            seq_number: packet.seq_number(),
            ack_number: packet.ack_number(),
            flags: packet.flags(),
            window_len: packet.window_len(),
            max_seg_size: packet.max_seg_size(),
            payload_len: ip.payload_len - header_len,
        })
    }

    /// The length of the header emitted from this representation.
    pub fn header_len(&self) -> usize {
        match self.max_seg_size {
            Some(_) => HEADER_LEN + MSS_OPTION_LEN,
            None => HEADER_LEN,
        }
    }

    /// The total length of the segment, header and payload.
    pub fn segment_len(&self) -> usize {
        self.header_len() + self.payload_len
    }

    /// The sequence space occupied, payload and control flags.
    pub fn sequence_len(&self) -> usize {
        self.payload_len + self.flags.sequence_len()
    }

    /// Emit the header with a zero checksum.
    pub fn emit(&self, packet: &mut tcp_packet) {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_seq_number(self.seq_number);
        packet.set_ack_number(self.ack_number);
        packet.set_flags_and_header_len(self.flags, self.header_len() as u8);
        packet.set_window_len(self.window_len);
        packet.set_checksum(0);
        packet.set_urgent_at(0);
        if let Some(mss) = self.max_seg_size {
            let option = &mut packet.0[HEADER_LEN..HEADER_LEN + MSS_OPTION_LEN];
            option[0] = field::OPT_MSS;
            option[1] = MSS_OPTION_LEN as u8;
            NetworkEndian::write_u16(&mut option[2..4], mss);
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP src={} dst={} {} seq={} ack={} win={} len={}",
               self.src_port, self.dst_port, self.flags,
               self.seq_number, self.ack_number, self.window_len, self.payload_len)?;
        if let Some(mss) = self.max_seg_size {
            write!(f, " mss={}", mss)?;
        }
        Ok(())
    }
}
