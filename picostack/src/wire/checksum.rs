//! The Internet checksum of RFC 1071.
//!
//! Transport checksums cover bytes that are never all resident at once: the headers sit in the
//! packet buffer, the payload may be produced on demand by a [`DataSource`] or read back from device
//! memory. The [`Accumulator`] is fed those pieces one after another and resolves to the same value as
//! a single pass over the concatenation, no matter where the pieces were split.
//!
//! [`DataSource`]: ../trait.DataSource.html
//! [`Accumulator`]: struct.Accumulator.html
use byteorder::{ByteOrder, NetworkEndian};

use super::{Ipv4Address, IpProtocol};

/// A running ones-complement sum over a sequence of bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Accumulator {
    sum: u32,
    /// The high byte of a word whose low byte is in the next piece.
    pending: Option<u8>,
}

impl Accumulator {
    /// An accumulator over the empty sequence.
    pub const fn new() -> Self {
        Accumulator { sum: 0, pending: None }
    }

    /// Add the bytes of `data` to the running sum.
    pub fn accumulate(&mut self, mut data: &[u8]) {
        if data.is_empty() {
            return;
        }

        if let Some(high) = self.pending.take() {
            self.add_word(u16::from_be_bytes([high, data[0]]));
            data = &data[1..];
        }

        let mut words = data.chunks_exact(2);
        for word in &mut words {
            self.add_word(NetworkEndian::read_u16(word));
        }

        if let [odd] = words.remainder() {
            self.pending = Some(*odd);
        }
    }

    /// Add a single 16-bit word.
    ///
    /// Must not be called while an odd byte is pending, the word would be misaligned.
    pub fn add_word(&mut self, word: u16) {
        debug_assert!(self.pending.is_none());
        self.sum += u32::from(word);
        if self.sum & 0x8000_0000 != 0 {
            self.sum = (self.sum & 0xffff) + (self.sum >> 16);
        }
    }

    /// The sum so far, with an odd trailing byte padded by zero but carries not yet folded.
    pub fn sum(&self) -> u32 {
        match self.pending {
            Some(high) => self.sum + (u32::from(high) << 8),
            None => self.sum,
        }
    }

    /// Fold the carries and complement.
    pub fn resolve(&self) -> u16 {
        resolve(self.sum())
    }
}

/// Fold a 32-bit running sum into 16 bits and return its ones-complement.
///
/// The high half is added to the low half twice, the first addition may itself carry.
pub fn resolve(sum: u32) -> u16 {
    !fold(sum)
}

fn fold(sum: u32) -> u16 {
    let sum = (sum >> 16) + (sum & 0xffff);
    let sum = (sum >> 16) + (sum & 0xffff);
    sum as u16
}

/// The folded sum over some data, without the final complement.
pub fn data(data: &[u8]) -> u16 {
    let mut accum = Accumulator::new();
    accum.accumulate(data);
    fold(accum.sum())
}

/// Combine several folded sums.
pub fn combine(checksums: &[u16]) -> u16 {
    let sum = checksums.iter().map(|&word| u32::from(word)).sum();
    fold(sum)
}

/// The folded sum of the IPv4 pseudo header.
pub fn pseudo_header(
    src_addr: Ipv4Address,
    dst_addr: Ipv4Address,
    protocol: IpProtocol,
    length: u16,
) -> u16 {
    let mut proto_len = [0u8; 4];
    proto_len[1] = protocol.into();
    NetworkEndian::write_u16(&mut proto_len[2..4], length);

    combine(&[
        data(src_addr.as_bytes()),
        data(dst_addr.as_bytes()),
        data(&proto_len[..]),
    ])
}

/// An accumulator already primed with the IPv4 pseudo header.
pub fn with_pseudo_header(
    src_addr: Ipv4Address,
    dst_addr: Ipv4Address,
    protocol: IpProtocol,
    length: u16,
) -> Accumulator {
    let mut accum = Accumulator::new();
    accum.add_word(pseudo_header(src_addr, dst_addr, protocol, length));
    accum
}

#[cfg(test)]
mod test {
    use super::*;

    // The IPv4 header from RFC 1071 discussions, with its checksum field zeroed.
    static HEADER: [u8; 20] = [
        0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00,
        0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8, 0x00, 0x01,
        0xc0, 0xa8, 0x00, 0xc7,
    ];

    #[test]
    fn known_header() {
        let mut accum = Accumulator::new();
        accum.accumulate(&HEADER);
        assert_eq!(accum.resolve(), 0xb861);
    }

    #[test]
    fn verifies_to_zero() {
        let mut header = HEADER;
        let mut accum = Accumulator::new();
        accum.accumulate(&header);
        let checksum = accum.resolve();
        NetworkEndian::write_u16(&mut header[10..12], checksum);

        let mut accum = Accumulator::new();
        accum.accumulate(&header);
        assert_eq!(accum.resolve(), 0);
    }

    #[test]
    fn split_anywhere() {
        let bytes: [u8; 37] = {
            let mut bytes = [0; 37];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = (i as u8).wrapping_mul(97).wrapping_add(13);
            }
            bytes
        };

        for len in [36usize, 37].iter().copied() {
            let whole = {
                let mut accum = Accumulator::new();
                accum.accumulate(&bytes[..len]);
                accum.resolve()
            };

            for first in 0..len {
                for second in first..len {
                    let mut accum = Accumulator::new();
                    accum.accumulate(&bytes[..first]);
                    accum.accumulate(&bytes[first..second]);
                    accum.accumulate(&bytes[second..len]);
                    assert_eq!(accum.resolve(), whole, "split at {} and {}", first, second);
                }
            }
        }
    }

    #[test]
    fn odd_length_pads_zero() {
        assert_eq!(data(&[0x12, 0x34, 0x56]), data(&[0x12, 0x34, 0x56, 0x00]));
    }

    #[test]
    fn double_carry() {
        // 0xffff + 0xffff + 0x0002 = 0x20000, folds to 0x0002 after two passes.
        assert_eq!(resolve(0x0002_ffff + 0xffff), !0x0002);
        assert_eq!(combine(&[0xffff, 0xffff, 0x0002]), 0x0002);
    }
}
