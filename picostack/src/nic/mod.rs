//! Encapsulates a network interface card.
//!
//! The engine never sees a device buffer as a whole. A [`Link`] delivers the first bytes of the
//! next frame into the engine's own buffer, keeps the remainder in device memory for streaming or
//! random access, and assembles outbound frames from a header block plus a data source while
//! computing the checksums it is asked for.
//!
//! [`Link`]: trait.Link.html
pub mod loopback;

use core::ops;

use crate::layer::Result;
use crate::wire::DataSource;

pub use self::loopback::Loopback;

/// Checksum validity flags of a received frame, and checksum requests of a transmitted one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Checksums(pub u8);

impl Checksums {
    pub const NONE: Checksums = Checksums(0);
    pub const IPV4: Checksums = Checksums(1);
    pub const ICMP: Checksums = Checksums(2);
    pub const TCP:  Checksums = Checksums(4);
    pub const UDP:  Checksums = Checksums(8);
    /// A UDP datagram from the DHCP server port to the client port.
    pub const DHCP: Checksums = Checksums(16);

    /// Test whether all flags of `other` are set.
    pub fn contains(self, other: Checksums) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Checksums) {
        self.0 |= other.0;
    }
}

impl ops::BitOr for Checksums {
    type Output = Checksums;

    fn bitor(self, rhs: Checksums) -> Checksums {
        Checksums(self.0 | rhs.0)
    }
}

/// The meta data of a received frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// The full length of the frame, whether resident or not.
    pub length: usize,
    /// Checksums the link found to be valid.
    pub checksums: Checksums,
}

/// Byte access to the part of the current frame that is not resident.
pub trait Stream {
    /// Move the read cursor to an absolute offset within the current frame.
    fn seek(&mut self, offset: usize);

    /// Read the byte at the cursor and advance it.
    ///
    /// Returns `None` past the end of the frame or when no frame is current.
    fn next_byte(&mut self) -> Option<u8>;

    /// Read into `buf` from the cursor, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for byte in buf.iter_mut() {
            match self.next_byte() {
                Some(value) => *byte = value,
                None => break,
            }
            count += 1;
        }
        count
    }
}

/// Outbound payload appended by the link after the header block.
pub struct Appended<'a> {
    /// Where the bytes come from.
    pub source: &'a mut dyn DataSource,
    /// The offset within `source` of the first appended byte.
    pub offset: usize,
}

/// The capability the engine requires from a link layer driver.
///
/// The driver must understand the IPv4 pseudo header, received transport checksums are validated
/// while the frame is streamed from the device and never recomputed by the engine.
pub trait Link: Stream {
    /// Receive the next frame, copying as many of its first bytes as fit into `buf`.
    ///
    /// The rest of the frame stays available through the `Stream` methods until `done` is called.
    fn receive_header(&mut self, buf: &mut [u8]) -> Option<Header>;

    /// Release the current frame.
    fn done(&mut self);

    /// Transmit a frame of `length` bytes.
    ///
    /// The first bytes are taken from `frame`. When `appended` is present, `frame` holds only the
    /// headers and the remaining bytes up to `length` are produced by its source. The link fills
    /// in each checksum requested in `checksums` over the assembled frame.
    fn transmit(
        &mut self,
        frame: &[u8],
        length: usize,
        checksums: Checksums,
        appended: Option<Appended<'_>>,
    ) -> Result<()>;

    /// The number of frames waiting to be received.
    fn packets_available(&self) -> usize;
}
