//! On-demand payload production.
//!
//! Outbound payloads are never required to be resident. The link pulls them from a `DataSource`
//! block by block while it writes the frame to the device and computes the transport checksum on
//! the fly. The same source may be asked again, at the same offsets, when a segment is
//! retransmitted.

/// A producer of a logical byte stream.
pub trait DataSource {
    /// Copy bytes of the stream beginning at `offset` into `out`.
    ///
    /// Fills at most `out.len()` bytes and never reads past the end of the stream. Returns the
    /// total length of the stream, independent of `offset`. When `out` is empty no copy is made and
    /// the call only reports that total.
    fn produce(&mut self, offset: usize, out: &mut [u8]) -> usize;

    /// The total available length of the stream.
    fn total_len(&mut self) -> usize {
        self.produce(0, &mut [])
    }
}

/// A stateless, static payload generator.
///
/// It follows the `DataSource` contract and, unlike a borrowed source, can be stored until the
/// segment it produced has been acknowledged. Retransmission then re-invokes it instead of keeping
/// a copy of the payload on the heap.
pub type Generator = fn(offset: usize, out: &mut [u8]) -> usize;

/// Where the payload of a send operation comes from.
pub enum Source<'a> {
    /// Borrowed for the duration of the call only.
    ///
    /// Retransmitting such a payload requires a heap copy.
    Borrowed(&'a mut dyn DataSource),
    /// A generator that can be called again at any time.
    Generator(Generator),
}

/// Wraps a closure as a `DataSource`.
pub struct FnSource<F>(pub F);

impl DataSource for [u8] {
    fn produce(&mut self, offset: usize, out: &mut [u8]) -> usize {
        copy_from(self, offset, out)
    }
}

impl DataSource for &'_ [u8] {
    fn produce(&mut self, offset: usize, out: &mut [u8]) -> usize {
        copy_from(self, offset, out)
    }
}

impl DataSource for Generator {
    fn produce(&mut self, offset: usize, out: &mut [u8]) -> usize {
        self(offset, out)
    }
}

impl<F> DataSource for FnSource<F>
    where F: FnMut(usize, &mut [u8]) -> usize
{
    fn produce(&mut self, offset: usize, out: &mut [u8]) -> usize {
        (self.0)(offset, out)
    }
}

impl Source<'_> {
    /// Produce bytes from either kind of source.
    pub fn produce(&mut self, offset: usize, out: &mut [u8]) -> usize {
        match self {
            Source::Borrowed(source) => source.produce(offset, out),
            Source::Generator(generator) => generator(offset, out),
        }
    }

    /// The total length of the underlying stream.
    pub fn total_len(&mut self) -> usize {
        self.produce(0, &mut [])
    }

    /// Reborrow as a dynamic data source.
    pub fn as_dyn(&mut self) -> &mut dyn DataSource {
        match self {
            Source::Borrowed(source) => &mut **source,
            Source::Generator(generator) => generator,
        }
    }
}

fn copy_from(data: &[u8], offset: usize, out: &mut [u8]) -> usize {
    if let Some(rest) = data.get(offset..) {
        let len = rest.len().min(out.len());
        out[..len].copy_from_slice(&rest[..len]);
    }
    data.len()
}
