//! The process logic of protocol layers.
//!
//! ## Layering
//!
//! Each protocol layer is split into two parts; the packet logic contained in `wire` and the
//! processing part in this module. An endpoint represents the local state of a protocol: the
//! address cache, the UDP binding table, the transmission control blocks. The [`Engine`] owns one
//! endpoint per layer and routes the single receive buffer through them.
//!
//! ## Receiving
//!
//! Received payloads are handed upwards through the [`Handler`] trait. A handler sees the resident
//! part of a payload as a slice of the receive buffer and reaches the remainder through the link's
//! [`Stream`]. It must not keep either, the buffer is reused for the next frame.
//!
//! ## Sending
//!
//! Every outbound frame is assembled in a small scratch buffer holding only its headers. Payloads
//! are pulled from a [`DataSource`] by the link while it transmits. This way, answering a segment
//! never overwrites the packet still being processed.
//!
//! [`Engine`]: ../struct.Engine.html
//! [`Handler`]: trait.Handler.html
//! [`Stream`]: ../nic/trait.Stream.html
//! [`DataSource`]: ../wire/trait.DataSource.html
pub mod arp;
pub mod icmp;
pub mod ip;
pub mod tcp;
pub mod udp;

#[cfg(test)]
mod fixtures;

use crate::nic::Stream;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The operation was not permitted.
    ///
    /// Returned when an endpoint is not in a state that allows the operation, such as sending on
    /// a connection that is not established or registering a port twice.
    Illegal,

    /// The payload does not fit.
    ///
    /// The requested length exceeds the data source or the largest frame.
    BadSize,

    /// Unable to find a link address for the destination.
    Unreachable,

    /// The action could not be completed because there were not enough resources.
    ///
    /// The main difference towards `Illegal` is that implies that it would have been legal with
    /// more resources: a free binding slot, or heap for a retransmission copy.
    Exhausted,
}

/// Can convert from a wire error.
///
/// This indicates some layer tried to operate on a packet but failed.
impl From<crate::wire::Error> for Error {
    fn from(_: crate::wire::Error) -> Self {
        Error::Illegal
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::Illegal => write!(f, "operation not permitted"),
            Error::BadSize => write!(f, "payload does not fit"),
            Error::Unreachable => write!(f, "destination unreachable"),
            Error::Exhausted => write!(f, "resources exhausted"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A received payload, partially resident in the receive buffer.
///
/// The resident bytes are a slice of the buffer, the rest is read through the link on demand.
pub struct Payload<'a> {
    resident: &'a [u8],
    len: usize,
    offset: usize,
    stream: &'a mut dyn Stream,
}

impl<'a> Payload<'a> {
    /// Describe a payload of `len` bytes starting at `offset` within the frame.
    ///
    /// `resident` must hold the first bytes of the payload, it is cut to `len`.
    pub fn new(resident: &'a [u8], len: usize, offset: usize, stream: &'a mut dyn Stream) -> Self {
        let resident = &resident[..resident.len().min(len)];
        Payload { resident, len, offset, stream }
    }

    /// The full payload length.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes that were delivered together with the headers.
    pub fn resident(&self) -> &'a [u8] {
        self.resident
    }

    /// Whether the whole payload is resident.
    pub fn is_complete(&self) -> bool {
        self.resident.len() == self.len
    }

    /// Read payload bytes from `at` into `buf`, regardless of where they reside.
    ///
    /// Returns the number of bytes read, less than `buf.len()` only at the end of the payload.
    pub fn read_at(&mut self, at: usize, buf: &mut [u8]) -> usize {
        let wanted = buf.len().min(self.len.saturating_sub(at));
        let mut done = 0;
        if let Some(resident) = self.resident.get(at..) {
            done = resident.len().min(wanted);
            buf[..done].copy_from_slice(&resident[..done]);
        }
        if done < wanted {
            self.stream.seek(self.offset + at + done);
            done += self.stream.read(&mut buf[done..wanted]);
        }
        done
    }
}

/// Receives the payloads the engine accepts.
///
/// Both methods default to discarding the data, implement those of interest.
pub trait Handler {
    /// A datagram arrived for a registered binding.
    fn udp(&mut self, binding: udp::Binding, datagram: udp::Datagram<'_>) {
        let _ = (binding, datagram);
    }

    /// New in-order payload arrived on a connection.
    fn data_in(&mut self, role: tcp::Role, data: tcp::DataIn<'_>) {
        let _ = (role, data);
    }
}

/// Discards everything.
impl Handler for () {}

/// A standard wrapper for a function implementing the handler trait.
///
/// The function receives every event, wrapped in `Event`.
pub struct FnHandler<F>(pub F);

/// An upcall, for handlers written as a single function.
pub enum Event<'a> {
    Udp(udp::Binding, udp::Datagram<'a>),
    DataIn(tcp::Role, tcp::DataIn<'a>),
}

impl<F> Handler for FnHandler<F>
    where F: FnMut(Event<'_>)
{
    fn udp(&mut self, binding: udp::Binding, datagram: udp::Datagram<'_>) {
        (self.0)(Event::Udp(binding, datagram))
    }

    fn data_in(&mut self, role: tcp::Role, data: tcp::DataIn<'_>) {
        (self.0)(Event::DataIn(role, data))
    }
}
