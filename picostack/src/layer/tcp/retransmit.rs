//! The retransmission scheduler.
//!
//! A fixed pool of entries shared by all roles. Each remembers one unacknowledged segment and how
//! to send it again: a heap copy, or a generator that reproduces the payload on demand so large
//! responses need not be kept in memory.
use alloc::vec::Vec;
use core::fmt;

use crate::wire::{Generator, TcpFlags, TcpSeqNumber};

use super::Role;

/// The number of segments tracked at once.
pub const POOL_SIZE: usize = 10;

/// How to reproduce a segment.
#[derive(Clone)]
pub enum Payload {
    /// The TCP header and payload as sent.
    Copy(Vec<u8>),
    /// A payload produced by a generator.
    ///
    /// The header is rebuilt on resend, with the original sequence number and the current
    /// acknowledgment.
    Generated {
        generator: Generator,
        offset: usize,
        seq_number: TcpSeqNumber,
        len: usize,
    },
    /// A segment without payload, such as SYN or FIN.
    Control {
        seq_number: TcpSeqNumber,
        flags: TcpFlags,
    },
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Payload::Copy(copy) => write!(f, "Copy({} bytes)", copy.len()),
            Payload::Generated { offset, seq_number, len, .. } => write!(f,
                "Generated {{ offset: {}, seq_number: {}, len: {} }}", offset, seq_number, len),
            Payload::Control { seq_number, flags } => write!(f,
                "Control {{ seq_number: {}, flags: {} }}", seq_number, flags),
        }
    }
}

/// A tracked segment.
#[derive(Debug, Clone)]
pub struct Entry {
    pub role: Role,
    /// Retransmissions left.
    pub retries: u8,
    /// Ticks until the next retransmission.
    pub timeout: u8,
    /// The last sequence number the segment occupies.
    pub last_byte: TcpSeqNumber,
    pub payload: Payload,
}

impl Entry {
    /// Track a segment starting at `seq_number` that occupies `seq_len` sequence numbers.
    pub fn new(role: Role, seq_number: TcpSeqNumber, seq_len: usize, payload: Payload) -> Self {
        Entry {
            role,
            retries: 0,
            timeout: 0,
            last_byte: seq_number + seq_len.saturating_sub(1),
            payload,
        }
    }

    /// Whether an acknowledgment number covers the whole segment.
    pub fn is_acked_by(&self, ack_number: TcpSeqNumber) -> bool {
        ack_number - self.last_byte > 0
    }
}

/// The timeout after a retry.
///
/// Doubles with every attempt made so far, saturating at the largest tick count.
pub fn backoff(base: u8, attempts: u8) -> u8 {
    let factor = 1u16.checked_shl(u32::from(attempts)).unwrap_or(u16::max_value());
    let timeout = u16::from(base).saturating_mul(factor);
    if timeout > u16::from(u8::max_value()) {
        u8::max_value()
    } else {
        timeout as u8
    }
}

/// The pool of tracked segments.
#[derive(Debug, Default)]
pub struct Pool {
    entries: [Option<Entry>; POOL_SIZE],
}

impl Pool {
    pub fn new() -> Self {
        Pool::default()
    }

    /// Start tracking a segment.
    ///
    /// Gives the entry back when every slot is taken.
    pub fn insert(&mut self, entry: Entry) -> Result<usize, Entry> {
        match self.entries.iter().position(Option::is_none) {
            Some(index) => {
                self.entries[index] = Some(entry);
                Ok(index)
            }
            None => Err(entry),
        }
    }

    pub fn is_full(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }

    /// Count down every timeout by one tick.
    pub fn countdown(&mut self) {
        for entry in self.entries.iter_mut().flatten() {
            entry.timeout = entry.timeout.saturating_sub(1);
        }
    }

    /// The index of the first entry whose timeout expired.
    pub fn next_due(&self, from: usize) -> Option<usize> {
        (from..POOL_SIZE).find(|&index| match &self.entries[index] {
            Some(entry) => entry.timeout == 0,
            None => false,
        })
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        self.entries.get_mut(index)?.as_mut()
    }

    pub fn remove(&mut self, index: usize) -> Option<Entry> {
        self.entries.get_mut(index)?.take()
    }

    /// Drop the entries of `role` fully covered by `ack_number`.
    pub fn cancel_acked(&mut self, role: Role, ack_number: TcpSeqNumber) -> usize {
        self.cancel_where(|entry| entry.role == role && entry.is_acked_by(ack_number))
    }

    /// Drop all entries of `role`.
    pub fn cancel_all(&mut self, role: Role) -> usize {
        self.cancel_where(|entry| entry.role == role)
    }

    fn cancel_where(&mut self, cancel: impl Fn(&Entry) -> bool) -> usize {
        let mut count = 0;
        for slot in self.entries.iter_mut() {
            if slot.as_ref().map_or(false, &cancel) {
                *slot = None;
                count += 1;
            }
        }
        count
    }

    /// The number of entries of `role`.
    pub fn pending(&self, role: Role) -> usize {
        self.iter().filter(|entry| entry.role == role).count()
    }

    pub fn iter(&self) -> impl Iterator<Item=&Entry> + '_ {
        self.entries.iter().flatten()
    }
}
