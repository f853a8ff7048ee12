use crate::wire::{Ipv4Address, TcpFlags, TcpRepr, TcpSeqNumber};

/// The window we advertise.
pub const WINDOW: u16 = 536;

/// The segment size we accept, announced in our SYN.
pub const OUR_MSS: u16 = 556;

/// The segment size assumed when the peer does not announce one.
pub const DEFAULT_MSS: u16 = 536;

/// The largest segment we send, whatever the peer announces.
pub const MAX_SEGMENT: u16 = 1460;

/// A fixed connection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Connections we open.
    Client = 0,
    /// Connections accepted on the server port.
    Server = 1,
}

/// The number of roles.
pub const ROLES: usize = 2;

impl Role {
    pub const ALL: [Role; ROLES] = [Role::Client, Role::Server];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// The state of a connection.
///
/// The order matters, every state from `SynSent` onwards is subject to idle aging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    Closed,
    Listen,
    SynSent,
    SynReceived,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    TimeWait,
    LastAck,
}

impl State {
    /// Whether the idle reaper watches this state.
    pub fn is_aging(self) -> bool {
        self >= State::SynSent
    }

    /// Whether the connection is still being opened.
    pub fn is_opening(self) -> bool {
        self == State::SynSent || self == State::SynReceived
    }
}

/// A transmission control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tcb {
    pub state: State,
    /// Idle ticks left before the reaper steps in.
    pub age: u8,
    pub local_port: u16,
    pub remote_port: u16,
    pub remote_addr: Ipv4Address,
    /// The sequence number of our next byte.
    pub last_byte_sent: TcpSeqNumber,
    /// The sequence number of the last in-order byte from the peer.
    pub last_byte_received: TcpSeqNumber,
    /// The highest acknowledgment number seen.
    pub last_ack_received: TcpSeqNumber,
    /// The window the peer advertised.
    pub window: u16,
    /// The segment size the peer accepts.
    pub remote_mss: u16,
}

impl Tcb {
    /// A closed block whose sequence space starts after `isn`.
    pub fn new(isn: u32) -> Self {
        Tcb {
            state: State::Closed,
            age: 0,
            local_port: 0,
            remote_port: 0,
            remote_addr: Ipv4Address::UNSPECIFIED,
            last_byte_sent: TcpSeqNumber(isn as i32),
            last_byte_received: TcpSeqNumber(0),
            last_ack_received: TcpSeqNumber(isn as i32),
            window: 0,
            remote_mss: DEFAULT_MSS,
        }
    }

    /// Whether a segment with these ports from `remote_addr` belongs to this connection.
    pub fn matches(&self, dst_port: u16, src_port: u16, remote_addr: Ipv4Address) -> bool {
        self.state != State::Closed
            && self.local_port == dst_port
            && self.remote_port == src_port
            && self.remote_addr == remote_addr
    }

    /// The size of the segments we send.
    pub fn segment_size(&self) -> usize {
        usize::from(self.remote_mss.min(MAX_SEGMENT).max(1))
    }

    /// The acknowledgment number for our segments.
    pub fn ack_number(&self) -> TcpSeqNumber {
        self.last_byte_received + 1
    }

    /// The header of a segment from us, starting at `seq_number`.
    pub fn segment(&self, seq_number: TcpSeqNumber, flags: TcpFlags, payload_len: usize) -> TcpRepr {
        let ack_number = if flags.ack() { self.ack_number() } else { TcpSeqNumber(0) };
        TcpRepr {
            src_port: self.local_port,
            dst_port: self.remote_port,
            seq_number,
            ack_number,
            flags,
            window_len: WINDOW,
            max_seg_size: if flags.syn() { Some(OUR_MSS) } else { None },
            payload_len,
        }
    }
}

/// A Galois LFSR for initial sequence numbers.
///
/// Not cryptographic, the state is stirred with the sequence numbers of the SYNs we receive so
/// that it is not a pure function of the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Isn(u32);

impl Isn {
    const TAPS: u32 = 0x8020_0003;

    pub fn new(seed: u32) -> Self {
        Isn(if seed == 0 { 1 } else { seed })
    }

    pub fn next(&mut self) -> u32 {
        let lsb = self.0 & 1;
        self.0 >>= 1;
        if lsb != 0 {
            self.0 ^= Self::TAPS;
        }
        self.0
    }

    /// Sixteen fresh bits.
    pub fn next_u16(&mut self) -> u16 {
        for _ in 0..15 {
            self.next();
        }
        self.next() as u16
    }

    /// Mix external entropy into the state.
    pub fn shuffle(&mut self, value: u32) {
        self.0 ^= value;
        if self.0 == 0 {
            self.0 = Self::TAPS;
        }
        self.next();
    }
}
