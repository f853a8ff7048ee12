//! The TCP layer.
//!
//! Connections live in fixed slots, one per [`Role`]. There is no reordering: a segment is
//! accepted only if it continues exactly where the last one ended, anything else is dropped and
//! left to the peer's retransmission. Our own unacknowledged segments are tracked in the shared
//! retransmission [`Pool`] and resent with exponential backoff until acknowledged or given up.
//!
//! Two wind-down states are collapsed. A FIN received on an established connection is answered
//! with FIN|ACK right away, skipping `CloseWait`. A FIN received while we are closing ends the
//! connection without lingering in `TimeWait`.
//!
//! [`Role`]: enum.Role.html
//! [`Pool`]: retransmit/struct.Pool.html
mod connection;
pub mod retransmit;


use alloc::vec::Vec;

use crate::nic::{Appended, Checksums, Link};
use crate::wire::{Checksum, DataSource, IpProtocol, Ipv4Address, Ipv4Repr, Source};
use crate::wire::{tcp_packet, TcpFlags, TcpRepr, TcpSeqNumber, TCP_HEADER_LEN, TCP_MSS_OPTION_LEN};

use super::ip::{self, HEADERS_LEN};
use super::{Error, Handler, Payload, Result};

pub use self::connection::{Isn, Role, State, Tcb, ROLES};
pub use self::connection::{DEFAULT_MSS, MAX_SEGMENT, OUR_MSS, WINDOW};
use self::retransmit::{backoff, Entry, Pool};

/// The largest header block of an outbound segment.
const FRAME_HEADERS_LEN: usize = HEADERS_LEN + TCP_HEADER_LEN + TCP_MSS_OPTION_LEN;

/// Tunables of the TCP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// The port the server role answers SYNs on.
    pub server_port: u16,
    /// Retransmissions before a connection is given up.
    pub retries: u8,
    /// The first retransmission timeout, in ticks.
    pub timeout: u8,
    /// Idle ticks before a connection is reaped.
    pub max_age: u8,
    /// Drop segments with contradictory flags.
    pub filter_flags: bool,
}

/// Event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Segments sent without tracking because the pool was full.
    pub untracked: u32,
    pub retransmissions: u32,
    /// Connections closed after exhausting their retries.
    pub failed: u32,
    /// Connections closed by the idle reaper.
    pub reaped: u32,
    /// Segments refused with a reset.
    pub refused: u32,
}

/// New in-order payload of a connection.
pub struct DataIn<'a> {
    pub remote_addr: Ipv4Address,
    pub remote_port: u16,
    pub seq_number: TcpSeqNumber,
    /// The number of bytes not seen before.
    pub new_data: usize,
    /// Leading payload bytes that were already delivered by an earlier segment.
    pub skip: usize,
    /// The whole payload of the segment.
    pub payload: Payload<'a>,
}

impl DataIn<'_> {
    /// Read the new bytes, starting `at` bytes into them.
    pub fn read_new(&mut self, at: usize, buf: &mut [u8]) -> usize {
        let len = buf.len().min(self.new_data.saturating_sub(at));
        self.payload.read_at(self.skip + at, &mut buf[..len])
    }
}

/// The connection state of the interface.
#[derive(Debug)]
pub struct Endpoint {
    tcbs: [Tcb; ROLES],
    pool: Pool,
    isn: Isn,
    settings: Settings,
    counters: Counters,
}

/// Whether a flag combination is plausible.
///
/// Rejects segments without any flag or with all of them, and those combining flags that exclude
/// each other. FIN, PSH and URG are only valid together with ACK.
pub fn flags_sane(flags: TcpFlags) -> bool {
    let flags = flags.classic();
    if flags == TcpFlags(0) || flags == TcpFlags::ALL {
        return false;
    }
    if !flags.ack() && (flags.fin() || flags.psh() || flags.urg()) {
        return false;
    }
    !(flags.fin() && flags.rst()) && !(flags.syn() && flags.fin()) && !(flags.syn() && flags.rst())
}

impl Endpoint {
    pub fn new(settings: Settings, isn_seed: u32) -> Self {
        let mut isn = Isn::new(isn_seed);
        let tcbs = [Tcb::new(isn.next()), Tcb::new(isn.next())];
        Endpoint {
            tcbs,
            pool: Pool::new(),
            isn,
            settings,
            counters: Counters::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// The state of a role.
    pub fn status(&self, role: Role) -> State {
        self.tcbs[role.index()].state
    }

    /// The control block of a role.
    pub fn tcb(&self, role: Role) -> &Tcb {
        &self.tcbs[role.index()]
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Whether an open connection uses `port` locally.
    pub fn port_in_use(&self, port: u16) -> bool {
        self.tcbs.iter().any(|tcb| tcb.state != State::Closed && tcb.local_port == port)
    }

    /// Open a connection.
    ///
    /// Sends a SYN announcing our segment size and waits in `SynSent`.
    pub fn connect<L: Link>(
        &mut self,
        ip: &mut ip::Endpoint,
        link: &mut L,
        role: Role,
        local_port: u16,
        remote_port: u16,
        remote_addr: Ipv4Address,
    ) -> Result<()> {
        let max_age = self.settings.max_age;
        let tcb = &mut self.tcbs[role.index()];
        if tcb.state != State::Closed {
            return Err(Error::Illegal);
        }

        tcb.local_port = local_port;
        tcb.remote_port = remote_port;
        tcb.remote_addr = remote_addr;
        tcb.remote_mss = DEFAULT_MSS;
        tcb.last_byte_received = TcpSeqNumber(0);
        tcb.last_byte_sent += 1;
        let seq_number = tcb.last_byte_sent;
        tcb.last_ack_received = seq_number - 1usize;
        tcb.age = max_age;
        set_state(role, tcb, State::SynSent);

        let repr = tcb.segment(seq_number, TcpFlags::SYN, 0);
        tcb.last_byte_sent += 1;
        self.schedule(role, seq_number, 1, retransmit::Payload::Control {
            seq_number,
            flags: TcpFlags::SYN,
        });

        if let Err(err) = transmit(ip, link, remote_addr, &repr, None) {
            self.reset(role);
            return Err(err);
        }
        Ok(())
    }

    /// Accept connections on `port` with the server role.
    pub fn listen(&mut self, port: u16) -> Result<()> {
        let tcb = &mut self.tcbs[Role::Server.index()];
        match tcb.state {
            State::Closed | State::Listen => (),
            _ => return Err(Error::Illegal),
        }
        self.settings.server_port = port;
        tcb.local_port = port;
        set_state(Role::Server, tcb, State::Listen);
        Ok(())
    }

    /// Send the bytes of `source` on an established connection.
    ///
    /// The data is split into segments no larger than the peer accepts. With `retransmit`, every
    /// segment is tracked until acknowledged: a generator is simply kept, a borrowed source is
    /// copied to the heap. Returns the number of bytes sent.
    pub fn send<L: Link>(
        &mut self,
        ip: &mut ip::Endpoint,
        link: &mut L,
        role: Role,
        mut source: Source<'_>,
        retransmit: bool,
    ) -> Result<usize> {
        if self.tcbs[role.index()].state != State::Established {
            return Err(Error::Illegal);
        }

        let total = source.total_len();
        let segment_size = self.tcbs[role.index()].segment_size();
        let mut offset = 0;
        while offset < total {
            let len = (total - offset).min(segment_size);
            let tcb = self.tcbs[role.index()];
            let seq_number = tcb.last_byte_sent;
            let repr = tcb.segment(seq_number, TcpFlags::ACK, len);

            let tracked = if retransmit {
                Some(match &mut source {
                    Source::Generator(generator) => retransmit::Payload::Generated {
                        generator: *generator,
                        offset,
                        seq_number,
                        len,
                    },
                    Source::Borrowed(data) => {
                        retransmit::Payload::Copy(copy_segment(&repr, &mut **data, offset)?)
                    }
                })
            } else {
                None
            };

            {
                let tcb = &mut self.tcbs[role.index()];
                tcb.last_byte_sent += len;
                tcb.age = self.settings.max_age;
            }
            if let Some(payload) = tracked {
                self.schedule(role, seq_number, len, payload);
            }

            let appended = Appended { source: source.as_dyn(), offset };
            transmit(ip, link, tcb.remote_addr, &repr, Some(appended))?;
            offset += len;
        }

        Ok(total)
    }

    /// Close a connection.
    ///
    /// An open connection sends FIN and winds down, one still opening is dropped at once. Pending
    /// retransmissions of the role are cancelled in any case.
    pub fn close<L: Link>(&mut self, ip: &mut ip::Endpoint, link: &mut L, role: Role) -> Result<()> {
        self.pool.cancel_all(role);
        match self.tcbs[role.index()].state {
            State::Established | State::SynReceived => {
                self.set_state(role, State::FinWait1);
                self.send_fin(ip, link, role)
            }
            State::CloseWait => {
                self.set_state(role, State::LastAck);
                self.send_fin(ip, link, role)
            }
            State::Listen | State::SynSent => {
                self.set_state(role, State::Closed);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Reset a connection.
    pub fn abort<L: Link>(&mut self, ip: &mut ip::Endpoint, link: &mut L, role: Role) -> Result<()> {
        let tcb = self.tcbs[role.index()];
        self.reset(role);
        match tcb.state {
            State::Closed | State::Listen => Ok(()),
            _ => {
                let repr = tcb.segment(tcb.last_byte_sent, TcpFlags::RST | TcpFlags::ACK, 0);
                transmit(ip, link, tcb.remote_addr, &repr, None)
            }
        }
    }

    /// Count down retransmission timeouts and connection ages by one tick.
    pub fn tick(&mut self) {
        self.pool.countdown();
        for tcb in self.tcbs.iter_mut() {
            if tcb.state.is_aging() {
                tcb.age = tcb.age.saturating_sub(1);
            }
        }
    }

    /// Resend due segments and reap idle connections.
    pub fn service<L: Link>(&mut self, ip: &mut ip::Endpoint, link: &mut L) {
        let mut from = 0;
        while let Some(index) = self.pool.next_due(from) {
            from = index + 1;
            self.retransmit(ip, link, index);
        }

        for &role in Role::ALL.iter() {
            let tcb = self.tcbs[role.index()];
            if !tcb.state.is_aging() || tcb.age != 0 {
                continue;
            }
            // A tracked SYN is given up by its retransmissions.
            if tcb.state.is_opening() && self.pool.pending(role) > 0 {
                continue;
            }
            net_debug!("tcp: {:?} idle in {:?}", role, tcb.state);
            self.counters.reaped += 1;
            match tcb.state {
                State::Established | State::CloseWait => {
                    if let Err(err) = self.close(ip, link, role) {
                        net_trace!("tcp: reaper FIN failed: {:?}", err);
                    }
                }
                _ => self.reset(role),
            }
        }
    }

    /// Process a received segment.
    ///
    /// `frame` is the resident frame and `offset` the start of the TCP header within it. Returns
    /// whether the segment concerned one of our connections.
    #[allow(clippy::too_many_arguments)]
    pub fn receive<L: Link, H: Handler + ?Sized>(
        &mut self,
        ip: &mut ip::Endpoint,
        link: &mut L,
        handler: &mut H,
        frame: &[u8],
        offset: usize,
        ip_repr: &Ipv4Repr,
        checksums: Checksums,
    ) -> crate::wire::Result<bool> {
        if !checksums.contains(Checksums::TCP) {
            return Err(crate::wire::Error::WrongChecksum);
        }
        let packet = tcp_packet::new_checked(&frame[offset..])?;
        let repr = TcpRepr::parse(packet, ip_repr, Checksum::Ignored)?;
        net_trace!("tcp: {}", repr);
        if self.settings.filter_flags && !flags_sane(repr.flags) {
            return Err(crate::wire::Error::Malformed);
        }
        if repr.flags.syn() {
            self.isn.shuffle(repr.seq_number.0 as u32);
        }
        let remote_addr = ip_repr.src_addr;

        if repr.dst_port == self.settings.server_port {
            let server = self.tcbs[Role::Server.index()];
            match server.state {
                State::Closed | State::Listen => {
                    if repr.flags.syn() && !repr.flags.ack() {
                        self.accept(ip, link, remote_addr, &repr);
                        return Ok(true);
                    }
                    return Ok(false);
                }
                _ if !server.matches(repr.dst_port, repr.src_port, remote_addr) => {
                    if repr.flags.syn() && !repr.flags.ack() {
                        self.refuse(ip, link, remote_addr, &repr);
                    }
                    return Ok(false);
                }
                _ => (),
            }
        }

        let role = match Role::ALL.iter()
            .copied()
            .find(|role| self.tcbs[role.index()].matches(repr.dst_port, repr.src_port, remote_addr))
        {
            Some(role) => role,
            None => return Ok(false),
        };
        self.tcbs[role.index()].age = self.settings.max_age;

        if repr.flags.rst() {
            net_debug!("tcp: {:?} reset by peer", role);
            self.reset(role);
            return Ok(true);
        }

        if repr.flags.ack() {
            let tcb = &mut self.tcbs[role.index()];
            if repr.ack_number - tcb.last_ack_received > 0 {
                tcb.last_ack_received = repr.ack_number;
                tcb.window = repr.window_len;
                self.pool.cancel_acked(role, repr.ack_number);
            }
        }

        let payload_offset = offset + usize::from(packet.header_len());
        let segment = Segment {
            repr: &repr,
            remote_addr,
            resident: packet.payload_slice(),
            offset: payload_offset,
        };

        let tcb = self.tcbs[role.index()];
        match tcb.state {
            State::SynSent => {
                if repr.flags.syn() && repr.flags.ack() && repr.ack_number == tcb.last_byte_sent {
                    {
                        let tcb = &mut self.tcbs[role.index()];
                        tcb.last_byte_received = repr.seq_number;
                        tcb.remote_mss = repr.max_seg_size.unwrap_or(DEFAULT_MSS);
                        tcb.window = repr.window_len;
                    }
                    self.set_state(role, State::Established);
                    self.pool.cancel_all(role);
                    self.send_ack(ip, link, role);
                }
            }
            State::SynReceived => {
                if repr.flags.ack() && !repr.flags.syn() && repr.ack_number == tcb.last_byte_sent {
                    self.tcbs[role.index()].last_byte_received = repr.seq_number - 1usize;
                    self.set_state(role, State::Established);
                    self.established(ip, link, handler, role, &segment);
                }
            }
            State::Established => self.established(ip, link, handler, role, &segment),
            State::FinWait1 | State::FinWait2 => {
                if let Some(accepted) = self.in_order(link, handler, role, &segment) {
                    let tcb = self.tcbs[role.index()];
                    let fin_acked = repr.flags.ack()
                        && repr.ack_number - tcb.last_byte_sent >= 0;
                    if accepted.fin {
                        self.send_ack(ip, link, role);
                        self.reset(role);
                    } else {
                        if accepted.ack {
                            self.send_ack(ip, link, role);
                        }
                        if fin_acked && tcb.state == State::FinWait1 {
                            self.set_state(role, State::FinWait2);
                        }
                    }
                }
            }
            State::LastAck => {
                if repr.flags.ack() && repr.ack_number - tcb.last_byte_sent >= 0 {
                    self.reset(role);
                }
            }
            State::Closed | State::Listen | State::CloseWait | State::Closing | State::TimeWait => (),
        }

        Ok(true)
    }

    fn established<L: Link, H: Handler + ?Sized>(
        &mut self,
        ip: &mut ip::Endpoint,
        link: &mut L,
        handler: &mut H,
        role: Role,
        segment: &Segment,
    ) {
        let accepted = match self.in_order(link, handler, role, segment) {
            Some(accepted) => accepted,
            None => return,
        };

        if accepted.fin {
            self.set_state(role, State::LastAck);
            if let Err(err) = self.send_fin(ip, link, role) {
                net_trace!("tcp: FIN failed: {:?}", err);
            }
        } else if accepted.ack {
            self.send_ack(ip, link, role);
        }
    }

    /// Apply a segment to the receive sequence, if it is in order.
    ///
    /// New payload is handed to the handler before anything is sent, address resolution for the
    /// acknowledgment may consume the rest of the frame.
    fn in_order<L: Link, H: Handler + ?Sized>(
        &mut self,
        link: &mut L,
        handler: &mut H,
        role: Role,
        segment: &Segment,
    ) -> Option<Accepted> {
        let repr = segment.repr;
        let tcb = &mut self.tcbs[role.index()];
        if repr.seq_number - tcb.last_byte_received > 1 {
            net_trace!("tcp: {:?} out of order seq={} expected={}",
                role, repr.seq_number, tcb.ack_number());
            return None;
        }

        let fin = repr.flags.fin();
        let last_byte = repr.seq_number + (repr.payload_len + usize::from(fin)) - 1usize;
        let new = last_byte - tcb.last_byte_received;
        let accepted = Accepted {
            fin: fin && new > 0,
            ack: repr.payload_len != 0 || fin,
        };
        if new <= 0 {
            return Some(accepted);
        }

        tcb.last_byte_received = last_byte;
        let new_data = new as usize - usize::from(fin);
        if new_data > 0 {
            let data = DataIn {
                remote_addr: segment.remote_addr,
                remote_port: repr.src_port,
                seq_number: repr.seq_number,
                new_data,
                skip: repr.payload_len - new_data,
                payload: Payload::new(segment.resident, repr.payload_len, segment.offset, link),
            };
            handler.data_in(role, data);
        }
        Some(accepted)
    }

    /// Answer a SYN to the server port.
    fn accept<L: Link>(
        &mut self,
        ip: &mut ip::Endpoint,
        link: &mut L,
        remote_addr: Ipv4Address,
        syn: &TcpRepr,
    ) {
        let advance = 1500 + usize::from(self.isn.next_u16());
        let tcb = &mut self.tcbs[Role::Server.index()];
        tcb.local_port = syn.dst_port;
        tcb.remote_port = syn.src_port;
        tcb.remote_addr = remote_addr;
        tcb.last_byte_received = syn.seq_number;
        tcb.window = syn.window_len;
        tcb.remote_mss = syn.max_seg_size.unwrap_or(DEFAULT_MSS);
        tcb.last_byte_sent += advance;
        let seq_number = tcb.last_byte_sent;
        tcb.last_ack_received = seq_number - 1usize;
        tcb.age = self.settings.max_age;
        let flags = TcpFlags::SYN | TcpFlags::ACK;
        let repr = tcb.segment(seq_number, flags, 0);
        tcb.last_byte_sent += 1;
        self.set_state(Role::Server, State::SynReceived);

        self.pool.cancel_all(Role::Server);
        self.schedule(Role::Server, seq_number, 1, retransmit::Payload::Control { seq_number, flags });
        if let Err(err) = transmit(ip, link, remote_addr, &repr, None) {
            net_trace!("tcp: SYN-ACK failed: {:?}", err);
        }
    }

    /// Refuse a SYN with a reset, without tracking anything.
    fn refuse<L: Link>(
        &mut self,
        ip: &mut ip::Endpoint,
        link: &mut L,
        remote_addr: Ipv4Address,
        syn: &TcpRepr,
    ) {
        self.counters.refused += 1;
        let repr = TcpRepr {
            src_port: syn.dst_port,
            dst_port: syn.src_port,
            seq_number: TcpSeqNumber(0),
            ack_number: syn.seq_number + 1,
            flags: TcpFlags::RST | TcpFlags::ACK,
            window_len: 0,
            max_seg_size: None,
            payload_len: 0,
        };
        if let Err(err) = transmit(ip, link, remote_addr, &repr, None) {
            net_trace!("tcp: RST failed: {:?}", err);
        }
    }

    fn send_ack<L: Link>(&mut self, ip: &mut ip::Endpoint, link: &mut L, role: Role) {
        let tcb = &mut self.tcbs[role.index()];
        tcb.age = self.settings.max_age;
        let repr = tcb.segment(tcb.last_byte_sent, TcpFlags::ACK, 0);
        let remote_addr = tcb.remote_addr;
        if let Err(err) = transmit(ip, link, remote_addr, &repr, None) {
            net_trace!("tcp: ACK failed: {:?}", err);
        }
    }

    /// Send FIN|ACK and track it, the FIN occupies one sequence number.
    fn send_fin<L: Link>(&mut self, ip: &mut ip::Endpoint, link: &mut L, role: Role) -> Result<()> {
        let flags = TcpFlags::FIN | TcpFlags::ACK;
        let tcb = &mut self.tcbs[role.index()];
        tcb.age = self.settings.max_age;
        let seq_number = tcb.last_byte_sent;
        let repr = tcb.segment(seq_number, flags, 0);
        let remote_addr = tcb.remote_addr;
        tcb.last_byte_sent += 1;
        self.schedule(role, seq_number, 1, retransmit::Payload::Control { seq_number, flags });
        transmit(ip, link, remote_addr, &repr, None)
    }

    fn retransmit<L: Link>(&mut self, ip: &mut ip::Endpoint, link: &mut L, index: usize) {
        let Endpoint { tcbs, pool, settings, counters, .. } = self;
        let entry = match pool.get_mut(index) {
            Some(entry) => entry,
            None => return,
        };
        let role = entry.role;

        if entry.retries == 0 {
            net_debug!("tcp: {:?} gave up on segment ending {}", role, entry.last_byte);
            pool.remove(index);
            pool.cancel_all(role);
            counters.failed += 1;
            set_state(role, &mut tcbs[role.index()], State::Closed);
            return;
        }

        entry.retries -= 1;
        entry.timeout = backoff(settings.timeout, settings.retries.saturating_sub(entry.retries));
        counters.retransmissions += 1;

        let tcb = &mut tcbs[role.index()];
        tcb.age = settings.max_age;
        net_trace!("tcp: {:?} resending {:?}", role, entry.payload);
        let result = match &entry.payload {
            retransmit::Payload::Copy(copy) => transmit_copy(ip, link, tcb.remote_addr, copy),
            retransmit::Payload::Generated { generator, offset, seq_number, len } => {
                let repr = tcb.segment(*seq_number, TcpFlags::ACK, *len);
                let mut generator = *generator;
                let appended = Appended { source: &mut generator, offset: *offset };
                transmit(ip, link, tcb.remote_addr, &repr, Some(appended))
            }
            retransmit::Payload::Control { seq_number, flags } => {
                let repr = tcb.segment(*seq_number, *flags, 0);
                transmit(ip, link, tcb.remote_addr, &repr, None)
            }
        };
        if let Err(err) = result {
            net_trace!("tcp: resend failed: {:?}", err);
        }
    }

    /// Track a segment for retransmission, or count it when the pool is full.
    fn schedule(
        &mut self,
        role: Role,
        seq_number: TcpSeqNumber,
        seq_len: usize,
        payload: retransmit::Payload,
    ) {
        let mut entry = Entry::new(role, seq_number, seq_len, payload);
        entry.retries = self.settings.retries;
        entry.timeout = self.settings.timeout;
        if self.pool.insert(entry).is_err() {
            net_debug!("tcp: retransmission pool full, segment {} untracked", seq_number);
            self.counters.untracked += 1;
        }
    }

    /// Force a role to `Closed` and forget its retransmissions.
    fn reset(&mut self, role: Role) {
        self.pool.cancel_all(role);
        self.set_state(role, State::Closed);
    }

    fn set_state(&mut self, role: Role, state: State) {
        set_state(role, &mut self.tcbs[role.index()], state)
    }
}

fn set_state(role: Role, tcb: &mut Tcb, state: State) {
    if tcb.state != state {
        net_debug!("tcp: {:?} {:?} -> {:?}", role, tcb.state, state);
        tcb.state = state;
    }
}

/// A received segment, as far as the state machine needs it.
struct Segment<'a> {
    repr: &'a TcpRepr,
    remote_addr: Ipv4Address,
    resident: &'a [u8],
    offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct Accepted {
    /// The segment carried a FIN we had not seen.
    fin: bool,
    /// The segment must be acknowledged.
    ack: bool,
}

/// Emit the headers of a segment and transmit it, with an optional payload.
fn transmit<L: Link>(
    ip: &mut ip::Endpoint,
    link: &mut L,
    remote_addr: Ipv4Address,
    repr: &TcpRepr,
    appended: Option<Appended<'_>>,
) -> Result<()> {
    let mut frame = [0u8; FRAME_HEADERS_LEN];
    let headers_len = HEADERS_LEN + repr.header_len();
    ip.build_header(&mut frame, repr.segment_len(), remote_addr, IpProtocol::Tcp);
    repr.emit(tcp_packet::new_unchecked_mut(&mut frame[HEADERS_LEN..headers_len]));
    let length = HEADERS_LEN + repr.segment_len();
    ip.launch(link, &mut frame[..headers_len], length, Checksums::TCP, appended)
}

/// Transmit a copied segment verbatim.
fn transmit_copy<L: Link>(
    ip: &mut ip::Endpoint,
    link: &mut L,
    remote_addr: Ipv4Address,
    copy: &[u8],
) -> Result<()> {
    let mut frame = [0u8; HEADERS_LEN];
    ip.build_header(&mut frame, copy.len(), remote_addr, IpProtocol::Tcp);
    let mut source = copy;
    let appended = Appended { source: &mut source, offset: 0 };
    ip.launch(link, &mut frame, HEADERS_LEN + copy.len(), Checksums::TCP, Some(appended))
}

/// Copy the header and payload of a segment to the heap.
fn copy_segment(repr: &TcpRepr, source: &mut dyn DataSource, offset: usize) -> Result<Vec<u8>> {
    let header_len = repr.header_len();
    let len = header_len + repr.payload_len;
    let mut copy = Vec::new();
    copy.try_reserve_exact(len).map_err(|_| Error::Exhausted)?;
    copy.resize(len, 0);
    repr.emit(tcp_packet::new_unchecked_mut(&mut copy[..header_len]));
    source.produce(offset, &mut copy[header_len..]);
    Ok(copy)
}
