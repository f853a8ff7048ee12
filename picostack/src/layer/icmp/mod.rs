//! The ICMP echo responder.
//!
//! A request is turned into its reply in place, inside the receive buffer. Only the resident part
//! of the request is echoed: whatever size a sender claims, the reply never exceeds the buffer.
#[cfg(test)]
mod tests;

use crate::nic::{Checksums, Link};
use crate::wire::{Checksum, ethernet_frame, icmpv4_packet, Icmpv4Message, Icmpv4Repr};
use crate::wire::{ipv4_packet, Ipv4Repr, ETHERNET_HEADER_LEN};

use super::ip::{self, Destination};
use super::Result;

/// Answer an echo request.
///
/// `frame` is the resident part of the received frame. Returns whether a reply was sent, only
/// echo requests to our unicast address are answered.
pub fn answer<L: Link>(
    ip: &ip::Endpoint,
    link: &mut L,
    frame: &mut [u8],
    repr: &Ipv4Repr,
    destination: Destination,
) -> Result<bool> {
    if destination != Destination::Unicast {
        return Ok(false);
    }

    let header_len = {
        let packet = ipv4_packet::new_checked(&frame[ETHERNET_HEADER_LEN..])?;
        usize::from(packet.header_len())
    };
    let icmp_start = ETHERNET_HEADER_LEN + header_len;
    let icmp_end = (icmp_start + repr.payload_len).min(frame.len());
    let request = icmpv4_packet::new_checked(&frame[icmp_start..icmp_end])?;
    match Icmpv4Repr::parse(request, Checksum::Ignored)? {
        Icmpv4Repr::EchoRequest { ident, seq_no } => {
            net_trace!("icmp: echo request {}/{} from {}", ident, seq_no, repr.src_addr);
        }
        Icmpv4Repr::EchoReply { .. } => return Ok(false),
    }

    let local = *ip.addresses();
    let eth = ethernet_frame::new_unchecked_mut(frame);
    let requester = eth.src_addr();
    eth.set_dst_addr(requester);
    eth.set_src_addr(local.hardware_addr);

    let packet = ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..icmp_end]);
    packet.set_dst_addr(repr.src_addr);
    packet.set_src_addr(local.ip_addr);
    packet.set_total_len((icmp_end - ETHERNET_HEADER_LEN) as u16);
    packet.set_hop_limit(ip.hop_limit());

    let reply = icmpv4_packet::new_unchecked_mut(packet.payload_mut_slice());
    reply.set_msg_type(Icmpv4Message::EchoReply);
    reply.fill_checksum();
    packet.fill_checksum();

    link.transmit(&frame[..icmp_end], icmp_end, Checksums::NONE, None)?;
    Ok(true)
}
