// Heads up! Before working on this file you should read, at least,
// the parts of RFC 1122 that discuss ARP.
use crate::wire::{EthernetAddress, Ipv4Address};

/// The number of mappings held at once.
pub const CAPACITY: usize = 3;

/// A cached neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub protocol_addr: Ipv4Address,
    pub hardware_addr: EthernetAddress,
    /// Seconds until the entry expires.
    pub ticks: u8,
}

/// A tiny address cache with countdown expiry.
///
/// Lookups scan all entries, there are only a handful. When a new address must be admitted to a
/// full cache, the entry closest to expiry is evicted.
#[derive(Debug, Clone)]
pub struct Cache {
    entries: [Option<Entry>; CAPACITY],
    lifetime: u8,
}

impl Cache {
    /// An empty cache whose entries live for `lifetime` ticks.
    pub fn new(lifetime: u8) -> Self {
        Cache {
            entries: [None; CAPACITY],
            lifetime,
        }
    }

    /// Find the hardware address of `protocol_addr`.
    pub fn lookup(&self, protocol_addr: Ipv4Address) -> Option<EthernetAddress> {
        self.entry(protocol_addr).map(|entry| entry.hardware_addr)
    }

    /// The entry of `protocol_addr`.
    pub fn entry(&self, protocol_addr: Ipv4Address) -> Option<&Entry> {
        self.iter().find(|entry| entry.protocol_addr == protocol_addr)
    }

    /// Refresh or insert a mapping.
    ///
    /// Returns `false` for addresses that can not be mapped, the unspecified and broadcast
    /// addresses.
    pub fn learn(&mut self, protocol_addr: Ipv4Address, hardware_addr: EthernetAddress) -> bool {
        if protocol_addr.is_unspecified() || protocol_addr.is_broadcast() {
            return false;
        }

        let lifetime = self.lifetime;
        let new = Entry { protocol_addr, hardware_addr, ticks: lifetime };

        if let Some(slot) = self.entries.iter_mut()
            .flatten()
            .find(|entry| entry.protocol_addr == protocol_addr)
        {
            *slot = new;
            return true;
        }

        if let Some(slot) = self.entries.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(new);
            return true;
        }

        // Full. Evict the first of the entries that expire soonest.
        let victim = self.entries.iter_mut()
            .min_by_key(|slot| slot.map_or(0, |entry| entry.ticks));
        if let Some(slot) = victim {
            net_trace!("arp: evicting {:?}", slot);
            *slot = Some(new);
        }
        true
    }

    /// Forget the mapping of `protocol_addr`.
    pub fn remove(&mut self, protocol_addr: Ipv4Address) -> Option<Entry> {
        self.entries.iter_mut()
            .find(|slot| slot.map_or(false, |entry| entry.protocol_addr == protocol_addr))
            .and_then(Option::take)
    }

    /// Count down all entries by one, expiring those that reach zero.
    pub fn tick(&mut self) {
        for slot in self.entries.iter_mut() {
            if let Some(entry) = slot {
                entry.ticks = entry.ticks.saturating_sub(1);
                if entry.ticks == 0 {
                    *slot = None;
                }
            }
        }
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item=&Entry> + '_ {
        self.entries.iter().flatten()
    }
}
