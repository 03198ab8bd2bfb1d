// Heads up! Before working on this file you should read, at least,
// the parts of RFC 1122 that discuss ARP.
use std::collections::BTreeMap;

use crate::time::{Duration, Expiration, Instant};
use crate::wire::{EthernetAddress, Ipv4Address};

/// A cached neighbor.
///
/// A neighbor mapping translates from a protocol address to a hardware address, and contains the
/// timestamp past which the mapping should be considered invalid. While no address is known, the
/// timestamp instead limits how often the address is requested.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighbor {
    protocol_addr: Ipv4Address,
    hardware_addr: Mapping,
    expires_at:    Expiration,
}

/// An answer to a neighbor cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// The neighbor address is in the cache and not expired.
    Found(EthernetAddress),
    /// The neighbor address is not in the cache, or has expired.
    NotFound,
    /// The neighbor address is not in the cache, or has expired,
    /// and a lookup has been made recently.
    RateLimited,
}

/// The state of the hardware address of a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mapping {
    /// An address is present.
    Address(EthernetAddress),

    /// We don't have a mapping but want to have one.
    LookingFor,

    /// We have recently sent a request.
    Requesting,
}

impl Default for Mapping {
    fn default() -> Self {
        Mapping::LookingFor
    }
}

/// A neighbor cache backed by an ordered map.
#[derive(Debug, Default, Clone)]
pub struct Cache {
    storage: BTreeMap<Ipv4Address, Neighbor>,
}

impl Cache {
    /// Minimum delay between requests for the same address.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5_000);

    /// Neighbor entry lifetime.
    pub const ENTRY_LIFETIME: Duration = Duration::from_millis(30_000);

    /// Create an empty cache.
    pub fn new() -> Self {
        Cache::default()
    }

    /// Add or refresh an entry containing a MAC address, learned at `now`.
    pub fn fill(
        &mut self,
        protocol_addr: Ipv4Address,
        hardware_addr: EthernetAddress,
        now: Instant,
    ) {
        self.update_or_insert(protocol_addr, Mapping::Address(hardware_addr), now + Self::ENTRY_LIFETIME);
    }

    /// Indicate a request for the entry was sent at `now`.
    ///
    /// Lookups are rate limited until the request times out, unless an answer arrives.
    pub fn requesting(&mut self, protocol_addr: Ipv4Address, now: Instant) {
        self.update_or_insert(protocol_addr, Mapping::Requesting, now + Self::REQUEST_TIMEOUT);
    }

    fn update_or_insert(&mut self, protocol_addr: Ipv4Address, hardware_addr: Mapping, until: Instant) {
        let neighbor = Neighbor {
            protocol_addr,
            hardware_addr,
            expires_at: Expiration::When(until),
        };

        net_trace!("neighbor {}: {:?} until {}", protocol_addr, hardware_addr, until);
        self.storage.insert(protocol_addr, neighbor);
    }

    /// Look up the hardware address of a neighbor.
    pub fn lookup(&self, protocol_addr: Ipv4Address, now: Instant) -> Answer {
        if protocol_addr.is_broadcast() {
            return Answer::Found(EthernetAddress::BROADCAST);
        }

        let entry = match self.storage.get(&protocol_addr) {
            Some(entry) if entry.is_alive(now) => entry,
            _ => return Answer::NotFound,
        };

        match entry.hardware_addr {
            Mapping::Address(addr) => Answer::Found(addr),
            Mapping::Requesting => Answer::RateLimited,
            Mapping::LookingFor => Answer::NotFound,
        }
    }

    /// Look up only a currently valid hardware address.
    pub fn lookup_pure(&self, protocol_addr: Ipv4Address, now: Instant) -> Option<EthernetAddress> {
        match self.lookup(protocol_addr, now) {
            Answer::Found(addr) => Some(addr),
            _ => None,
        }
    }

    /// Revert every entry whose deadline passed back to an unresolved state.
    pub fn expire(&mut self, now: Instant) {
        for neighbor in self.storage.values_mut() {
            if neighbor.hardware_addr != Mapping::LookingFor && neighbor.is_expired(now) {
                net_trace!("neighbor {} expired", neighbor.protocol_addr);
                neighbor.hardware_addr = Mapping::LookingFor;
                neighbor.expires_at = Expiration::Never;
            }
        }
    }

    /// Iterate over all entries, resolved or not.
    pub fn iter(&self) -> impl Iterator<Item=&Neighbor> + '_ {
        self.storage.values()
    }

    /// Iterate over the entries that have no address.
    pub fn missing(&self) -> impl Iterator<Item=&Neighbor> + '_ {
        self.iter().filter(|entry| entry.hardware_addr().is_none())
    }

    /// The number of entries, resolved or not.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the cache has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl Neighbor {
    /// The protocol address of the entry.
    pub fn protocol_addr(&self) -> Ipv4Address {
        self.protocol_addr
    }

    /// The hardware address, if resolved.
    pub fn hardware_addr(&self) -> Option<EthernetAddress> {
        match self.hardware_addr {
            Mapping::Address(addr) => Some(addr),
            Mapping::LookingFor => None,
            Mapping::Requesting => None,
        }
    }

    /// The raw state of the mapping.
    pub fn mapping(&self) -> Mapping {
        self.hardware_addr
    }

    /// Whether the deadline of the entry lies in the future.
    pub fn is_alive(&self, ts: Instant) -> bool {
        !self.expires_at.is_reached(ts)
    }

    /// Whether the deadline of the entry has been reached.
    pub fn is_expired(&self, ts: Instant) -> bool {
        !self.is_alive(ts)
    }

    /// If this address mapping is unknown and should be requested.
    pub fn looking_for(&self) -> bool {
        self.hardware_addr == Mapping::LookingFor
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const IP_ADDR_1: Ipv4Address = Ipv4Address([10, 0, 0, 1]);
    const IP_ADDR_2: Ipv4Address = Ipv4Address([10, 0, 0, 2]);

    const HADDR_A: EthernetAddress = EthernetAddress([0, 0, 0, 0, 0, 1]);
    const HADDR_B: EthernetAddress = EthernetAddress([0, 0, 0, 0, 0, 2]);

    #[test]
    fn fill() {
        let mut cache = Cache::new();

        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::ZERO), None);
        assert_eq!(cache.lookup_pure(IP_ADDR_2, Instant::ZERO), None);

        cache.fill(IP_ADDR_1, HADDR_A, Instant::ZERO);
        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::ZERO), Some(HADDR_A));
        assert_eq!(cache.lookup_pure(IP_ADDR_2, Instant::ZERO), None);
        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::ZERO + Cache::ENTRY_LIFETIME * 2),
                   None);
    }

    #[test]
    fn expire() {
        let mut cache = Cache::new();
        cache.fill(IP_ADDR_1, HADDR_A, Instant::ZERO);

        let almost = Instant::from_millis(29_999u64);
        cache.expire(almost);
        assert_eq!(cache.lookup(IP_ADDR_1, almost), Answer::Found(HADDR_A));

        let deadline = Instant::ZERO + Cache::ENTRY_LIFETIME;
        cache.expire(deadline);
        assert_eq!(cache.lookup(IP_ADDR_1, deadline), Answer::NotFound);
        // The entry itself is kept, only unresolved.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.missing().count(), 1);
        assert!(cache.iter().all(Neighbor::looking_for));
    }

    #[test]
    fn refresh() {
        let mut cache = Cache::new();
        cache.fill(IP_ADDR_1, HADDR_A, Instant::ZERO);
        cache.fill(IP_ADDR_1, HADDR_A, Instant::from_secs(20u64));
        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::from_secs(40u64)), Some(HADDR_A));
        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::from_secs(50u64)), None);
    }

    #[test]
    fn replace() {
        let mut cache = Cache::new();

        cache.fill(IP_ADDR_1, HADDR_A, Instant::ZERO);
        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::ZERO), Some(HADDR_A));
        cache.fill(IP_ADDR_1, HADDR_B, Instant::ZERO);
        assert_eq!(cache.lookup_pure(IP_ADDR_1, Instant::ZERO), Some(HADDR_B));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rate_limit() {
        let mut cache = Cache::new();
        cache.requesting(IP_ADDR_1, Instant::ZERO);
        assert_eq!(cache.lookup(IP_ADDR_1, Instant::from_millis(4_999u64)), Answer::RateLimited);
        assert_eq!(cache.lookup(IP_ADDR_1, Instant::from_millis(5_000u64)), Answer::NotFound);

        // An answer ends the limit early.
        cache.fill(IP_ADDR_1, HADDR_A, Instant::from_millis(100u64));
        assert_eq!(cache.lookup(IP_ADDR_1, Instant::from_millis(100u64)), Answer::Found(HADDR_A));
    }

    #[test]
    fn broadcast() {
        let cache = Cache::new();
        assert_eq!(cache.lookup(Ipv4Address::BROADCAST, Instant::ZERO),
                   Answer::Found(EthernetAddress::BROADCAST));
    }
}
