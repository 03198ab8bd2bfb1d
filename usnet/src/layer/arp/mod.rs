//! Resolving and answering link addresses.
//!
//! Restricted to Ethernet and IPv4. The [`NeighborCache`] remembers answers for a limited time
//! and rate-limits requests for addresses that are still unknown, the helpers here construct the
//! two kinds of messages a network interface sends.
//!
//! [`NeighborCache`]: struct.NeighborCache.html
use crate::wire::{ArpOperation, ArpRepr, EthernetAddress, Ipv4Address};

mod neighbor;

pub use self::neighbor::{
    Neighbor,
    Answer as NeighborAnswer,
    Mapping as NeighborMapping,
    Cache as NeighborCache,
};

/// A request for the link address of `target`, to be broadcast.
pub fn request(
    hardware_addr: EthernetAddress,
    protocol_addr: Ipv4Address,
    target: Ipv4Address,
) -> ArpRepr {
    ArpRepr::EthernetIpv4 {
        operation: ArpOperation::Request,
        source_hardware_addr: hardware_addr,
        source_protocol_addr: protocol_addr,
        target_hardware_addr: EthernetAddress::default(),
        target_protocol_addr: target,
    }
}

/// The answer to a request, to be sent back to the requester only.
pub fn reply(
    hardware_addr: EthernetAddress,
    protocol_addr: Ipv4Address,
    target_hardware_addr: EthernetAddress,
    target_protocol_addr: Ipv4Address,
) -> ArpRepr {
    ArpRepr::EthernetIpv4 {
        operation: ArpOperation::Reply,
        source_hardware_addr: hardware_addr,
        source_protocol_addr: protocol_addr,
        target_hardware_addr,
        target_protocol_addr,
    }
}
