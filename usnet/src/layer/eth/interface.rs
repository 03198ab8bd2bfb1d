use std::collections::VecDeque;

use crate::layer::arp::{self, NeighborAnswer, NeighborCache};
use crate::time::{Duration, Instant};
use crate::wire::{ArpOperation, ArpRepr};
use crate::wire::{EthernetAddress, EthernetFrame, EthernetProtocol, EthernetRepr};
use crate::wire::{Ipv4Address, Ipv4Datagram};

/// A network interface connecting IPv4 to an Ethernet link.
///
/// Datagrams are encapsulated for the link address of their next hop. Link addresses are learned
/// from every ARP message that reaches the interface and requested by broadcast when missing. A
/// datagram waits in the outgoing queue until its next hop is known.
#[derive(Debug)]
pub struct NetworkInterface {
    ethernet_addr: EthernetAddress,
    ip_addr: Ipv4Address,
    now: Instant,
    neighbors: NeighborCache,
    outgoing: VecDeque<Outgoing>,
}

#[derive(Debug)]
enum Outgoing {
    /// A frame that can leave right away.
    Ready(EthernetFrame),
    /// A datagram waiting for its next hop to resolve.
    Pending {
        datagram: Ipv4Datagram,
        next_hop: Ipv4Address,
    },
}

impl NetworkInterface {
    /// Create an interface with the given addresses and an empty neighbor cache.
    pub fn new(ethernet_addr: EthernetAddress, ip_addr: Ipv4Address) -> Self {
        net_debug!("interface has Ethernet address {} and IP address {}", ethernet_addr, ip_addr);
        NetworkInterface {
            ethernet_addr,
            ip_addr,
            now: Instant::ZERO,
            neighbors: NeighborCache::new(),
            outgoing: VecDeque::new(),
        }
    }

    /// The link address of the interface.
    pub fn ethernet_addr(&self) -> EthernetAddress {
        self.ethernet_addr
    }

    /// The protocol address of the interface.
    pub fn ip_addr(&self) -> Ipv4Address {
        self.ip_addr
    }

    /// The logical time of the interface.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// The link addresses learned so far.
    pub fn neighbors(&self) -> &NeighborCache {
        &self.neighbors
    }

    /// The number of frames and datagrams waiting to be sent.
    pub fn queued(&self) -> usize {
        self.outgoing.len()
    }

    /// Queue a datagram for `next_hop`.
    ///
    /// When the link address of the next hop is not known, the datagram waits and a broadcast
    /// request is queued unless one was sent recently.
    pub fn send_datagram(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Address) {
        match self.neighbors.lookup(next_hop, self.now) {
            NeighborAnswer::Found(dst_addr) => {
                let frame = self.ipv4_frame(dst_addr, &datagram);
                self.outgoing.push_back(Outgoing::Ready(frame));
            },
            NeighborAnswer::RateLimited => {
                self.outgoing.push_back(Outgoing::Pending { datagram, next_hop });
            },
            NeighborAnswer::NotFound => {
                let request = self.request(next_hop);
                self.outgoing.push_back(Outgoing::Ready(request));
                self.outgoing.push_back(Outgoing::Pending { datagram, next_hop });
            },
        }
    }

    /// Process one frame from the link.
    ///
    /// Returns the datagram it carried, if any. ARP messages are consumed here: their sender is
    /// always learned and requests for our address are answered.
    pub fn recv_frame(&mut self, frame: &EthernetFrame) -> Option<Ipv4Datagram> {
        let dst_addr = frame.repr.dst_addr;
        if dst_addr != self.ethernet_addr && !dst_addr.is_broadcast() {
            net_trace!("{}: frame for {} not addressed to us", self.ethernet_addr, dst_addr);
            return None;
        }

        match frame.repr.ethertype {
            EthernetProtocol::Arp => {
                self.recv_arp(&frame.payload);
                None
            },
            EthernetProtocol::Ipv4 => match Ipv4Datagram::parse(&frame.payload) {
                Ok(datagram) => Some(datagram),
                Err(err) => {
                    net_trace!("{}: dropping IPv4 payload: {}", self.ethernet_addr, err);
                    None
                },
            },
            other => {
                net_trace!("{}: dropping frame of type {}", self.ethernet_addr, other);
                None
            },
        }
    }

    /// Advance the logical clock, expiring stale link addresses.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.now += Duration::from_millis(ms_since_last_tick);
        self.neighbors.expire(self.now);
    }

    /// Take the next frame that is ready to be sent.
    ///
    /// Frames leave in the order they were queued, except that a datagram whose next hop is still
    /// being resolved does not hold back anything queued after it.
    pub fn maybe_send(&mut self) -> Option<EthernetFrame> {
        for index in 0..self.outgoing.len() {
            let next_hop = match self.outgoing.get(index) {
                Some(Outgoing::Pending { next_hop, .. }) => *next_hop,
                _ => return self.dequeue(index, None),
            };

            match self.neighbors.lookup(next_hop, self.now) {
                NeighborAnswer::Found(dst_addr) => return self.dequeue(index, Some(dst_addr)),
                NeighborAnswer::RateLimited => continue,
                NeighborAnswer::NotFound => return Some(self.request(next_hop)),
            }
        }

        None
    }

    fn dequeue(&mut self, index: usize, dst_addr: Option<EthernetAddress>) -> Option<EthernetFrame> {
        match self.outgoing.remove(index)? {
            Outgoing::Ready(frame) => Some(frame),
            Outgoing::Pending { datagram, next_hop } => {
                let dst_addr = dst_addr.or_else(|| self.neighbors.lookup_pure(next_hop, self.now))?;
                Some(self.ipv4_frame(dst_addr, &datagram))
            },
        }
    }

    fn recv_arp(&mut self, payload: &[u8]) {
        let repr = match ArpRepr::parse_bytes(payload) {
            Ok(repr) => repr,
            Err(err) => {
                net_trace!("{}: dropping ARP message: {}", self.ethernet_addr, err);
                return;
            },
        };

        let ArpRepr::EthernetIpv4 {
            operation,
            source_hardware_addr,
            source_protocol_addr,
            target_protocol_addr,
            ..
        } = repr;

        self.neighbors.fill(source_protocol_addr, source_hardware_addr, self.now);

        if operation == ArpOperation::Request && target_protocol_addr == self.ip_addr {
            net_trace!("{}: answering {} for {}", self.ethernet_addr, source_protocol_addr, self.ip_addr);
            let reply = arp::reply(
                self.ethernet_addr,
                self.ip_addr,
                source_hardware_addr,
                source_protocol_addr);
            let frame = self.frame(source_hardware_addr, EthernetProtocol::Arp, reply.to_bytes());
            self.outgoing.push_back(Outgoing::Ready(frame));
        }
    }

    /// Build a broadcast request for `target` and note that it was sent.
    fn request(&mut self, target: Ipv4Address) -> EthernetFrame {
        net_trace!("{}: requesting {}", self.ethernet_addr, target);
        self.neighbors.requesting(target, self.now);
        let request = arp::request(self.ethernet_addr, self.ip_addr, target);
        self.frame(EthernetAddress::BROADCAST, EthernetProtocol::Arp, request.to_bytes())
    }

    fn ipv4_frame(&self, dst_addr: EthernetAddress, datagram: &Ipv4Datagram) -> EthernetFrame {
        self.frame(dst_addr, EthernetProtocol::Ipv4, datagram.to_bytes())
    }

    fn frame(&self, dst_addr: EthernetAddress, ethertype: EthernetProtocol, payload: Vec<u8>) -> EthernetFrame {
        EthernetFrame {
            repr: EthernetRepr {
                src_addr: self.ethernet_addr,
                dst_addr,
                ethertype,
            },
            payload,
        }
    }
}
