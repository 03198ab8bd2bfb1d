use std::collections::VecDeque;

use crate::layer::{Error, Result};
use crate::layer::eth::NetworkInterface;
use crate::wire::{EthernetFrame, Ipv4Address, Ipv4Datagram};

use super::route::{Route, Routes};

/// A router interface.
///
/// Pairs a network interface with the datagrams it received but the router has not yet
/// forwarded.
#[derive(Debug)]
pub struct Port {
    interface: NetworkInterface,
    inbound: VecDeque<Ipv4Datagram>,
}

/// Forwards datagrams between its interfaces.
///
/// The router owns its interfaces. Their links are driven from the outside by handing frames to
/// [`Port::recv_frame`] and taking them from [`Port::maybe_send`], while [`route`] moves the
/// received datagrams to the interface their destination is reached through.
///
/// [`Port::recv_frame`]: struct.Port.html#method.recv_frame
/// [`Port::maybe_send`]: struct.Port.html#method.maybe_send
/// [`route`]: #method.route
#[derive(Debug, Default)]
pub struct Router {
    ports: Vec<Port>,
    routes: Routes,
}

impl Port {
    /// Wrap an interface without any received datagrams.
    pub fn new(interface: NetworkInterface) -> Self {
        Port {
            interface,
            inbound: VecDeque::new(),
        }
    }

    /// The underlying interface.
    pub fn interface(&self) -> &NetworkInterface {
        &self.interface
    }

    /// Process a frame from the link, keeping the datagram it carried.
    pub fn recv_frame(&mut self, frame: &EthernetFrame) {
        if let Some(datagram) = self.interface.recv_frame(frame) {
            self.inbound.push_back(datagram);
        }
    }

    /// Take the oldest received datagram.
    pub fn maybe_receive(&mut self) -> Option<Ipv4Datagram> {
        self.inbound.pop_front()
    }

    /// Queue a datagram for `next_hop` on this interface.
    pub fn send_datagram(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Address) {
        self.interface.send_datagram(datagram, next_hop)
    }

    /// Take the next frame that is ready for the link.
    pub fn maybe_send(&mut self) -> Option<EthernetFrame> {
        self.interface.maybe_send()
    }

    /// Advance the clock of the interface.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.interface.tick(ms_since_last_tick)
    }
}

impl Router {
    /// A router without interfaces or routes.
    pub fn new() -> Self {
        Router::default()
    }

    /// Attach an interface, returning the index routes refer to it by.
    pub fn add_interface(&mut self, interface: NetworkInterface) -> usize {
        self.ports.push(Port::new(interface));
        self.ports.len() - 1
    }

    /// The interface with the given index.
    pub fn interface(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// The interface with the given index, for driving its link.
    pub fn interface_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.ports.get_mut(index)
    }

    /// The number of attached interfaces.
    pub fn interface_count(&self) -> usize {
        self.ports.len()
    }

    /// Add a route for the network `prefix/prefix_len`.
    ///
    /// Datagrams are handed to `next_hop` if given, otherwise directly to their destination.
    /// Fails with `Illegal` if the prefix length is larger than 32 or the interface is unknown.
    pub fn add_route(
        &mut self,
        prefix: u32,
        prefix_len: u8,
        next_hop: Option<Ipv4Address>,
        interface: usize,
    ) -> Result<()> {
        if interface >= self.ports.len() {
            return Err(Error::Illegal);
        }

        let route = Route::new(prefix, prefix_len, next_hop, interface)
            .ok_or(Error::Illegal)?;
        net_debug!("route {} via {:?} on interface {}", route.net, route.next_hop, interface);
        self.routes.add_route(route);
        Ok(())
    }

    /// The routing table.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Forward at most one received datagram of every interface.
    pub fn route(&mut self) {
        for index in 0..self.ports.len() {
            let datagram = match self.ports[index].maybe_receive() {
                Some(datagram) => datagram,
                None => continue,
            };

            let dst_addr = datagram.header.dst_addr;
            if let Err(err) = self.forward(datagram) {
                net_debug!("dropping datagram for {}: {}", dst_addr, err);
            }
        }
    }

    /// Advance the clock of every interface.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        for port in self.ports.iter_mut() {
            port.tick(ms_since_last_tick);
        }
    }

    fn forward(&mut self, mut datagram: Ipv4Datagram) -> Result<()> {
        let hop_limit = datagram.header.hop_limit;
        if hop_limit <= 1 {
            net_debug!("time to live exceeded: {}", datagram);
            return Ok(());
        }

        datagram.header.hop_limit = hop_limit - 1;
        datagram.compute_checksum();

        let dst_addr = datagram.header.dst_addr;
        let route = *self.routes.lookup(dst_addr)
            .ok_or(Error::Unreachable)?;
        let port = self.ports.get_mut(route.interface)
            .ok_or(Error::Illegal)?;

        net_trace!("forwarding {} on interface {}", datagram, route.interface);
        port.send_datagram(datagram, route.next_hop_for(dst_addr));
        Ok(())
    }
}
