//! CIDR, relevant rfc1519, rfc4632.
//!
use crate::wire::{Ipv4Address, Ipv4Cidr};

/// A prefix of addresses that is reached through one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// The network routed through this route.
    ///
    /// Host bits of the address are accepted and ignored when matching.
    pub net: Ipv4Cidr,

    /// The router to forward to, or `None` when the network is directly attached.
    pub next_hop: Option<Ipv4Address>,

    /// Index of the interface datagrams leave through.
    pub interface: usize,
}

impl Route {
    /// A route for the network of the given prefix.
    ///
    /// Returns `None` if the prefix length is larger than 32.
    pub fn new(prefix: u32, prefix_len: u8, next_hop: Option<Ipv4Address>, interface: usize) -> Option<Route> {
        let net = Ipv4Cidr::try_new(Ipv4Address::from_network_integer(prefix), prefix_len)?;
        Some(Route { net, next_hop, interface })
    }

    /// Returns a route match `0.0.0.0/0` via the `gateway`.
    ///
    /// This route is a worst match for all addresses so that it can be used as a sink.
    pub fn new_ipv4_gateway(gateway: Ipv4Address, interface: usize) -> Route {
        Route {
            net: Ipv4Cidr::ANY,
            next_hop: Some(gateway),
            interface,
        }
    }

    /// The address a datagram for `dst_addr` is handed to on the link.
    pub fn next_hop_for(&self, dst_addr: Ipv4Address) -> Ipv4Address {
        self.next_hop.unwrap_or(dst_addr)
    }
}

/// A routing table.
///
/// Routes are kept in the order they were added. Conflicting routes are not detected; among
/// several matches of equal prefix length the earliest one wins.
#[derive(Debug, Default, Clone)]
pub struct Routes {
    storage: Vec<Route>,
}

impl Routes {
    /// Creates an empty routing table.
    pub fn new() -> Self {
        Routes::default()
    }

    /// Append a route.
    pub fn add_route(&mut self, route: Route) {
        self.storage.push(route);
    }

    /// Find the most specific route for `addr`.
    pub fn lookup(&self, addr: Ipv4Address) -> Option<&Route> {
        // The rules say to find the subnet with longest prefix.
        let mut best_match: Option<&Route> = None;
        for route in self.storage.iter() {
            // Ignored routes with mismatching net.
            if !route.net.contains(addr) {
                continue;
            }

            match best_match {
                // Strictly longer only, ties go to the earlier route.
                Some(best) if best.net.prefix_len() >= route.net.prefix_len() => {},
                _ => best_match = Some(route),
            }
        }
        best_match
    }

    /// Iterate over all routes in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item=&Route> + '_ {
        self.storage.iter()
    }

    /// The number of routes.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether no route was added yet.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ADDR_1A: Ipv4Address = Ipv4Address::new(192, 168, 1, 1);
    const ADDR_1B: Ipv4Address = Ipv4Address::new(192, 168, 1, 13);
    const ADDR_2A: Ipv4Address = Ipv4Address::new(192, 168, 51, 1);
    const ADDR_2B: Ipv4Address = Ipv4Address::new(192, 168, 51, 21);
    const GATEWAY: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);

    fn route(net: Ipv4Address, prefix_len: u8, interface: usize) -> Route {
        Route::new(net.to_network_integer(), prefix_len, None, interface)
            .expect("valid prefix")
    }

    #[test]
    fn test_fill() {
        let mut routes = Routes::new();

        assert_eq!(routes.lookup(ADDR_1A), None);
        assert_eq!(routes.lookup(ADDR_2A), None);

        routes.add_route(route(ADDR_1A, 24, 1));
        assert_eq!(routes.lookup(ADDR_1A).map(|r| r.interface), Some(1));
        assert_eq!(routes.lookup(ADDR_1B).map(|r| r.interface), Some(1));
        assert_eq!(routes.lookup(ADDR_2A), None);

        routes.add_route(route(ADDR_2A, 24, 2));
        assert_eq!(routes.lookup(ADDR_1B).map(|r| r.interface), Some(1));
        assert_eq!(routes.lookup(ADDR_2B).map(|r| r.interface), Some(2));

        routes.add_route(Route::new_ipv4_gateway(GATEWAY, 0));
        assert_eq!(routes.lookup(ADDR_2B).map(|r| r.interface), Some(2));
        let default = routes.lookup(Ipv4Address::new(8, 8, 8, 8)).expect("default route");
        assert_eq!(default.interface, 0);
        assert_eq!(default.next_hop_for(Ipv4Address::new(8, 8, 8, 8)), GATEWAY);
        assert_eq!(routes.len(), 3);
    }

    #[test]
    fn longest_prefix_wins() {
        let mut routes = Routes::new();
        routes.add_route(route(ADDR_1A, 24, 1));
        routes.add_route(route(ADDR_1B, 32, 2));
        routes.add_route(route(ADDR_1A, 16, 3));

        assert_eq!(routes.lookup(ADDR_1B).map(|r| r.interface), Some(2));
        assert_eq!(routes.lookup(ADDR_1A).map(|r| r.interface), Some(1));
        assert_eq!(routes.lookup(ADDR_2A).map(|r| r.interface), Some(3));
    }

    #[test]
    fn ties_go_to_earliest() {
        let mut routes = Routes::new();
        routes.add_route(route(ADDR_1A, 24, 4));
        routes.add_route(route(ADDR_1B, 24, 5));
        assert_eq!(routes.lookup(ADDR_1B).map(|r| r.interface), Some(4));
    }

    #[test]
    fn direct_delivery() {
        let direct = route(ADDR_1A, 24, 0);
        assert_eq!(direct.next_hop_for(ADDR_1B), ADDR_1B);
    }

    #[test]
    fn invalid_prefix() {
        assert_eq!(Route::new(0, 33, None, 0), None);
        assert!(Route::new(0, 32, None, 0).is_some());
    }
}
