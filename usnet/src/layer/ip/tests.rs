use crate::layer::Error;
use crate::layer::eth::NetworkInterface;
use crate::layer::ip::Router;
use crate::wire::{ArpOperation, ArpRepr};
use crate::wire::{EthernetAddress, EthernetFrame, EthernetProtocol, EthernetRepr};
use crate::wire::{IpProtocol, Ipv4Address, Ipv4Datagram, Ipv4Header};

const MAC_ADDR_IF0: EthernetAddress = EthernetAddress([2, 0, 0, 0, 0, 0]);
const IP_ADDR_IF0: Ipv4Address = Ipv4Address::new(172, 16, 0, 1);
const MAC_ADDR_IF1: EthernetAddress = EthernetAddress([2, 0, 0, 0, 0, 1]);
const IP_ADDR_IF1: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);

const MAC_ADDR_HOST: EthernetAddress = EthernetAddress([2, 0, 0, 0, 1, 0]);
const IP_ADDR_HOST: Ipv4Address = Ipv4Address::new(172, 16, 0, 2);

const ADDR_INSIDE: Ipv4Address = Ipv4Address::new(10, 1, 2, 3);
const ADDR_OUTSIDE: Ipv4Address = Ipv4Address::new(192, 168, 0, 1);

fn router() -> Router {
    let mut router = Router::new();
    assert_eq!(router.add_interface(NetworkInterface::new(MAC_ADDR_IF0, IP_ADDR_IF0)), 0);
    assert_eq!(router.add_interface(NetworkInterface::new(MAC_ADDR_IF1, IP_ADDR_IF1)), 1);
    router
}

fn datagram(dst_addr: Ipv4Address, hop_limit: u8) -> Ipv4Datagram {
    let header = Ipv4Header::new(IP_ADDR_HOST, dst_addr, IpProtocol::Udp, hop_limit);
    Ipv4Datagram::new(header, b"forward me".to_vec())
}

/// Deliver a datagram from the host to the given router interface.
fn inject(router: &mut Router, index: usize, datagram: &Ipv4Datagram) {
    let port = router.interface_mut(index).expect("interface exists");
    let frame = EthernetFrame {
        repr: EthernetRepr {
            src_addr: MAC_ADDR_HOST,
            dst_addr: port.interface().ethernet_addr(),
            ethertype: EthernetProtocol::Ipv4,
        },
        payload: datagram.to_bytes(),
    };
    port.recv_frame(&frame);
}

/// Answer the address request of an interface for `addr` with `hardware_addr`.
fn resolve(router: &mut Router, index: usize, addr: Ipv4Address, hardware_addr: EthernetAddress) {
    let port = router.interface_mut(index).expect("interface exists");
    let reply = ArpRepr::EthernetIpv4 {
        operation: ArpOperation::Reply,
        source_hardware_addr: hardware_addr,
        source_protocol_addr: addr,
        target_hardware_addr: port.interface().ethernet_addr(),
        target_protocol_addr: port.interface().ip_addr(),
    };
    let frame = EthernetFrame {
        repr: EthernetRepr {
            src_addr: hardware_addr,
            dst_addr: port.interface().ethernet_addr(),
            ethertype: EthernetProtocol::Arp,
        },
        payload: reply.to_bytes(),
    };
    port.recv_frame(&frame);
}

/// The address a frame requests, if it is an ARP request.
fn requested(frame: &EthernetFrame) -> Option<Ipv4Address> {
    if frame.repr.ethertype != EthernetProtocol::Arp {
        return None;
    }

    match ArpRepr::parse_bytes(&frame.payload) {
        Ok(ArpRepr::EthernetIpv4 { operation: ArpOperation::Request, target_protocol_addr, .. })
            => Some(target_protocol_addr),
        _ => None,
    }
}

fn send_next(router: &mut Router, index: usize) -> Option<EthernetFrame> {
    router.interface_mut(index).and_then(|port| port.maybe_send())
}

#[test]
fn longest_prefix() {
    let mut router = router();
    router.add_route(0, 0, None, 0).expect("default route");
    router.add_route(Ipv4Address::new(10, 0, 0, 0).to_network_integer(), 8, None, 1)
        .expect("inner route");

    inject(&mut router, 0, &datagram(ADDR_INSIDE, 64));
    router.route();
    let frame = send_next(&mut router, 1).expect("leaves through if1");
    assert_eq!(requested(&frame), Some(ADDR_INSIDE));
    assert_eq!(send_next(&mut router, 0), None);

    inject(&mut router, 1, &datagram(ADDR_OUTSIDE, 64));
    router.route();
    let frame = send_next(&mut router, 0).expect("leaves through if0");
    assert_eq!(requested(&frame), Some(ADDR_OUTSIDE));
    assert_eq!(send_next(&mut router, 1), None);
}

#[test]
fn forwarded_datagram() {
    let mut router = router();
    router.add_route(Ipv4Address::new(10, 0, 0, 0).to_network_integer(), 8, None, 1)
        .expect("inner route");

    let mac_inside = EthernetAddress([2, 0, 0, 0, 2, 0]);
    resolve(&mut router, 1, ADDR_INSIDE, mac_inside);

    let original = datagram(ADDR_INSIDE, 64);
    inject(&mut router, 0, &original);
    router.route();

    let frame = send_next(&mut router, 1).expect("forwarded");
    assert_eq!(frame.repr.src_addr, MAC_ADDR_IF1);
    assert_eq!(frame.repr.dst_addr, mac_inside);
    assert_eq!(frame.repr.ethertype, EthernetProtocol::Ipv4);

    // Parsing checks the recomputed checksum.
    let forwarded = Ipv4Datagram::parse(&frame.payload).expect("valid datagram");
    assert_eq!(forwarded.header.hop_limit, 63);
    assert_ne!(forwarded.header.checksum, original.header.checksum);
    assert_eq!(forwarded.header.src_addr, original.header.src_addr);
    assert_eq!(forwarded.payload, original.payload);
}

#[test]
fn hop_limit_exceeded() {
    let mut router = router();
    router.add_route(0, 0, None, 1).expect("default route");

    inject(&mut router, 0, &datagram(ADDR_INSIDE, 1));
    inject(&mut router, 0, &datagram(ADDR_INSIDE, 0));
    router.route();
    router.route();

    assert_eq!(send_next(&mut router, 0), None);
    assert_eq!(send_next(&mut router, 1), None);

    // Two hops left is enough.
    inject(&mut router, 0, &datagram(ADDR_INSIDE, 2));
    router.route();
    assert!(send_next(&mut router, 1).is_some());
}

#[test]
fn unroutable_dropped() {
    let mut router = router();
    router.add_route(Ipv4Address::new(10, 0, 0, 0).to_network_integer(), 8, None, 1)
        .expect("inner route");

    inject(&mut router, 0, &datagram(ADDR_OUTSIDE, 64));
    router.route();
    assert_eq!(send_next(&mut router, 0), None);
    assert_eq!(send_next(&mut router, 1), None);
}

#[test]
fn via_next_hop() {
    let mut router = router();
    let gateway = Ipv4Address::new(172, 16, 0, 254);
    router.add_route(0, 0, Some(gateway), 0).expect("default route");

    inject(&mut router, 1, &datagram(ADDR_OUTSIDE, 64));
    router.route();
    let frame = send_next(&mut router, 0).expect("request for the gateway");
    assert_eq!(requested(&frame), Some(gateway));

    let mac_gateway = EthernetAddress([2, 0, 0, 0, 3, 0]);
    resolve(&mut router, 0, gateway, mac_gateway);
    let frame = send_next(&mut router, 0).expect("forwarded");
    assert_eq!(frame.repr.dst_addr, mac_gateway);
    let forwarded = Ipv4Datagram::parse(&frame.payload).expect("valid datagram");
    // The destination itself is untouched.
    assert_eq!(forwarded.header.dst_addr, ADDR_OUTSIDE);
}

#[test]
fn one_datagram_per_interface() {
    let mut router = router();
    router.add_route(0, 0, None, 1).expect("default route");
    let mac_inside = EthernetAddress([2, 0, 0, 0, 2, 0]);
    resolve(&mut router, 1, ADDR_INSIDE, mac_inside);

    inject(&mut router, 0, &datagram(ADDR_INSIDE, 64));
    inject(&mut router, 0, &datagram(ADDR_INSIDE, 32));

    router.route();
    assert!(send_next(&mut router, 1).is_some());
    assert_eq!(send_next(&mut router, 1), None);

    router.route();
    let frame = send_next(&mut router, 1).expect("second datagram");
    let forwarded = Ipv4Datagram::parse(&frame.payload).expect("valid datagram");
    assert_eq!(forwarded.header.hop_limit, 31);
}

#[test]
fn bad_routes() {
    let mut router = router();
    assert_eq!(router.add_route(0, 33, None, 0), Err(Error::Illegal));
    assert_eq!(router.add_route(0, 0, None, 2), Err(Error::Illegal));
    assert!(router.routes().is_empty());

    assert_eq!(Error::Illegal.to_string(), "illegal operation");
    assert_eq!(Error::Unreachable.to_string(), "destination unreachable");
}
