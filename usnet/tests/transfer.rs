//! Whole-stack transfers between two hosts on opposite sides of a router.
use usnet::layer::eth::NetworkInterface;
use usnet::layer::ip::Router;
use usnet::layer::loss::{Link, PrngLoss};
use usnet::layer::tcp::{Config, FourTuple, IsnGenerator, Peer, TcpOverIpv4};
use usnet::time::Instant;
use usnet::wire::{EthernetAddress, Ipv4Address};

const CLIENT_MAC: EthernetAddress = EthernetAddress([2, 0, 0, 0, 0, 2]);
const CLIENT_IP: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);
const SERVER_MAC: EthernetAddress = EthernetAddress([2, 0, 0, 0, 1, 2]);
const SERVER_IP: Ipv4Address = Ipv4Address::new(192, 168, 0, 2);

const ROUTER_MAC_0: EthernetAddress = EthernetAddress([2, 0, 0, 0, 0, 1]);
const ROUTER_IP_0: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
const ROUTER_MAC_1: EthernetAddress = EthernetAddress([2, 0, 0, 0, 1, 1]);
const ROUTER_IP_1: Ipv4Address = Ipv4Address::new(192, 168, 0, 1);

/// Logical milliseconds per simulation step.
const STEP: u64 = 10;

struct Host {
    interface: NetworkInterface,
    adapter: TcpOverIpv4,
    peer: Peer,
    gateway: Ipv4Address,
}

/// The hosts, the router and the four directed links between them.
struct Network {
    client: Host,
    server: Host,
    router: Router,
    client_up: Link,
    client_down: Link,
    server_up: Link,
    server_down: Link,
}

impl Host {
    fn new(
        mac: EthernetAddress,
        connection: FourTuple,
        gateway: Ipv4Address,
        config: Config,
        isn: &IsnGenerator,
    ) -> Self {
        Host {
            interface: NetworkInterface::new(mac, connection.local),
            adapter: TcpOverIpv4::new(connection),
            peer: Peer::new(config, isn.isn_for(&config, connection, Instant::ZERO)),
            gateway,
        }
    }

    fn tick(&mut self, ms: u64) {
        self.interface.tick(ms);
        self.peer.tick(ms);
    }

    fn transmit(&mut self, link: &mut Link) {
        while let Some(message) = self.peer.maybe_send() {
            let datagram = self.adapter.to_datagram(&message);
            self.interface.send_datagram(datagram, self.gateway);
        }

        while let Some(frame) = self.interface.maybe_send() {
            link.send(frame);
        }
    }

    fn receive(&mut self, link: &mut Link) {
        while let Some(frame) = link.recv() {
            let datagram = match self.interface.recv_frame(&frame) {
                Some(datagram) => datagram,
                None => continue,
            };

            if let Some(message) = self.adapter.from_datagram(&datagram) {
                self.peer.receive(&message);
            }
        }
    }
}

impl Network {
    fn new(config: Config, loss: [PrngLoss; 4]) -> Self {
        let isn = IsnGenerator::from_secret_key_bytes([0x5a; 16]);
        let connection = FourTuple {
            local: CLIENT_IP,
            local_port: 49152,
            remote: SERVER_IP,
            remote_port: 80,
        };

        let mut router = Router::new();
        router.add_interface(NetworkInterface::new(ROUTER_MAC_0, ROUTER_IP_0));
        router.add_interface(NetworkInterface::new(ROUTER_MAC_1, ROUTER_IP_1));
        router.add_route(Ipv4Address::new(10, 0, 0, 0).to_network_integer(), 8, None, 0)
            .expect("client network");
        router.add_route(Ipv4Address::new(192, 168, 0, 0).to_network_integer(), 16, None, 1)
            .expect("server network");

        let [a, b, c, d] = loss;
        Network {
            client: Host::new(CLIENT_MAC, connection, ROUTER_IP_0, config, &isn),
            server: Host::new(SERVER_MAC, connection.reversed(), ROUTER_IP_1, config, &isn),
            router,
            client_up: Link::new(a),
            client_down: Link::new(b),
            server_up: Link::new(c),
            server_down: Link::new(d),
        }
    }

    fn step(&mut self) {
        self.client.tick(STEP);
        self.server.tick(STEP);
        self.router.tick(STEP);

        self.client.transmit(&mut self.client_up);
        self.server.transmit(&mut self.server_up);

        let ingress = [(0, &mut self.client_up), (1, &mut self.server_up)];
        for (index, link) in ingress {
            while let Some(frame) = link.recv() {
                if let Some(port) = self.router.interface_mut(index) {
                    port.recv_frame(&frame);
                }
                self.router.route();
            }
        }

        let egress = [(0, &mut self.client_down), (1, &mut self.server_down)];
        for (index, link) in egress {
            if let Some(port) = self.router.interface_mut(index) {
                while let Some(frame) = port.maybe_send() {
                    link.send(frame);
                }
            }
        }

        self.client.receive(&mut self.client_down);
        self.server.receive(&mut self.server_down);
    }

    fn active(&self) -> bool {
        self.client.peer.active() || self.server.peer.active()
    }
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

/// Send `data` from client to server, then close both directions.
///
/// Returns what the server read and the logical time the exchange took.
fn transfer(network: &mut Network, data: &[u8], max_steps: u64) -> (Vec<u8>, u64) {
    let mut offset = 0;
    let mut received = Vec::new();
    let mut steps = 0;

    while network.active() && steps < max_steps {
        if offset < data.len() {
            offset += network.client.peer.outbound_writer().push(&data[offset..]);
            if offset == data.len() {
                network.client.peer.outbound_writer().close();
            }
        }

        network.step();
        steps += 1;

        let reader = network.server.peer.inbound_reader();
        received.extend(reader.read(usize::max_value()));
        if reader.is_finished() {
            network.server.peer.outbound_writer().close();
        }
    }

    (received, steps * STEP)
}

#[test]
fn lossless_transfer() {
    let config = Config {
        capacity: 4_000,
        ..Config::default()
    };
    let mut network = Network::new(config, [PrngLoss::lossless(); 4]);
    let data = payload(50_000);

    let (received, elapsed) = transfer(&mut network, &data, 100_000);
    assert!(received == data, "received {} of {} bytes", received.len(), data.len());
    assert!(!network.active());

    // Nothing was ever lost, so nothing had to be retransmitted.
    assert_eq!(network.client.peer.sender().consecutive_retransmissions(), 0);
    assert_eq!(network.client_up.dropped() + network.server_down.dropped(), 0);

    // Only the client lingers after the exchange.
    let linger = 10 * config.rt_timeout;
    assert!(elapsed >= linger && elapsed < linger + 10_000, "took {}ms", elapsed);

    // Both hosts resolved their gateway.
    let client = &network.client.interface;
    assert_eq!(client.neighbors().lookup_pure(ROUTER_IP_0, client.now()), Some(ROUTER_MAC_0));
    let server = &network.server.interface;
    assert_eq!(server.neighbors().lookup_pure(ROUTER_IP_1, server.now()), Some(ROUTER_MAC_1));
}

#[test]
fn lossy_transfer() {
    let rate = PrngLoss::rate_from_probability(0.05);
    let loss = [
        PrngLoss::uniform(rate, 1),
        PrngLoss::uniform(rate, 2),
        PrngLoss::uniform(rate, 3),
        PrngLoss::uniform(rate, 4),
    ];
    let mut network = Network::new(Config::default(), loss);
    let data = payload(20_000);

    let (received, _) = transfer(&mut network, &data, 1_000_000);
    assert!(received == data, "received {} of {} bytes", received.len(), data.len());
    assert!(!network.active());

    let dropped = network.client_up.dropped()
        + network.client_down.dropped()
        + network.server_up.dropped()
        + network.server_down.dropped();
    assert!(dropped > 0);
}

#[test]
fn burst_loss_transfer() {
    // Every fourth frame towards the server is lost.
    let loss = [
        PrngLoss::lossless(),
        PrngLoss::lossless(),
        PrngLoss::lossless(),
        PrngLoss::pulsed(1, 4).expect("valid pulse"),
    ];
    let mut network = Network::new(Config::default(), loss);
    let data = payload(10_000);

    let (received, _) = transfer(&mut network, &data, 1_000_000);
    assert!(received == data, "received {} of {} bytes", received.len(), data.len());
    assert!(network.server_down.dropped() > 0);
}

#[test]
fn unreachable_server_gives_up() {
    let lost = PrngLoss::uniform(PrngLoss::rate_from_probability(1.0), 0);
    let mut network = Network::new(Config::default(), [
        PrngLoss::lossless(),
        PrngLoss::lossless(),
        PrngLoss::lossless(),
        lost,
    ]);

    let (received, _) = transfer(&mut network, b"anyone there?", 1_000_000);
    assert!(received.is_empty());
    assert!(!network.client.peer.active());
    assert!(network.client.peer.sender().budget_exceeded());
}
