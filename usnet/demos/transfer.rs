//! Transfers a stream between two simulated hosts through a router.
//!
//! # Usage
//!
//! The client at `10.0.0.2` sends a number of bytes to the server at `192.168.0.2`. Both reach
//! each other only through a router with one interface in each network. All four links between
//! the hosts and the router drop frames at the same rate, each with its own seed derived from the
//! given one. Time is simulated, the demo runs as fast as it can.
//!
//!   > $ RUST_LOG=usnet=debug cargo run --example transfer -- -n 100000 --loss 0.1 --seed 7
use structopt::StructOpt;

use usnet::layer::eth::NetworkInterface;
use usnet::layer::ip::Router;
use usnet::layer::loss::{Link, PrngLoss};
use usnet::layer::tcp::{self, FourTuple, IsnGenerator, Peer, TcpOverIpv4};
use usnet::time::Instant;
use usnet::wire::{EthernetAddress, Ipv4Address};

const STEP: u64 = 1;

fn main() {
    env_logger::init();

    let Config {
        bytes,
        loss,
        seed,
        rto,
        capacity,
        timeout,
    } = Config::from_args();

    let tcp_config = tcp::Config {
        capacity,
        rt_timeout: rto,
        ..tcp::Config::default()
    };

    let rate = PrngLoss::rate_from_probability(loss);
    let links = [0, 1, 2, 3].map(|i| Link::new(PrngLoss::uniform(rate, seed.wrapping_add(i))));
    let [mut client_up, mut client_down, mut server_up, mut server_down] = links;

    let isn = IsnGenerator::from_std_hash();
    let connection = FourTuple {
        local: Ipv4Address::new(10, 0, 0, 2),
        local_port: 49152,
        remote: Ipv4Address::new(192, 168, 0, 2),
        remote_port: 5001,
    };

    let mut client = Host::new(EthernetAddress([2, 0, 0, 0, 0, 2]), connection,
        Ipv4Address::new(10, 0, 0, 1), tcp_config, &isn);
    let mut server = Host::new(EthernetAddress([2, 0, 0, 0, 1, 2]), connection.reversed(),
        Ipv4Address::new(192, 168, 0, 1), tcp_config, &isn);

    let mut router = Router::new();
    let inner = router.add_interface(NetworkInterface::new(
        EthernetAddress([2, 0, 0, 0, 0, 1]), Ipv4Address::new(10, 0, 0, 1)));
    let outer = router.add_interface(NetworkInterface::new(
        EthernetAddress([2, 0, 0, 0, 1, 1]), Ipv4Address::new(192, 168, 0, 1)));
    router.add_route(Ipv4Address::new(10, 0, 0, 0).to_network_integer(), 8, None, inner)
        .expect("Valid route for the client network");
    router.add_route(Ipv4Address::new(192, 168, 0, 0).to_network_integer(), 16, None, outer)
        .expect("Valid route for the server network");

    let data: Vec<u8> = (0..bytes).map(|i| i as u8).collect();
    let mut offset = 0;
    let mut received = 0;
    let mut corrupt = false;
    let mut now = 0;

    while (client.peer.active() || server.peer.active()) && now < timeout {
        if offset < data.len() {
            offset += client.peer.outbound_writer().push(&data[offset..]);
            if offset == data.len() {
                client.peer.outbound_writer().close();
            }
        }

        now += STEP;
        client.tick(STEP);
        server.tick(STEP);
        router.tick(STEP);

        client.transmit(&mut client_up);
        server.transmit(&mut server_up);

        for (index, link) in [(inner, &mut client_up), (outer, &mut server_up)] {
            while let Some(frame) = link.recv() {
                if let Some(port) = router.interface_mut(index) {
                    port.recv_frame(&frame);
                }
                router.route();
            }
        }

        for (index, link) in [(inner, &mut client_down), (outer, &mut server_down)] {
            if let Some(port) = router.interface_mut(index) {
                while let Some(frame) = port.maybe_send() {
                    link.send(frame);
                }
            }
        }

        client.receive(&mut client_down);
        server.receive(&mut server_down);

        let reader = server.peer.inbound_reader();
        let chunk = reader.read(usize::max_value());
        corrupt |= chunk.iter().zip(&data[received..]).any(|(a, b)| a != b);
        received += chunk.len();
        if reader.is_finished() {
            server.peer.outbound_writer().close();
        }
    }

    let lost: u64 = [&client_up, &client_down, &server_up, &server_down]
        .iter()
        .map(|link| link.dropped())
        .sum();
    let sent: u64 = [&client_up, &client_down, &server_up, &server_down]
        .iter()
        .map(|link| link.sent())
        .sum();

    println!("Transferred {} of {} bytes in {}ms of simulated time", received, bytes, now);
    println!("Frames: {} sent, {} lost", sent, lost);
    println!("Client retransmissions in a row at the end: {}",
        client.peer.sender().consecutive_retransmissions());
    if corrupt {
        println!("Received data differs from the sent data");
    }
    if client.peer.sender().budget_exceeded() || server.peer.sender().budget_exceeded() {
        println!("Connection gave up after too many retransmissions");
    }
}

struct Host {
    interface: NetworkInterface,
    adapter: TcpOverIpv4,
    peer: Peer,
    gateway: Ipv4Address,
}

impl Host {
    fn new(
        mac: EthernetAddress,
        connection: FourTuple,
        gateway: Ipv4Address,
        config: tcp::Config,
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
            if let Some(datagram) = self.interface.recv_frame(&frame) {
                if let Some(message) = self.adapter.from_datagram(&datagram) {
                    self.peer.receive(&message);
                }
            }
        }
    }
}

#[derive(StructOpt)]
struct Config {
    /// The number of bytes the client sends.
    #[structopt(short = "n", long = "bytes", default_value = "100000")]
    bytes: usize,
    /// The probability of each link to lose a frame.
    #[structopt(long = "loss", default_value = "0.05")]
    loss: f64,
    /// Seed of the loss simulation.
    #[structopt(long = "seed", default_value = "0")]
    seed: u64,
    /// The initial retransmission timeout in milliseconds.
    #[structopt(long = "rto", default_value = "1000")]
    rto: u64,
    /// The capacity of the stream buffers of both peers.
    #[structopt(long = "capacity", default_value = "64000")]
    capacity: usize,
    /// Give up after this many milliseconds of simulated time.
    #[structopt(long = "timeout", default_value = "3600000")]
    timeout: u64,
}
