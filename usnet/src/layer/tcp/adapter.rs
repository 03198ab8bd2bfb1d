use crate::wire::{IpProtocol, Ipv4Address, Ipv4Datagram, Ipv4Header};
use crate::wire::{TcpMessage, TcpRepr};

/// The addresses and ports identifying a connection, from the local point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FourTuple {
    /// The local address.
    pub local: Ipv4Address,
    /// The local port.
    pub local_port: u16,
    /// The remote address.
    pub remote: Ipv4Address,
    /// The remote port.
    pub remote_port: u16,
}

/// Carries the messages of one connection in IPv4 datagrams.
#[derive(Clone, Copy, Debug)]
pub struct TcpOverIpv4 {
    connection: FourTuple,
}

impl FourTuple {
    /// The same connection seen from the remote end.
    pub fn reversed(self) -> Self {
        FourTuple {
            local: self.remote,
            local_port: self.remote_port,
            remote: self.local,
            remote_port: self.local_port,
        }
    }
}

impl TcpOverIpv4 {
    /// The hop limit of outgoing datagrams.
    pub const HOP_LIMIT: u8 = 64;

    /// An adapter for the given connection.
    pub fn new(connection: FourTuple) -> Self {
        TcpOverIpv4 { connection }
    }

    /// The connection this adapter is for.
    pub fn connection(&self) -> FourTuple {
        self.connection
    }

    /// Put a message into a datagram for the remote end.
    pub fn to_datagram(&self, message: &TcpMessage) -> Ipv4Datagram {
        let FourTuple { local, local_port, remote, remote_port } = self.connection;
        let repr = TcpRepr::from_message(message, local_port, remote_port);
        let header = Ipv4Header::new(local, remote, IpProtocol::Tcp, Self::HOP_LIMIT);
        Ipv4Datagram::new(header, repr.to_bytes(local, remote))
    }

    /// Take the message out of a datagram of this connection.
    ///
    /// Datagrams of other protocols or connections and malformed segments yield nothing.
    pub fn from_datagram(&self, datagram: &Ipv4Datagram) -> Option<TcpMessage> {
        let FourTuple { local, local_port, remote, remote_port } = self.connection;
        let header = &datagram.header;
        if header.protocol != IpProtocol::Tcp {
            net_trace!("not a TCP datagram: {}", header);
            return None;
        }

        if header.src_addr != remote || header.dst_addr != local {
            net_trace!("datagram of another connection: {}", header);
            return None;
        }

        let repr = match TcpRepr::parse(&datagram.payload, remote, local) {
            Ok(repr) => repr,
            Err(err) => {
                net_trace!("dropping TCP segment: {}", err);
                return None;
            },
        };

        if repr.src_port != remote_port || repr.dst_port != local_port {
            net_trace!("segment of another connection: {}", repr);
            return None;
        }

        Some(repr.into_message())
    }
}
