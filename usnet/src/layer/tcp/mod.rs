//! The TCP layer abstraction.
//!
//! Offers receiver and sender implementations for the two directions of a connection, and a
//! [`Peer`] combining them with the byte streams the application reads and writes. Some parts
//! differ from lower layers since TCP is a connection oriented protocol but most concepts should
//! be somewhat familiar nevertheless.
//!
//! The main difference is that many incoming events *require* soliciting an answer such as an ACK
//! for received data. The peer remembers that obligation and answers with an empty segment if it
//! has nothing else to send. Dropping such answers potentially starves the remote of ACKs and
//! window updates, leading to inefficient communication but not to failure.
//!
//! ## Simplifications
//!
//! * There is no connection state machine beyond what the two halves track on their own. The SYN
//!   of each direction is sent with the first segment, the FIN with the last byte of the stream.
//! * Acknowledgements are cumulative only. A retransmission resends the oldest unacknowledged
//!   segment exactly as it was first sent.
//! * There is no congestion control. The window of the peer is the only limit, a closed window is
//!   probed with single bytes whose timeouts do not back off.
//!
//! ## Time
//!
//! A timer timeout is used to retransmit queued segments. There is no background timer, the
//! driver calls `tick` with the time that passed and polls `maybe_send` for the retransmission.
//!
//! [`Peer`]: struct.Peer.html
use crate::wire::TcpSeqNumber;

mod adapter;
mod peer;
mod receiver;
mod sender;
mod siphash;
mod timer;


pub use adapter::{
    FourTuple,
    TcpOverIpv4};

pub use peer::Peer;

pub use receiver::Receiver;

pub use sender::Sender;

// publically exposed for initialization.
pub use siphash::IsnGenerator;

pub use timer::Timer;

/// Parameters of a TCP connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// The capacity of both byte streams.
    pub capacity: usize,
    /// The initial retransmission timeout in milliseconds.
    pub rt_timeout: u64,
    /// The number of consecutive retransmissions tolerated before giving up.
    pub max_retx_attempts: u32,
    /// An initial sequence number to use instead of a generated one.
    pub fixed_isn: Option<TcpSeqNumber>,
    /// The maximum number of stream bytes in a single segment.
    pub max_payload_size: usize,
}

impl Config {
    /// The default stream capacity.
    pub const DEFAULT_CAPACITY: usize = 64_000;

    /// The default initial retransmission timeout.
    pub const TIMEOUT_DFLT: u64 = 1000;

    /// The default retransmission budget.
    pub const MAX_RETX_ATTEMPTS: u32 = 8;

    /// The default segment payload limit.
    pub const MAX_PAYLOAD_SIZE: usize = 1000;
}

impl Default for Config {
    fn default() -> Self {
        Config {
            capacity: Config::DEFAULT_CAPACITY,
            rt_timeout: Config::TIMEOUT_DFLT,
            max_retx_attempts: Config::MAX_RETX_ATTEMPTS,
            fixed_isn: None,
            max_payload_size: Config::MAX_PAYLOAD_SIZE,
        }
    }
}
