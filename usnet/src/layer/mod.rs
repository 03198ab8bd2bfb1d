//! The process logic of protocol layers.
//!
//! ## Layering
//!
//! Each protocol layer is split into two parts; the packet logic contained in `wire` and the
//! processing part in this module. The state of a layer is an ordinary struct owned by the
//! caller. Every operation takes that state by mutable reference, runs to completion and either
//! absorbs a failure (dropping the offending packet) or encodes it in the state it returns.
//!
//! ## Polling
//!
//! Nothing in a layer runs on its own. Incoming units are handed in with `receive` or
//! `recv_frame`, outgoing units are pulled out with `maybe_send`, and time passes only through
//! `tick`. The caller decides the order of these calls, a layer only promises that each single
//! call leaves it consistent.
//!
//! ## Stacking
//!
//! * [`tcp`] turns byte streams into segments and back.
//! * [`eth`] carries IPv4 datagrams in Ethernet frames, resolving link addresses with [`arp`].
//! * [`ip`] forwards datagrams between several such interfaces.
//! * [`loss`] decides which frames a simulated link drops.
//!
//! [`tcp`]: tcp/index.html
//! [`eth`]: eth/index.html
//! [`arp`]: arp/index.html
//! [`ip`]: ip/index.html
//! [`loss`]: loss/index.html

pub mod arp;
pub mod eth;
pub mod ip;
pub mod loss;
pub mod tcp;

/// The result type of layer configuration.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors of layer configuration.
///
/// Processing a packet never returns one of these. A router failing to forward a datagram logs
/// the error and drops the datagram, malformed or unexpected packets are dropped silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// The operation was not permitted.
    ///
    /// Returned when an argument is out of its domain, for example a prefix length larger than
    /// the address or an interface index that was never handed out.
    #[error("illegal operation")]
    Illegal,

    /// Unable to find a route towards the destination address.
    #[error("destination unreachable")]
    Unreachable,
}
