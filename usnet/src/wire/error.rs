use thiserror::Error;

/// The error type for parsing of the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// An incoming packet could not be parsed because it was shorter than assumed.
    ///
    /// The packet may be shorter than the minimum length specified, a size longer than the actual
    /// payload. For variable length packets, this may be because some of its fields were out of
    /// bounds of the received data.
    #[error("truncated packet")]
    Truncated,

    /// An incoming packet had an incorrect checksum and was dropped.
    #[error("checksum error")]
    WrongChecksum,

    /// An incoming packet could not be recognized and was dropped.
    ///
    /// E.g. an Ethernet packet with an unknown EtherType or an ARP packet with an opcode other
    /// than request and reply.
    #[error("unrecognized packet")]
    Unrecognized,

    /// An incoming packet was recognized but was self-contradictory.
    ///
    /// Examples: an IPv4 header claiming to be longer than the whole datagram; a TCP header
    /// with a data offset pointing into its fixed fields.
    #[error("malformed packet")]
    Malformed,

    /// Parsing depends on information derived from a non-implemented features.
    ///
    /// Similar to `Unrecognized` but in contrast we know that our implementation is incomplete,
    /// for example for fragmented IPv4 datagrams.
    #[error("unsupported option")]
    Unsupported,
}

/// The result type for the networking stack.
pub type Result<T> = core::result::Result<T, Error>;
