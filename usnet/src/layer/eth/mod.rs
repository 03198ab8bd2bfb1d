//! The Ethernet layer.
//!
//! This is tasked with putting IPv4 datagrams into Ethernet framing and taking them back out,
//! which requires knowing the link address of the next hop. The [`NetworkInterface`] owns the
//! [neighbor cache][arp] for that purpose and answers the requests of other hosts on the link.
//!
//! Addressing follows the generic [layer documentation][layer]: frames are handed in and pulled
//! out by the caller, and time only passes through `tick`.
//!
//! [`NetworkInterface`]: struct.NetworkInterface.html
//! [arp]: ../arp/index.html
//! [layer]: ../index.html
mod interface;

pub use interface::NetworkInterface;
