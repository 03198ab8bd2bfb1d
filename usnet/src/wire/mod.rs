/*! Low-level packet access and construction.

# An overview over packet representations

The `wire` module deals with the packet *representation*. The core state machines consume these
codecs as given and never look at raw bytes themselves. It provides three levels of
functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens in the lowercase structures e.g. [`ethernet_frame`] or
   [`ipv4_packet`].
 * Second, it provides a compact, high-level representation of header data that can be created
   from parsing and emitted into a sequence of octets. This happens through the `Repr` family of
   structs and enums, e.g. [`ArpRepr`] or [`TcpRepr`].
 * Third, it provides owned packets which pair a header representation with the payload bytes,
   [`EthernetFrame`] and [`Ipv4Datagram`]. These are what the network interface queues and what
   the router forwards.

[`ethernet_frame`]: struct.ethernet_frame.html
[`ipv4_packet`]: struct.ipv4_packet.html
[`ArpRepr`]: enum.ArpRepr.html
[`TcpRepr`]: struct.TcpRepr.html
[`EthernetFrame`]: struct.EthernetFrame.html
[`Ipv4Datagram`]: struct.Ipv4Datagram.html

The lowercase `packet` family of data structures guarantees that, if the `packet::check_len()`
method returned `Ok(())`, then no field accessor or setter method will panic. When parsing
untrusted input, it is *necessary* to use either of the checked methods; so long as the buffer is
not modified, no accessor will fail.

In the `Repr` family of data structures, the `Repr::parse()` method never panics and the
`Repr::emit()` method never panics as long as the underlying buffer is exactly `Repr::buffer_len()`
octets long.

The sequence number arithmetic of TCP also lives here, in [`SeqNumber`], together with the two
message shapes exchanged between a sender and a receiver.

[`SeqNumber`]: struct.SeqNumber.html
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `arp.rs`
// * `error.rs`
// * `ethernet.rs`
// * `ipv4.rs`
// * `mod.rs` (this file)

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest  = ::core::ops::RangeFrom<usize>;
}

mod error;
pub mod arp;
pub mod ethernet;
pub mod ipv4;
pub mod tcp;

pub use self::error::{
    Error,
    Result};

pub use self::ethernet::{
    ethernet as ethernet_frame,
    EtherType as EthernetProtocol,
    Address as EthernetAddress,
    Frame as EthernetFrame,
    Repr as EthernetRepr};

pub use self::arp::{
    arp as arp_packet,
    Hardware as ArpHardware,
    Operation as ArpOperation,
    Repr as ArpRepr};

pub use self::ipv4::{
    ipv4 as ipv4_packet,
    Address as Ipv4Address,
    Cidr as Ipv4Cidr,
    Datagram as Ipv4Datagram,
    Header as Ipv4Header,
    Protocol as IpProtocol};

pub use self::tcp::{
    tcp as tcp_packet,
    Message as TcpMessage,
    ReceiverMessage as TcpReceiverMessage,
    Repr as TcpRepr,
    SenderMessage as TcpSenderMessage,
    SeqNumber as TcpSeqNumber};
