use core::{fmt, str::FromStr};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
use super::field::Field;

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        /// Internet control messages.
        Icmp = 0x01,
        /// Transmission control protocol.
        Tcp  = 0x06,
        /// User datagram protocol.
        Udp  = 0x11,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Tcp  => write!(f, "TCP"),
            Protocol::Udp  => write!(f, "UDP"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id),
        }
    }
}

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// An unspecified address.
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    /// The broadcast address.
    pub const BROADCAST:   Address = Address([0xff; 4]);

    /// Construct an IPv4 address from parts.
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address([a0, a1, a2, a3])
    }

    /// Construct an IPv4 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an IPv4 address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode the address into a `u32` in network endian byte order.
    pub fn to_network_integer(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Decode a network endian `u32` into an address.
    pub fn from_network_integer(num: u32) -> Self {
        Address(num.to_be_bytes())
    }

    /// Query whether the address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the address falls into the "unspecified" range.
    pub fn is_unspecified(&self) -> bool {
        self.0[0] == 0
    }

    /// Mask the address to some prefix length.
    ///
    /// Preserves only address bits that are relevant for the prefix length. This can be used to
    /// isolate the bits of the cidr subnet that the address belongs to.
    ///
    /// ```rust
    /// # use usnet::wire::Ipv4Address as Address;
    /// let base = Address([192, 168, 178, 32]);
    /// let masked = base.mask(24);
    /// assert!(masked == Address([192, 168, 178, 0]));
    /// ```
    ///
    /// # Panics
    /// This function panics if `prefix` is greater than 32.
    pub fn mask(&self, prefix: u8) -> Address {
        assert!(prefix <= 32);
        let masked_off = (!0u32)
            .checked_shr(prefix.into())
            .unwrap_or(0);
        let as_int = self.to_network_integer() & !masked_off;
        Address::from_network_integer(as_int)
    }
}

impl From<std::net::Ipv4Addr> for Address {
    fn from(x: std::net::Ipv4Addr) -> Address {
        Address(x.octets())
    }
}

impl From<Address> for std::net::Ipv4Addr {
    fn from(Address(x): Address) -> std::net::Ipv4Addr {
        x.into()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

impl FromStr for Address {
    type Err = std::net::AddrParseError;

    fn from_str(src: &str) -> core::result::Result<Self, Self::Err> {
        src.parse::<std::net::Ipv4Addr>().map(Address::from)
    }
}

/// An IPv4 CIDR block: an address and a variable-length subnet masking prefix length.
///
/// Only the leading `prefix_len` bits of the address are significant when matching.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Cidr {
    address:    Address,
    prefix_len: u8,
}

impl Cidr {
    /// The block containing every address.
    pub const ANY: Self = Cidr { address: Address::UNSPECIFIED, prefix_len: 0 };

    /// Create an IPv4 CIDR block from the given address and prefix length.
    ///
    /// # Panics
    /// This function panics if the prefix length is larger than 32.
    pub fn new(address: Address, prefix_len: u8) -> Cidr {
        assert!(prefix_len <= 32);
        Cidr { address, prefix_len }
    }

    /// Create a block from its address and prefix length, if the length is valid.
    pub fn try_new(address: Address, prefix_len: u8) -> Option<Cidr> {
        if prefix_len <= 32 {
            Some(Cidr { address, prefix_len })
        } else {
            None
        }
    }

    /// Return the address of this IPv4 CIDR block.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Return the prefix length of this IPv4 CIDR block.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Return the network mask of this IPv4 CIDR.
    pub fn netmask(&self) -> Address {
        Address::from_network_integer(!0).mask(self.prefix_len)
    }

    /// Query whether a host is contained in the block described by `self`.
    ///
    /// Host bits of the block's own address are ignored.
    pub fn contains(&self, address: Address) -> bool {
        self.address.mask(self.prefix_len) == address.mask(self.prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// Error emitted when parsing an IPv4 CIDR specifier fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseCidrError {
    /// The subnet prefix was missing entirely.
    #[error("missing subnet prefix separator")]
    NoSubnet,
    /// The IPv4 address part is invalid.
    #[error("invalid address")]
    AddrParseError,
    /// The subnet prefix is invalid.
    #[error("invalid cidr prefix")]
    InvalidPrefix,
}

impl FromStr for Cidr {
    type Err = ParseCidrError;

    fn from_str(src: &str) -> core::result::Result<Self, ParseCidrError> {
        let subnet = src.find('/')
            .ok_or(ParseCidrError::NoSubnet)?;
        let address: Address = src[..subnet]
            .parse()
            .map_err(|_| ParseCidrError::AddrParseError)?;
        let prefix_len = src[subnet+1..]
            .parse()
            .map_err(|_| ParseCidrError::InvalidPrefix)?;
        Cidr::try_new(address, prefix_len)
            .ok_or(ParseCidrError::InvalidPrefix)
    }
}

byte_wrapper! {
    /// A byte sequence representing an IPv4 packet.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ipv4([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub(crate) const VER_IHL:  usize = 0;
    pub(crate) const DSCP_ECN: usize = 1;
    pub(crate) const LENGTH:   Field = 2..4;
    pub(crate) const IDENT:    Field = 4..6;
    pub(crate) const FLG_OFF:  Field = 6..8;
    pub(crate) const TTL:      usize = 8;
    pub(crate) const PROTOCOL: usize = 9;
    pub(crate) const CHECKSUM: Field = 10..12;
    pub(crate) const SRC_ADDR: Field = 12..16;
    pub(crate) const DST_ADDR: Field = 16..20;
}

impl ipv4 {
    /// Imbue a raw octet buffer with IPv4 packet structure.
    pub fn new_unchecked(buffer: &[u8]) -> &ipv4 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with IPv4 packet structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut ipv4 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&ipv4> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Unwrap the packet as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the header length is smaller than the fixed header or
    /// larger than the total length.
    ///
    /// The result of this check is invalidated by calling [set_header_len]
    /// and [set_total_len].
    ///
    /// [set_header_len]: #method.set_header_len
    /// [set_total_len]: #method.set_total_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::DST_ADDR.end {
            Err(Error::Truncated)
        } else if usize::from(self.header_len()) < field::DST_ADDR.end {
            Err(Error::Malformed)
        } else if len < self.header_len() as usize {
            Err(Error::Truncated)
        } else if self.header_len() as u16 > self.total_len() {
            Err(Error::Malformed)
        } else if len < self.total_len() as usize {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the version field.
    #[inline]
    pub fn version(&self) -> u8 {
        self.0[field::VER_IHL] >> 4
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        (self.0[field::VER_IHL] & 0x0f) * 4
    }

    /// Return the combined type of service field.
    pub fn tos(&self) -> u8 {
        self.0[field::DSCP_ECN]
    }

    /// Return the total length field.
    #[inline]
    pub fn total_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the fragment identification field.
    #[inline]
    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::IDENT])
    }

    /// Return the "don't fragment" flag.
    #[inline]
    pub fn dont_frag(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x4000 != 0
    }

    /// Return the "more fragments" flag.
    #[inline]
    pub fn more_frags(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x2000 != 0
    }

    /// Return the fragment offset, in octets.
    #[inline]
    pub fn frag_offset(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) << 3
    }

    /// Return the time to live field.
    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.0[field::TTL]
    }

    /// Return the protocol field.
    #[inline]
    pub fn protocol(&self) -> Protocol {
        Protocol::from(self.0[field::PROTOCOL])
    }

    /// Return the header checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the source address field.
    #[inline]
    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC_ADDR])
    }

    /// Return the destination address field.
    #[inline]
    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST_ADDR])
    }

    /// Return the options between the fixed header and the payload.
    pub fn options(&self) -> &[u8] {
        &self.0[field::DST_ADDR.end..usize::from(self.header_len())]
    }

    /// Validate the header checksum.
    pub fn verify_checksum(&self) -> bool {
        checksum::data(&self.0[..self.header_len() as usize]) == !0
    }

    /// Set the version field.
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        self.0[field::VER_IHL] = (self.0[field::VER_IHL] & !0xf0) | (value << 4);
    }

    /// Set the header length, in octets.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        self.0[field::VER_IHL] = (self.0[field::VER_IHL] & !0x0f) | ((value / 4) & 0x0f);
    }

    /// Set the combined type of service field.
    pub fn set_tos(&mut self, value: u8) {
        self.0[field::DSCP_ECN] = value
    }

    /// Set the total length field.
    #[inline]
    pub fn set_total_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    /// Set the fragment identification field.
    #[inline]
    pub fn set_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::IDENT], value)
    }

    /// Clear the entire flags and fragment offset field.
    #[inline]
    pub fn clear_flags(&mut self) {
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], 0);
    }

    /// Set the "don't fragment" flag.
    #[inline]
    pub fn set_dont_frag(&mut self, value: bool) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLG_OFF]);
        let raw = if value { raw | 0x4000 } else { raw & !0x4000 };
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], raw);
    }

    /// Set the time to live field.
    #[inline]
    pub fn set_hop_limit(&mut self, value: u8) {
        self.0[field::TTL] = value
    }

    /// Set the protocol field.
    #[inline]
    pub fn set_protocol(&mut self, value: Protocol) {
        self.0[field::PROTOCOL] = value.into()
    }

    /// Set the header checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the source address field.
    #[inline]
    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SRC_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Set the destination address field.
    #[inline]
    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DST_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Return the options as a mutable slice.
    pub fn options_mut(&mut self) -> &mut [u8] {
        let end = usize::from(self.header_len());
        &mut self.0[field::DST_ADDR.end..end]
    }

    /// Compute and fill in the header checksum.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = !checksum::data(&self.0[..self.header_len() as usize]);
        self.set_checksum(checksum)
    }

    /// Compute the range of the payload without accessing it.
    pub fn payload_range(&self) -> Field {
        let header_end = usize::from(self.header_len());
        let total_len = usize::from(self.total_len());
        header_end..total_len
    }

    /// Return the payload as a byte slice.
    ///
    /// Link layer padding beyond the total length is not part of the payload.
    pub fn payload_slice(&self) -> &[u8] {
        let range = self.payload_range();
        &self.0[range]
    }

    /// Return the payload as a mutable byte slice.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let range = self.payload_range();
        &mut self.0[range]
    }
}

impl AsRef<[u8]> for ipv4 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The header of an IPv4 datagram, as it appears on the wire.
///
/// Unlike a pure representation this keeps the checksum that was read or last computed, so that a
/// forwarded datagram is emitted exactly as it was modified.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    /// The type of service octet (DSCP and ECN).
    pub tos:       u8,
    /// The fragment identification.
    pub ident:     u16,
    /// The "don't fragment" flag.
    pub dont_frag: bool,
    /// The remaining hop limit (time to live).
    pub hop_limit: u8,
    /// The encapsulated protocol identifier.
    pub protocol:  Protocol,
    /// The header checksum.
    pub checksum:  u16,
    /// The source of the datagram.
    pub src_addr:  Address,
    /// The destination of the datagram.
    pub dst_addr:  Address,
    /// Raw options, a multiple of four octets.
    pub options:   Vec<u8>,
}

impl Header {
    /// A header without options that still needs its checksum computed.
    pub fn new(src_addr: Address, dst_addr: Address, protocol: Protocol, hop_limit: u8) -> Self {
        Header {
            tos: 0,
            ident: 0,
            dont_frag: true,
            hop_limit,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
            options: Vec::new(),
        }
    }

    /// Parse the header of an IPv4 packet.
    ///
    /// Rejects other versions, bad checksums and fragments.
    pub fn parse(packet: &ipv4) -> Result<Header> {
        packet.check_len()?;
        // Version 4 is expected.
        if packet.version() != 4 { return Err(Error::Malformed) }
        // Valid checksum is expected.
        if !packet.verify_checksum() { return Err(Error::WrongChecksum) }
        // We do not support fragmentation.
        if packet.more_frags() || packet.frag_offset() != 0 { return Err(Error::Unsupported) }

        Ok(Header {
            tos: packet.tos(),
            ident: packet.ident(),
            dont_frag: packet.dont_frag(),
            hop_limit: packet.hop_limit(),
            protocol: packet.protocol(),
            checksum: packet.checksum(),
            src_addr: packet.src_addr(),
            dst_addr: packet.dst_addr(),
            options: packet.options().to_vec(),
        })
    }

    /// Return the length of the emitted header.
    pub fn header_len(&self) -> usize {
        field::DST_ADDR.end + self.options.len()
    }

    /// Emit the header, including the stored checksum, for a payload of the given length.
    ///
    /// # Panics
    /// This function panics if the packet is shorter than the header, or if the options are not
    /// a multiple of four octets or longer than forty.
    pub fn emit(&self, packet: &mut ipv4, payload_len: usize) {
        assert!(self.options.len() % 4 == 0 && self.options.len() <= 40);
        packet.set_version(4);
        packet.set_header_len(self.header_len() as u8);
        packet.set_tos(self.tos);
        packet.set_total_len((self.header_len() + payload_len) as u16);
        packet.set_ident(self.ident);
        packet.clear_flags();
        packet.set_dont_frag(self.dont_frag);
        packet.set_hop_limit(self.hop_limit);
        packet.set_protocol(self.protocol);
        packet.set_checksum(self.checksum);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);
        packet.options_mut().copy_from_slice(&self.options);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IPv4 src={} dst={} proto={} ttl={}",
               self.src_addr, self.dst_addr, self.protocol, self.hop_limit)
    }
}

/// An owned IPv4 datagram.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Datagram {
    /// The header as it will be emitted.
    pub header: Header,
    /// The encapsulated payload.
    pub payload: Vec<u8>,
}

impl Datagram {
    /// Create a datagram and fill in its checksum.
    pub fn new(header: Header, payload: Vec<u8>) -> Self {
        let mut datagram = Datagram { header, payload };
        datagram.compute_checksum();
        datagram
    }

    /// Parse a complete datagram from the wire.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let packet = ipv4::new_checked(data)?;
        let header = Header::parse(packet)?;
        Ok(Datagram {
            header,
            payload: packet.payload_slice().to_vec(),
        })
    }

    /// Recompute the header checksum from the current header fields.
    pub fn compute_checksum(&mut self) {
        let mut bytes = vec![0; self.header.header_len()];
        let packet = ipv4::new_unchecked_mut(&mut bytes);
        self.header.emit(packet, self.payload.len());
        packet.fill_checksum();
        self.header.checksum = packet.checksum();
    }

    /// Serialize the datagram for the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header_len = self.header.header_len();
        let mut bytes = vec![0; header_len + self.payload.len()];
        let packet = ipv4::new_unchecked_mut(&mut bytes);
        self.header.emit(packet, self.payload.len());
        packet.payload_mut_slice().copy_from_slice(&self.payload);
        bytes
    }
}

impl fmt::Display for Datagram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} len={}", self.header, self.payload.len())
    }
}

pub(crate) mod checksum {
    use byteorder::{ByteOrder, NetworkEndian};

    use super::{Address, Protocol};

    fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    pub(crate) fn data(mut data: &[u8]) -> u16 {
        let mut accum = 0;

        // For each 32-byte chunk...
        const CHUNK_SIZE: usize = 32;
        while data.len() >= CHUNK_SIZE {
            let mut d = &data[..CHUNK_SIZE];
            // ... take by 2 bytes and sum them.
            while d.len() >= 2 {
                accum += NetworkEndian::read_u16(d) as u32;
                d = &d[2..];
            }

            data = &data[CHUNK_SIZE..];
        }

        // Sum the rest that does not fit the last 32-byte chunk,
        // taking by 2 bytes.
        while data.len() >= 2 {
            accum += NetworkEndian::read_u16(data) as u32;
            data = &data[2..];
        }

        // Add the last remaining odd byte, if any.
        if let Some(&value) = data.first() {
            accum += (value as u32) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub(crate) fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum += word as u32;
        }
        propagate_carries(accum)
    }

    /// Compute an IPv4 pseudo header checksum.
    pub(crate) fn pseudo_header(src_addr: Address, dst_addr: Address,
                                protocol: Protocol, length: u32) -> u16 {
        let mut proto_len = [0u8; 4];
        proto_len[1] = protocol.into();
        NetworkEndian::write_u16(&mut proto_len[2..4], length as u16);

        combine(&[
            data(src_addr.as_bytes()),
            data(dst_addr.as_bytes()),
            data(&proto_len[..])
        ])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static PACKET_BYTES: [u8; 30] =
        [0x45, 0x00, 0x00, 0x1e,
         0x01, 0x02, 0x62, 0x03,
         0x1a, 0x01, 0xd5, 0x6e,
         0x11, 0x12, 0x13, 0x14,
         0x21, 0x22, 0x23, 0x24,
         0xaa, 0x00, 0x00, 0x00,
         0x00, 0x00, 0x00, 0x00,
         0x00, 0xff];

    static REPR_PACKET_BYTES: [u8; 24] =
        [0x45, 0x00, 0x00, 0x18,
         0x00, 0x00, 0x40, 0x00,
         0x40, 0x01, 0xd2, 0x79,
         0x11, 0x12, 0x13, 0x14,
         0x21, 0x22, 0x23, 0x24,
         0xaa, 0x00, 0x00, 0xff];

    static REPR_PAYLOAD_BYTES: [u8; 4] =
        [0xaa, 0x00, 0x00, 0xff];

    fn packet_header() -> Header {
        Header {
            checksum: 0xd279,
            .. Header::new(
                Address([0x11, 0x12, 0x13, 0x14]),
                Address([0x21, 0x22, 0x23, 0x24]),
                Protocol::Icmp,
                64)
        }
    }

    #[test]
    fn test_deconstruct() {
        let packet = ipv4::new_unchecked(&PACKET_BYTES[..]);
        assert_eq!(packet.version(), 4);
        assert_eq!(packet.header_len(), 20);
        assert_eq!(packet.total_len(), 30);
        assert_eq!(packet.ident(), 0x102);
        assert_eq!(packet.more_frags(), true);
        assert_eq!(packet.dont_frag(), true);
        assert_eq!(packet.frag_offset(), 0x203 * 8);
        assert_eq!(packet.hop_limit(), 0x1a);
        assert_eq!(packet.protocol(), Protocol::Icmp);
        assert_eq!(packet.checksum(), 0xd56e);
        assert_eq!(packet.verify_checksum(), true);
    }

    #[test]
    fn test_parse() {
        let datagram = Datagram::parse(&REPR_PACKET_BYTES[..]).unwrap();
        assert_eq!(datagram.header, packet_header());
        assert_eq!(datagram.payload, &REPR_PAYLOAD_BYTES[..]);
    }

    #[test]
    fn test_emit() {
        let datagram = Datagram::new(
            Header { checksum: 0, .. packet_header() },
            REPR_PAYLOAD_BYTES.to_vec());
        assert_eq!(datagram.header.checksum, 0xd279);
        assert_eq!(datagram.to_bytes(), &REPR_PACKET_BYTES[..]);
    }

    #[test]
    fn test_fragment_unsupported() {
        assert_eq!(Datagram::parse(&PACKET_BYTES[..]), Err(Error::Unsupported));
    }

    #[test]
    fn test_bad_checksum() {
        let mut bytes = REPR_PACKET_BYTES;
        bytes[11] ^= 1;
        assert_eq!(Datagram::parse(&bytes[..]), Err(Error::WrongChecksum));
    }

    #[test]
    fn test_parse_bad_version() {
        let mut bytes = REPR_PACKET_BYTES;
        let packet = ipv4::new_unchecked_mut(&mut bytes);
        packet.set_version(6);
        packet.fill_checksum();
        assert_eq!(Datagram::parse(&bytes[..]), Err(Error::Malformed));
    }

    #[test]
    fn test_parse_total_len_less_than_header_len() {
        let mut bytes = vec![0; 40];
        bytes[0] = 0x49;
        assert_eq!(Datagram::parse(&bytes), Err(Error::Malformed));
    }

    #[test]
    fn test_total_len_overflow() {
        let mut bytes = REPR_PACKET_BYTES;
        ipv4::new_unchecked_mut(&mut bytes).set_total_len(128);
        assert_eq!(Datagram::parse(&bytes[..]), Err(Error::Truncated));
    }

    #[test]
    fn test_padding_stripped() {
        let mut bytes = REPR_PACKET_BYTES.to_vec();
        bytes.extend_from_slice(&[0; 6]);
        let datagram = Datagram::parse(&bytes).unwrap();
        assert_eq!(datagram.payload, &REPR_PAYLOAD_BYTES[..]);
    }

    #[test]
    fn test_ttl_decrement_checksum() {
        let mut datagram = Datagram::parse(&REPR_PACKET_BYTES[..]).unwrap();
        datagram.header.hop_limit -= 1;
        datagram.compute_checksum();
        // RFC 1624: lowering the TTL octet by one raises the checksum by 0x0100.
        assert_eq!(datagram.header.checksum, 0xd379);
        let bytes = datagram.to_bytes();
        assert!(ipv4::new_unchecked(&bytes).verify_checksum());
        assert_eq!(Datagram::parse(&bytes), Ok(datagram));
    }

    #[test]
    fn test_options_kept() {
        let mut header = Header::new(
            Address([10, 0, 0, 1]), Address([10, 0, 0, 2]), Protocol::Udp, 5);
        header.options = vec![1, 1, 1, 0];
        let datagram = Datagram::new(header, vec![0xfe; 3]);
        let bytes = datagram.to_bytes();
        assert_eq!(bytes.len(), 27);
        assert_eq!(bytes[0], 0x46);
        assert_eq!(Datagram::parse(&bytes), Ok(datagram));
    }

    #[test]
    fn test_mask() {
        let addr = Address([192, 168, 23, 42]);
        assert_eq!(addr.mask(0), Address::UNSPECIFIED);
        assert_eq!(addr.mask(16), Address([192, 168, 0, 0]));
        assert_eq!(addr.mask(32), addr);
    }

    #[test]
    fn test_cidr_contains() {
        let net: Cidr = "10.0.0.0/8".parse().unwrap();
        assert!(net.contains(Address([10, 1, 2, 3])));
        assert!(!net.contains(Address([11, 0, 0, 0])));
        assert!(Cidr::ANY.contains(Address([192, 168, 0, 1])));
        // Host bits in the block address do not matter.
        assert!(Cidr::new(Address([10, 9, 9, 9]), 8).contains(Address([10, 0, 0, 1])));
        assert_eq!(net.netmask(), Address([255, 0, 0, 0]));
    }

    #[test]
    fn test_cidr_parse() {
        assert_eq!("10.0.0.1".parse::<Cidr>(), Err(ParseCidrError::NoSubnet));
        assert_eq!("10.0.0/8".parse::<Cidr>(), Err(ParseCidrError::AddrParseError));
        assert_eq!("10.0.0.1/33".parse::<Cidr>(), Err(ParseCidrError::InvalidPrefix));
        assert_eq!(format!("{}", "10.0.0.1/24".parse::<Cidr>().unwrap()), "10.0.0.1/24");
    }
}
