use core::{fmt, ops};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, IpProtocol, Ipv4Address, Result};
use super::ipv4::checksum;

/// A TCP sequence number as it appears on the wire.
///
/// A sequence number is an absolute stream position plus an initial offset, modulo
/// 2<sup>32</sup>. Converting back to an absolute position needs a reference point close to the
/// expected answer, see [`unwrap`].
///
/// [`unwrap`]: #method.unwrap
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub u32);

impl SeqNumber {
    const SPAN: u64 = 1 << 32;

    /// Convert an absolute sequence number to its wire representation.
    pub fn wrap(absolute: u64, zero_point: SeqNumber) -> SeqNumber {
        SeqNumber((absolute as u32).wrapping_add(zero_point.0))
    }

    /// Find the absolute sequence number closest to `checkpoint` that wraps to `self`.
    ///
    /// When two candidates are equally close, which happens exactly when they are 2<sup>31</sup>
    /// away from the checkpoint, the larger one is chosen.
    pub fn unwrap(self, zero_point: SeqNumber, checkpoint: u64) -> u64 {
        let offset = u64::from(self.0.wrapping_sub(zero_point.0));
        let base = (checkpoint & !(Self::SPAN - 1)) | offset;
        let candidates = [
            base.checked_sub(Self::SPAN),
            Some(base),
            base.checked_add(Self::SPAN),
        ];

        candidates.iter()
            .flatten()
            .copied()
            .min_by_key(|&value| (abs_diff(value, checkpoint), core::cmp::Reverse(value)))
            .unwrap_or(base)
    }
}

fn abs_diff(a: u64, b: u64) -> u64 {
    if a > b { a - b } else { b - a }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ops::Add<u32> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u32) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs))
    }
}

/// The part of a segment written by a sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderMessage {
    /// The wrapped sequence number of the first element of sequence space.
    pub seqno: SeqNumber,
    /// Whether the segment opens the stream.
    pub syn: bool,
    /// The stream bytes carried.
    pub payload: Vec<u8>,
    /// Whether the segment ends the stream.
    pub fin: bool,
    /// Whether the outbound stream has failed.
    pub rst: bool,
}

impl SenderMessage {
    /// The number of sequence numbers the segment occupies.
    pub fn sequence_length(&self) -> u64 {
        u64::from(self.syn) + self.payload.len() as u64 + u64::from(self.fin)
    }
}

impl fmt::Display for SenderMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "seq={}", self.seqno)?;
        if self.syn { write!(f, " syn")? }
        if self.fin { write!(f, " fin")? }
        if self.rst { write!(f, " rst")? }
        write!(f, " len={}", self.payload.len())
    }
}

/// The feedback a receiver gives to the sender of the opposite direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverMessage {
    /// The next sequence number expected, once the stream has been opened.
    pub ackno: Option<SeqNumber>,
    /// How many bytes beyond the ack number the receiver is willing to accept.
    pub window_size: u16,
    /// Whether the inbound stream has failed.
    pub rst: bool,
}

impl fmt::Display for ReceiverMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ackno) = self.ackno {
            write!(f, "ack={} ", ackno)?;
        }
        write!(f, "win={}", self.window_size)?;
        if self.rst { write!(f, " rst")? }
        Ok(())
    }
}

/// A full segment exchanged between two peers: data in one direction, feedback for the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// The outbound half.
    pub sender: SenderMessage,
    /// The acknowledgement half.
    pub receiver: ReceiverMessage,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP {} {}", self.sender, self.receiver)
    }
}

byte_wrapper! {
    /// A byte sequence representing a TCP segment.
    #[derive(Debug, PartialEq, Eq)]
    pub struct tcp([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const SEQ_NUM:  Field = 4..8;
    pub(crate) const ACK_NUM:  Field = 8..12;
    pub(crate) const FLAGS:    Field = 12..14;
    pub(crate) const WIN_SIZE: Field = 14..16;
    pub(crate) const CHECKSUM: Field = 16..18;
    pub(crate) const URGENT:   Field = 18..20;

    pub(crate) const FLG_FIN: u16 = 0x001;
    pub(crate) const FLG_SYN: u16 = 0x002;
    pub(crate) const FLG_RST: u16 = 0x004;
    pub(crate) const FLG_ACK: u16 = 0x010;
}

impl tcp {
    /// Imbue a raw octet buffer with TCP segment structure.
    pub fn new_unchecked(buffer: &[u8]) -> &tcp {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with TCP segment structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut tcp {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&tcp> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Unwrap the segment as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no header accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the header length field has a value smaller
    /// than the minimal header length.
    ///
    /// The result of this check is invalidated by calling [set_header_len].
    ///
    /// [set_header_len]: #method.set_header_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::URGENT.end {
            Err(Error::Truncated)
        } else {
            let header_len = self.header_len() as usize;
            if len < header_len {
                Err(Error::Truncated)
            } else if header_len < field::URGENT.end {
                Err(Error::Malformed)
            } else {
                Ok(())
            }
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the sequence number field.
    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_u32(&self.0[field::SEQ_NUM]))
    }

    /// Return the acknowledgement number field.
    #[inline]
    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_u32(&self.0[field::ACK_NUM]))
    }

    /// Return all flag bits.
    pub fn flags(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::FLAGS]) & 0x1ff
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        ((raw >> 12) * 4) as u8
    }

    /// Return the window size field.
    #[inline]
    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::WIN_SIZE])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the payload following the header and its options.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[usize::from(self.header_len())..]
    }

    /// Validate the checksum over the pseudo header and the whole segment.
    pub fn verify_checksum(&self, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> bool {
        checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Tcp, self.0.len() as u32),
            checksum::data(&self.0),
        ]) == !0
    }

    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    /// Set the sequence number field.
    #[inline]
    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_u32(&mut self.0[field::SEQ_NUM], value.0)
    }

    /// Set the acknowledgement number field.
    #[inline]
    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_u32(&mut self.0[field::ACK_NUM], value.0)
    }

    /// Set the header length and flag bits at once.
    pub fn set_header_len_and_flags(&mut self, header_len: u8, flags: u16) {
        let raw = (u16::from(header_len / 4) << 12) | (flags & 0x1ff);
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw)
    }

    /// Set the window size field.
    #[inline]
    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::WIN_SIZE], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the urgent pointer field.
    #[inline]
    pub fn set_urgent_at(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::URGENT], value)
    }

    /// Return a mutable pointer to the payload data.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let header_len = usize::from(self.header_len());
        &mut self.0[header_len..]
    }

    /// Compute and fill in the checksum.
    pub fn fill_checksum(&mut self, src_addr: Ipv4Address, dst_addr: Ipv4Address) {
        self.set_checksum(0);
        let checksum = !checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Tcp, self.0.len() as u32),
            checksum::data(&self.0),
        ]);
        self.set_checksum(checksum)
    }
}

impl AsRef<[u8]> for tcp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A high-level representation of a Transmission Control Protocol segment.
///
/// Options are skipped when parsing and never emitted, the urgent pointer is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repr {
    /// The sending port.
    pub src_port:   u16,
    /// The receiving port.
    pub dst_port:   u16,
    /// The sequence number of the first element of sequence space.
    pub seq_number: SeqNumber,
    /// The acknowledgement number, present iff the ACK flag is set.
    pub ack_number: Option<SeqNumber>,
    /// The SYN flag.
    pub syn:        bool,
    /// The FIN flag.
    pub fin:        bool,
    /// The RST flag.
    pub rst:        bool,
    /// The advertised receive window.
    pub window_len: u16,
    /// The segment data.
    pub payload:    Vec<u8>,
}

impl Repr {
    /// Parse a segment that arrived from `src_addr` for `dst_addr`.
    pub fn parse(data: &[u8], src_addr: Ipv4Address, dst_addr: Ipv4Address) -> Result<Repr> {
        let packet = tcp::new_checked(data)?;
        // Source and destination ports must be present.
        if packet.src_port() == 0 { return Err(Error::Malformed) }
        if packet.dst_port() == 0 { return Err(Error::Malformed) }

        if !packet.verify_checksum(src_addr, dst_addr) {
            return Err(Error::WrongChecksum)
        }

        let flags = packet.flags();
        let ack_number = if flags & field::FLG_ACK != 0 {
            Some(packet.ack_number())
        } else {
            None
        };

        Ok(Repr {
            src_port:   packet.src_port(),
            dst_port:   packet.dst_port(),
            seq_number: packet.seq_number(),
            ack_number,
            syn:        flags & field::FLG_SYN != 0,
            fin:        flags & field::FLG_FIN != 0,
            rst:        flags & field::FLG_RST != 0,
            window_len: packet.window_len(),
            payload:    packet.payload_slice().to_vec(),
        })
    }

    /// Combine the two halves of a message into a segment between two ports.
    pub fn from_message(message: &Message, src_port: u16, dst_port: u16) -> Repr {
        Repr {
            src_port,
            dst_port,
            seq_number: message.sender.seqno,
            ack_number: message.receiver.ackno,
            syn: message.sender.syn,
            fin: message.sender.fin,
            rst: message.sender.rst || message.receiver.rst,
            window_len: message.receiver.window_size,
            payload: message.sender.payload.clone(),
        }
    }

    /// Split the segment into its sender and receiver halves.
    pub fn into_message(self) -> Message {
        Message {
            sender: SenderMessage {
                seqno: self.seq_number,
                syn: self.syn,
                payload: self.payload,
                fin: self.fin,
                rst: self.rst,
            },
            receiver: ReceiverMessage {
                ackno: self.ack_number,
                window_size: self.window_len,
                rst: self.rst,
            },
        }
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        field::URGENT.end
    }

    /// Return the length of a segment that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        self.header_len() + self.payload.len()
    }

    /// Emit the segment with a checksum for the given addresses.
    pub fn emit(&self, packet: &mut tcp, src_addr: Ipv4Address, dst_addr: Ipv4Address) {
        let mut flags = 0;
        if self.syn { flags |= field::FLG_SYN }
        if self.fin { flags |= field::FLG_FIN }
        if self.rst { flags |= field::FLG_RST }
        if self.ack_number.is_some() { flags |= field::FLG_ACK }

        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_seq_number(self.seq_number);
        packet.set_ack_number(self.ack_number.unwrap_or(SeqNumber(0)));
        packet.set_header_len_and_flags(self.header_len() as u8, flags);
        packet.set_window_len(self.window_len);
        packet.set_urgent_at(0);
        packet.payload_mut_slice().copy_from_slice(&self.payload);
        packet.fill_checksum(src_addr, dst_addr);
    }

    /// Emit into a freshly allocated buffer.
    pub fn to_bytes(&self, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> Vec<u8> {
        let mut bytes = vec![0; self.buffer_len()];
        self.emit(tcp::new_unchecked_mut(&mut bytes), src_addr, dst_addr);
        bytes
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP src={} dst={}", self.src_port, self.dst_port)?;
        if self.syn { write!(f, " syn")? }
        if self.fin { write!(f, " fin")? }
        if self.rst { write!(f, " rst")? }
        write!(f, " seq={}", self.seq_number)?;
        if let Some(ack_number) = self.ack_number {
            write!(f, " ack={}", ack_number)?;
        }
        write!(f, " win={} len={}", self.window_len, self.payload.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SRC_ADDR: Ipv4Address = Ipv4Address([192, 168, 1, 1]);
    const DST_ADDR: Ipv4Address = Ipv4Address([192, 168, 1, 2]);

    static PACKET_BYTES: [u8; 28] =
        [0xbf, 0x00, 0x00, 0x50,
         0x01, 0x23, 0x45, 0x67,
         0x89, 0xab, 0xcd, 0xef,
         0x60, 0x35, 0x01, 0x23,
         0x01, 0xb6, 0x02, 0x01,
         0x03, 0x03, 0x0c, 0x01,
         0xaa, 0x00, 0x00, 0xff];

    static PAYLOAD_BYTES: [u8; 4] =
        [0xaa, 0x00, 0x00, 0xff];

    #[test]
    fn test_deconstruct() {
        let packet = tcp::new_checked(&PACKET_BYTES[..]).unwrap();
        assert_eq!(packet.src_port(), 48896);
        assert_eq!(packet.dst_port(), 80);
        assert_eq!(packet.seq_number(), SeqNumber(0x01234567));
        assert_eq!(packet.ack_number(), SeqNumber(0x89abcdef));
        assert_eq!(packet.header_len(), 24);
        assert_eq!(packet.window_len(), 0x0123);
        assert_eq!(packet.checksum(), 0x01b6);
        assert_eq!(packet.payload_slice(), &PAYLOAD_BYTES[..]);
        assert!(packet.verify_checksum(SRC_ADDR, DST_ADDR));
    }

    #[test]
    fn test_parse_skips_options() {
        let repr = Repr::parse(&PACKET_BYTES[..], SRC_ADDR, DST_ADDR).unwrap();
        assert_eq!(repr, Repr {
            src_port: 48896,
            dst_port: 80,
            seq_number: SeqNumber(0x01234567),
            ack_number: Some(SeqNumber(0x89abcdef)),
            syn: false,
            fin: true,
            rst: true,
            window_len: 0x0123,
            payload: PAYLOAD_BYTES.to_vec(),
        });
    }

    #[test]
    fn test_wrong_checksum() {
        let mut bytes = PACKET_BYTES;
        bytes[27] = 0;
        assert_eq!(Repr::parse(&bytes[..], SRC_ADDR, DST_ADDR), Err(Error::WrongChecksum));
        // The pseudo header covers the addresses.
        assert_eq!(Repr::parse(&PACKET_BYTES[..], DST_ADDR, SRC_ADDR), Err(Error::WrongChecksum));
    }

    #[test]
    fn test_truncated() {
        assert_eq!(Repr::parse(&PACKET_BYTES[..19], SRC_ADDR, DST_ADDR), Err(Error::Truncated));
        let mut bytes = PACKET_BYTES;
        bytes[12] = 0x40;
        assert_eq!(tcp::new_checked(&bytes[..]), Err(Error::Malformed));
    }

    #[test]
    fn test_emit() {
        let repr = Repr {
            src_port: 1234,
            dst_port: 80,
            seq_number: SeqNumber(7),
            ack_number: None,
            syn: true,
            fin: false,
            rst: false,
            window_len: 4096,
            payload: b"hi".to_vec(),
        };
        let bytes = repr.to_bytes(SRC_ADDR, DST_ADDR);
        assert_eq!(bytes.len(), 22);
        assert_eq!(&bytes[12..14], &[0x50, 0x02]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
        assert_eq!(&bytes[20..], b"hi");
        assert_eq!(Repr::parse(&bytes, SRC_ADDR, DST_ADDR), Ok(repr));
    }

    #[test]
    fn test_message_split() {
        let repr = Repr::parse(&PACKET_BYTES[..], SRC_ADDR, DST_ADDR).unwrap();
        let message = repr.clone().into_message();
        assert_eq!(message.sender.sequence_length(), 5);
        assert_eq!(message.receiver.ackno, Some(SeqNumber(0x89abcdef)));
        assert!(message.receiver.rst);
        assert_eq!(Repr::from_message(&message, 48896, 80), repr);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(SeqNumber::wrap(3 * (1 << 32), SeqNumber(0)), SeqNumber(0));
        assert_eq!(SeqNumber::wrap(3 * (1 << 32) + 17, SeqNumber(15)), SeqNumber(32));
        assert_eq!(SeqNumber::wrap(7 * (1 << 32) - 2, SeqNumber(15)), SeqNumber(13));
    }

    #[test]
    fn test_unwrap_round_trip() {
        let zero_points = [0u32, 1, 2, 0x7fff_ffff, 0x8000_0000, 0xffff_ffff];
        let absolutes = [0u64, 1, 17, 1 << 31, (1 << 32) - 1, 1 << 32, 5 << 32 | 9, u64::max_value() >> 1];
        for &zp in zero_points.iter() {
            for &absolute in absolutes.iter() {
                let zero_point = SeqNumber(zp);
                let wrapped = SeqNumber::wrap(absolute, zero_point);
                assert_eq!(wrapped.unwrap(zero_point, absolute), absolute);
            }
        }
    }

    #[test]
    fn test_unwrap_closest() {
        // A checkpoint in the second epoch prefers the candidate in that epoch.
        let raw = SeqNumber::wrap(1, SeqNumber(2));
        assert_eq!(raw.unwrap(SeqNumber(2), 1 << 32), (1 << 32) + 1);
        // Slightly below an epoch boundary still rounds up.
        assert_eq!(SeqNumber(5).unwrap(SeqNumber(0), (3 << 32) - 2), (3 << 32) + 5);
        // And slightly above rounds down.
        assert_eq!(SeqNumber(u32::max_value()).unwrap(SeqNumber(0), (3 << 32) + 2), (3 << 32) - 1);
        // Nothing negative is ever produced.
        assert_eq!(SeqNumber(u32::max_value()).unwrap(SeqNumber(0), 0), u64::from(u32::max_value()));
    }

    #[test]
    fn test_unwrap_tie_prefers_larger() {
        assert_eq!(SeqNumber(0).unwrap(SeqNumber(0), 1 << 31), 1 << 32);
        assert_eq!(SeqNumber(10).unwrap(SeqNumber(10), 1 << 31), 1 << 32);
    }
}
