use crate::storage::{ByteStream, Reassembler, Writer};
use crate::wire::{TcpReceiverMessage, TcpSenderMessage, TcpSeqNumber};

/// The receiving half of a TCP connection.
///
/// Translates the sequence numbers of incoming segments into stream indices for the reassembler
/// and produces the acknowledgement and window for the opposite direction. Nothing is accepted
/// before the segment carrying the SYN flag, whose sequence number becomes the zero point of the
/// stream. Only the first SYN is honored.
#[derive(Clone, Copy, Debug, Default)]
pub struct Receiver {
    zero_point: Option<TcpSeqNumber>,
}

impl Receiver {
    /// A receiver that has not seen a SYN yet.
    pub fn new() -> Self {
        Receiver::default()
    }

    /// The initial sequence number of the peer, once known.
    pub fn zero_point(&self) -> Option<TcpSeqNumber> {
        self.zero_point
    }

    /// Process the sender half of an incoming segment.
    pub fn receive(
        &mut self,
        message: &TcpSenderMessage,
        reassembler: &mut Reassembler,
        inbound: &mut Writer,
    ) {
        if message.rst {
            net_debug!("inbound stream reset");
            inbound.set_error();
            return;
        }

        let zero_point = match self.zero_point {
            Some(zero_point) => {
                if message.syn && message.seqno != zero_point {
                    net_trace!("ignoring SYN at {}, stream started at {}", message.seqno, zero_point);
                }
                zero_point
            },
            None if message.syn => {
                self.zero_point = Some(message.seqno);
                message.seqno
            },
            None => {
                net_trace!("dropping segment before SYN: {}", message);
                return;
            },
        };

        // The SYN occupies absolute sequence number zero, the stream starts right after it.
        let absolute = message.seqno.unwrap(zero_point, inbound.bytes_pushed());
        let stream_index = match (absolute + u64::from(message.syn)).checked_sub(1) {
            Some(index) => index,
            None => {
                net_trace!("dropping segment without SYN at the SYN position");
                return;
            },
        };

        reassembler.insert(stream_index, &message.payload, message.fin, inbound);
    }

    /// The feedback for the opposite direction.
    ///
    /// The window is the free capacity of the inbound stream, clamped to what the wire can carry.
    pub fn send(&self, inbound: &ByteStream) -> TcpReceiverMessage {
        let window_size = inbound.available_capacity().min(usize::from(u16::MAX)) as u16;
        let ackno = self.zero_point.map(|zero_point| {
            // One for the SYN, one more for the FIN once the stream is complete.
            let absolute = inbound.bytes_pushed() + 1 + u64::from(inbound.is_closed());
            TcpSeqNumber::wrap(absolute, zero_point)
        });

        TcpReceiverMessage {
            ackno,
            window_size,
            rst: inbound.has_error(),
        }
    }
}
