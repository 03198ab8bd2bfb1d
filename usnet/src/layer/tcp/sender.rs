use std::collections::VecDeque;

use crate::storage::Reader;
use crate::wire::{TcpReceiverMessage, TcpSenderMessage, TcpSeqNumber};

use super::Config;
use super::timer::Timer;

/// The sending half of a TCP connection.
///
/// Cuts the outbound stream into segments that fit the window of the peer, keeps every segment
/// until it is acknowledged cumulatively and retransmits the oldest one when the retransmission
/// timer expires. Sequence numbers are tracked as absolute stream positions where the SYN is
/// position zero and wrapped only at the boundary.
#[derive(Clone, Debug)]
pub struct Sender {
    isn: TcpSeqNumber,
    initial_rto: u64,
    rto: u64,
    max_retx_attempts: u32,
    max_payload_size: usize,
    timer: Timer,
    /// Segments sent but not fully acknowledged, with their absolute sequence number.
    outstanding: VecDeque<(u64, TcpSenderMessage)>,
    /// The absolute sequence number of the next new segment.
    next_seqno: u64,
    /// The absolute sequence number acknowledged last.
    acked: u64,
    window: u16,
    /// Bytes taken from the outbound stream but not yet put into a segment.
    unsent: VecDeque<u8>,
    stream_finished: bool,
    fin_sent: bool,
    error: bool,
    retransmit_pending: bool,
    consecutive_retransmissions: u32,
}

impl Sender {
    /// A sender starting at `isn`, with timing and segment size from the configuration.
    pub fn new(isn: TcpSeqNumber, config: &Config) -> Self {
        Sender {
            isn,
            initial_rto: config.rt_timeout,
            rto: config.rt_timeout,
            max_retx_attempts: config.max_retx_attempts,
            max_payload_size: config.max_payload_size,
            timer: Timer::new(),
            outstanding: VecDeque::new(),
            next_seqno: 0,
            acked: 0,
            // Enough for the SYN before the peer told us anything.
            window: 1,
            unsent: VecDeque::new(),
            stream_finished: false,
            fin_sent: false,
            error: false,
            retransmit_pending: false,
            consecutive_retransmissions: 0,
        }
    }

    /// Take every buffered byte of the outbound stream.
    ///
    /// Also notes whether the stream has ended or failed.
    pub fn push(&mut self, outbound: &mut Reader) {
        let len = outbound.bytes_buffered();
        self.unsent.extend(outbound.read(len));
        if outbound.is_finished() {
            self.stream_finished = true;
        }
        if outbound.has_error() {
            self.error = true;
        }
    }

    /// Produce the next segment, if there is one.
    ///
    /// A retransmission due from an expired timer takes precedence over new data. New segments
    /// are limited by the window of the peer, a zero window being treated as one so that it gets
    /// probed.
    pub fn maybe_send(&mut self) -> Option<TcpSenderMessage> {
        if self.retransmit_pending {
            self.retransmit_pending = false;
            if !self.budget_exceeded() {
                if let Some((_, segment)) = self.outstanding.front() {
                    net_trace!("retransmitting {}", segment);
                    let mut segment = segment.clone();
                    segment.rst = self.error;
                    return Some(segment);
                }
            }
        }

        let window = u64::from(self.window.max(1));
        let mut remaining = window.saturating_sub(self.sequence_numbers_in_flight());
        if remaining == 0 {
            return None;
        }

        let syn = self.next_seqno == 0;
        if syn {
            remaining -= 1;
        }

        let len = self.unsent.len()
            .min(self.max_payload_size)
            .min(remaining as usize);
        let payload: Vec<u8> = self.unsent.drain(..len).collect();
        // The FIN rides along once all of the stream fits.
        let fin = self.stream_finished && !self.fin_sent && self.unsent.is_empty();

        if !syn && !fin && payload.is_empty() {
            return None;
        }

        let segment = TcpSenderMessage {
            seqno: TcpSeqNumber::wrap(self.next_seqno, self.isn),
            syn,
            payload,
            fin,
            rst: self.error,
        };

        self.fin_sent |= fin;
        self.outstanding.push_back((self.next_seqno, segment.clone()));
        self.next_seqno += segment.sequence_length();
        if !self.timer.is_running() {
            self.timer.start(self.rto);
        }

        Some(segment)
    }

    /// A segment without sequence space at the current position.
    ///
    /// Used to carry acknowledgements. It is never retransmitted.
    pub fn send_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: TcpSeqNumber::wrap(self.next_seqno, self.isn),
            rst: self.error,
            ..TcpSenderMessage::default()
        }
    }

    /// Process the feedback of the peer's receiver.
    pub fn receive(&mut self, message: &TcpReceiverMessage) {
        let ackno = match message.ackno {
            Some(ackno) => ackno,
            None => {
                self.window = message.window_size;
                return;
            },
        };

        let ack = ackno.unwrap(self.isn, self.next_seqno);
        if ack > self.next_seqno {
            net_trace!("ignoring ack {} for unsent data", ackno);
            return;
        }

        if ack < self.acked {
            net_trace!("ignoring stale ack {}", ackno);
            return;
        }

        // A repeated ack is the only way a peer that advertised a zero window can reopen it while
        // the probe is unacknowledged, so its window is taken even without progress.
        self.window = message.window_size;
        if ack == self.acked {
            return;
        }

        self.acked = ack;
        while let Some((start, segment)) = self.outstanding.front() {
            if start + segment.sequence_length() > ack {
                break;
            }
            self.outstanding.pop_front();
        }

        self.rto = self.initial_rto;
        self.consecutive_retransmissions = 0;
        self.retransmit_pending = false;
        if self.outstanding.is_empty() {
            self.timer.stop();
        } else {
            self.timer.start(self.rto);
        }
    }

    /// Advance the retransmission timer.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        if !self.timer.tick(ms_since_last_tick) {
            return;
        }

        if self.outstanding.is_empty() {
            self.timer.stop();
            return;
        }

        // Probing a closed window is not a sign of congestion.
        if self.window != 0 {
            self.consecutive_retransmissions += 1;
            self.rto = self.rto.saturating_mul(2);
        }

        if self.budget_exceeded() {
            net_debug!("giving up after {} retransmissions", self.consecutive_retransmissions);
        }

        self.timer.start(self.rto);
        self.retransmit_pending = true;
    }

    /// The number of sequence numbers sent but not yet acknowledged.
    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.next_seqno - self.acked
    }

    /// The number of retransmissions since the last progress.
    pub fn consecutive_retransmissions(&self) -> u32 {
        self.consecutive_retransmissions
    }

    /// Whether retransmissions stopped because there were too many in a row.
    pub fn budget_exceeded(&self) -> bool {
        self.consecutive_retransmissions > self.max_retx_attempts
    }

    /// The current retransmission timeout in milliseconds.
    pub fn rto(&self) -> u64 {
        self.rto
    }

    /// The initial sequence number.
    pub fn isn(&self) -> TcpSeqNumber {
        self.isn
    }

    /// Whether the FIN was sent.
    pub fn fin_sent(&self) -> bool {
        self.fin_sent
    }

    /// Whether the whole stream, FIN included, was acknowledged.
    pub fn is_finished(&self) -> bool {
        self.fin_sent && self.sequence_numbers_in_flight() == 0
    }
}
