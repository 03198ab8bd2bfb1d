use crate::storage::{ByteStream, Reader, Reassembler, Writer};
use crate::wire::{TcpMessage, TcpSeqNumber};

use super::{Config, Receiver, Sender};

/// One end of a TCP connection.
///
/// The application writes into the outbound stream and reads from the inbound stream. Every
/// segment the peer emits carries data (or at least the sequence number) of the outbound
/// direction together with the acknowledgement and window of the inbound direction.
///
/// A peer that closed its outbound stream before the remote closed its own lingers for ten
/// retransmission timeouts after the last segment it received, so that it can still acknowledge
/// a retransmitted FIN.
#[derive(Debug)]
pub struct Peer {
    config: Config,
    outbound: ByteStream,
    sender: Sender,
    inbound: ByteStream,
    reassembler: Reassembler,
    receiver: Receiver,
    need_send: bool,
    linger_after_close: bool,
    reset: bool,
    time_since_last_segment: u64,
}

impl Peer {
    /// A peer whose outbound direction starts at `isn`.
    pub fn new(config: Config, isn: TcpSeqNumber) -> Self {
        Peer {
            config,
            outbound: ByteStream::new(config.capacity),
            sender: Sender::new(isn, &config),
            inbound: ByteStream::new(config.capacity),
            reassembler: Reassembler::new(),
            receiver: Receiver::new(),
            need_send: false,
            linger_after_close: true,
            reset: false,
            time_since_last_segment: 0,
        }
    }

    /// The configuration of the connection.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The writing end of the outbound stream.
    pub fn outbound_writer(&mut self) -> &mut Writer {
        self.outbound.writer()
    }

    /// The reading end of the inbound stream.
    pub fn inbound_reader(&mut self) -> &mut Reader {
        self.inbound.reader()
    }

    /// The sending half.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// The receiving half.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Move the bytes written by the application into the sender.
    pub fn push(&mut self) {
        self.sender.push(self.outbound.reader());
    }

    /// Process a segment from the remote peer.
    pub fn receive(&mut self, message: &TcpMessage) {
        if !self.active() {
            return;
        }

        self.time_since_last_segment = 0;

        // Anything occupying sequence space must be acknowledged.
        if message.sender.sequence_length() > 0 {
            self.need_send = true;
        }

        if message.sender.rst || message.receiver.rst {
            net_debug!("connection reset by the remote");
            self.outbound.set_error();
            self.reset = true;
        }

        self.receiver.receive(&message.sender, &mut self.reassembler, self.inbound.writer());
        self.sender.receive(&message.receiver);

        // The remote closed first, there is nobody to linger for.
        if self.inbound.is_closed() && !self.sender.fin_sent() {
            self.linger_after_close = false;
        }
    }

    /// Produce the next segment, if there is anything to send or acknowledge.
    pub fn maybe_send(&mut self) -> Option<TcpMessage> {
        if !self.active() {
            return None;
        }

        self.push();

        // A local failure is reported to the remote exactly once.
        let failed = self.outbound.has_error() || self.inbound.has_error();
        if failed {
            self.need_send = true;
        }

        let sender = match self.sender.maybe_send() {
            Some(segment) => segment,
            None if self.need_send => self.sender.send_empty_message(),
            None => return None,
        };

        self.need_send = false;
        let mut message = TcpMessage {
            sender,
            receiver: self.receiver.send(&self.inbound),
        };

        if failed {
            message.sender.rst = true;
            message.receiver.rst = true;
            self.reset = true;
        }

        Some(message)
    }

    /// Advance the clock of the connection.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.sender.tick(ms_since_last_tick);
        self.time_since_last_segment = self.time_since_last_segment.saturating_add(ms_since_last_tick);
    }

    /// Whether the connection is still alive.
    ///
    /// A connection ends when it was reset, when the sender gave up retransmitting, or when both
    /// streams are complete and acknowledged and any lingering time has passed.
    pub fn active(&self) -> bool {
        if self.reset || self.sender.budget_exceeded() {
            return false;
        }

        let done = self.inbound.is_closed() && self.sender.is_finished();
        if !done {
            return true;
        }

        self.linger_after_close
            && self.time_since_last_segment < self.config.rt_timeout.saturating_mul(10)
    }
}
