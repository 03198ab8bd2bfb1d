use std::collections::VecDeque;
use core::ops;

/// A flow-controlled in-memory byte stream.
///
/// At most `capacity` bytes are buffered at any time. Bytes leave the buffer in the order they
/// were written. Closing the stream is a one-way signal from the writer; an error is a sticky
/// signal that either side may raise and that is distinct from a normal close.
#[derive(Clone, Debug)]
pub struct ByteStream {
    capacity: usize,
    buffer: VecDeque<u8>,
    pushed: u64,
    popped: u64,
    closed: bool,
    error: bool,
}

/// The writing end of a byte stream.
#[derive(Debug)]
#[repr(transparent)]
pub struct Writer(ByteStream);

/// The reading end of a byte stream.
#[derive(Debug)]
#[repr(transparent)]
pub struct Reader(ByteStream);

impl ByteStream {
    /// Create an empty, open stream that buffers at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        ByteStream {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
            pushed: 0,
            popped: 0,
            closed: false,
            error: false,
        }
    }

    /// Borrow the writing end.
    pub fn writer(&mut self) -> &mut Writer {
        // SAFETY: this is safe due to repr(transparent)
        unsafe { &mut *(self as *mut ByteStream as *mut Writer) }
    }

    /// Borrow the reading end.
    pub fn reader(&mut self) -> &mut Reader {
        // SAFETY: this is safe due to repr(transparent)
        unsafe { &mut *(self as *mut ByteStream as *mut Reader) }
    }

    /// The maximum number of buffered bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many more bytes a push would currently accept.
    pub fn available_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Total number of bytes accepted from the writer.
    pub fn bytes_pushed(&self) -> u64 {
        self.pushed
    }

    /// Total number of bytes handed to the reader.
    pub fn bytes_popped(&self) -> u64 {
        self.popped
    }

    /// Number of bytes written but not yet read.
    pub fn bytes_buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the writer has closed the stream.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the stream is closed and everything has been read.
    pub fn is_finished(&self) -> bool {
        self.closed && self.buffer.is_empty()
    }

    /// Whether either side signalled an error.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Signal an error. It is never cleared.
    pub fn set_error(&mut self) {
        self.error = true;
    }
}

impl Writer {
    /// Append as much of `data` as fits, returning the number of accepted bytes.
    ///
    /// Pushing to a closed stream accepts nothing and marks the stream erroneous.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let stream = &mut self.0;
        if stream.closed {
            net_debug!("push of {} bytes to closed stream", data.len());
            stream.error = true;
            return 0;
        }

        let len = data.len().min(stream.available_capacity());
        stream.buffer.extend(&data[..len]);
        stream.pushed += len as u64;
        len
    }

    /// Signal that no more bytes will be written.
    pub fn close(&mut self) {
        self.0.closed = true;
    }

    /// Signal an error. It is never cleared.
    pub fn set_error(&mut self) {
        self.0.set_error()
    }
}

impl Reader {
    /// Look at the next buffered bytes without consuming them.
    ///
    /// The returned slice is empty only if nothing is buffered. It need not contain all buffered
    /// bytes.
    pub fn peek(&self) -> &[u8] {
        let (front, back) = self.0.buffer.as_slices();
        if front.is_empty() { back } else { front }
    }

    /// Remove up to `len` bytes from the front of the stream.
    pub fn pop(&mut self, len: usize) {
        let stream = &mut self.0;
        let len = len.min(stream.buffer.len());
        stream.buffer.drain(..len);
        stream.popped += len as u64;
    }

    /// Remove and return up to `max` bytes from the front of the stream.
    pub fn read(&mut self, max: usize) -> Vec<u8> {
        let len = max.min(self.0.buffer.len());
        let data: Vec<u8> = self.0.buffer.iter().take(len).copied().collect();
        self.pop(len);
        data
    }

    /// Signal an error. It is never cleared.
    pub fn set_error(&mut self) {
        self.0.set_error()
    }
}

impl ops::Deref for Writer {
    type Target = ByteStream;

    fn deref(&self) -> &ByteStream {
        &self.0
    }
}

impl ops::Deref for Reader {
    type Target = ByteStream;

    fn deref(&self) -> &ByteStream {
        &self.0
    }
}
