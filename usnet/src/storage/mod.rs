//! Byte buffers with stream semantics.
//!
//! A [`ByteStream`] is a bounded queue of bytes with a writing end and a reading end. The two ends
//! are exposed as the [`Writer`] and [`Reader`] views of the same stream so that an owner can hand
//! out exactly one of the two roles to a component. The [`Reassembler`] fills the writing end of a
//! stream from out-of-order, possibly overlapping fragments.
//!
//! [`ByteStream`]: struct.ByteStream.html
//! [`Writer`]: struct.Writer.html
//! [`Reader`]: struct.Reader.html
//! [`Reassembler`]: struct.Reassembler.html
mod assembler;
mod stream;

pub use self::assembler::Reassembler;
pub use self::stream::{ByteStream, Reader, Writer};
