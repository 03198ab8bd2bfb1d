//! A user-space core of a TCP/IP stack.
//!
//! ## Table of contents
//!
//! This is also a recommended reading order but feel free to skip ahead, each chapter tries to be
//! somewhat self-contained.
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [The wire module](wire/index.html)
//! 3. [Storage: streams and reassembly](storage/index.html)
//! 4. [The layers](layer/index.html)
//!    1. [Tcp](layer/tcp/index.html)
//!    1. [Arp](layer/arp/index.html)
//!    1. [The network interface](layer/eth/index.html)
//!    1. [Ip routing](layer/ip/index.html)
//!    1. [Simulated loss](layer/loss/index.html)
//!
//! ## Design and relevant core concepts
//!
//! The library owns none of the physical I/O. A driver hands in raw frames, datagrams or segments
//! and polls for the ones that should leave. Every operation runs synchronously to completion and
//! nothing happens in the background: the `maybe_send`, `maybe_receive` and `route` functions are
//! non-blocking polls that do at most one unit of work per call, so the driver has to call them
//! repeatedly until they come up empty.
//!
//! There is no wall clock either. All timers count logical milliseconds which only advance when
//! the driver calls `tick`. This makes every component deterministic and trivially testable, at
//! the cost of leaving pacing entirely to the caller.
//!
//! Malformed input is never an error surfaced to the caller. A frame that does not parse is
//! dropped, a segment for an unknown connection state is ignored and a push beyond capacity is
//! truncated. Only configuration (adding routes, for example) reports errors.
#![warn(missing_docs)]
#![warn(unreachable_pub)]

#[macro_use] mod macros;
pub mod layer;
pub mod storage;
pub mod time;
pub mod wire;
