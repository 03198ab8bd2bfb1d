//! Simulates packet loss.
//!
//! A [`Link`] is one direction of a simulated wire between two network interfaces. Frames handed
//! to it come out in order on the other end, unless the [`PrngLoss`] of the link decides to drop
//! them. The decision is fully determined by the seed so that a lossy run can be replayed.
//!
//! [`Link`]: struct.Link.html
//! [`PrngLoss`]: struct.PrngLoss.html
use std::collections::VecDeque;

use crate::wire::EthernetFrame;

/// Simple pseudo-random loss.
///
/// Can simulate burst-losses and uniform losses by dropping packets based on a pulse design.
#[derive(Copy, Clone, Debug, Hash)]
pub struct PrngLoss {
    /// Threshold for dropping the packet.
    pub threshold: u32,
    /// The packet is never dropped while `count` at least as large as `threshold`.
    pub count: u32,
    /// Reset value for `count` when it reaches `0`.
    pub reset: u32,
    /// Loss rate as a (0, 32)-bit fixed point number.
    ///
    /// Or `None` for no loss at all, which can be used to temporarily turn loss off.
    pub lossrate: Option<u32>,
    /// The current prng state.
    pub prng: Xoroshiro256,
}

/// The Xoroshiro256** generator.
#[derive(Copy, Clone, Debug, Hash)]
pub struct Xoroshiro256 {
    state: [u64; 4],
}

/// One direction of a simulated wire.
#[derive(Clone, Debug)]
pub struct Link {
    loss: PrngLoss,
    in_flight: VecDeque<EthernetFrame>,
    sent: u64,
    dropped: u64,
}

impl PrngLoss {
    /// A link that never loses anything.
    pub fn lossless() -> Self {
        PrngLoss::uniform(None, 0)
    }

    /// A uniform loss simulator.
    pub fn uniform(rate: Option<u32>, seed: u64) -> Self {
        PrngLoss {
            // Threshold always greater than count
            threshold: 1,
            count: 0,
            reset: 0,
            lossrate: rate,
            prng: Xoroshiro256::new(seed),
        }
    }

    /// Convert a probability into a loss rate.
    ///
    /// Probabilities of zero and below turn loss off, those of one and above drop everything.
    pub fn rate_from_probability(probability: f64) -> Option<u32> {
        if !(probability > 0.0) {
            return None;
        }

        let scaled = probability.min(1.0) * f64::from(u32::max_value());
        Some(scaled as u32)
    }

    /// Simulate burst losses as pulses.
    ///
    /// Drops all packets while in a high state, lets packets pass while in low state. Returns
    /// `None` for an empty pulse or one whose high state is longer than the pulse itself.
    pub fn pulsed(high: u32, length: u32) -> Option<Self> {
        if length == 0 || high > length {
            return None;
        }

        Some(PrngLoss {
            threshold: high,
            count: length - 1,
            reset: length - 1,
            // Packet always lost when pulse condition is true.
            lossrate: Some(u32::max_value()),
            prng: Xoroshiro256::new(0),
        })
    }

    /// Determine the fate for the next packet, `true` if it is lost.
    pub fn next(&mut self) -> bool {
        let in_window = self.count < self.threshold;
        let fate = Some(self.roll()) <= self.lossrate;

        let ncount = self.count.checked_sub(1)
            .unwrap_or(self.reset);
        self.count = ncount;

        fate & in_window
    }

    /// Generate the next value of the prng.
    fn roll(&mut self) -> u32 {
        (self.prng.next() >> 32) as u32
    }
}

impl Default for PrngLoss {
    fn default() -> Self {
        PrngLoss::lossless()
    }
}

impl Xoroshiro256 {
    /// Seed the generator.
    ///
    /// The state is expanded from the seed with SplitMix64, so that no seed (not even zero)
    /// leaves the generator stuck in the all-zero state.
    pub fn new(seed: u64) -> Self {
        let mut split = seed;
        let mut state = [0; 4];
        state.iter_mut().for_each(|word| *word = splitmix64(&mut split));
        Xoroshiro256 { state }
    }

    /// Advance the generator.
    pub fn next(&mut self) -> u64 {
        let s = &mut self.state;
        let result_starstar = s[1]
            .wrapping_mul(5)
            .rotate_left(7)
            .wrapping_mul(9);

        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];

        s[2] ^= t;

        s[3] = s[3].rotate_left(45);

        result_starstar
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl Link {
    /// An empty link dropping frames as decided by `loss`.
    pub fn new(loss: PrngLoss) -> Self {
        Link {
            loss,
            in_flight: VecDeque::new(),
            sent: 0,
            dropped: 0,
        }
    }

    /// Put a frame onto the wire.
    pub fn send(&mut self, frame: EthernetFrame) {
        self.sent += 1;
        if self.loss.next() {
            net_trace!("link lost {}", frame);
            self.dropped += 1;
            return;
        }

        self.in_flight.push_back(frame);
    }

    /// Take the oldest frame off the wire.
    pub fn recv(&mut self) -> Option<EthernetFrame> {
        self.in_flight.pop_front()
    }

    /// The number of frames still on the wire.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// The number of frames ever put onto the wire.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// The number of those frames that were lost.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Turn the loss of the link on or off.
    pub fn set_lossrate(&mut self, rate: Option<u32>) {
        self.loss.lossrate = rate;
    }
}
