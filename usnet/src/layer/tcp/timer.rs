use crate::time::{Duration, Expiration, Instant};

/// A retransmission timer on its own logical clock.
///
/// The clock only moves with `tick`. A started timer expires once its full timeout has elapsed
/// and stays expired until it is started again or stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    now: Instant,
    expires_at: Expiration,
}

impl Timer {
    /// A stopped timer.
    pub fn new() -> Self {
        Timer::default()
    }

    /// (Re)start the timer to expire `timeout_ms` from now.
    pub fn start(&mut self, timeout_ms: u64) {
        self.expires_at = Expiration::When(self.now + Duration::from_millis(timeout_ms));
    }

    /// Stop the timer. It does not expire until started again.
    pub fn stop(&mut self) {
        self.expires_at = Expiration::Never;
    }

    /// Whether the timer was started and not stopped since.
    pub fn is_running(&self) -> bool {
        self.expires_at != Expiration::Never
    }

    /// Advance the clock, returning whether the timer is expired afterwards.
    pub fn tick(&mut self, ms_since_last_tick: u64) -> bool {
        self.now += Duration::from_millis(ms_since_last_tick);
        self.is_expired()
    }

    /// Whether the timer is running and its timeout has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_reached(self.now)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expires_after_timeout() {
        let mut timer = Timer::new();
        assert!(!timer.is_running());
        assert!(!timer.tick(10_000));

        timer.start(1000);
        assert!(timer.is_running());
        assert!(!timer.tick(999));
        assert!(timer.tick(1));
        // Stays expired.
        assert!(timer.tick(0));

        timer.start(500);
        assert!(!timer.is_expired());
        assert!(timer.tick(600));

        timer.stop();
        assert!(!timer.is_expired());
        assert!(!timer.tick(10_000));
    }
}
