/*! Logical time.

There is no wall clock anywhere in this crate. Every component that needs to measure time keeps
its own [Instant], starting at zero, and advances it only when its driver calls `tick` with the
number of milliseconds that passed since the previous call.

 - [Instant] is used to represent absolute logical time.
 - [Duration] is used to represet relative time.
 - [Expiration] is a deadline that may also be absent.

[Instant]: struct.Instant.html
[Duration]: struct.Duration.html
[Expiration]: enum.Expiration.html
*/
use core::{cmp, fmt, ops};
pub use core::time::Duration;

/// A representation of an absolute logical time value.
///
/// The `Instant` type is a wrapper around a `u64` value that represents a number of
/// milliseconds, monotonically increasing since the component that owns it was created.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    millis: u64,
}

/// An expiration time, inversion of `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expiration {
    /// Expires at the instant.
    When(Instant),
    /// Never expires.
    Never,
}

use Expiration::{When, Never};

impl Instant {
    /// The start of logical time.
    pub const ZERO: Instant = Instant { millis: 0 };

    /// Create a new `Instant` from a number of milliseconds.
    pub fn from_millis<T: Into<u64>>(millis: T) -> Instant {
        Instant { millis: millis.into() }
    }

    /// Create a new `Instant` from a number of seconds.
    pub fn from_secs<T: Into<u64>>(secs: T) -> Instant {
        Instant { millis: secs.into() * 1000 }
    }

    /// The fractional number of milliseconds that have passed
    /// since the beginning of time.
    pub fn millis(&self) -> u64 {
        self.millis % 1000
    }

    /// The number of whole seconds that have passed since the
    /// beginning of time.
    pub fn secs(&self) -> u64 {
        self.millis / 1000
    }

    /// The total number of milliseconds that have passed since
    /// the biginning of time.
    pub fn total_millis(&self) -> u64 {
        self.millis
    }

    /// The time elapsed since an earlier instant, or zero if `earlier` is in the future.
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_millis(self.millis.saturating_sub(earlier.millis))
    }
}

impl Expiration {
    /// Check if the deadline has been reached at `now`.
    ///
    /// A deadline is reached *at* its instant, not only strictly after it.
    pub fn is_reached(&self, now: Instant) -> bool {
        When(now) >= *self
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.secs(), self.millis())
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant::from_millis(self.millis + rhs.as_millis() as u64)
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        self.millis += rhs.as_millis() as u64;
    }
}

impl ops::Sub<Instant> for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        Duration::from_millis(if self.millis > rhs.millis {
            self.millis - rhs.millis
        } else {
            rhs.millis - self.millis
        })
    }
}

impl Default for Expiration {
    fn default() -> Self {
        Expiration::Never
    }
}

impl From<Option<Instant>> for Expiration {
    fn from(opt: Option<Instant>) -> Self {
        match opt {
            Some(instant) => When(instant),
            None => Never,
        }
    }
}

impl From<Expiration> for Option<Instant> {
    fn from(opt: Expiration) -> Self {
        match opt {
            When(instant) => Some(instant),
            Never => None,
        }
    }
}

impl cmp::PartialOrd<Self> for Expiration {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::Ord for Expiration {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        match (*self, *other) {
            (Never, Never) => cmp::Ordering::Equal,
            (Never, When(_)) => cmp::Ordering::Greater,
            (When(_), Never) => cmp::Ordering::Less,
            (When(ref a), When(ref b)) => a.cmp(b),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_instant_ops() {
        assert_eq!(Instant::from_millis(4u64) + Duration::from_millis(6), Instant::from_millis(10u64));
        assert_eq!(Instant::from_millis(7u64) - Instant::from_millis(5u64), Duration::from_millis(2));
        assert_eq!(Instant::from_millis(5u64) - Instant::from_millis(7u64), Duration::from_millis(2));
    }

    #[test]
    fn test_instant_getters() {
        let instant = Instant::from_millis(5674u64);
        assert_eq!(instant.secs(), 5);
        assert_eq!(instant.millis(), 674);
        assert_eq!(instant.total_millis(), 5674);
    }

    #[test]
    fn test_instant_display() {
        assert_eq!(format!("{}", Instant::from_millis(5674u64)), "5.674s");
        assert_eq!(format!("{}", Instant::from_millis(5000u64)), "5.000s");
    }

    #[test]
    fn test_expiration() {
        let deadline = Expiration::When(Instant::from_millis(100u64));
        assert!(!deadline.is_reached(Instant::from_millis(99u64)));
        assert!(deadline.is_reached(Instant::from_millis(100u64)));
        assert!(!Expiration::Never.is_reached(Instant::from_millis(u64::max_value())));
        assert!(Expiration::Never > deadline);
    }

    #[test]
    fn test_saturating_duration() {
        let early = Instant::from_millis(10u64);
        let late = Instant::from_millis(25u64);
        assert_eq!(late.saturating_duration_since(early), Duration::from_millis(15));
        assert_eq!(early.saturating_duration_since(late), Duration::from_millis(0));
    }
}
