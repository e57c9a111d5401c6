//! Monotonic countdown timers.
//!
//! The engine never sleeps; it bounds every blocking call with a [`Timer`]
//! deadline derived from a platform [`Clock`]. The clock only has to be
//! monotonic and millisecond-granular - a RTOS tick counter or a hardware
//! timer both qualify.

/// A monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds elapsed since some fixed, arbitrary origin.
    ///
    /// Must never go backwards. Wrap-around is not handled; use a 64-bit
    /// counter.
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// A countdown deadline computed from a [`Clock`].
///
/// Queried repeatedly to answer "has this deadline elapsed" and "how many
/// milliseconds remain". A timer started with a zero duration is expired
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timer {
    deadline_ms: u64,
}

impl Timer {
    /// Start a countdown of `duration_ms` from the clock's current time.
    pub fn start(clock: &impl Clock, duration_ms: u32) -> Self {
        Self {
            deadline_ms: clock.now_ms().saturating_add(u64::from(duration_ms)),
        }
    }

    /// Start a countdown measured in whole seconds.
    pub fn start_seconds(clock: &impl Clock, duration_s: u16) -> Self {
        Self::start(clock, u32::from(duration_s).saturating_mul(1000))
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        clock.now_ms() >= self.deadline_ms
    }

    /// Milliseconds left until the deadline, zero once expired.
    pub fn remaining_ms(&self, clock: &impl Clock) -> u32 {
        let remaining = self.deadline_ms.saturating_sub(clock.now_ms());
        u32::try_from(remaining).unwrap_or(u32::MAX)
    }
}
