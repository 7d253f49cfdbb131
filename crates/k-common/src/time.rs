// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Tick based time keeping
//!
//! The boot path has no wall clock. Every bounded wait is expressed as a
//! number of ticks of the platform timer and checked against a [`Deadline`].

use core::ops::{Add, Sub};

/// System tick counter (platform-specific resolution)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(u64);

impl Ticks {
    /// Create from raw tick count
    #[must_use]
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Calculate elapsed ticks since this timestamp
    #[must_use]
    pub const fn elapsed(&self, now: Self) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Check if duration has elapsed since this timestamp
    #[must_use]
    pub const fn has_elapsed(&self, now: Self, duration: u64) -> bool {
        self.elapsed(now) >= duration
    }
}

impl From<u64> for Ticks {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Ticks> for u64 {
    fn from(value: Ticks) -> Self {
        value.0
    }
}

impl Add<u64> for Ticks {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<Ticks> for Ticks {
    type Output = u64;

    fn sub(self, rhs: Ticks) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

/// Point in tick time after which a wait is abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    end: Ticks,
}

impl Deadline {
    /// Deadline `timeout` ticks after `start`
    #[must_use]
    pub fn after(start: Ticks, timeout: u64) -> Self {
        Self { end: start + timeout }
    }

    /// Tick value at which the deadline lies
    #[must_use]
    pub const fn end(&self) -> Ticks {
        self.end
    }

    /// The deadline has passed once `now` is strictly beyond it
    #[must_use]
    pub fn expired(&self, now: Ticks) -> bool {
        self.end < now
    }
}

/// Duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(u32);

impl Millis {
    /// Create from milliseconds
    #[must_use]
    pub const fn new(ms: u32) -> Self {
        Self(ms)
    }

    /// Get as milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u32 {
        self.0
    }

    /// Convert to ticks of a timer running at `frequency_hz`
    #[must_use]
    pub const fn to_ticks(&self, frequency_hz: u32) -> u64 {
        (self.0 as u64) * (frequency_hz as u64) / 1000
    }
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_is_exclusive() {
        let deadline = Deadline::after(Ticks::new(100), 50);
        assert!(!deadline.expired(Ticks::new(150)));
        assert!(deadline.expired(Ticks::new(151)));
    }

    #[test]
    fn test_deadline_saturates() {
        let deadline = Deadline::after(Ticks::new(u64::MAX - 1), 10);
        assert_eq!(deadline.end(), Ticks::new(u64::MAX));
        assert!(!deadline.expired(Ticks::new(u64::MAX)));
    }

    #[test]
    fn test_millis_to_ticks() {
        assert_eq!(Millis::new(5000).to_ticks(27_000_000), 135_000_000);
    }
}
