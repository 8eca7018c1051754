//! ## smitta-core::time
//! **Simulated time & the shared virtual clock**
//!
//! Simulated time is kept as integer nanoseconds so that ordering and
//! equality of event instants are exact. Seconds only appear at the edges
//! (configuration, input documents, result files).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TimeError;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A point on (or a span of) the simulated timeline, in nanoseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX: SimTime = SimTime(u64::MAX);

    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Converts seconds to simulated time, rounding to the nearest nanosecond.
    ///
    /// A positive duration never collapses to zero: anything below the
    /// clock resolution maps to one nanosecond.
    pub fn from_secs_f64(secs: f64) -> Result<Self, TimeError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(TimeError::Invalid(secs));
        }
        let nanos = (secs * NANOS_PER_SEC).round();
        if nanos >= u64::MAX as f64 {
            return Err(TimeError::Overflow(secs));
        }
        if secs > 0.0 && nanos < 1.0 {
            return Ok(Self(1));
        }
        Ok(Self(nanos as u64))
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn checked_add(self, rhs: SimTime) -> Option<SimTime> {
        self.0.checked_add(rhs.0).map(SimTime)
    }

    #[inline]
    pub fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs_f64())
    }
}

/// Shared simulation clock.
///
/// Only the kernel advances it; clones handed out to observers read the
/// same counter.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>, // Nanoseconds
}

impl VirtualClock {
    pub fn new(start: SimTime) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(start.as_nanos())),
        }
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        SimTime::from_nanos(self.now_ns())
    }

    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    #[inline]
    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::Release);
    }

    /// Moves the clock forward to `t`. The clock never runs backwards.
    #[inline]
    pub fn advance_to(&self, t: SimTime) {
        self.offset.fetch_max(t.as_nanos(), Ordering::AcqRel);
    }
}
