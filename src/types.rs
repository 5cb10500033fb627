//! Domain-specific newtypes for type safety.
//!
//! Strongly-typed wrappers for the values that flow between the playback
//! source, the graders and the reporter, so a media position in seconds is
//! never mixed up with a wall-clock offset in milliseconds or a threshold.

use std::fmt;
use std::ops::{Sub, SubAssign};
use std::time::Duration;

use derive_more::{Add as DeriveAdd, From, Into};
use serde::{Deserialize, Serialize};

// ============================================================================
// Milliseconds
// ============================================================================

/// A wall-clock span in milliseconds.
///
/// Used for sample arrival offsets in event logs and for sampling intervals.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    DeriveAdd,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Milliseconds(pub u64);

impl Milliseconds {
    /// Create a new instance.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Create from seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    /// Convert to a standard duration.
    #[must_use]
    pub const fn to_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Sub for Milliseconds {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Milliseconds {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl From<Duration> for Milliseconds {
    fn from(value: Duration) -> Self {
        Self(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Milliseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.to_duration()))
    }
}

// ============================================================================
// Percent
// ============================================================================

/// A whole percentage in `0..=100`.
///
/// Grading thresholds are expressed in this unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    /// Nothing needs to be watched.
    pub const ZERO: Self = Self(0);

    /// The whole stream needs to be watched.
    pub const FULL: Self = Self(100);

    /// Create a percentage, returning `None` above 100.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 100 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Get the inner value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Check if the value is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u64> for Percent {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("percentage must be between 0 and 100, got {value}"))
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
