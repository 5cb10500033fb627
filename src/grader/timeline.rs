//! Watch timeline bookkeeping: bucket sizing, observed buckets, sample throttling

use std::time::{Duration, Instant};

/// Tuning for how finely a stream is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    /// Shortest interval between two accepted progress samples.
    pub min_interval: Duration,

    /// Bucket count for streams long enough to fill it.
    pub resolution: u32,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(200),
            resolution: 100,
        }
    }
}

/// Bucket layout computed once, when playback starts.
///
/// A short stream delivers fewer samples than `resolution` at the minimum
/// interval, so the bucket count shrinks to the expected sample count and
/// every bucket weighs `100 / bucket_count` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPlan {
    duration_secs: f64,
    bucket_count: u32,
    sample_interval: Duration,
}

impl BucketPlan {
    /// Lay out buckets for a stream, or `None` when the duration is not a
    /// positive finite number of seconds.
    #[must_use]
    pub fn for_duration(duration_secs: f64, policy: &SamplingPolicy) -> Option<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return None;
        }

        let resolution = policy.resolution.max(1);
        let duration_ms = duration_secs * 1000.0;
        let min_interval_ms = policy.min_interval.as_secs_f64() * 1000.0;
        let interval_ms = (duration_ms / f64::from(resolution)).max(min_interval_ms);

        // Sample count is bounded above by `resolution` since interval >= duration / resolution
        let expected_samples = duration_ms / interval_ms;
        let bucket_count = if expected_samples < f64::from(resolution) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = expected_samples.floor() as u32;
            count.max(1)
        } else {
            resolution
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let interval_nanos = (interval_ms * 1_000_000.0).round() as u64;

        Some(Self {
            duration_secs,
            bucket_count,
            sample_interval: Duration::from_nanos(interval_nanos),
        })
    }

    /// Number of buckets in the timeline
    #[must_use]
    pub const fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Minimum spacing between accepted samples
    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Map a playback position to its bucket, clamping out-of-range positions.
    ///
    /// Returns `None` only for NaN.
    #[must_use]
    pub fn bucket_for(&self, position_secs: f64) -> Option<usize> {
        if position_secs.is_nan() {
            return None;
        }

        let count = f64::from(self.bucket_count);
        let raw = (count * position_secs / self.duration_secs).floor();
        let last = self.bucket_count as usize - 1;

        if raw <= 0.0 {
            Some(0)
        } else if raw >= count {
            Some(last)
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(raw as usize)
        }
    }
}

/// Set of observed buckets.
#[derive(Debug, Clone)]
pub struct Timeline {
    buckets: Vec<bool>,
    observed: u32,
}

impl Timeline {
    /// Create an empty timeline with a fixed bucket count
    #[must_use]
    pub fn new(bucket_count: u32) -> Self {
        Self {
            buckets: vec![false; bucket_count as usize],
            observed: 0,
        }
    }

    /// Mark a bucket observed. Returns `true` the first time a bucket is seen.
    pub fn mark(&mut self, bucket: usize) -> bool {
        match self.buckets.get_mut(bucket) {
            Some(seen) if !*seen => {
                *seen = true;
                self.observed += 1;
                true
            }
            _ => false,
        }
    }

    /// Number of observed buckets
    #[must_use]
    pub const fn observed(&self) -> u32 {
        self.observed
    }

    /// Number of buckets
    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.buckets.len()).unwrap_or(u32::MAX)
    }

    /// Whether the timeline has no buckets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Observed share of the stream on the 0-100 scale
    #[must_use]
    pub fn watched_percent(&self) -> f64 {
        if self.buckets.is_empty() {
            return 0.0;
        }
        f64::from(self.observed) * 100.0 / f64::from(self.len())
    }

    /// Whether the observed share has reached `threshold` percent.
    ///
    /// Compares `observed * 100 >= threshold * len` so no rounding is involved.
    #[must_use]
    pub fn reaches(&self, threshold: u8) -> bool {
        u64::from(self.observed) * 100 >= u64::from(threshold) * u64::from(self.len())
    }

    /// Observed flags in bucket order
    #[must_use]
    pub fn buckets(&self) -> &[bool] {
        &self.buckets
    }
}

/// Rate limiter for progress samples, firing on both edges of the interval.
///
/// The first sample of an interval passes straight through. Later samples
/// in the same interval replace one another as the pending sample, which
/// is released once the interval has elapsed, at the moment it would have
/// fired on a timer. Time only advances through `offer`, so the release
/// happens on the next offer at or after that moment.
#[derive(Debug, Clone)]
pub struct SampleThrottle<T> {
    interval: Duration,
    last: Option<Instant>,
    pending: Option<T>,
}

impl<T: Copy> SampleThrottle<T> {
    /// Create a throttle releasing at most one sample per `interval`
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            pending: None,
        }
    }

    /// Offer a sample arriving at `at`.
    ///
    /// Returns the samples released by this call, oldest first: a pending
    /// sample whose interval has run out, then `sample` itself if it opens
    /// a new interval.
    pub fn offer(&mut self, at: Instant, sample: T) -> [Option<T>; 2] {
        let mut released = [None, None];

        if let Some(last) = self.last {
            let due = last + self.interval;
            if at >= due {
                if let Some(pending) = self.pending.take() {
                    released[0] = Some(pending);
                    self.last = Some(due);
                }
            }
        }

        match self.last {
            Some(last) if at.saturating_duration_since(last) < self.interval => {
                self.pending = Some(sample);
            }
            _ => {
                self.last = Some(at);
                released[1] = Some(sample);
            }
        }

        released
    }

    /// Sample waiting for the current interval to end
    #[must_use]
    pub const fn pending(&self) -> Option<T> {
        self.pending
    }
}
