/// Turns raw cumulative counter readings into incremental usage samples.
use super::sample::UsageSample;
use chrono::{DateTime, Utc};

/// How a sample's delta was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    /// No previous sample; the reading only establishes a baseline
    Baseline,
    /// Counter advanced (or stood still) since the previous sample
    Increment,
    /// Counter went backwards, the client restarted or reset its stats
    Reset,
}

impl std::fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeltaKind::Baseline => write!(f, "baseline"),
            DeltaKind::Increment => write!(f, "increment"),
            DeltaKind::Reset => write!(f, "reset"),
        }
    }
}

/// Result of accounting one counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accounting {
    pub sample: UsageSample,
    pub kind: DeltaKind,
    /// `now` did not advance past the previous observation
    pub clock_skew: bool,
}

/// Compute the sample for a fresh reading of `current` bytes taken at `now`.
///
/// * first run: delta is 0, the sample only serves as a baseline
/// * `current >= previous`: delta is the difference
/// * `current < previous`: the counter was reset and delta is `current`
///
/// The reset rule is an approximation. Bytes moved between the previous
/// observation and the reset are lost, and several resets within one
/// interval collapse into the last one, so usage can be under-counted.
/// It never produces a negative value and never drops the interval.
///
/// If `now` is not after the previous observation the sample is pinned to
/// the previous timestamp, recording a zero-duration interval that still
/// carries the computed delta.
pub fn compute_delta(previous: Option<&UsageSample>, now: DateTime<Utc>, current: u64) -> Accounting {
    let Some(previous) = previous else {
        return Accounting {
            sample: UsageSample::new(now, current, 0),
            kind: DeltaKind::Baseline,
            clock_skew: false,
        };
    };

    let (delta_bytes, kind) = if current >= previous.cumulative_bytes {
        (current - previous.cumulative_bytes, DeltaKind::Increment)
    } else {
        tracing::warn!(
            "Cumulative counter went backwards ({} -> {}); assuming a client restart",
            previous.cumulative_bytes,
            current
        );
        (current, DeltaKind::Reset)
    };

    let clock_skew = now <= previous.observed_at;
    let observed_at = if clock_skew {
        tracing::warn!(
            "Clock did not advance past the last sample ({} <= {}); recording a zero-duration interval",
            now,
            previous.observed_at
        );
        previous.observed_at
    } else {
        now
    };

    Accounting {
        sample: UsageSample::new(observed_at, current, delta_bytes),
        kind,
        clock_skew,
    }
}
