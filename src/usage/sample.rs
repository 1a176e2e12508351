/// Usage sample recorded once per limiter run.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of the client's cumulative transfer counter.
///
/// `delta_bytes` is derived by the accountant and is the only value the
/// window totals sum over. Samples are never mutated once stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSample {
    pub observed_at: DateTime<Utc>,
    pub cumulative_bytes: u64,
    pub delta_bytes: u64,
}

impl UsageSample {
    pub fn new(observed_at: DateTime<Utc>, cumulative_bytes: u64, delta_bytes: u64) -> Self {
        Self {
            observed_at,
            cumulative_bytes,
            delta_bytes,
        }
    }
}
