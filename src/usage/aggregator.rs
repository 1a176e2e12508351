/// Calendar-window aggregation of stored usage deltas.
use super::sample::UsageSample;
use crate::store::{SampleStore, StoreError, StoreResult};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use futures::TryStreamExt;
use std::sync::Arc;

/// Rolling windows the limiter can enforce, all anchored in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WindowKind {
    /// Midnight to midnight
    Daily,
    /// Monday 00:00 to Monday 00:00
    Weekly,
    /// The 1st 00:00 to the next 1st 00:00
    Monthly,
}

impl WindowKind {
    pub const ALL: [WindowKind; 3] = [WindowKind::Daily, WindowKind::Weekly, WindowKind::Monthly];

    /// Start of the window of this kind that contains `as_of`.
    pub fn window_start(self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        let date = as_of.date_naive();
        let first_day = match self {
            WindowKind::Daily => date,
            WindowKind::Weekly => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            WindowKind::Monthly => date - Duration::days(date.day0() as i64),
        };

        Utc.from_utc_datetime(&first_day.and_time(NaiveTime::MIN))
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowKind::Daily => write!(f, "daily"),
            WindowKind::Weekly => write!(f, "weekly"),
            WindowKind::Monthly => write!(f, "monthly"),
        }
    }
}

/// Usage summed over `[start, end]` for one window kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTotal {
    pub kind: WindowKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bytes: u64,
    pub samples: u64,
}

pub struct UsageAggregator {
    store: Arc<SampleStore>,
}

impl UsageAggregator {
    pub fn new(store: Arc<SampleStore>) -> Self {
        Self { store }
    }

    /// Sum the deltas of the window of `kind` containing `as_of`, truncated at `as_of`.
    pub async fn total_for(&self, kind: WindowKind, as_of: DateTime<Utc>) -> StoreResult<WindowTotal> {
        let start = kind.window_start(as_of);

        let (bytes, samples) = self
            .store
            .samples_in_range(start, as_of)
            .try_fold((0u64, 0u64), |(bytes, samples), sample: UsageSample| async move {
                Ok::<_, StoreError>((bytes.saturating_add(sample.delta_bytes), samples + 1))
            })
            .await?;

        tracing::debug!(
            "{} usage since {}: {} bytes over {} samples",
            kind,
            start,
            bytes,
            samples
        );

        Ok(WindowTotal {
            kind,
            start,
            end: as_of,
            bytes,
            samples,
        })
    }

    /// Totals for every window kind as of the same instant.
    pub async fn totals(&self, as_of: DateTime<Utc>) -> StoreResult<Vec<WindowTotal>> {
        let mut totals = Vec::with_capacity(WindowKind::ALL.len());
        for kind in WindowKind::ALL {
            totals.push(self.total_for(kind, as_of).await?);
        }
        Ok(totals)
    }
}
