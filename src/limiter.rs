//! One limiter run: fetch, account, persist, aggregate, enforce.

use crate::config::ConfigError;
use crate::rpc::{RpcError, TransferClient};
use crate::store::{SampleStore, StoreError};
use crate::usage::{
    compute_delta, decide, exceeded, DeltaKind, Decision, LimitConfig, LimitEnforcer,
    UsageAggregator, UsageSample, WindowKind, WindowTotal,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Nothing was recorded and the client was left untouched
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Nothing was recorded and the client was left untouched
    #[error("Failed to read transfer statistics: {0}")]
    RemoteFetch(#[source] RpcError),

    /// The sample was recorded; the next run retries enforcement
    #[error("Failed to {decision} transfers: {source}")]
    Enforcement {
        decision: Decision,
        #[source]
        source: RpcError,
    },
}

pub type LimiterResult<T> = Result<T, LimiterError>;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sample: UsageSample,
    pub delta_kind: DeltaKind,
    pub clock_skew: bool,
    pub totals: Vec<WindowTotal>,
    pub exceeded: Vec<WindowKind>,
    pub decision: Decision,
    /// Samples removed by the retention purge, if it ran
    pub purged: Option<u64>,
}

pub struct Limiter {
    store: Arc<SampleStore>,
    client: Arc<dyn TransferClient>,
    aggregator: UsageAggregator,
    enforcer: LimitEnforcer,
    limits: LimitConfig,
    /// Purge horizon for `--clear-old-data`; `None` keeps everything
    retention: Option<Duration>,
}

impl Limiter {
    pub fn new(store: Arc<SampleStore>, client: Arc<dyn TransferClient>, limits: LimitConfig) -> Self {
        Self {
            aggregator: UsageAggregator::new(store.clone()),
            enforcer: LimitEnforcer::new(client.clone()),
            store,
            client,
            limits,
            retention: None,
        }
    }

    /// Purge samples no window can reach any more after each run.
    ///
    /// `fallback` is only used when no limit is configured.
    pub fn with_purge(mut self, fallback: Duration) -> Self {
        self.retention = Some(fallback);
        self
    }

    pub async fn run(&self) -> LimiterResult<RunReport> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> LimiterResult<RunReport> {
        let previous = self.store.last_sample().await?;

        let current = self
            .client
            .cumulative_bytes()
            .await
            .map_err(LimiterError::RemoteFetch)?;

        let accounting = compute_delta(previous.as_ref(), now, current);
        self.store.append(&accounting.sample).await?;

        tracing::debug!(
            "Recorded {} sample: cumulative={} delta={}",
            accounting.kind,
            accounting.sample.cumulative_bytes,
            accounting.sample.delta_bytes
        );

        let purged = match self.retention {
            Some(fallback) => {
                let purged = self.store.purge_before(self.purge_cutoff(now, fallback)).await?;
                tracing::debug!("{} samples retained after purge", self.store.count().await?);
                Some(purged)
            }
            None => None,
        };

        // A skewed sample is pinned after `now`; aggregate up to it so it counts
        let as_of = now.max(accounting.sample.observed_at);
        let totals = self.aggregator.totals(as_of).await?;

        for (kind, limit) in self.limits.configured() {
            if let Some(total) = totals.iter().find(|t| t.kind == kind) {
                tracing::debug!(
                    "{} usage: {} of {} bytes over {} samples ({} to {})",
                    kind,
                    total.bytes,
                    limit,
                    total.samples,
                    total.start,
                    total.end
                );
            }
        }

        let exceeded = exceeded(&totals, &self.limits);
        let decision = decide(&totals, &self.limits);

        self.enforcer
            .enforce(decision)
            .await
            .map_err(|source| LimiterError::Enforcement { decision, source })?;

        Ok(RunReport {
            sample: accounting.sample,
            delta_kind: accounting.kind,
            clock_skew: accounting.clock_skew,
            totals,
            exceeded,
            decision,
            purged,
        })
    }

    /// Start of the longest configured window, or `now - fallback` without limits.
    fn purge_cutoff(&self, now: DateTime<Utc>, fallback: Duration) -> DateTime<Utc> {
        match self.limits.longest_configured() {
            Some(kind) => kind.window_start(now),
            None => now - fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// Scripted stand-in for the Transmission client
    #[derive(Default)]
    struct FakeTransferClient {
        readings: Mutex<VecDeque<u64>>,
        fail_fetch: bool,
        fail_set: bool,
        set_calls: Mutex<Vec<bool>>,
    }

    impl FakeTransferClient {
        fn with_readings(readings: &[u64]) -> Self {
            Self {
                readings: Mutex::new(readings.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn set_calls(&self) -> Vec<bool> {
            self.set_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransferClient for FakeTransferClient {
        async fn cumulative_bytes(&self) -> rpc::Result<u64> {
            if self.fail_fetch {
                return Err(RpcError::Unauthorized);
            }
            Ok(self
                .readings
                .lock()
                .unwrap()
                .pop_front()
                .expect("no reading scripted"))
        }

        async fn set_enabled(&self, enabled: bool) -> rpc::Result<()> {
            self.set_calls.lock().unwrap().push(enabled);
            if self.fail_set {
                return Err(RpcError::Rejected {
                    method: "session-set".to_string(),
                    result: "no".to_string(),
                });
            }
            Ok(())
        }
    }

    fn utc(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, min, 0).unwrap()
    }

    async fn open_store() -> (NamedTempFile, Arc<SampleStore>) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SampleStore::open(temp_file.path()).await.unwrap();
        (temp_file, Arc::new(store))
    }

    #[tokio::test]
    async fn test_baseline_increment_and_reset() {
        let (_file, store) = open_store().await;
        let client = Arc::new(FakeTransferClient::with_readings(&[500, 1500, 200]));
        let limiter = Limiter::new(store.clone(), client.clone(), LimitConfig::default());

        let first = limiter.run_at(utc(14, 10, 0)).await.unwrap();
        assert_eq!(first.delta_kind, DeltaKind::Baseline);
        assert_eq!(first.sample.delta_bytes, 0);
        assert_eq!(first.sample.cumulative_bytes, 500);

        let second = limiter.run_at(utc(14, 10, 15)).await.unwrap();
        assert_eq!(second.delta_kind, DeltaKind::Increment);
        assert_eq!(second.sample.delta_bytes, 1000);

        let third = limiter.run_at(utc(14, 10, 30)).await.unwrap();
        assert_eq!(third.delta_kind, DeltaKind::Reset);
        assert_eq!(third.sample.delta_bytes, 200);
        assert_eq!(third.sample.cumulative_bytes, 200);

        let daily = third
            .totals
            .iter()
            .find(|t| t.kind == WindowKind::Daily)
            .unwrap();
        assert_eq!(daily.bytes, 1200);

        // No limits: every run re-asserts "enabled"
        assert_eq!(client.set_calls(), vec![true, true, true]);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_daily_limit_disables_transfers() {
        let (_file, store) = open_store().await;
        for (hour, delta) in [(1, 400_000_000u64), (5, 400_000_000), (9, 400_000_000)] {
            store
                .append(&UsageSample::new(utc(14, hour, 0), 0, delta))
                .await
                .unwrap();
        }

        // Same counter as the last sample: no new usage this run
        let client = Arc::new(FakeTransferClient::with_readings(&[0]));
        let limits = LimitConfig {
            daily: Some(1_000_000_000),
            ..Default::default()
        };
        let limiter = Limiter::new(store, client.clone(), limits);

        let report = limiter.run_at(utc(14, 12, 0)).await.unwrap();
        assert_eq!(report.decision, Decision::Disable);
        assert_eq!(report.exceeded, vec![WindowKind::Daily]);
        assert_eq!(client.set_calls(), vec![false]);
    }

    #[tokio::test]
    async fn test_usage_from_yesterday_does_not_count_today() {
        let (_file, store) = open_store().await;
        store
            .append(&UsageSample::new(utc(13, 23, 0), 5_000, 5_000))
            .await
            .unwrap();

        let client = Arc::new(FakeTransferClient::with_readings(&[5_100]));
        let limits = LimitConfig {
            daily: Some(1_000),
            weekly: Some(100_000),
            ..Default::default()
        };
        let limiter = Limiter::new(store, client.clone(), limits);

        let report = limiter.run_at(utc(14, 0, 30)).await.unwrap();
        assert_eq!(report.decision, Decision::Enable);
        assert_eq!(client.set_calls(), vec![true]);
    }

    #[tokio::test]
    async fn test_fetch_failure_records_nothing_and_skips_enforcement() {
        let (_file, store) = open_store().await;
        let client = Arc::new(FakeTransferClient {
            fail_fetch: true,
            ..Default::default()
        });
        let limiter = Limiter::new(store.clone(), client.clone(), LimitConfig::default());

        let err = limiter.run_at(utc(14, 12, 0)).await.unwrap_err();
        assert!(matches!(err, LimiterError::RemoteFetch(_)));
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(client.set_calls().is_empty());
    }

    #[tokio::test]
    async fn test_enforcement_failure_keeps_sample() {
        let (_file, store) = open_store().await;
        let client = Arc::new(FakeTransferClient {
            readings: Mutex::new(VecDeque::from(vec![42])),
            fail_set: true,
            ..Default::default()
        });
        let limiter = Limiter::new(store.clone(), client, LimitConfig::default());

        let err = limiter.run_at(utc(14, 12, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            LimiterError::Enforcement {
                decision: Decision::Enable,
                ..
            }
        ));

        let last = store.last_sample().await.unwrap().unwrap();
        assert_eq!(last.cumulative_bytes, 42);
    }

    #[tokio::test]
    async fn test_clock_skew_sample_still_counts() {
        let (_file, store) = open_store().await;
        let client = Arc::new(FakeTransferClient::with_readings(&[100, 700]));
        let limits = LimitConfig {
            daily: Some(500),
            ..Default::default()
        };
        let limiter = Limiter::new(store, client.clone(), limits);

        limiter.run_at(utc(14, 12, 0)).await.unwrap();
        let report = limiter.run_at(utc(14, 11, 0)).await.unwrap();

        assert!(report.clock_skew);
        assert_eq!(report.sample.observed_at, utc(14, 12, 0));
        assert_eq!(report.decision, Decision::Disable);
        assert_eq!(client.set_calls(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_purge_uses_longest_configured_window() {
        let (_file, store) = open_store().await;
        store
            .append(&UsageSample::new(utc(1, 0, 0), 10, 0))
            .await
            .unwrap();
        store
            .append(&UsageSample::new(utc(11, 6, 0), 20, 10))
            .await
            .unwrap();

        let client = Arc::new(FakeTransferClient::with_readings(&[30]));
        let limits = LimitConfig {
            daily: Some(1_000),
            weekly: Some(10_000),
            ..Default::default()
        };
        let limiter = Limiter::new(store.clone(), client, limits).with_purge(Duration::days(35));

        // Thursday the 14th: the weekly window starts Monday the 11th
        let report = limiter.run_at(utc(14, 12, 0)).await.unwrap();
        assert_eq!(report.purged, Some(1));
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(report.sample.delta_bytes, 10);
    }

    #[tokio::test]
    async fn test_purge_without_limits_uses_fallback_retention() {
        let (_file, store) = open_store().await;
        store
            .append(&UsageSample::new(utc(1, 0, 0), 10, 0))
            .await
            .unwrap();

        let client = Arc::new(FakeTransferClient::with_readings(&[10, 10]));
        let limiter = Limiter::new(store.clone(), client, LimitConfig::default())
            .with_purge(Duration::days(7));

        let report = limiter.run_at(utc(14, 12, 0)).await.unwrap();
        assert_eq!(report.purged, Some(1));

        let again = limiter.run_at(utc(14, 12, 15)).await.unwrap();
        assert_eq!(again.purged, Some(0));
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
