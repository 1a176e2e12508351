/// Cap comparison and the enable/disable action it drives.
use super::aggregator::{WindowKind, WindowTotal};
use crate::rpc::{self, TransferClient};
use std::sync::Arc;

/// Optional byte ceiling per window kind. `None` leaves that window unenforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitConfig {
    pub daily: Option<u64>,
    pub weekly: Option<u64>,
    pub monthly: Option<u64>,
}

impl LimitConfig {
    pub fn limit_for(&self, kind: WindowKind) -> Option<u64> {
        match kind {
            WindowKind::Daily => self.daily,
            WindowKind::Weekly => self.weekly,
            WindowKind::Monthly => self.monthly,
        }
    }

    /// Configured `(kind, limit)` pairs, shortest window first.
    pub fn configured(&self) -> impl Iterator<Item = (WindowKind, u64)> + '_ {
        WindowKind::ALL
            .into_iter()
            .filter_map(|kind| self.limit_for(kind).map(|limit| (kind, limit)))
    }

    pub fn is_empty(&self) -> bool {
        self.configured().next().is_none()
    }

    pub fn longest_configured(&self) -> Option<WindowKind> {
        self.configured().map(|(kind, _)| kind).max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Enable,
    Disable,
}

impl Decision {
    pub fn is_enabled(self) -> bool {
        self == Decision::Enable
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Enable => write!(f, "enable"),
            Decision::Disable => write!(f, "disable"),
        }
    }
}

/// Windows whose total meets or exceeds their configured limit.
///
/// A configured window without a matching total counts as zero usage.
pub fn exceeded(totals: &[WindowTotal], limits: &LimitConfig) -> Vec<WindowKind> {
    limits
        .configured()
        .filter(|(kind, limit)| {
            let used = totals
                .iter()
                .find(|total| total.kind == *kind)
                .map(|total| total.bytes)
                .unwrap_or(0);
            used >= *limit
        })
        .map(|(kind, _)| kind)
        .collect()
}

/// `Disable` if any configured limit is reached, `Enable` otherwise.
pub fn decide(totals: &[WindowTotal], limits: &LimitConfig) -> Decision {
    if exceeded(totals, limits).is_empty() {
        Decision::Enable
    } else {
        Decision::Disable
    }
}

/// Pushes a decision to the transfer client.
///
/// The state is asserted on every run rather than on changes, so a missed
/// run or a manual toggle on the client is corrected by the next run.
pub struct LimitEnforcer {
    client: Arc<dyn TransferClient>,
}

impl LimitEnforcer {
    pub fn new(client: Arc<dyn TransferClient>) -> Self {
        Self { client }
    }

    pub async fn enforce(&self, decision: Decision) -> rpc::Result<()> {
        match decision {
            Decision::Disable => tracing::warn!("Usage limit reached, disabling transfers"),
            Decision::Enable => tracing::info!("Usage within limits, enabling transfers"),
        }

        self.client.set_enabled(decision.is_enabled()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn total(kind: WindowKind, bytes: u64) -> WindowTotal {
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        WindowTotal {
            kind,
            start: kind.window_start(now),
            end: now,
            bytes,
            samples: 1,
        }
    }

    #[test]
    fn test_no_limits_always_enable() {
        let totals = vec![
            total(WindowKind::Daily, u64::MAX),
            total(WindowKind::Weekly, u64::MAX),
            total(WindowKind::Monthly, u64::MAX),
        ];
        let limits = LimitConfig::default();

        assert!(limits.is_empty());
        assert_eq!(decide(&totals, &limits), Decision::Enable);
    }

    #[test]
    fn test_daily_limit_exceeded_disables() {
        let totals = vec![total(WindowKind::Daily, 1_200_000_000)];
        let limits = LimitConfig {
            daily: Some(1_000_000_000),
            ..Default::default()
        };

        assert_eq!(decide(&totals, &limits), Decision::Disable);
        assert_eq!(exceeded(&totals, &limits), vec![WindowKind::Daily]);
    }

    #[test]
    fn test_limit_reached_exactly_disables() {
        let totals = vec![total(WindowKind::Weekly, 500)];
        let limits = LimitConfig {
            weekly: Some(500),
            ..Default::default()
        };

        assert_eq!(decide(&totals, &limits), Decision::Disable);
    }

    #[test]
    fn test_unconfigured_window_is_ignored() {
        let totals = vec![
            total(WindowKind::Daily, 10),
            total(WindowKind::Monthly, 9_999_999),
        ];
        let limits = LimitConfig {
            daily: Some(100),
            ..Default::default()
        };

        assert_eq!(decide(&totals, &limits), Decision::Enable);
    }

    #[test]
    fn test_any_exceeded_window_disables() {
        let totals = vec![
            total(WindowKind::Daily, 10),
            total(WindowKind::Weekly, 10),
            total(WindowKind::Monthly, 2_000),
        ];
        let limits = LimitConfig {
            daily: Some(100),
            weekly: Some(100),
            monthly: Some(1_000),
        };

        assert_eq!(exceeded(&totals, &limits), vec![WindowKind::Monthly]);
        assert_eq!(decide(&totals, &limits), Decision::Disable);
    }

    #[test]
    fn test_missing_total_counts_as_zero() {
        let limits = LimitConfig {
            monthly: Some(1),
            ..Default::default()
        };
        assert_eq!(decide(&[], &limits), Decision::Enable);

        let zero_limit = LimitConfig {
            monthly: Some(0),
            ..Default::default()
        };
        assert_eq!(decide(&[], &zero_limit), Decision::Disable);
    }

    #[test]
    fn test_longest_configured() {
        let limits = LimitConfig {
            daily: Some(1),
            weekly: Some(2),
            monthly: None,
        };
        assert_eq!(limits.longest_configured(), Some(WindowKind::Weekly));
        assert_eq!(LimitConfig::default().longest_configured(), None);
    }
}
