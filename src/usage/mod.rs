/// Usage accounting for the transfer limiter.
///
/// Covers:
/// - Turning cumulative counter readings into per-run deltas
/// - Summing deltas over daily, weekly and monthly windows
/// - Comparing window totals to the configured caps
mod accountant;
mod aggregator;
mod limits;
mod sample;

pub use accountant::{compute_delta, DeltaKind};
pub use aggregator::{UsageAggregator, WindowKind, WindowTotal};
pub use limits::{decide, exceeded, Decision, LimitConfig, LimitEnforcer};
pub use sample::UsageSample;
