//! Unified constants module for bandwidth-gate
//!
//! Size and time units shared by argument parsing and output formatting.

// ============================================================================
// Size Constants (used by parse_size and format_bytes)
// ============================================================================

/// One kilobyte in bytes (1024 bytes)
pub const KB: u64 = 1024;

/// One megabyte in bytes (1024 KB)
pub const MB: u64 = KB * 1024;

/// One gigabyte in bytes (1024 MB)
pub const GB: u64 = MB * 1024;

/// One terabyte in bytes (1024 GB)
pub const TB: u64 = GB * 1024;

/// Size suffixes, smallest first
pub const SIZE_UNITS: &[(char, u64)] = &[('b', 1), ('k', KB), ('m', MB), ('g', GB), ('t', TB)];

// ============================================================================
// Time Constants (used by parse_duration)
// ============================================================================

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = SECONDS_PER_MINUTE * 60;
pub const SECONDS_PER_DAY: u64 = SECONDS_PER_HOUR * 24;
pub const SECONDS_PER_WEEK: u64 = SECONDS_PER_DAY * 7;

/// Duration suffixes
pub const TIME_UNITS: &[(char, u64)] = &[
    ('m', SECONDS_PER_MINUTE),
    ('h', SECONDS_PER_HOUR),
    ('d', SECONDS_PER_DAY),
    ('w', SECONDS_PER_WEEK),
];

// ============================================================================
// Defaults
// ============================================================================

/// Retention used by --clear-old-data when no limit is configured
pub const DEFAULT_RETENTION: &str = "35d";

/// Transmission RPC request timeout in seconds
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
