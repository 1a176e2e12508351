use crate::utils::constants::{SIZE_UNITS, TIME_UNITS};

pub struct InputValidator;

impl InputValidator {
    /// Parse a byte size with a unit suffix (binary multiples).
    /// Format: number[unit] with unit one of b, k, m, g, t (case-insensitive),
    /// optionally followed by "b" or "ib": "10g", "1.5T", "500MiB"
    pub fn parse_size(s: &str) -> Result<u64, String> {
        let (number, unit) = split_quantity(s, SIZE_UNITS, &["", "b", "ib"])
            .ok_or_else(|| format!("Invalid size '{}': must be formatted like '5.5T', '500G', '1000M'", s))?;

        let bytes = number * unit as f64;
        if bytes > u64::MAX as f64 {
            return Err(format!("Size '{}' is too large", s));
        }

        Ok(bytes as u64)
    }

    /// Parse a duration with a unit suffix.
    /// Format: number[unit] with unit one of m (minutes), h, d, w: "30d", "12h", "1.5w"
    pub fn parse_duration(s: &str) -> Result<chrono::Duration, String> {
        let (number, unit) = split_quantity(s, TIME_UNITS, &[""])
            .ok_or_else(|| format!("Invalid duration '{}': must be formatted like '30d', '12h', '2w'", s))?;

        let seconds = number * unit as f64;
        if seconds > i64::MAX as f64 / 1000.0 {
            return Err(format!("Duration '{}' is too large", s));
        }

        Ok(chrono::Duration::seconds(seconds as i64))
    }
}

/// Split "1.5g" into (1.5, multiplier of 'g'). The unit letter is required.
fn split_quantity(s: &str, units: &[(char, u64)], allowed_tails: &[&str]) -> Option<(f64, u64)> {
    let lowered = s.trim().to_lowercase();
    let split_at = lowered
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(lowered.len());
    let (number, suffix) = lowered.split_at(split_at);

    let number: f64 = number.parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }

    let mut suffix_chars = suffix.trim_start().chars();
    let unit_char = suffix_chars.next()?;
    let tail = suffix_chars.as_str();
    if !allowed_tails.contains(&tail) {
        return None;
    }

    units
        .iter()
        .find(|(c, _)| *c == unit_char)
        .map(|(_, multiplier)| (number, *multiplier))
}
