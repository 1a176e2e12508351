use crate::utils::constants::SIZE_UNITS;

/// Render a byte count in the largest unit that keeps the value >= 1,
/// e.g. `1.50G`, `512.00K`, `0.00B`.
pub fn format_bytes(bytes: u64) -> String {
    let (unit, size) = SIZE_UNITS
        .iter()
        .rev()
        .find(|(_, size)| bytes >= *size)
        .copied()
        .unwrap_or(SIZE_UNITS[0]);

    format!("{:.2}{}", bytes as f64 / size as f64, unit.to_ascii_uppercase())
}
