//! Human-scaled byte counts ("1.20MB").

const UNITS: [&str; 6] = ["", "K", "M", "G", "T", "P"];
const FACTOR: f64 = 1024.0;

/// Render `bytes` in the largest unit that keeps the value under 1024, with
/// two decimals and a trailing `B`.
///
/// The value is divided by exactly 1024 once per unit step, so results are
/// reproducible across implementations that scale the same way. Anything past
/// the petabyte threshold stays in `P`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= FACTOR && unit < UNITS.len() - 1 {
        value /= FACTOR;
        unit += 1;
    }
    format!("{:.2}{}B", value, UNITS[unit])
}
