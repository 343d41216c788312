//! Time strings to picoseconds and back.
//!
//! Accepts plain numbers (seconds) or a `ns`, `us`/`µs`, `ms`, `s`
//! suffix. Fractions are parsed in decimal, never through a float, so
//! "2.5ns" is exactly 2500ps.

use anyhow::{bail, Context, Result};
use prac_core::types::{SimTime, PS_PER_MS, PS_PER_NS, PS_PER_S, PS_PER_US};

const UNITS: &[(&str, SimTime)] = &[
    ("ns", PS_PER_NS),
    ("us", PS_PER_US),
    ("ms", PS_PER_MS),
    ("s",  PS_PER_S),
];

pub fn parse_time(input: &str) -> Result<SimTime> {
    let s = input
        .trim()
        .to_lowercase()
        .replace("µs", "us")
        .replace("μs", "us");

    let (numeric, scale) = UNITS
        .iter()
        .find_map(|&(suffix, scale)| s.strip_suffix(suffix).map(|n| (n.trim(), scale)))
        .unwrap_or((s.as_str(), PS_PER_S));

    parse_scaled(numeric, scale).with_context(|| format!("Invalid time: '{input}'"))
}

fn parse_scaled(numeric: &str, scale: SimTime) -> Result<SimTime> {
    let (whole, frac) = numeric.split_once('.').unwrap_or((numeric, ""));
    if whole.is_empty() && frac.is_empty() {
        bail!("missing number");
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        bail!("expected a non-negative decimal number");
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse()? };
    let frac_digits = frac.trim_end_matches('0');
    let mut ps = whole.checked_mul(scale as u128).context("out of range")?;
    if !frac_digits.is_empty() {
        let denom = 10u128
            .checked_pow(frac_digits.len() as u32)
            .context("too many fractional digits")?;
        let scaled = frac_digits.parse::<u128>()? * scale as u128;
        if scaled % denom != 0 {
            bail!("finer than 1ps");
        }
        ps += scaled / denom;
    }
    SimTime::try_from(ps).context("out of range")
}

/// Friendly rendering with an auto-selected unit.
pub fn human_time(ps: SimTime) -> String {
    let seconds = ps as f64 / PS_PER_S as f64;
    if ps >= PS_PER_S {
        format!("{seconds:.6} s")
    } else if ps >= PS_PER_MS {
        format!("{:.3} ms", seconds * 1e3)
    } else if ps >= PS_PER_US {
        format!("{:.3} us", seconds * 1e6)
    } else {
        format!("{:.3} ns", seconds * 1e9)
    }
}

/// Seconds for CSV columns, in the shortest form that reads back to the
/// same float. Exponent notation below 1e-4 and from 1e16 up, with at
/// least two exponent digits ("6e-07"). Whole values keep a ".0".
pub fn seconds(ps: SimTime) -> String {
    let value = ps as f64 / PS_PER_S as f64;
    if value == 0.0 {
        return "0.0".to_string();
    }

    // `{:e}` already yields the shortest round-trip digits.
    let sci = format!("{value:e}");
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exponent < -4 || exponent >= 16 {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }

    let fixed = value.to_string();
    if fixed.contains('.') {
        fixed
    } else {
        format!("{fixed}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_unit() {
        assert_eq!(parse_time("45ns").unwrap(), 45_000);
        assert_eq!(parse_time("3.2us").unwrap(), 3_200_000);
        assert_eq!(parse_time("3.2µs").unwrap(), 3_200_000);
        assert_eq!(parse_time("64ms").unwrap(), 64 * PS_PER_MS);
        assert_eq!(parse_time("0.001s").unwrap(), PS_PER_MS);
        assert_eq!(parse_time("0.128").unwrap(), 128 * PS_PER_MS);
        assert_eq!(parse_time(" 32 MS ").unwrap(), 32 * PS_PER_MS);
    }

    #[test]
    fn fractional_nanoseconds_are_exact() {
        assert_eq!(parse_time("2.5ns").unwrap(), 2_500);
        assert_eq!(parse_time(".5ns").unwrap(), 500);
        assert_eq!(parse_time("1.000ns").unwrap(), 1_000);
        assert_eq!(parse_time("0").unwrap(), 0);
        assert_eq!(parse_time("0us").unwrap(), 0);
    }

    #[test]
    fn rejects_garbage_negative_and_sub_picosecond() {
        for bad in ["", "ns", "abc", "-5ns", "1e3ns", "1.2.3us", "0.0001ns", "5 parsecs"] {
            assert!(parse_time(bad).is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn human_time_picks_a_unit() {
        assert_eq!(human_time(45_000), "45.000 ns");
        assert_eq!(human_time(2_500), "2.500 ns");
        assert_eq!(human_time(3_200_000), "3.200 us");
        assert_eq!(human_time(32 * PS_PER_MS), "32.000 ms");
        assert_eq!(human_time(2 * PS_PER_S), "2.000000 s");
        assert_eq!(human_time(0), "0.000 ns");
    }

    #[test]
    fn csv_seconds_use_shortest_float_form() {
        assert_eq!(seconds(600_000), "6e-07");
        assert_eq!(seconds(15 * PS_PER_US), "1.5e-05");
        assert_eq!(seconds(10 * PS_PER_US), "1e-05");
        assert_eq!(seconds(100 * PS_PER_US), "0.0001");
        assert_eq!(seconds(150 * PS_PER_US), "0.00015");
        assert_eq!(seconds(12 * PS_PER_MS + 500 * PS_PER_US), "0.0125");
        assert_eq!(seconds(2 * PS_PER_S), "2.0");
        assert_eq!(seconds(0), "0.0");
    }
}
