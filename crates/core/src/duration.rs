//! Compact duration strings (`"30s"`, `"2m0s"`, `"1h30m"`, `"1.5s"`).
//!
//! The same grammar serves two callers with different failure policies:
//! the environment loader falls back to its default on a parse error, while
//! a timeout handed over explicitly by calling code is a fatal input error.

use std::time::Duration;

use crate::error::InputError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest units first so `ms` wins over `m`.
const UNITS: [(&str, u128); 8] = [
    ("ns", 1),
    ("us", NANOS_PER_MICRO),
    ("µs", NANOS_PER_MICRO),
    ("μs", NANOS_PER_MICRO),
    ("ms", NANOS_PER_MILLI),
    ("s", NANOS_PER_SEC),
    ("m", 60 * NANOS_PER_SEC),
    ("h", 3600 * NANOS_PER_SEC),
];

fn invalid(value: &str, reason: impl Into<String>) -> InputError {
    InputError::InvalidTimeout {
        value: value.to_owned(),
        reason: reason.into(),
    }
}

/// Parses a sequence of `<number><unit>` tokens into a [`Duration`].
///
/// Units: `h`, `m`, `s`, `ms`, `us`/`µs`, `ns`. Numbers may carry a decimal
/// fraction. The bare string `"0"` is accepted.
///
/// # Errors
///
/// Returns [`InputError::InvalidTimeout`] for empty input, a token without a
/// number, an unknown or missing unit, or a value that overflows.
pub fn parse_timeout(value: &str) -> Result<Duration, InputError> {
    if value.is_empty() {
        return Err(invalid(value, "must not be empty"));
    }
    if value == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = value;
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(value, "expected a number before each unit"));
        }

        let Some((unit, scale)) = UNITS.iter().find(|(unit, _)| rest.starts_with(unit)) else {
            return Err(invalid(value, "missing or unknown unit (use h, m, s, ms, us, ns)"));
        };
        rest = &rest[unit.len()..];

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| invalid(value, "number out of range"))?
        };

        let mut nanos = whole
            .checked_mul(*scale)
            .ok_or_else(|| invalid(value, "duration overflows"))?;

        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision are dropped.
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: u128 = digits
                .parse()
                .map_err(|_| invalid(value, "fraction out of range"))?;
            let denominator = 10u128.pow(digits.len() as u32);
            nanos += numerator * scale / denominator;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| invalid(value, "duration overflows"))?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid(value, "duration overflows"))?;
    // Remainder is below one second, so it always fits in u32.
    let subsec = (total % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, subsec))
}

/// Renders `whole.fraction` with trailing zeros removed.
fn with_fraction(nanos: u128, unit: u128, width: usize) -> String {
    let whole = nanos / unit;
    let rem = nanos % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let digits = format!("{rem:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Formats a duration in the compact form accepted by [`parse_timeout`].
///
/// `Duration::from_secs(120)` renders as `"2m0s"`, 1.5 s as `"1.5s"`,
/// 250 ms as `"250ms"`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", with_fraction(nanos, NANOS_PER_MICRO, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", with_fraction(nanos, NANOS_PER_MILLI, 6));
    }

    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs_nanos = u128::from(total_secs % 60) * NANOS_PER_SEC + u128::from(duration.subsec_nanos());
    let seconds = with_fraction(secs_nanos, NANOS_PER_SEC, 9);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `serde` adapter storing a [`Duration`] in the compact string form.
///
/// ```ignore
/// #[serde(with = "kubetriage_core::duration::compact")]
/// pub collection_timeout: Duration,
/// ```
pub mod compact {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timeout(&raw).map_err(serde::de::Error::custom)
    }
}
