//! Lenient temporal coercion for filter operands.
//!
//! Operands aimed at timestamp fields arrive as whatever the caller had on
//! hand: RFC 3339 strings, bare dates, or numbers in seconds, milliseconds,
//! or microseconds. Everything normalizes to microseconds since the Unix
//! epoch, the representation [`Value::Timestamp`] carries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use polystore_types::Value;

/// Magnitude below which an integer operand is read as whole seconds.
const SECONDS_CUTOFF: i64 = 100_000_000_000;
/// Magnitude below which an integer operand is read as milliseconds.
const MILLIS_CUTOFF: i64 = 100_000_000_000_000;

/// Coerce an operand to [`Value::Timestamp`] when it plausibly denotes a
/// point in time. Operands that do not parse are returned unchanged so the
/// backend can reject or match them natively.
pub fn coerce(value: Value) -> Value {
    match value {
        Value::String(ref s) => match parse_str(s) {
            Some(micros) => Value::Timestamp(micros),
            None => value,
        },
        Value::Int32(n) => Value::Timestamp(int_to_micros(i64::from(n))),
        Value::Int64(n) => Value::Timestamp(int_to_micros(n)),
        Value::Float32(f) => Value::Timestamp(float_to_micros(f64::from(f))),
        Value::Float64(f) => Value::Timestamp(float_to_micros(f)),
        other => other,
    }
}

/// Parse a textual timestamp to epoch microseconds.
pub fn parse_str(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp_micros());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.and_utc().timestamp_micros());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0)?;
        return Some(dt.and_utc().timestamp_micros());
    }
    None
}

/// Interpret a bare integer by magnitude: seconds, then milliseconds,
/// then microseconds.
fn int_to_micros(n: i64) -> i64 {
    let magnitude = n.abs();
    if magnitude < SECONDS_CUTOFF {
        n.saturating_mul(1_000_000)
    } else if magnitude < MILLIS_CUTOFF {
        n.saturating_mul(1_000)
    } else {
        n
    }
}

/// Floats are fractional seconds.
fn float_to_micros(f: f64) -> i64 {
    (f * 1_000_000.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339() {
        let v = coerce(Value::String("2024-01-15T10:30:00Z".into()));
        assert_eq!(v, Value::Timestamp(1_705_314_600_000_000));
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let v = coerce(Value::String("2024-01-15T10:30:00+02:00".into()));
        assert_eq!(v, Value::Timestamp(1_705_307_400_000_000));
    }

    #[test]
    fn test_space_separated_datetime() {
        let v = coerce(Value::String("2024-01-15 10:30:00.250".into()));
        assert_eq!(v, Value::Timestamp(1_705_314_600_250_000));
    }

    #[test]
    fn test_bare_date() {
        let v = coerce(Value::String("2024-01-15".into()));
        assert_eq!(v, Value::Timestamp(1_705_276_800_000_000));
    }

    #[test]
    fn test_unparseable_string_passes_through() {
        let v = coerce(Value::String("not a date".into()));
        assert_eq!(v, Value::String("not a date".into()));
    }

    #[test]
    fn test_integer_magnitudes() {
        // Seconds.
        assert_eq!(
            coerce(Value::Int64(1_705_314_600)),
            Value::Timestamp(1_705_314_600_000_000)
        );
        // Milliseconds.
        assert_eq!(
            coerce(Value::Int64(1_705_314_600_000)),
            Value::Timestamp(1_705_314_600_000_000)
        );
        // Already microseconds.
        assert_eq!(
            coerce(Value::Int64(1_705_314_600_000_000)),
            Value::Timestamp(1_705_314_600_000_000)
        );
    }

    #[test]
    fn test_float_is_fractional_seconds() {
        assert_eq!(
            coerce(Value::Float64(1_705_314_600.5)),
            Value::Timestamp(1_705_314_600_500_000)
        );
    }

    #[test]
    fn test_non_temporal_values_untouched() {
        assert_eq!(coerce(Value::Null), Value::Null);
        assert_eq!(coerce(Value::Bool(true)), Value::Bool(true));
        assert_eq!(
            coerce(Value::Timestamp(123)),
            Value::Timestamp(123)
        );
    }
}
