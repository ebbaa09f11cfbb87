//! Monetary amounts are integer cents end to end. Formatting to a decimal
//! string happens only at presentation boundaries (logs, tickets).

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

/// Renders an amount of cents as a decimal string, e.g. `2300` -> `"23.00"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Deserializes an amount of cents leniently: integers pass through, floats
/// are rounded, numeric strings are parsed, and anything unparsable (or
/// absent, via `#[serde(default)]`) becomes 0. Malformed client input must
/// degrade to a zero amount, not reject the request.
pub fn lenient_cents<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CentsVisitor;

    impl<'de> Visitor<'de> for CentsVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer amount of cents")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(0))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.is_finite() {
                Ok(v.round() as i64)
            } else {
                Ok(0)
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            if let Ok(n) = v.trim().parse::<i64>() {
                return Ok(n);
            }
            match v.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(f.round() as i64),
                _ => Ok(0),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> Result<i64, E> {
            Ok(0)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<i64, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(CentsVisitor)
        }
    }

    deserializer.deserialize_any(CentsVisitor)
}
