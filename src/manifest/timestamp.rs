//! Tolerant timestamp handling for manifests.
//!
//! Producers disagree on how instants are written: some emit ISO-8601
//! strings, others emit Unix epoch seconds as JSON numbers. Both are
//! accepted on input. Output is always RFC 3339 in UTC with a `Z` suffix and
//! second precision, e.g. `2025-09-26T14:00:10Z`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(f64),
    Text(String),
}

/// Formats an instant in the canonical manifest form.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Converts Unix epoch seconds (possibly fractional) to an instant.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Parses a textual timestamp.
///
/// Accepts RFC 3339 with any offset, zone-less `YYYY-MM-DDTHH:MM:SS[.f]`
/// (read as UTC), a bare `YYYY-MM-DD` date (midnight UTC), and digit-only
/// strings holding epoch seconds.
pub fn parse_timestamp_str(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        if let Some(ts) = s.parse::<f64>().ok().and_then(from_epoch_seconds) {
            return Ok(ts);
        }
    }

    Err(format!("unrecognized timestamp '{raw}'"))
}

fn resolve(raw: RawTimestamp) -> Result<DateTime<Utc>, String> {
    match raw {
        RawTimestamp::Seconds(seconds) => from_epoch_seconds(seconds)
            .ok_or_else(|| format!("epoch seconds {seconds} out of range")),
        RawTimestamp::Text(text) => parse_timestamp_str(&text),
    }
}

/// Serde adapter for required timestamp fields.
pub mod required {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = RawTimestamp::deserialize(deserializer)?;
        resolve(raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for optional timestamp fields. `null` reads as `None`.
///
/// Pair with `#[serde(default)]` so a missing key is also `None`.
pub mod optional {
    use super::*;

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
        raw.map(resolve)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Fuzz-only entrypoint for textual timestamp parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_timestamp(input: &str) {
    let _ = parse_timestamp_str(input);
}
