//! Lenient deserializers for the persisted blob.
//!
//! Older blobs were written by code that mixed numeric and string ids and
//! stored form values verbatim, so the readers here accept a few shapes for
//! the same field and normalize them. Everything is written back in the
//! canonical form.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl RawScalar {
    fn into_string(self) -> String {
        match self {
            RawScalar::Str(s) => s,
            RawScalar::Int(n) => n.to_string(),
            RawScalar::UInt(n) => n.to_string(),
            RawScalar::Float(f) => f.to_string(),
        }
    }
}

/// An id given as a JSON string or number, normalized to a string.
pub fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(RawScalar::deserialize(d)?.into_string())
}

/// An optional id. `null` and the empty string both mean "no id".
pub fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<RawScalar> = Option::deserialize(d)?;
    Ok(raw.map(RawScalar::into_string).filter(|s| !s.is_empty()))
}

/// A string that may be stored as `null`.
pub fn de_string_or_null<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.unwrap_or_default())
}

/// A number that may have been stored as a numeric string (form input).
/// `null`, `""` and non-numeric strings read as absent.
pub fn de_opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<RawScalar> = Option::deserialize(d)?;
    Ok(match raw {
        None => None,
        Some(RawScalar::Int(n)) => Some(n as f64),
        Some(RawScalar::UInt(n)) => Some(n as f64),
        Some(RawScalar::Float(f)) => Some(f),
        Some(RawScalar::Str(s)) => s.trim().parse::<f64>().ok(),
    })
}

/// Progress as a whole percentage. Fractional values are rounded and
/// anything above 255 saturates.
pub fn de_progress<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let raw: Option<RawScalar> = Option::deserialize(d)?;
    let value = match raw {
        None => 0.0,
        Some(RawScalar::Int(n)) => n as f64,
        Some(RawScalar::UInt(n)) => n as f64,
        Some(RawScalar::Float(f)) => f,
        Some(RawScalar::Str(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
    };
    Ok(value.round().clamp(0.0, u8::MAX as f64) as u8)
}

/// A timestamp in RFC 3339 or a bare `YYYY-MM-DD` date (read as midnight UTC).
/// Unparseable values read as absent rather than failing the whole load.
pub fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.and_then(|s| parse_timestamp(&s)))
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "de_id")]
        id: String,
        #[serde(default, deserialize_with = "de_opt_id")]
        parent: Option<String>,
        #[serde(default, deserialize_with = "de_opt_number")]
        budget: Option<f64>,
        #[serde(default, deserialize_with = "de_progress")]
        progress: u8,
        #[serde(default, deserialize_with = "de_opt_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numeric_ids_become_strings() {
        let p = sample(r#"{"id": 7, "parent": 3}"#);
        assert_eq!(p.id, "7");
        assert_eq!(p.parent.as_deref(), Some("3"));
    }

    #[test]
    fn empty_parent_is_none() {
        assert!(sample(r#"{"id": "a", "parent": ""}"#).parent.is_none());
        assert!(sample(r#"{"id": "a", "parent": null}"#).parent.is_none());
        assert!(sample(r#"{"id": "a"}"#).parent.is_none());
    }

    #[test]
    fn budget_accepts_strings_and_numbers() {
        assert_eq!(sample(r#"{"id": 1, "budget": 1200}"#).budget, Some(1200.0));
        assert_eq!(sample(r#"{"id": 1, "budget": "450"}"#).budget, Some(450.0));
        assert_eq!(sample(r#"{"id": 1, "budget": ""}"#).budget, None);
        assert_eq!(sample(r#"{"id": 1, "budget": null}"#).budget, None);
    }

    #[test]
    fn progress_rounds_and_saturates() {
        assert_eq!(sample(r#"{"id": 1, "progress": 42.6}"#).progress, 43);
        assert_eq!(sample(r#"{"id": 1, "progress": 999}"#).progress, 255);
        assert_eq!(sample(r#"{"id": 1, "progress": -5}"#).progress, 0);
        assert_eq!(sample(r#"{"id": 1, "progress": null}"#).progress, 0);
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        let p = sample(r#"{"id": 1, "at": "2024-03-01"}"#);
        assert_eq!(p.at.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        let p = sample(r#"{"id": 1, "at": "2024-03-01T10:30:00.000Z"}"#);
        assert_eq!(p.at.unwrap().to_rfc3339(), "2024-03-01T10:30:00+00:00");
        assert!(sample(r#"{"id": 1, "at": "yesterday"}"#).at.is_none());
    }
}
