//! Ingest normalisation for snapshot payloads.
//!
//! The backend and the realtime channel disagree on how they encode time:
//! RFC 3339 strings, epoch milliseconds, and Firestore-style
//! `{ "_seconds": .., "_nanoseconds": .. }` objects all show up. Everything is
//! normalised to `DateTime<Utc>` here, and list fields that arrive as `null`
//! or not at all become empty vectors.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes any supported timestamp encoding. Unrecognised values become `None`
/// rather than failing the whole record.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_value))
}

/// Deserializes a field that may be `null`, substituting its default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "deserialize_opt")]
        at: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "null_as_default")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
    }

    #[test]
    fn test_rfc3339_string() {
        let ts = parse_value(&json!("2024-03-01T12:00:00Z")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_epoch_millis() {
        let ts = parse_value(&json!(1_700_000_000_000_i64)).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_firestore_object_both_spellings() {
        let a = parse_value(&json!({"_seconds": 1_700_000_000, "_nanoseconds": 500})).unwrap();
        let b = parse_value(&json!({"seconds": 1_700_000_000, "nanoseconds": 500})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.timestamp_subsec_nanos(), 500);
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_value(&json!("yesterday")).is_none());
        assert!(parse_value(&json!(true)).is_none());
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let p: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(p.at.is_none());
        assert!(p.tags.is_empty());

        let p: Probe =
            serde_json::from_value(json!({"at": null, "tags": null, "name": null})).unwrap();
        assert!(p.at.is_none());
        assert!(p.tags.is_empty());
        assert!(p.name.is_empty());
    }
}
