//! Serde helpers for the agent wire format.
//!
//! Every text transport (decoded-file intermediates and store values) carries
//! payloads as base64 strings and timestamps as numeric epoch seconds.

use chrono::{DateTime, Utc};

/// Base64 engine for payload fields.
pub const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Returns the current time truncated to microsecond precision.
///
/// Wire timestamps round-trip at microsecond granularity, so anything
/// constructed for later encoding starts out truncated.
pub fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Numeric epoch-seconds encoding for timestamps.
///
/// Serializes as a float carrying microsecond precision; accepts any JSON
/// number on the way in.
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.timestamp_micros() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        let micros = (seconds * 1_000_000.0).round() as i64;
        DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            serde::de::Error::custom(format!("epoch seconds out of range: {seconds}"))
        })
    }
}

/// Base64 encoding for optional payload bytes.
///
/// Serialization always emits base64 text (or null). Deserialization assumes
/// an incoming string is base64 and decodes it; if strict decoding fails, the
/// raw bytes of the string are taken verbatim. The permissive fallback is
/// deliberate: remote peers may hand us plain text payloads.
pub mod base64_payload {
    use super::BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.map(|text| match BASE64.decode(text.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => text.into_bytes(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Stamp {
        #[serde(with = "epoch_seconds")]
        at: DateTime<Utc>,
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Blob {
        #[serde(with = "base64_payload", default)]
        data: Option<Vec<u8>>,
    }

    #[test]
    fn timestamp_roundtrips_at_microsecond_precision() {
        let stamp = Stamp { at: now_micros() };
        let json = serde_json::to_string(&stamp).unwrap();
        let back: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stamp);
    }

    #[test]
    fn timestamp_accepts_integer_seconds() {
        let back: Stamp = serde_json::from_str(r#"{"at": 1700000000}"#).unwrap();
        assert_eq!(back.at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn payload_serializes_as_base64() {
        let blob = Blob {
            data: Some(b"command: echo hi".to_vec()),
        };
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, r#"{"data":"Y29tbWFuZDogZWNobyBoaQ=="}"#);
    }

    #[test]
    fn payload_decodes_valid_base64() {
        let back: Blob = serde_json::from_str(r#"{"data":"aGVsbG8="}"#).unwrap();
        assert_eq!(back.data.as_deref(), Some(b"hello".as_slice()));
    }

    #[test]
    fn payload_falls_back_to_raw_bytes() {
        // "hi there" is not valid base64; the string bytes are kept verbatim.
        let back: Blob = serde_json::from_str(r#"{"data":"hi there"}"#).unwrap();
        assert_eq!(back.data.as_deref(), Some(b"hi there".as_slice()));
    }

    #[test]
    fn payload_null_and_missing_are_none() {
        let null: Blob = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(null.data.is_none());
        let missing: Blob = serde_json::from_str(r#"{}"#).unwrap();
        assert!(missing.data.is_none());
    }
}
