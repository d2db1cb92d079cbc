//! Response envelope normalization.
//!
//! The upstream wraps data in a single property named after the resource:
//! singular for one record (`{"ticket": {...}}`), plural for many
//! (`{"tickets": [...]}`). Filter queries add a sibling `total` counter.
//! Decoding is explicit: strip `total`, require exactly one remaining
//! property, and accept only an object or an array under it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::SluiceError;

/// Property name of the filter counter, never data-bearing.
const TOTAL_KEY: &str = "total";

/// Records extracted from one or more response bodies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalized {
    /// The envelope key the records came from (empty for a bodiless delete).
    pub key: String,
    /// Records in server order.
    pub records: Vec<Value>,
    /// The `total` counter, when the server sent one.
    pub total: Option<u64>,
}

impl Normalized {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends the records of a later page.
    pub fn extend(&mut self, other: Normalized) {
        if self.key.is_empty() {
            self.key = other.key;
        }
        if self.total.is_none() {
            self.total = other.total;
        }
        self.records.extend(other.records);
    }

    /// Returns the only record.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::UnrecognizedEnvelope` unless there is exactly one.
    pub fn into_single(self) -> Result<Value, SluiceError> {
        if self.records.len() != 1 {
            return Err(SluiceError::UnrecognizedEnvelope {
                keys: vec![format!("{} ({} records)", self.key, self.records.len())],
            });
        }
        self.records
            .into_iter()
            .next()
            .ok_or(SluiceError::UnrecognizedEnvelope { keys: Vec::new() })
    }

    /// Deserializes every record into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Vec<T>, SluiceError> {
        self.records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(SluiceError::Serialization))
            .collect()
    }
}

/// Decoded envelope shape.
#[derive(Debug)]
enum Envelope {
    One(String, Map<String, Value>),
    Many(String, Vec<Value>),
}

impl Envelope {
    fn decode(mut body: Map<String, Value>) -> Result<(Self, Option<u64>), SluiceError> {
        let total = body.remove(TOTAL_KEY).and_then(|v| v.as_u64());

        if body.len() != 1 {
            return Err(SluiceError::UnrecognizedEnvelope {
                keys: body.keys().cloned().collect(),
            });
        }

        let (key, value) = body
            .into_iter()
            .next()
            .ok_or(SluiceError::UnrecognizedEnvelope { keys: Vec::new() })?;

        let envelope = match value {
            Value::Object(record) => Envelope::One(key, record),
            Value::Array(records) => Envelope::Many(key, records),
            _ => return Err(SluiceError::UnrecognizedEnvelope { keys: vec![key] }),
        };
        Ok((envelope, total))
    }

    fn into_normalized(self, total: Option<u64>) -> Normalized {
        match self {
            Envelope::One(key, record) => Normalized {
                key,
                records: vec![Value::Object(record)],
                total,
            },
            Envelope::Many(key, records) => Normalized {
                key,
                records,
                total,
            },
        }
    }
}

/// Normalizes a response body into an ordered record set.
///
/// # Errors
///
/// - `SluiceError::Serialization` if the body is not JSON
/// - `SluiceError::UnrecognizedEnvelope` if the top level is not an object
///   with exactly one non-`total` property holding an object or array
pub fn normalize(body: &str) -> Result<Normalized, SluiceError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(map) = value else {
        return Err(SluiceError::UnrecognizedEnvelope { keys: Vec::new() });
    };
    let (envelope, total) = Envelope::decode(map)?;
    Ok(envelope.into_normalized(total))
}

/// Normalizes a body and checks the envelope key against the resource names.
pub fn normalize_expecting(
    body: &str,
    singular: &str,
    plural: &str,
) -> Result<Normalized, SluiceError> {
    let normalized = normalize(body)?;
    if normalized.key != singular && normalized.key != plural {
        return Err(SluiceError::UnrecognizedEnvelope {
            keys: vec![normalized.key],
        });
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_single_object_becomes_one_record() {
        let normalized = normalize(r#"{"ticket": {"id": 7, "subject": "Printer"}}"#).unwrap();
        assert_eq!(normalized.key, "ticket");
        assert_eq!(normalized.records, vec![json!({"id": 7, "subject": "Printer"})]);
        assert_eq!(normalized.total, None);
    }

    #[test]
    fn test_array_keeps_length_and_order() {
        let normalized = normalize(r#"{"tickets": [{"id": 3}, {"id": 1}, {"id": 2}]}"#).unwrap();
        assert_eq!(normalized.key, "tickets");
        let ids: Vec<_> = normalized.records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_total_is_not_data() {
        let normalized = normalize(r#"{"total": 2, "tickets": [{"id": 1}, {"id": 2}]}"#).unwrap();
        assert_eq!(normalized.key, "tickets");
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized.total, Some(2));
    }

    #[test]
    fn test_empty_array_is_valid() {
        let normalized = normalize(r#"{"tickets": [], "total": 0}"#).unwrap();
        assert!(normalized.is_empty());
        assert_eq!(normalized.total, Some(0));
    }

    #[test]
    fn test_ambiguous_envelopes_fail_closed() {
        assert!(matches!(
            normalize(r#"{"ticket": {}, "meta": {}}"#),
            Err(SluiceError::UnrecognizedEnvelope { .. })
        ));
        assert!(matches!(
            normalize(r#"{"total": 4}"#),
            Err(SluiceError::UnrecognizedEnvelope { .. })
        ));
        assert!(matches!(
            normalize(r#"{}"#),
            Err(SluiceError::UnrecognizedEnvelope { .. })
        ));
        assert!(matches!(
            normalize(r#"[{"id": 1}]"#),
            Err(SluiceError::UnrecognizedEnvelope { .. })
        ));
        assert!(matches!(
            normalize(r#"{"ticket": "nope"}"#),
            Err(SluiceError::UnrecognizedEnvelope { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        assert!(matches!(
            normalize("<html>"),
            Err(SluiceError::Serialization(_))
        ));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let body = r#"{"releases": [{"id": 1, "subject": "a"}, {"id": 2, "subject": "b"}]}"#;
        assert_eq!(normalize(body).unwrap(), normalize(body).unwrap());
    }

    #[test]
    fn test_normalize_expecting_checks_key() {
        let body = r#"{"change": {"id": 1}}"#;
        assert!(normalize_expecting(body, "change", "changes").is_ok());
        assert!(matches!(
            normalize_expecting(body, "ticket", "tickets"),
            Err(SluiceError::UnrecognizedEnvelope { .. })
        ));
    }

    #[test]
    fn test_into_single_and_typed() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: u64,
        }

        let one = normalize(r#"{"ticket": {"id": 9}}"#).unwrap();
        assert_eq!(one.clone().into_single().unwrap(), json!({"id": 9}));
        let rows: Vec<Row> = one.into_typed().unwrap();
        assert_eq!(rows[0].id, 9);

        let many = normalize(r#"{"tickets": [{"id": 1}, {"id": 2}]}"#).unwrap();
        assert!(many.into_single().is_err());
    }

    #[test]
    fn test_extend_concatenates_pages() {
        let mut first = normalize(r#"{"tickets": [{"id": 1}], "total": 2}"#).unwrap();
        first.extend(normalize(r#"{"tickets": [{"id": 2}]}"#).unwrap());
        assert_eq!(first.records, vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(first.total, Some(2));
    }
}
