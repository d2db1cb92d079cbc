//! Common types shared across API models.
//!
//! This module defines the structured error body returned with 400
//! responses and small helpers used by several resource models.

use serde::{Deserialize, Deserializer, Serialize};

/// Structured error body sent with validation failures.
///
/// ```json
/// {"description": "Validation failed",
///  "errors": [{"field": "email", "message": "is required", "code": "missing_field"}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Top-level description.
    #[serde(default)]
    pub description: Option<String>,

    /// Field level errors, in server order.
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl ErrorEnvelope {
    /// Parses an error body leniently.
    ///
    /// Anything that is not the expected JSON shape yields an empty envelope.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

/// One field level validation error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field. Empty when the server sent none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field: String,

    /// Human-readable problem.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,

    /// Machine-readable code (e.g., `missing_field`, `invalid_value`).
    #[serde(default)]
    pub code: Option<String>,
}

impl FieldError {
    /// Formats as `"<field> field - <message>"`, or just the message when
    /// no field is named.
    pub fn describe(&self) -> String {
        if self.field.is_empty() {
            return self.message.clone();
        }
        format!("{} field - {}", self.field, self.message)
    }
}

/// Reads a string that the server may send as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Maps a numeric priority to its display name.
pub fn priority_name(priority: Option<u8>) -> &'static str {
    match priority {
        Some(1) => "Low",
        Some(2) => "Medium",
        Some(3) => "High",
        Some(4) => "Urgent",
        _ => "Unknown",
    }
}
