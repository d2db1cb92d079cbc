//! Onboarding and offboarding request models.
//!
//! The form fields behind these requests are account specific, so anything
//! beyond the common header is kept as raw JSON.

use serde::{Deserialize, Serialize};

/// An employee onboarding or offboarding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingRequest {
    /// Unique ID.
    pub id: u64,

    /// Workflow status (e.g., `In Progress`, `Completed`).
    #[serde(default)]
    pub status: Option<String>,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// Who raised the request.
    #[serde(default)]
    pub requester_id: Option<u64>,

    /// Creation time (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update time (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Everything else the account's form defines.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}
