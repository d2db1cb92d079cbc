//! Ticket models.
//!
//! Tickets are the incidents and service requests raised by requesters.
//! Status, priority and source travel as small integers on the wire.

use serde::{Deserialize, Serialize};

use super::priority_name;

/// A ticket as returned by list and get calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket ID.
    pub id: u64,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// Plain text description.
    #[serde(default)]
    pub description_text: Option<String>,

    /// Status code (2 Open, 3 Pending, 4 Resolved, 5 Closed).
    #[serde(default)]
    pub status: Option<u8>,

    /// Priority code (1 Low .. 4 Urgent).
    #[serde(default)]
    pub priority: Option<u8>,

    /// Channel the ticket came in through.
    #[serde(default)]
    pub source: Option<u8>,

    /// `Incident` or `Service Request`.
    #[serde(default, rename = "type")]
    pub ticket_type: Option<String>,

    /// Requester ID.
    #[serde(default)]
    pub requester_id: Option<u64>,

    /// Assigned agent ID.
    #[serde(default)]
    pub responder_id: Option<u64>,

    /// Assigned group ID.
    #[serde(default)]
    pub group_id: Option<u64>,

    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Due date (ISO 8601).
    #[serde(default)]
    pub due_by: Option<String>,

    /// Creation time (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update time (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,

    /// Account specific fields.
    #[serde(default)]
    pub custom_fields: Option<serde_json::Value>,
}

impl Ticket {
    /// Returns the subject or a placeholder.
    pub fn display_subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("(No subject)")
    }

    /// Returns the status name.
    pub fn display_status(&self) -> &'static str {
        match self.status {
            Some(2) => "Open",
            Some(3) => "Pending",
            Some(4) => "Resolved",
            Some(5) => "Closed",
            _ => "Unknown",
        }
    }

    /// Returns the priority name.
    pub fn display_priority(&self) -> &'static str {
        priority_name(self.priority)
    }

    /// Returns true for resolved or closed tickets.
    pub fn is_closed(&self) -> bool {
        matches!(self.status, Some(4) | Some(5))
    }
}
