//! Release models.

use serde::{Deserialize, Serialize};

use super::priority_name;

/// A release (planned rollout of changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Unique release ID.
    pub id: u64,

    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,

    /// Plain text description.
    #[serde(default)]
    pub description_text: Option<String>,

    /// Status code (1 Open, 2 On hold, 3 In progress, 4 Incomplete, 5 Completed).
    #[serde(default)]
    pub status: Option<u8>,

    /// Priority code (1 Low .. 4 Urgent).
    #[serde(default)]
    pub priority: Option<u8>,

    /// Type code (1 Minor, 2 Standard, 3 Major, 4 Emergency).
    #[serde(default)]
    pub release_type: Option<u8>,

    /// Owning agent.
    #[serde(default)]
    pub agent_id: Option<u64>,

    /// Owning group.
    #[serde(default)]
    pub group_id: Option<u64>,

    /// Planned start (ISO 8601).
    #[serde(default)]
    pub planned_start_date: Option<String>,

    /// Planned end (ISO 8601).
    #[serde(default)]
    pub planned_end_date: Option<String>,

    /// Creation time (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update time (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Release {
    /// Returns the status name.
    pub fn display_status(&self) -> &'static str {
        match self.status {
            Some(1) => "Open",
            Some(2) => "On hold",
            Some(3) => "In progress",
            Some(4) => "Incomplete",
            Some(5) => "Completed",
            _ => "Unknown",
        }
    }

    /// Returns the release type name.
    pub fn display_type(&self) -> &'static str {
        match self.release_type {
            Some(1) => "Minor",
            Some(2) => "Standard",
            Some(3) => "Major",
            Some(4) => "Emergency",
            _ => "Unknown",
        }
    }

    /// Returns the priority name.
    pub fn display_priority(&self) -> &'static str {
        priority_name(self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_release() {
        let release: Release = serde_json::from_str(
            r#"{"id": 3, "subject": "Q3 rollout", "status": 3, "priority": 2, "release_type": 4}"#,
        )
        .unwrap();
        assert_eq!(release.display_status(), "In progress");
        assert_eq!(release.display_type(), "Emergency");
        assert_eq!(release.display_priority(), "Medium");
    }
}
