//! Canned response models.

use serde::{Deserialize, Serialize};

/// A reusable reply template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannedResponse {
    /// Unique ID.
    pub id: u64,

    /// Title shown to agents.
    #[serde(default)]
    pub title: Option<String>,

    /// Plain text body.
    #[serde(default)]
    pub content: Option<String>,

    /// HTML body.
    #[serde(default)]
    pub content_html: Option<String>,

    /// Containing folder.
    #[serde(default)]
    pub folder_id: Option<u64>,

    /// Creation time (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update time (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl CannedResponse {
    /// Returns the title or a placeholder.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}

/// A folder grouping canned responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannedResponseFolder {
    /// Unique ID.
    pub id: u64,

    /// Folder name.
    #[serde(default)]
    pub name: Option<String>,

    /// Number of responses inside.
    #[serde(default)]
    pub responses_count: Option<u64>,
}
