//! Normalized integration item shared by every provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resource discovered in a connected account (a Notion page, an Airtable
/// table, a HubSpot company, ...).
///
/// `None` means the provider did not tell us, not that the value is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationItem {
    /// Provider-scoped identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Type tag (e.g. "page", "Base", "Company").
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,

    /// Whether the item can contain other items.
    #[serde(default)]
    pub directory: bool,

    /// Display name or path of the parent.
    #[serde(default)]
    pub parent_path_or_name: Option<String>,

    /// Identifier of the parent item.
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Creation timestamp.
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,

    /// Last modification timestamp.
    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,

    /// Link to the item in the provider's UI.
    #[serde(default)]
    pub url: Option<String>,

    /// Identifiers of child items.
    #[serde(default)]
    pub children: Option<Vec<String>>,

    /// MIME type for file-like items.
    #[serde(default)]
    pub mime_type: Option<String>,

    /// Provider delta or version token.
    #[serde(default)]
    pub delta: Option<String>,

    /// Drive identifier for drive-backed providers.
    #[serde(default)]
    pub drive_id: Option<String>,

    /// False for archived or hidden items.
    #[serde(default = "default_visibility")]
    pub visibility: bool,
}

const fn default_visibility() -> bool {
    true
}

impl Default for IntegrationItem {
    fn default() -> Self {
        Self {
            id: None,
            item_type: None,
            directory: false,
            parent_path_or_name: None,
            parent_id: None,
            name: None,
            creation_time: None,
            last_modified_time: None,
            url: None,
            children: None,
            mime_type: None,
            delta: None,
            drive_id: None,
            visibility: true,
        }
    }
}
