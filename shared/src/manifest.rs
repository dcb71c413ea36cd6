use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of reference data (equipment kinds, capabilities, patrol groups).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Orders entries for display: `sort_order`, then title.
pub fn sort_entries(entries: &mut [ManifestEntry]) {
    entries.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.title.cmp(&b.title))
    });
}
