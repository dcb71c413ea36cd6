use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::{Equipment, ResourceStatus};

/// The locally active shift. At most one exists at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookOnRequest {
    pub callsign: String,
    /// Payroll ids of every officer on the callsign, the logged-in officer included.
    #[serde(default)]
    pub officers: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub remarks: Option<String>,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
}

impl BookOnRequest {
    pub fn includes_officer(&self, payroll_id: &str) -> bool {
        self.officers.iter().any(|id| id == payroll_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookOffRequest {
    pub callsign: String,
}

/// Payload of a callsign status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ResourceStatus,
    #[serde(default)]
    pub incident: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub location_comments: Option<String>,
}
