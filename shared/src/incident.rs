use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_number: String,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default)]
    pub grade: IncidentGrade,
    #[serde(default)]
    pub incident_type: Option<String>,
    #[serde(default)]
    pub location: Option<IncidentLocation>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLocation {
    pub address: String,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Unresourced,
    Resourced,
    Assigned,
    Current,
}

/// Response priority, P1 being the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentGrade {
    P1,
    P2,
    #[default]
    P3,
    P4,
}
