use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A callsign and its current assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub callsign: String,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default)]
    pub assigned_incidents: Vec<String>,
    #[serde(default)]
    pub payroll_ids: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub current_incident: Option<String>,
    #[serde(default)]
    pub patrol_group: Option<String>,
    #[serde(default)]
    pub shift_end: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(callsign: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
            status: ResourceStatus::default(),
            assigned_incidents: Vec::new(),
            payroll_ids: Vec::new(),
            equipment: Vec::new(),
            current_incident: None,
            patrol_group: None,
            shift_end: None,
        }
    }

    pub fn is_assigned_to(&self, incident_number: &str) -> bool {
        self.assigned_incidents.iter().any(|id| id == incident_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub description: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Unavailable,
    OnAir,
    MealBreak,
    TrafficStop,
    Court,
    AtStation,
    OnCall,
    Inquiries,
    Busy,
    Proceeding,
    AtIncident,
    Finalise,
    #[default]
    OffDuty,
}

impl ResourceStatus {
    pub const ALL: [ResourceStatus; 13] = [
        ResourceStatus::Unavailable,
        ResourceStatus::OnAir,
        ResourceStatus::MealBreak,
        ResourceStatus::TrafficStop,
        ResourceStatus::Court,
        ResourceStatus::AtStation,
        ResourceStatus::OnCall,
        ResourceStatus::Inquiries,
        ResourceStatus::Busy,
        ResourceStatus::Proceeding,
        ResourceStatus::AtIncident,
        ResourceStatus::Finalise,
        ResourceStatus::OffDuty,
    ];

    /// Statuses that only make sense while attached to an incident.
    pub const fn is_incident_bound(self) -> bool {
        matches!(
            self,
            ResourceStatus::Busy
                | ResourceStatus::Proceeding
                | ResourceStatus::AtIncident
                | ResourceStatus::Finalise
        )
    }

    pub const fn is_general(self) -> bool {
        !self.is_incident_bound()
    }
}
