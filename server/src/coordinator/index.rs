use std::collections::HashMap;

use cad_shared::{Broadcast, Incident, Officer, Patrol, Resource, ResourceStatus, SyncSnapshot};

/// Ordered entity lists plus keyed lookups, always rebuilt together from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    incidents: Vec<Incident>,
    resources: Vec<Resource>,
    officers: Vec<Officer>,
    patrols: Vec<Patrol>,
    broadcasts: Vec<Broadcast>,
    incidents_by_id: HashMap<String, Incident>,
    resources_by_callsign: HashMap<String, Resource>,
    officers_by_payroll_id: HashMap<String, Officer>,
    patrols_by_id: HashMap<String, Patrol>,
    broadcasts_by_id: HashMap<String, Broadcast>,
}

impl SnapshotIndex {
    /// `current_officer` is injected into the officer lookup when the snapshot lacks it.
    pub fn build(snapshot: &SyncSnapshot, current_officer: Option<&Officer>) -> Self {
        let mut index = Self {
            incidents: snapshot.incidents.clone(),
            resources: snapshot.resources.clone(),
            officers: snapshot.officers.clone(),
            patrols: snapshot.patrols.clone(),
            broadcasts: snapshot.broadcasts.clone(),
            incidents_by_id: keyed(&snapshot.incidents, |i| &i.incident_number),
            resources_by_callsign: keyed(&snapshot.resources, |r| &r.callsign),
            officers_by_payroll_id: keyed(&snapshot.officers, |o| &o.payroll_id),
            patrols_by_id: keyed(&snapshot.patrols, |p| &p.identifier),
            broadcasts_by_id: keyed(&snapshot.broadcasts, |b| &b.identifier),
        };
        if let Some(officer) = current_officer {
            index.ensure_officer(officer);
        }
        index
    }

    pub fn ensure_officer(&mut self, officer: &Officer) {
        self.officers_by_payroll_id
            .entry(officer.payroll_id.clone())
            .or_insert_with(|| officer.clone());
    }

    /// The lists as a snapshot, local changes included.
    pub fn to_snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            incidents: self.incidents.clone(),
            resources: self.resources.clone(),
            officers: self.officers.clone(),
            patrols: self.patrols.clone(),
            broadcasts: self.broadcasts.clone(),
        }
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn officers(&self) -> &[Officer] {
        &self.officers
    }

    pub fn patrols(&self) -> &[Patrol] {
        &self.patrols
    }

    pub fn broadcasts(&self) -> &[Broadcast] {
        &self.broadcasts
    }

    pub fn incident(&self, incident_number: &str) -> Option<&Incident> {
        self.incidents_by_id.get(incident_number)
    }

    pub fn resource(&self, callsign: &str) -> Option<&Resource> {
        self.resources_by_callsign.get(callsign)
    }

    pub fn officer(&self, payroll_id: &str) -> Option<&Officer> {
        self.officers_by_payroll_id.get(payroll_id)
    }

    pub fn patrol(&self, identifier: &str) -> Option<&Patrol> {
        self.patrols_by_id.get(identifier)
    }

    pub fn broadcast(&self, identifier: &str) -> Option<&Broadcast> {
        self.broadcasts_by_id.get(identifier)
    }

    pub fn incident_for_resource(&self, callsign: &str) -> Option<&Incident> {
        let incident_number = self.resource(callsign)?.current_incident.as_deref()?;
        self.incident(incident_number)
    }

    /// Resources assigned to the incident, in list order.
    pub fn resources_for_incident(&self, incident_number: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|resource| resource.is_assigned_to(incident_number))
            .collect()
    }

    /// Officers on the callsign in payroll-id order; unknown ids are skipped.
    pub fn officers_for_resource(&self, callsign: &str) -> Vec<&Officer> {
        let Some(resource) = self.resource(callsign) else {
            return Vec::new();
        };
        resource
            .payroll_ids
            .iter()
            .filter_map(|payroll_id| self.officer(payroll_id))
            .collect()
    }

    /// Applies `update` to the resource in both the list and the lookup.
    pub fn update_resource<F>(&mut self, callsign: &str, update: F) -> Option<&Resource>
    where
        F: FnOnce(&mut Resource),
    {
        let position = self
            .resources
            .iter()
            .position(|resource| resource.callsign == callsign)?;
        let resource = &mut self.resources[position];
        update(resource);
        self.resources_by_callsign
            .insert(callsign.to_string(), resource.clone());
        self.resources_by_callsign.get(callsign)
    }

    pub fn move_resource_to_front(&mut self, callsign: &str) {
        if let Some(position) = self
            .resources
            .iter()
            .position(|resource| resource.callsign == callsign)
        {
            let resource = self.resources.remove(position);
            self.resources.insert(0, resource);
        }
    }

    /// Local status transition for `callsign`, ahead of the next sync.
    ///
    /// Finalise clears the incident and lands on `OnAir`. Leaving an incident-bound
    /// status for a general one clears the incident. A supplied incident is only
    /// taken when the resource has none, and moves the resource to the front so
    /// first-assigned lookups resolve to it.
    pub fn apply_status_change(
        &mut self,
        callsign: &str,
        status: ResourceStatus,
        incident: Option<String>,
    ) -> Option<&Resource> {
        let previous = self.resource(callsign)?.status;

        let (status, incident, clear_incident) = if status == ResourceStatus::Finalise {
            (ResourceStatus::OnAir, None, true)
        } else {
            let leaving_incident = previous.is_incident_bound() && status.is_general();
            (status, incident, leaving_incident)
        };

        let mut assigned = false;
        self.update_resource(callsign, |resource| {
            if clear_incident && let Some(current) = resource.current_incident.take() {
                resource.assigned_incidents.retain(|id| *id != current);
            }
            resource.status = status;
            if let Some(incident) = incident
                && resource.current_incident.is_none()
            {
                if !resource.is_assigned_to(&incident) {
                    resource.assigned_incidents.push(incident.clone());
                }
                resource.current_incident = Some(incident);
                assigned = true;
            }
        })?;

        if assigned {
            self.move_resource_to_front(callsign);
        }
        self.resource(callsign)
    }
}

fn keyed<T: Clone>(items: &[T], key: impl Fn(&T) -> &String) -> HashMap<String, T> {
    items
        .iter()
        .map(|item| (key(item).clone(), item.clone()))
        .collect()
}
