//! Client-side cache of dispatch state.
//!
//! [`SyncCoordinator`] holds the last synced [`SyncSnapshot`], serializes sync
//! operations so only one fetch is in flight, applies local shift and status
//! changes ahead of the next sync, and publishes a [`CoordinatorEvent`] for
//! every change. All mutable state lives behind one `RwLock`; the separate
//! sync gate is a FIFO mutex, so queued syncs run in request order and each
//! re-reads the sync mode when it starts.

mod index;
mod shift_reminder;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use cad_shared::{
    BookOffRequest, BookOnRequest, BoundingBox, Broadcast, CoordinatorEvent, Incident,
    ManifestEntry, Officer, Patrol, Resource, ResourceStatus, StatusUpdate, SyncMode,
    SyncSnapshot,
};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::api_client::DispatchApi;
use crate::error::SyncError;
use crate::manifest_store::ManifestStore;

use index::SnapshotIndex;
use shift_reminder::ShiftReminder;

#[derive(Debug, Default)]
struct CoordinatorState {
    sync_mode: SyncMode,
    book_on: Option<BookOnRequest>,
    current_officer: Option<Officer>,
    last_snapshot: Option<Arc<SyncSnapshot>>,
    last_sync_time: Option<DateTime<Utc>>,
    last_manifest_sync_time: Option<DateTime<Utc>>,
    /// Bounds of the last successful map sync; the throttle compares against these.
    last_synced_bounds: Option<BoundingBox>,
    index: SnapshotIndex,
}

struct Inner {
    api: Arc<dyn DispatchApi>,
    manifest: Arc<dyn ManifestStore>,
    state: RwLock<CoordinatorState>,
    sync_gate: Mutex<()>,
    event_tx: broadcast::Sender<CoordinatorEvent>,
    next_seq: AtomicU64,
    shift_reminder: ShiftReminder,
}

impl Inner {
    fn publish(&self, build: impl FnOnce(u64) -> CoordinatorEvent) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        // No subscribers is fine.
        let _ = self.event_tx.send(build(seq));
    }
}

/// Cheap to clone; every clone drives the same state.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(
        api: Arc<dyn DispatchApi>,
        manifest: Arc<dyn ManifestStore>,
        event_buffer: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                api,
                manifest,
                state: RwLock::new(CoordinatorState::default()),
                sync_gate: Mutex::new(()),
                event_tx,
                next_seq: AtomicU64::new(0),
                shift_reminder: ShiftReminder::default(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.event_tx.receiver_count()
    }

    /// Sequence number of the most recently published event.
    pub fn seq(&self) -> u64 {
        self.inner.next_seq.load(Ordering::Relaxed)
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.sync_gate.try_lock().is_err()
    }

    pub async fn sync_mode(&self) -> SyncMode {
        self.inner.state.read().await.sync_mode.clone()
    }

    pub async fn current_book_on(&self) -> Option<BookOnRequest> {
        self.inner.state.read().await.book_on.clone()
    }

    pub async fn current_officer(&self) -> Option<Officer> {
        self.inner.state.read().await.current_officer.clone()
    }

    pub async fn last_snapshot(&self) -> Option<Arc<SyncSnapshot>> {
        self.inner.state.read().await.last_snapshot.clone()
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_sync_time
    }

    pub async fn last_manifest_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().await.last_manifest_sync_time
    }

    /// Cached entity lists with local shift and status changes applied.
    pub async fn current_snapshot(&self) -> SyncSnapshot {
        self.inner.state.read().await.index.to_snapshot()
    }

    pub async fn incidents(&self) -> Vec<Incident> {
        self.inner.state.read().await.index.incidents().to_vec()
    }

    pub async fn resources(&self) -> Vec<Resource> {
        self.inner.state.read().await.index.resources().to_vec()
    }

    pub async fn officers(&self) -> Vec<Officer> {
        self.inner.state.read().await.index.officers().to_vec()
    }

    pub async fn patrols(&self) -> Vec<Patrol> {
        self.inner.state.read().await.index.patrols().to_vec()
    }

    pub async fn broadcasts(&self) -> Vec<Broadcast> {
        self.inner.state.read().await.index.broadcasts().to_vec()
    }

    pub async fn incident(&self, incident_number: &str) -> Option<Incident> {
        self.inner
            .state
            .read()
            .await
            .index
            .incident(incident_number)
            .cloned()
    }

    pub async fn resource(&self, callsign: &str) -> Option<Resource> {
        self.inner.state.read().await.index.resource(callsign).cloned()
    }

    pub async fn officer(&self, payroll_id: &str) -> Option<Officer> {
        self.inner.state.read().await.index.officer(payroll_id).cloned()
    }

    pub async fn patrol(&self, identifier: &str) -> Option<Patrol> {
        self.inner.state.read().await.index.patrol(identifier).cloned()
    }

    pub async fn broadcast(&self, identifier: &str) -> Option<Broadcast> {
        self.inner
            .state
            .read()
            .await
            .index
            .broadcast(identifier)
            .cloned()
    }

    /// The resource for the active book-on callsign.
    pub async fn current_resource(&self) -> Option<Resource> {
        let state = self.inner.state.read().await;
        let callsign = &state.book_on.as_ref()?.callsign;
        state.index.resource(callsign).cloned()
    }

    pub async fn current_incident(&self) -> Option<Incident> {
        let state = self.inner.state.read().await;
        let callsign = &state.book_on.as_ref()?.callsign;
        state.index.incident_for_resource(callsign).cloned()
    }

    pub async fn incident_for_resource(&self, callsign: &str) -> Option<Incident> {
        self.inner
            .state
            .read()
            .await
            .index
            .incident_for_resource(callsign)
            .cloned()
    }

    pub async fn resources_for_incident(&self, incident_number: &str) -> Vec<Resource> {
        self.inner
            .state
            .read()
            .await
            .index
            .resources_for_incident(incident_number)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn officers_for_resource(&self, callsign: &str) -> Vec<Officer> {
        self.inner
            .state
            .read()
            .await
            .index
            .officers_for_resource(callsign)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Logs an officer in (or out with `None`). The officer stays resolvable by payroll id.
    pub async fn set_current_officer(&self, officer: Option<Officer>) {
        let mut state = self.inner.state.write().await;
        if let Some(officer) = &officer {
            state.index.ensure_officer(officer);
        }
        state.current_officer = officer;
    }

    pub async fn fetch_current_officer(&self) -> Result<Officer, SyncError> {
        let officer = self.inner.api.fetch_current_officer().await?;
        info!(payroll_id = %officer.payroll_id, "fetched current officer details");
        self.set_current_officer(Some(officer.clone())).await;
        Ok(officer)
    }

    /// Stores a mode without syncing; the next sync uses it.
    pub async fn restore_sync_mode(&self, mode: SyncMode) {
        self.inner.state.write().await.sync_mode = mode;
    }

    /// Stores the mode and resyncs, unless nothing changed or the map is still
    /// close to the bounds of the last map sync.
    pub async fn set_sync_mode(&self, mode: SyncMode) -> Result<(), SyncError> {
        let minor = {
            let mut state = self.inner.state.write().await;
            if state.sync_mode == mode {
                return Ok(());
            }
            state.sync_mode = mode.clone();
            match (state.last_synced_bounds, mode.bounds()) {
                (Some(synced), Some(next)) => synced.is_minor_change(next),
                _ => false,
            }
        };

        if minor {
            debug!("map bounds moved below threshold; keeping current snapshot");
            return Ok(());
        }

        self.sync_details(true).await
    }

    /// Fetches a snapshot for the current sync mode and replaces the cache.
    ///
    /// Calls made while a sync is running wait for it and then perform their own
    /// sync with whatever mode is current at that point.
    pub async fn sync_details(&self, force: bool) -> Result<(), SyncError> {
        let _gate = self.inner.sync_gate.lock().await;

        let (mode, last_bounds) = {
            let state = self.inner.state.read().await;
            (state.sync_mode.clone(), state.last_synced_bounds)
        };

        let snapshot = match &mode {
            SyncMode::None => return Ok(()),
            SyncMode::PatrolGroup { name } => self.inner.api.sync_patrol_group(name).await?,
            SyncMode::Map { bounds } => {
                if !force
                    && let Some(previous) = last_bounds
                    && previous.is_minor_change(bounds)
                {
                    debug!("map bounds within throttle threshold; sync skipped");
                    return Ok(());
                }
                self.inner.api.sync_bounding_box(*bounds).await?
            }
        };

        self.apply_snapshot(snapshot, mode.bounds().copied()).await;
        Ok(())
    }

    async fn apply_snapshot(&self, snapshot: SyncSnapshot, bounds: Option<BoundingBox>) {
        let snapshot = Arc::new(snapshot);
        let synced_at = Utc::now();
        let index_counts = {
            let mut state = self.inner.state.write().await;
            state.index = SnapshotIndex::build(&snapshot, state.current_officer.as_ref());
            state.last_snapshot = Some(Arc::clone(&snapshot));
            state.last_sync_time = Some(synced_at);
            state.last_synced_bounds = bounds;
            (
                state.index.incidents().len(),
                state.index.resources().len(),
                state.index.officers().len(),
            )
        };
        let (incidents, resources, officers) = index_counts;

        info!(incidents, resources, officers, "dispatch snapshot synced");
        self.inner
            .publish(|seq| CoordinatorEvent::SyncChanged {
                seq,
                synced_at,
                incidents,
                resources,
                officers,
            });
    }

    /// Pulls reference data changed since the store's last check.
    pub async fn sync_manifest(&self, categories: Option<Vec<String>>) -> Result<usize, SyncError> {
        let last_updated = self.inner.manifest.last_update_date().await?;
        // Must predate the fetch; upstream changes made while it is in flight belong to the next delta.
        let checked_at = Utc::now();
        let entries = self
            .inner
            .api
            .fetch_manifest(last_updated, categories.as_deref())
            .await?;
        let count = entries.len();
        self.inner.manifest.save(entries, checked_at).await?;

        self.inner.state.write().await.last_manifest_sync_time = Some(checked_at);
        info!(entries = count, "manifest synced");
        self.inner
            .publish(|seq| CoordinatorEvent::ManifestChanged {
                seq,
                checked_at,
                entries: count,
            });
        Ok(count)
    }

    pub async fn manifest_entries(&self, category: &str) -> Result<Vec<ManifestEntry>, SyncError> {
        Ok(self.inner.manifest.entries(category).await?)
    }

    /// Reference data, officer identity, then dispatch state.
    pub async fn sync_initial(&self) -> Result<(), SyncError> {
        self.sync_manifest(None).await?;
        self.fetch_current_officer().await?;
        self.sync_details(true).await
    }

    /// Starts a shift on a callsign.
    ///
    /// If the logged-in officer is not among the request's officers, the book-on
    /// is cleared again right after, on a separate task.
    pub async fn book_on(&self, request: BookOnRequest) -> Result<(), SyncError> {
        let officer = self
            .current_officer()
            .await
            .ok_or(SyncError::NotLoggedIn)?;

        self.inner.api.book_on(&request).await?;

        {
            let mut state = self.inner.state.write().await;
            let updated = state.index.update_resource(&request.callsign, |resource| {
                resource.payroll_ids = request.officers.clone();
                resource.equipment = request.equipment.clone();
                resource.shift_end = Some(request.shift_end);
                if resource.status == ResourceStatus::OffDuty {
                    resource.status = ResourceStatus::OnAir;
                }
            });
            if updated.is_none() {
                warn!(callsign = %request.callsign, "booked on to a callsign missing from the last snapshot");
            }
            info!(callsign = %request.callsign, officers = request.officers.len(), "booked on");
            self.store_book_on(&mut state, Some(request.clone()));
        }

        if !request.includes_officer(&officer.payroll_id) {
            info!(payroll_id = %officer.payroll_id, "logged-in officer left the callsign; booking off locally");
            let coordinator = self.clone();
            tokio::spawn(async move {
                let mut state = coordinator.inner.state.write().await;
                // A newer book-on replaced this one in the meantime.
                if state.book_on.as_ref() != Some(&request) {
                    return;
                }
                coordinator.store_book_on(&mut state, None);
            });
        }

        Ok(())
    }

    pub async fn book_off(&self) -> Result<(), SyncError> {
        let callsign = self
            .current_book_on()
            .await
            .map(|book_on| book_on.callsign)
            .ok_or(SyncError::NotBookedOn)?;

        let request = BookOffRequest {
            callsign: callsign.clone(),
        };
        self.inner.api.book_off(&request).await?;

        let mut state = self.inner.state.write().await;
        state.index.update_resource(&callsign, |resource| {
            resource.status = ResourceStatus::OffDuty;
        });
        info!(%callsign, "booked off");
        self.store_book_on(&mut state, None);
        Ok(())
    }

    /// Sends a status change for the booked-on callsign and applies it locally.
    pub async fn update_callsign_status(
        &self,
        status: ResourceStatus,
        incident: Option<String>,
        comments: Option<String>,
        location_comments: Option<String>,
    ) -> Result<(), SyncError> {
        let callsign = self
            .current_book_on()
            .await
            .map(|book_on| book_on.callsign)
            .ok_or(SyncError::NotBookedOn)?;

        let update = StatusUpdate {
            status,
            incident,
            comments,
            location_comments,
        };
        self.inner
            .api
            .update_resource_status(&callsign, &update)
            .await?;

        let applied = {
            let mut state = self.inner.state.write().await;
            state
                .index
                .apply_status_change(&callsign, update.status, update.incident)
                .map(|resource| (resource.status, resource.current_incident.clone()))
        };

        let (status, current_incident) = match applied {
            Some(applied) => applied,
            None => {
                warn!(%callsign, "status sent for a callsign missing from the last snapshot");
                (update.status, None)
            }
        };
        info!(%callsign, ?status, ?current_incident, "callsign status updated");
        self.inner
            .publish(|seq| CoordinatorEvent::CallsignChanged {
                seq,
                callsign,
                status,
                current_incident,
            });
        Ok(())
    }

    /// Logs out: drops the shift, the officer identity and all cached dispatch state.
    pub async fn clear_session(&self) {
        let mut state = self.inner.state.write().await;
        self.store_book_on(&mut state, None);
        let last_manifest_sync_time = state.last_manifest_sync_time;
        *state = CoordinatorState {
            last_manifest_sync_time,
            ..CoordinatorState::default()
        };
        info!("session cleared");
    }

    /// Swaps the active shift and re-arms its reminder under the caller's write guard.
    fn store_book_on(&self, state: &mut CoordinatorState, book_on: Option<BookOnRequest>) {
        if state.book_on.is_none() && book_on.is_none() {
            return;
        }
        state.book_on = book_on.clone();

        match &book_on {
            Some(request) => {
                let weak = Arc::downgrade(&self.inner);
                let callsign = request.callsign.clone();
                let shift_end = request.shift_end;
                self.inner.shift_reminder.schedule(shift_end, move || {
                    notify_shift_ending(&weak, callsign, shift_end);
                });
            }
            None => self.inner.shift_reminder.cancel(),
        }

        self.inner
            .publish(|seq| CoordinatorEvent::BookOnChanged { seq, book_on });
    }
}

fn notify_shift_ending(inner: &Weak<Inner>, callsign: String, shift_end: DateTime<Utc>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    info!(%callsign, %shift_end, "shift ending");
    inner.publish(|seq| CoordinatorEvent::ShiftEnding {
        seq,
        callsign,
        shift_end,
    });
}
