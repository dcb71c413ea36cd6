//! Scripted in-process dispatch API for coordinator and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cad_shared::{
    BookOffRequest, BookOnRequest, BoundingBox, ManifestEntry, Officer, StatusUpdate, SyncSnapshot,
};
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use crate::api_client::{ApiFuture, DispatchApi};
use crate::coordinator::SyncCoordinator;
use crate::error::ApiError;
use crate::manifest_store::MemoryManifestStore;
use crate::state::AppState;

/// App state over a fresh fake API and an in-memory manifest store.
pub(crate) fn test_state() -> (AppState, Arc<FakeDispatchApi>) {
    let api = FakeDispatchApi::new();
    let coordinator = SyncCoordinator::new(api.clone(), Arc::new(MemoryManifestStore::new()), 64);
    (AppState::new(coordinator, None), api)
}

pub(crate) fn officer_fixture(payroll_id: &str) -> Officer {
    serde_json::from_value(serde_json::json!({
        "payroll_id": payroll_id,
        "given_name": "Jane",
        "family_name": "Citizen",
    }))
    .expect("officer fixture")
}

pub(crate) async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

#[derive(Default)]
pub(crate) struct FakeDispatchApi {
    responses: Mutex<VecDeque<Result<SyncSnapshot, ApiError>>>,
    shift_failure: Mutex<Option<ApiError>>,
    officer: Mutex<Option<Officer>>,
    manifest: Mutex<Vec<ManifestEntry>>,
    manifest_requests: Mutex<Vec<Option<DateTime<Utc>>>>,
    manifest_delay: Mutex<Option<Duration>>,
    bounds_requests: Mutex<Vec<BoundingBox>>,
    calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeDispatchApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Next sync answers with `snapshot`. Unscripted syncs return an empty snapshot.
    pub(crate) fn push_snapshot(&self, snapshot: SyncSnapshot) {
        self.lock_responses().push_back(Ok(snapshot));
    }

    pub(crate) fn push_failure(&self, error: ApiError) {
        self.lock_responses().push_back(Err(error));
    }

    pub(crate) fn fail_next_shift_call(&self, error: ApiError) {
        *self.shift_failure.lock().expect("fake lock") = Some(error);
    }

    pub(crate) fn set_officer(&self, officer: Officer) {
        *self.officer.lock().expect("fake lock") = Some(officer);
    }

    pub(crate) fn set_manifest(&self, entries: Vec<ManifestEntry>) {
        *self.manifest.lock().expect("fake lock") = entries;
    }

    /// Manifest fetches take at least `delay`.
    pub(crate) fn delay_manifest(&self, delay: Duration) {
        *self.manifest_delay.lock().expect("fake lock") = Some(delay);
    }

    /// From now on each sync blocks until the returned semaphore gets a permit.
    pub(crate) fn hold_syncs(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().expect("fake lock") = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("fake lock").clone()
    }

    pub(crate) fn manifest_requests(&self) -> Vec<Option<DateTime<Utc>>> {
        self.manifest_requests.lock().expect("fake lock").clone()
    }

    pub(crate) fn bounds_requests(&self) -> Vec<BoundingBox> {
        self.bounds_requests.lock().expect("fake lock").clone()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("fake lock").push(call);
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<SyncSnapshot, ApiError>>> {
        self.responses.lock().expect("fake lock")
    }

    fn snapshot_call(&self, call: String) -> ApiFuture<'_, SyncSnapshot> {
        Box::pin(async move {
            self.record(call);
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

            let gate = self.gate.lock().expect("fake lock").clone();
            if let Some(gate) = gate
                && let Ok(permit) = gate.acquire().await
            {
                permit.forget();
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let response = self.lock_responses().pop_front();
            response.unwrap_or_else(|| Ok(SyncSnapshot::default()))
        })
    }

    fn shift_call(&self, call: String) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            self.record(call);
            let failure = self.shift_failure.lock().expect("fake lock").take();
            match failure {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }
}

impl DispatchApi for FakeDispatchApi {
    fn sync_patrol_group<'a>(&'a self, patrol_group: &'a str) -> ApiFuture<'a, SyncSnapshot> {
        self.snapshot_call(format!("patrol_group:{patrol_group}"))
    }

    fn sync_bounding_box(&self, bounds: BoundingBox) -> ApiFuture<'_, SyncSnapshot> {
        self.bounds_requests.lock().expect("fake lock").push(bounds);
        self.snapshot_call("bounding_box".to_string())
    }

    fn book_on<'a>(&'a self, request: &'a BookOnRequest) -> ApiFuture<'a, ()> {
        self.shift_call(format!("book_on:{}", request.callsign))
    }

    fn book_off<'a>(&'a self, request: &'a BookOffRequest) -> ApiFuture<'a, ()> {
        self.shift_call(format!("book_off:{}", request.callsign))
    }

    fn update_resource_status<'a>(
        &'a self,
        callsign: &'a str,
        update: &'a StatusUpdate,
    ) -> ApiFuture<'a, ()> {
        self.shift_call(format!("status:{callsign}:{:?}", update.status))
    }

    fn fetch_current_officer(&self) -> ApiFuture<'_, Officer> {
        Box::pin(async move {
            self.record("officer_details".to_string());
            let officer = self.officer.lock().expect("fake lock").clone();
            officer.ok_or(ApiError::Status {
                status: 404,
                preview: "no officer".to_string(),
            })
        })
    }

    fn fetch_manifest<'a>(
        &'a self,
        last_updated: Option<DateTime<Utc>>,
        _categories: Option<&'a [String]>,
    ) -> ApiFuture<'a, Vec<ManifestEntry>> {
        Box::pin(async move {
            self.record("manifest".to_string());
            self.manifest_requests
                .lock()
                .expect("fake lock")
                .push(last_updated);
            let delay = *self.manifest_delay.lock().expect("fake lock");
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let entries = self.manifest.lock().expect("fake lock").clone();
            Ok(entries)
        })
    }
}
