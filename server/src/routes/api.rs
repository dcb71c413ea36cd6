use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cad_shared::{
    BookOnRequest, Broadcast, Incident, ManifestEntry, Officer, Patrol, Resource, SyncMode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinator::SyncCoordinator;
use crate::error::SyncError;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const SNAPSHOT_CACHE_CONTROL: &str = "no-cache";

/// Local view of the logged-in session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub officer: Option<Officer>,
    pub book_on: Option<BookOnRequest>,
    pub current_resource: Option<Resource>,
    pub current_incident: Option<Incident>,
    pub sync_mode: SyncMode,
    pub syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub last_manifest_sync_time: Option<DateTime<Utc>>,
}

impl SessionView {
    pub async fn collect(coordinator: &SyncCoordinator) -> Self {
        Self {
            officer: coordinator.current_officer().await,
            book_on: coordinator.current_book_on().await,
            current_resource: coordinator.current_resource().await,
            current_incident: coordinator.current_incident().await,
            sync_mode: coordinator.sync_mode().await,
            syncing: coordinator.is_syncing(),
            last_sync_time: coordinator.last_sync_time().await,
            last_manifest_sync_time: coordinator.last_manifest_sync_time().await,
        }
    }
}

struct CacheGauges {
    incidents: usize,
    resources: usize,
    officers: usize,
    patrols: usize,
    broadcasts: usize,
    booked_on: bool,
    persistent_manifest: bool,
    event_subscribers: usize,
    last_sync_unix: Option<i64>,
}

impl CacheGauges {
    async fn collect(state: &AppState) -> Self {
        let coordinator = &state.coordinator;
        let snapshot = coordinator.current_snapshot().await;
        Self {
            incidents: snapshot.incidents.len(),
            resources: snapshot.resources.len(),
            officers: snapshot.officers.len(),
            patrols: snapshot.patrols.len(),
            broadcasts: snapshot.broadcasts.len(),
            booked_on: coordinator.current_book_on().await.is_some(),
            persistent_manifest: state.db.is_some(),
            event_subscribers: coordinator.subscriber_count(),
            last_sync_unix: coordinator.last_sync_time().await.map(|t| t.timestamp()),
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let gauges = CacheGauges::collect(&state).await;
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "incidents": gauges.incidents,
        "resources": gauges.resources,
        "officers": gauges.officers,
        "booked_on": gauges.booked_on,
        "syncing": state.coordinator.is_syncing(),
        "snapshot_cached": state.coordinator.last_snapshot().await.is_some(),
        "manifest_persistent": gauges.persistent_manifest,
        "event_seq": state.coordinator.seq(),
        "observability": {
            "snapshot_requests_total": observability.snapshot_requests_total,
            "sync_runs_total": observability.sync_runs_total,
            "sync_failures_total": observability.sync_failures_total,
            "manifest_runs_total": observability.manifest_runs_total,
            "manifest_failures_total": observability.manifest_failures_total,
            "command_failures_total": observability.command_failures_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let gauges = CacheGauges::collect(&state).await;
    let body = render_prometheus_metrics(&gauges, state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(gauges: &CacheGauges, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let entity_gauges = [
        ("cad_incidents", "Incidents in the cached snapshot.", gauges.incidents),
        ("cad_resources", "Resources in the cached snapshot.", gauges.resources),
        ("cad_officers", "Officers in the cached snapshot.", gauges.officers),
        ("cad_patrols", "Patrols in the cached snapshot.", gauges.patrols),
        ("cad_broadcasts", "Broadcasts in the cached snapshot.", gauges.broadcasts),
        (
            "cad_event_subscribers",
            "Open coordinator event subscriptions.",
            gauges.event_subscribers,
        ),
    ];
    for (name, help, value) in entity_gauges {
        push_metric(&mut body, name, "gauge", help, value);
    }

    push_metric(
        &mut body,
        "cad_booked_on",
        "gauge",
        "Whether a shift is active (1 or 0).",
        u8::from(gauges.booked_on),
    );
    push_metric(
        &mut body,
        "cad_manifest_persistent",
        "gauge",
        "Whether the manifest store is backed by PostgreSQL (1 or 0).",
        u8::from(gauges.persistent_manifest),
    );
    if let Some(last_sync) = gauges.last_sync_unix {
        push_metric(
            &mut body,
            "cad_last_sync_timestamp_seconds",
            "gauge",
            "Unix time of the last successful dispatch sync.",
            last_sync,
        );
    }

    let counters = [
        (
            "cad_snapshot_requests_total",
            "Total /api/snapshot requests.",
            observability.snapshot_requests_total,
        ),
        (
            "cad_sync_runs_total",
            "Total dispatch sync attempts.",
            observability.sync_runs_total,
        ),
        (
            "cad_sync_failures_total",
            "Total failed dispatch syncs.",
            observability.sync_failures_total,
        ),
        (
            "cad_manifest_runs_total",
            "Total manifest sync attempts.",
            observability.manifest_runs_total,
        ),
        (
            "cad_manifest_failures_total",
            "Total failed manifest syncs.",
            observability.manifest_failures_total,
        ),
        (
            "cad_command_failures_total",
            "Total rejected or failed shift and status commands.",
            observability.command_failures_total,
        ),
    ];
    for (name, help, value) in counters {
        push_metric(&mut body, name, "counter", help, value);
    }

    body
}

fn push_metric(body: &mut String, name: &str, kind: &str, help: &str, value: impl std::fmt::Display) {
    let _ = writeln!(body, "# HELP {name} {help}");
    let _ = writeln!(body, "# TYPE {name} {kind}");
    let _ = writeln!(body, "{name} {value}");
}

/// Cached entity lists as one document, revalidated by content fingerprint.
pub async fn get_snapshot(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.observability.record_snapshot_request();
    let snapshot = state.coordinator.current_snapshot().await;
    let body = match serde_json::to_vec(&snapshot) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "failed to serialize snapshot");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let etag = snapshot_etag(crc32fast::hash(&body));

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(SNAPSHOT_CACHE_CONTROL, &etag);
    }
    json_bytes_response(Bytes::from(body), SNAPSHOT_CACHE_CONTROL, Some(etag.as_str()))
}

pub async fn get_incidents(State(state): State<AppState>) -> Json<Vec<Incident>> {
    Json(state.coordinator.incidents().await)
}

pub async fn get_resources(State(state): State<AppState>) -> Json<Vec<Resource>> {
    Json(state.coordinator.resources().await)
}

pub async fn get_officers(State(state): State<AppState>) -> Json<Vec<Officer>> {
    Json(state.coordinator.officers().await)
}

pub async fn get_patrols(State(state): State<AppState>) -> Json<Vec<Patrol>> {
    Json(state.coordinator.patrols().await)
}

pub async fn get_broadcasts(State(state): State<AppState>) -> Json<Vec<Broadcast>> {
    Json(state.coordinator.broadcasts().await)
}

pub async fn get_incident(
    State(state): State<AppState>,
    Path(incident_number): Path<String>,
) -> Result<Json<Incident>, StatusCode> {
    found(state.coordinator.incident(&incident_number).await)
}

pub async fn get_resource(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Result<Json<Resource>, StatusCode> {
    found(state.coordinator.resource(&callsign).await)
}

pub async fn get_officer(
    State(state): State<AppState>,
    Path(payroll_id): Path<String>,
) -> Result<Json<Officer>, StatusCode> {
    found(state.coordinator.officer(&payroll_id).await)
}

pub async fn get_patrol(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Patrol>, StatusCode> {
    found(state.coordinator.patrol(&identifier).await)
}

pub async fn get_broadcast(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Broadcast>, StatusCode> {
    found(state.coordinator.broadcast(&identifier).await)
}

pub async fn get_resource_incident(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Result<Json<Incident>, StatusCode> {
    found(state.coordinator.incident_for_resource(&callsign).await)
}

pub async fn get_resource_officers(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Result<Json<Vec<Officer>>, StatusCode> {
    if state.coordinator.resource(&callsign).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(state.coordinator.officers_for_resource(&callsign).await))
}

pub async fn get_incident_resources(
    State(state): State<AppState>,
    Path(incident_number): Path<String>,
) -> Json<Vec<Resource>> {
    Json(
        state
            .coordinator
            .resources_for_incident(&incident_number)
            .await,
    )
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(SessionView::collect(&state.coordinator).await)
}

pub async fn get_manifest(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<ManifestEntry>>, SyncError> {
    Ok(Json(state.coordinator.manifest_entries(&category).await?))
}

fn found<T>(value: Option<T>) -> Result<Json<T>, StatusCode> {
    value.map(Json).ok_or(StatusCode::NOT_FOUND)
}

fn snapshot_etag(fingerprint: u32) -> String {
    format!("\"snapshot-{fingerprint:08x}\"")
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: &str) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Ok(etag_header) = HeaderValue::from_str(etag) {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
