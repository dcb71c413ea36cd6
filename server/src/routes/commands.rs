use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use cad_shared::{BookOnRequest, Officer, StatusUpdate, SyncMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SyncError;
use crate::routes::api::SessionView;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestSyncQuery {
    /// Comma-separated category filter; absent means every category.
    pub categories: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestSyncResult {
    pub entries: usize,
    pub checked_at: Option<DateTime<Utc>>,
}

pub async fn put_sync_mode(
    State(state): State<AppState>,
    Json(mode): Json<SyncMode>,
) -> Result<Json<SessionView>, SyncError> {
    let result = state.coordinator.set_sync_mode(mode).await;
    state.observability.record_sync(result.is_ok());
    result?;
    Ok(Json(SessionView::collect(&state.coordinator).await))
}

pub async fn post_sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SessionView>, SyncError> {
    let result = state.coordinator.sync_details(query.force).await;
    state.observability.record_sync(result.is_ok());
    result?;
    Ok(Json(SessionView::collect(&state.coordinator).await))
}

pub async fn post_manifest_sync(
    State(state): State<AppState>,
    Query(query): Query<ManifestSyncQuery>,
) -> Result<Json<ManifestSyncResult>, SyncError> {
    let categories = query.categories.as_deref().map(parse_categories);
    let result = state.coordinator.sync_manifest(categories).await;
    state.observability.record_manifest_sync(result.is_ok());
    let entries = result?;
    Ok(Json(ManifestSyncResult {
        entries,
        checked_at: state.coordinator.last_manifest_sync_time().await,
    }))
}

pub async fn post_book_on(
    State(state): State<AppState>,
    Json(request): Json<BookOnRequest>,
) -> Result<Json<SessionView>, SyncError> {
    command_result(&state, state.coordinator.book_on(request).await)?;
    Ok(Json(SessionView::collect(&state.coordinator).await))
}

pub async fn post_book_off(State(state): State<AppState>) -> Result<Json<SessionView>, SyncError> {
    command_result(&state, state.coordinator.book_off().await)?;
    Ok(Json(SessionView::collect(&state.coordinator).await))
}

pub async fn post_resource_status(
    State(state): State<AppState>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<SessionView>, SyncError> {
    let result = state
        .coordinator
        .update_callsign_status(
            update.status,
            update.incident,
            update.comments,
            update.location_comments,
        )
        .await;
    command_result(&state, result)?;
    Ok(Json(SessionView::collect(&state.coordinator).await))
}

pub async fn post_session_officer(
    State(state): State<AppState>,
) -> Result<Json<Officer>, SyncError> {
    let officer = command_result(&state, state.coordinator.fetch_current_officer().await)?;
    Ok(Json(officer))
}

pub async fn delete_session(State(state): State<AppState>) -> StatusCode {
    state.coordinator.clear_session().await;
    StatusCode::NO_CONTENT
}

fn command_result<T>(state: &AppState, result: Result<T, SyncError>) -> Result<T, SyncError> {
    if let Err(e) = &result {
        state.observability.record_command_failure();
        warn!(error = %e, code = e.code(), "command rejected");
    }
    result
}

fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use cad_shared::{Resource, ResourceStatus, SyncSnapshot};
    use chrono::Utc;
    use tower::ServiceExt;

    use super::parse_categories;
    use crate::error::ApiError;
    use crate::testing::{body_json, officer_fixture, test_state};

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("build request")
    }

    fn book_on_body(officers: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "callsign": "P24",
            "officers": officers,
            "shift_start": Utc::now(),
            "shift_end": Utc::now() + chrono::Duration::hours(8),
        })
    }

    #[test]
    fn parse_categories_drops_blank_entries() {
        assert_eq!(
            parse_categories("equipment, ,capability,"),
            vec!["equipment".to_string(), "capability".to_string()]
        );
    }

    #[tokio::test]
    async fn put_sync_mode_switches_and_syncs() {
        let (state, api) = test_state();
        let app = crate::app::build_app(state);

        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/api/sync/mode",
                serde_json::json!({ "type": "patrol_group", "name": "Collingwood" }),
            ))
            .await
            .expect("set mode");

        assert_eq!(response.status(), StatusCode::OK);
        let session = body_json(response).await;
        assert_eq!(session["sync_mode"]["name"], "Collingwood");
        assert!(session["last_sync_time"].is_string());
        assert_eq!(api.calls(), vec!["patrol_group:Collingwood"]);
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let (state, api) = test_state();
        state
            .coordinator
            .set_sync_mode(cad_shared::SyncMode::patrol_group("Alpha"))
            .await
            .expect("initial sync");
        api.push_failure(ApiError::Status {
            status: 503,
            preview: "maintenance".to_string(),
        });
        let app = crate::app::build_app(state.clone());

        let response = app
            .oneshot(empty_request(Method::POST, "/api/sync?force=true"))
            .await
            .expect("sync");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "UPSTREAM_ERROR");
        assert_eq!(state.observability.snapshot().sync_failures_total, 1);
    }

    #[tokio::test]
    async fn book_on_without_officer_is_unauthorized() {
        let (state, api) = test_state();
        let app = crate::app::build_app(state.clone());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/shift/book-on",
                book_on_body(&["1001"]),
            ))
            .await
            .expect("book on");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "NOT_LOGGED_IN");
        assert!(api.calls().is_empty());
        assert_eq!(state.observability.snapshot().command_failures_total, 1);
    }

    #[tokio::test]
    async fn book_off_without_shift_conflicts() {
        let (state, _api) = test_state();
        let app = crate::app::build_app(state);

        let response = app
            .oneshot(empty_request(Method::POST, "/api/shift/book-off"))
            .await
            .expect("book off");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "NOT_BOOKED_ON");
    }

    #[tokio::test]
    async fn shift_flow_books_on_updates_status_and_books_off() {
        let (state, api) = test_state();
        api.push_snapshot(SyncSnapshot {
            resources: vec![Resource::new("P24")],
            ..SyncSnapshot::default()
        });
        state
            .coordinator
            .set_current_officer(Some(officer_fixture("1001")))
            .await;
        state
            .coordinator
            .set_sync_mode(cad_shared::SyncMode::patrol_group("Alpha"))
            .await
            .expect("sync");
        let app = crate::app::build_app(state.clone());

        let booked = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/shift/book-on",
                book_on_body(&["1001"]),
            ))
            .await
            .expect("book on");
        assert_eq!(booked.status(), StatusCode::OK);
        let session = body_json(booked).await;
        assert_eq!(session["book_on"]["callsign"], "P24");
        assert_eq!(session["current_resource"]["status"], "on_air");

        let status = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/resource/status",
                serde_json::json!({ "status": "meal_break", "comments": "crib" }),
            ))
            .await
            .expect("status");
        assert_eq!(status.status(), StatusCode::OK);
        assert_eq!(
            body_json(status).await["current_resource"]["status"],
            "meal_break"
        );

        let off = app
            .oneshot(empty_request(Method::POST, "/api/shift/book-off"))
            .await
            .expect("book off");
        assert_eq!(off.status(), StatusCode::OK);
        assert!(body_json(off).await["book_on"].is_null());
        assert_eq!(
            state.coordinator.resource("P24").await.map(|r| r.status),
            Some(ResourceStatus::OffDuty)
        );
        assert_eq!(
            api.calls()[1..],
            ["book_on:P24", "status:P24:MealBreak", "book_off:P24"]
        );
    }

    #[tokio::test]
    async fn manifest_sync_reports_entry_count() {
        let (state, api) = test_state();
        api.set_manifest(vec![cad_shared::ManifestEntry {
            id: "radio".to_string(),
            category: "equipment".to_string(),
            title: "Radio".to_string(),
            value: None,
            sort_order: 1,
            active: true,
            last_updated: None,
        }]);
        let app = crate::app::build_app(state);

        let synced = app
            .clone()
            .oneshot(empty_request(
                Method::POST,
                "/api/manifest/sync?categories=equipment",
            ))
            .await
            .expect("manifest sync");
        assert_eq!(synced.status(), StatusCode::OK);
        let body = body_json(synced).await;
        assert_eq!(body["entries"], 1);
        assert!(body["checked_at"].is_string());

        let listed = app
            .oneshot(empty_request(Method::GET, "/api/manifest/equipment"))
            .await
            .expect("manifest entries");
        assert_eq!(body_json(listed).await[0]["id"], "radio");
    }

    #[tokio::test]
    async fn delete_session_clears_officer() {
        let (state, _api) = test_state();
        state
            .coordinator
            .set_current_officer(Some(officer_fixture("1001")))
            .await;
        let app = crate::app::build_app(state.clone());

        let response = app
            .oneshot(empty_request(Method::DELETE, "/api/session"))
            .await
            .expect("clear session");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.coordinator.current_officer().await.is_none());
    }

    #[tokio::test]
    async fn officer_refresh_propagates_upstream_status() {
        let (state, api) = test_state();
        let app = crate::app::build_app(state);

        let missing = app
            .clone()
            .oneshot(empty_request(Method::POST, "/api/session/officer"))
            .await
            .expect("officer");
        assert_eq!(missing.status(), StatusCode::BAD_GATEWAY);

        api.set_officer(officer_fixture("1001"));
        let found = app
            .oneshot(empty_request(Method::POST, "/api/session/officer"))
            .await
            .expect("officer");
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(body_json(found).await["payroll_id"], "1001");
    }
}
