use axum::Router;
use axum::routing::{get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cache = Router::new()
        .route("/api/snapshot", get(routes::api::get_snapshot))
        .route("/api/incidents", get(routes::api::get_incidents))
        .route("/api/resources", get(routes::api::get_resources))
        .route("/api/officers", get(routes::api::get_officers))
        .route("/api/patrols", get(routes::api::get_patrols))
        .route("/api/broadcasts", get(routes::api::get_broadcasts))
        .route(
            "/api/incidents/{incident_number}",
            get(routes::api::get_incident),
        )
        .route("/api/resources/{callsign}", get(routes::api::get_resource))
        .route("/api/officers/{payroll_id}", get(routes::api::get_officer))
        .route("/api/patrols/{identifier}", get(routes::api::get_patrol))
        .route(
            "/api/broadcasts/{identifier}",
            get(routes::api::get_broadcast),
        )
        .route(
            "/api/resources/{callsign}/incident",
            get(routes::api::get_resource_incident),
        )
        .route(
            "/api/resources/{callsign}/officers",
            get(routes::api::get_resource_officers),
        )
        .route(
            "/api/incidents/{incident_number}/resources",
            get(routes::api::get_incident_resources),
        )
        .route(
            "/api/manifest/{category}",
            get(routes::api::get_manifest),
        );

    let commands = Router::new()
        .route(
            "/api/session",
            get(routes::api::get_session).delete(routes::commands::delete_session),
        )
        .route(
            "/api/session/officer",
            post(routes::commands::post_session_officer),
        )
        .route("/api/sync/mode", put(routes::commands::put_sync_mode))
        .route("/api/sync", post(routes::commands::post_sync))
        .route(
            "/api/manifest/sync",
            post(routes::commands::post_manifest_sync),
        )
        .route(
            "/api/shift/book-on",
            post(routes::commands::post_book_on),
        )
        .route(
            "/api/shift/book-off",
            post(routes::commands::post_book_off),
        )
        .route(
            "/api/resource/status",
            post(routes::commands::post_resource_status),
        );

    Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .route("/api/events", get(routes::sse::coordinator_events))
        .merge(cache)
        .merge(commands)
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
