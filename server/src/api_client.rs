use std::future::Future;
use std::pin::Pin;

use cad_shared::{
    BookOffRequest, BookOnRequest, BoundingBox, ManifestEntry, Officer, StatusUpdate, SyncSnapshot,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{upstream_connect_timeout, upstream_http_timeout};
use crate::error::ApiError;

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

const BODY_PREVIEW_CHARS: usize = 200;

/// Dispatch backend operations the coordinator depends on.
pub trait DispatchApi: Send + Sync {
    fn sync_patrol_group<'a>(&'a self, patrol_group: &'a str) -> ApiFuture<'a, SyncSnapshot>;

    fn sync_bounding_box(&self, bounds: BoundingBox) -> ApiFuture<'_, SyncSnapshot>;

    fn book_on<'a>(&'a self, request: &'a BookOnRequest) -> ApiFuture<'a, ()>;

    fn book_off<'a>(&'a self, request: &'a BookOffRequest) -> ApiFuture<'a, ()>;

    fn update_resource_status<'a>(
        &'a self,
        callsign: &'a str,
        update: &'a StatusUpdate,
    ) -> ApiFuture<'a, ()>;

    fn fetch_current_officer(&self) -> ApiFuture<'_, Officer>;

    fn fetch_manifest<'a>(
        &'a self,
        last_updated: Option<DateTime<Utc>>,
        categories: Option<&'a [String]>,
    ) -> ApiFuture<'a, Vec<ManifestEntry>>;
}

#[derive(Serialize)]
struct PatrolGroupSyncBody<'a> {
    patrol_group: &'a str,
}

#[derive(Serialize)]
struct BoundingBoxSyncBody {
    bounds: BoundingBox,
}

#[derive(Serialize)]
struct ManifestFetchBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<&'a [String]>,
}

/// `reqwest` client for the CAD REST API.
#[derive(Debug, Clone)]
pub struct HttpDispatchApi {
    client: reqwest::Client,
    base_url: reqwest::Url,
    token: Option<String>,
}

impl HttpDispatchApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| ApiError::Request(format!("invalid base url {base_url}: {e}")))?;
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let client = reqwest::Client::builder()
            .user_agent("cad-sync/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint_url(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let mut url = self.base_url.clone();
        let Ok(mut path_segments) = url.path_segments_mut() else {
            return Err(ApiError::Request(format!(
                "base url {} cannot carry a path",
                self.base_url
            )));
        };
        path_segments.pop_if_empty().extend(segments);
        drop(path_segments);
        Ok(url)
    }

    async fn post<B, R>(&self, segments: &[&str], body: &B, context: &str) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.send(reqwest::Method::POST, segments, Some(body)).await?;
        decode_payload(&bytes, context)
    }

    async fn post_unit<B>(&self, segments: &[&str], body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(reqwest::Method::POST, segments, Some(body))
            .await
            .map(|_| ())
    }

    async fn send<B>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<bytes::Bytes, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(segments)?;
        debug!(%method, %url, "dispatch api request");

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Request(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                preview: body_preview(&bytes),
            });
        }

        Ok(bytes)
    }
}

impl DispatchApi for HttpDispatchApi {
    fn sync_patrol_group<'a>(&'a self, patrol_group: &'a str) -> ApiFuture<'a, SyncSnapshot> {
        Box::pin(async move {
            self.post(
                &["sync", "patrolgroup"],
                &PatrolGroupSyncBody { patrol_group },
                "patrol group sync",
            )
            .await
        })
    }

    fn sync_bounding_box(&self, bounds: BoundingBox) -> ApiFuture<'_, SyncSnapshot> {
        Box::pin(async move {
            self.post(
                &["sync", "boundingbox"],
                &BoundingBoxSyncBody { bounds },
                "bounding box sync",
            )
            .await
        })
    }

    fn book_on<'a>(&'a self, request: &'a BookOnRequest) -> ApiFuture<'a, ()> {
        Box::pin(async move { self.post_unit(&["shift", "bookon"], request).await })
    }

    fn book_off<'a>(&'a self, request: &'a BookOffRequest) -> ApiFuture<'a, ()> {
        Box::pin(async move { self.post_unit(&["shift", "bookoff"], request).await })
    }

    fn update_resource_status<'a>(
        &'a self,
        callsign: &'a str,
        update: &'a StatusUpdate,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            self.post_unit(&["resource", callsign, "status"], update)
                .await
        })
    }

    fn fetch_current_officer(&self) -> ApiFuture<'_, Officer> {
        Box::pin(async move {
            let bytes = self
                .send::<()>(reqwest::Method::GET, &["officer", "details"], None)
                .await?;
            decode_payload(&bytes, "officer details")
        })
    }

    fn fetch_manifest<'a>(
        &'a self,
        last_updated: Option<DateTime<Utc>>,
        categories: Option<&'a [String]>,
    ) -> ApiFuture<'a, Vec<ManifestEntry>> {
        Box::pin(async move {
            self.post(
                &["manifest", "fetch"],
                &ManifestFetchBody {
                    last_updated,
                    categories,
                },
                "manifest",
            )
            .await
        })
    }
}

fn decode_payload<R: DeserializeOwned>(bytes: &[u8], context: &str) -> Result<R, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::Decode {
        context: context.to_string(),
        message: format!("{e}; body preview: {}", body_preview(bytes)),
    })
}

fn body_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use cad_shared::{ResourceStatus, StatusUpdate};

    use super::{DispatchApi, HttpDispatchApi, body_preview};
    use crate::error::ApiError;

    async fn spawn_upstream(app: Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve upstream");
        });
        (addr, handle)
    }

    #[test]
    fn endpoint_url_percent_encodes_callsigns() {
        let api = HttpDispatchApi::new("https://cad.example/api/", None).expect("build api");
        let url = api
            .endpoint_url(&["resource", "P24 A", "status"])
            .expect("endpoint url");
        assert_eq!(url.as_str(), "https://cad.example/api/resource/P24%20A/status");
    }

    #[test]
    fn body_preview_truncates_long_payloads() {
        let payload = "x".repeat(500);
        assert_eq!(body_preview(payload.as_bytes()).len(), 200);
    }

    #[tokio::test]
    async fn patrol_group_sync_decodes_snapshot() {
        let app = Router::new().route(
            "/cad/api/sync/patrolgroup",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["patrol_group"], "Collingwood");
                Json(serde_json::json!({
                    "incidents": [{"incident_number": "MP-1"}],
                    "resources": [{"callsign": "P24", "status": "on_air"}],
                }))
            }),
        );
        let (addr, handle) = spawn_upstream(app).await;
        let api = HttpDispatchApi::new(&format!("http://{addr}/cad/api"), Some("t0k".into()))
            .expect("build api");

        let snapshot = api
            .sync_patrol_group("Collingwood")
            .await
            .expect("patrol group sync");
        assert_eq!(snapshot.incidents.len(), 1);
        assert_eq!(snapshot.resources[0].status, ResourceStatus::OnAir);

        handle.abort();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn non_success_status_surfaces_body_preview() {
        let app = Router::new()
            .route(
                "/cad/api/resource/{callsign}/status",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "cad offline") }),
            )
            .route("/cad/api/officer/details", get(|| async { "not json" }));
        let (addr, handle) = spawn_upstream(app).await;
        let api = HttpDispatchApi::new(&format!("http://{addr}/cad/api"), None).expect("build api");

        let update = StatusUpdate {
            status: ResourceStatus::AtIncident,
            incident: None,
            comments: None,
            location_comments: None,
        };
        let err = api
            .update_resource_status("P24", &update)
            .await
            .expect_err("503 should fail");
        assert_eq!(
            err,
            ApiError::Status {
                status: 503,
                preview: "cad offline".to_string(),
            }
        );

        let err = api
            .fetch_current_officer()
            .await
            .expect_err("invalid officer payload should fail");
        assert!(matches!(err, ApiError::Decode { ref context, .. } if context == "officer details"));

        handle.abort();
        let _ = handle.await;
    }
}
