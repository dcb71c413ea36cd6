use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use cad_shared::CoordinatorEvent;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::AppState;

/// Named events: `sync`, `book_on`, `callsign`, `shift_ending`, `manifest`, plus
/// `resync` when the client fell behind and should refetch `/api/snapshot`.
pub async fn coordinator_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.coordinator.subscribe();
    let stream = async_stream::stream! {
        let mut events = BroadcastStream::new(rx);

        while let Some(result) = events.next().await {
            match result {
                Ok(event) => {
                    if let Some(sse_event) = to_sse_event(&event) {
                        yield Ok(sse_event);
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind coordinator events; asking it to resync"
                    );
                    yield Ok(
                        Event::default()
                            .id(state.coordinator.seq().to_string())
                            .event("resync")
                            .data(format!("{{\"skipped\":{skipped}}}")),
                    );
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &CoordinatorEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(
            Event::default()
                .id(event.seq().to_string())
                .event(event.kind())
                .data(payload),
        ),
        Err(e) => {
            warn!(seq = event.seq(), error = %e, "failed to serialize coordinator event; dropping");
            None
        }
    }
}
