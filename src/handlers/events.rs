use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::services::sync::Snapshot;
use crate::state::AppState;

// GET /api/events — SSE change stream.
//
// Each connection is one hub observer: the subscription's immediate replay
// becomes the first event, so a freshly attached surface renders without
// waiting for the next change. Events carry only counters; surfaces
// re-derive what they show from the query endpoints.
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::channel::<Snapshot>(16);

    let subscription = state.hub.subscribe(move |snapshot| {
        // A slow consumer just skips ticks; the next one carries the same
        // cumulative state.
        let _ = tx.try_send(snapshot.clone());
    });

    let mut seq: u64 = 0;
    let live = ReceiverStream::new(rx).map(move |snapshot| {
        let _keep_alive = &subscription;
        seq += 1;
        let data = serde_json::json!({
            "seq": seq,
            "connected": snapshot.connected,
            "bookings": snapshot.bookings.len(),
            "services": snapshot.config.services.len(),
            "blockouts": snapshot.config.blockouts.len(),
        })
        .to_string();
        Ok(Event::default().event("sync").data(data))
    });

    let keepalive = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    Sse::new(StreamExt::merge(live, keepalive))
}
