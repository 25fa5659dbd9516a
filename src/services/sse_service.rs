use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::{
    StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};
use tracing::{debug, warn};

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::{fanout_events, match_service},
    state::{SharedState, versus::MatchCode},
};

/// Subscribe `viewer` to the events of `code` and capture the current state.
///
/// The subscription is taken before the snapshot is read, so a write landing
/// in between shows up as an extra event rather than being lost.
pub async fn subscribe_match(
    state: &SharedState,
    code: &MatchCode,
    viewer: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, Option<ServerEvent>), ServiceError> {
    let receiver = state.hub().subscribe(code);
    let (game, _) = match_service::get_match(state, code, viewer).await?;
    Ok((receiver, fanout_events::match_state_event(&game)))
}

/// Convert a match subscription into an SSE response that starts with `snapshot`.
pub fn to_sse_stream(
    state: SharedState,
    receiver: broadcast::Receiver<ServerEvent>,
    snapshot: Option<ServerEvent>,
    code: MatchCode,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let log_code = code.clone();
    let updates = BroadcastStream::new(receiver).filter_map(move |item| match item {
        Ok(payload) => Some(Ok::<_, Infallible>(to_event(payload))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            // Skip lagged messages but keep the stream alive.
            warn!(code = %log_code, skipped, "match SSE stream lagged behind");
            None
        }
    });
    let stream = tokio_stream::iter(snapshot.map(|payload| Ok(to_event(payload)))).chain(updates);
    let stream = Released {
        inner: Some(Box::pin(stream)),
        state,
        code,
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Stream wrapper that prunes the match channel once the client is gone.
struct Released<S> {
    inner: Option<Pin<Box<S>>>,
    state: SharedState,
    code: MatchCode,
}

impl<S: Stream> Stream for Released<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        match self.inner.as_mut() {
            Some(inner) => inner.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl<S> Drop for Released<S> {
    fn drop(&mut self) {
        // The receiver must be gone before the hub can see the channel as idle.
        self.inner.take();
        self.state.hub().prune(&self.code);
        debug!(code = %self.code, "match SSE stream closed");
    }
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
