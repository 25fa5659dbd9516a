use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{match_dto::ActionRequest, sse::ServerEvent},
    error::ServiceError,
    services::{fanout_events, match_service},
    state::{
        SharedState,
        versus::{MatchAction, MatchCode, ParticipantId},
    },
};

/// Handle one participant's WebSocket for the match `code`.
///
/// The socket first receives the current `match.state`, then every
/// `match.state` published for the match. Text frames are parsed as actions;
/// each one is answered on this socket with `match.ack` or `match.error`.
pub async fn handle_socket(
    state: SharedState,
    socket: WebSocket,
    code: MatchCode,
    participant: ParticipantId,
) {
    let connection = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Subscribe before loading the snapshot so no write falls in between.
    let mut events = state.hub().subscribe(&code);
    let snapshot = match match_service::get_match(&state, &code, &participant).await {
        Ok((game, _)) => fanout_events::match_state_event(&game),
        Err(err) => {
            warn!(%code, %connection, error = %err, "cannot open match socket");
            if let Some(event) = fanout_events::action_rejected_event(&err) {
                send_event(&outbound_tx, &event);
            }
            let _ = outbound_tx.send(Message::Close(None));
            drop(events);
            state.hub().prune(&code);
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };
    if let Some(event) = snapshot {
        send_event(&outbound_tx, &event);
    }

    info!(%code, %connection, participant = %participant, "match socket connected");

    let forward_tx = outbound_tx.clone();
    let forward_code = code.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !send_event(&forward_tx, &event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(code = %forward_code, %connection, skipped, "match socket lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_inbound(&state, &code, &participant, text.as_str(), &outbound_tx).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%code, %connection, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder.abort();
    let _ = forwarder.await;
    state.hub().prune(&code);
    info!(%code, %connection, "match socket disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Run one inbound action and answer the sender.
async fn handle_inbound(
    state: &SharedState,
    code: &MatchCode,
    participant: &str,
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
) {
    let request = match serde_json::from_str::<ActionRequest>(text) {
        Ok(request) => request,
        Err(err) => {
            let err = ServiceError::InvalidInput(format!("unreadable action: {err}"));
            if let Some(event) = fanout_events::action_rejected_event(&err) {
                send_event(tx, &event);
            }
            return;
        }
    };

    let action = MatchAction::from(request);
    debug!(%code, participant, action = action.name(), "websocket action");

    let reply = match match_service::perform_action(state, code, participant, action).await {
        Ok(outcome) => fanout_events::action_ack_event(&outcome),
        Err(err) => {
            debug!(%code, participant, error = %err, "websocket action rejected");
            fanout_events::action_rejected_event(&err)
        }
    };
    if let Some(event) = reply {
        send_event(tx, &event);
    }
}

/// Queue `event` for the writer task. Returns `false` once the writer is gone.
fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) -> bool {
    tx.send(Message::Text(event.to_ws_text().into())).is_ok()
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
