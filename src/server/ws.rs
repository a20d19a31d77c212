//! The `/ws` upgrade and per-connection loop (spec §6.2).
//!
//! A connection registers with the session table to get its outbound
//! queue, then runs one `select!` loop between socket reads and that
//! queue's receiver — the same pattern the teacher's price-broadcast socket
//! used, generalised so the read side runs through the inbound failure
//! chain and the router instead of being ignored.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::router;

use super::AppState;

fn session_id_of(headers: &HeaderMap) -> String {
    headers
        .get("X-Session-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("ws-{}", Uuid::new_v4()))
}

pub async fn ws_handler(State(state): State<AppState>, headers: HeaderMap, ws: WebSocketUpgrade) -> impl IntoResponse {
    let session_id = session_id_of(&headers);
    ws.on_upgrade(move |socket| handle_connection(socket, state, session_id))
}

async fn handle_connection(mut socket: WebSocket, state: AppState, session_id: String) {
    info!(session_id, "ws session connected");
    let mut outbound_rx = state.ctx.sessions.register(session_id.as_str()).await;

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
    let dispatch_handle = tokio::spawn(dispatch_loop(state.clone(), session_id.clone(), inbound_rx));

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        state.ctx.failures.inbound.process(text, &session_id, inbound_tx.clone());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(session_id, error = %e, "ws read error");
                        break;
                    }
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(msg) => {
                        if socket.send(Message::Text(msg)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    dispatch_handle.abort();
    state.ctx.sessions.deregister(&session_id).await;
    state.ctx.failures.scheduler.cancel_session(&session_id);
    info!(session_id, "ws session disconnected");
}

/// Drains the inbound failure chain's output, dispatches each surviving
/// message through the router, and feeds every reply back through the
/// outbound failure chain onto this session's queue.
async fn dispatch_loop(state: AppState, session_id: String, mut inbound_rx: mpsc::UnboundedReceiver<String>) {
    while let Some(raw) = inbound_rx.recv().await {
        let replies = router::dispatch(&raw, &session_id, &state.ctx).await;
        for reply in replies {
            super::deliver_outbound(state.ctx.clone(), session_id.clone(), reply.to_wire()).await;
        }
    }
}
