//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{JoinRequest, MatchHandle, PlayerInput};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Longest display name kept from the query string
const MAX_NAME_LEN: usize = 24;

/// Lobbies tried before the session gives up
const MAX_JOIN_ATTEMPTS: u32 = 3;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Display name shown to other players
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let user_id = Uuid::new_v4();
    let display_name = display_name_for(user_id, query.name.as_deref());
    info!(user_id = %user_id, name = %display_name, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, display_name, state))
}

/// Sanitized display name, falling back to an id-derived one
fn display_name_for(user_id: Uuid, requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        format!("Player_{}", &user_id.to_string()[..8])
    } else {
        cleaned.to_string()
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, display_name: String, state: AppState) {
    info!(user_id = %user_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        user_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(user_id = %user_id, error = %e, "Failed to send welcome");
        return;
    }

    let Some((handle, snapshot_rx)) = join_match(&state, user_id, &display_name).await else {
        let refusal = ServerMsg::Error {
            code: "no_match".to_string(),
            message: "No lobby could take this player".to_string(),
        };
        let _ = send_msg(&mut ws_sink, &refusal).await;
        let _ = ws_sink.send(Message::Close(None)).await;
        return;
    };
    let input_tx = handle.input_tx.clone();

    run_session(user_id, ws_sink, ws_stream, input_tx, snapshot_rx).await;

    info!(user_id = %user_id, match_id = %handle.id, "WebSocket connection closed");
}

/// Get the player into a lobby. A lobby that filled up or started between
/// assignment and join is skipped and matchmaking is asked again.
async fn join_match(
    state: &AppState,
    user_id: Uuid,
    display_name: &str,
) -> Option<(MatchHandle, broadcast::Receiver<ServerMsg>)> {
    for attempt in 1..=MAX_JOIN_ATTEMPTS {
        let handle = state.matchmaking.assign(user_id).await;
        // Subscribe before joining so the join confirmation is not missed
        let snapshot_rx = handle.snapshot_tx.subscribe();

        let (reply, reply_rx) = oneshot::channel();
        let request = JoinRequest {
            user_id,
            display_name: display_name.to_string(),
            reply,
        };
        if handle.join_tx.send(request).await.is_err() {
            debug!(user_id = %user_id, match_id = %handle.id, attempt, "Match closed before join");
            continue;
        }

        match reply_rx.await {
            Ok(Ok(())) => return Some((handle, snapshot_rx)),
            Ok(Err(e)) => {
                debug!(
                    user_id = %user_id,
                    match_id = %handle.id,
                    attempt,
                    code = e.code(),
                    "Join refused, retrying"
                );
            }
            Err(_) => {
                debug!(user_id = %user_id, match_id = %handle.id, attempt, "Match ended during join");
            }
        }
    }

    warn!(user_id = %user_id, "Giving up on matchmaking");
    None
}

/// Run the WebSocket session with read/write split
async fn run_session(
    user_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<PlayerInput>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Spawn writer task: broadcast snapshots -> WebSocket
    let writer_user_id = user_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    let is_end = matches!(msg, ServerMsg::MatchEnd { .. });
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(user_id = %writer_user_id, error = %e, "WebSocket send failed");
                        break;
                    }
                    if is_end {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        user_id = %writer_user_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - the next snapshot carries the full state
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(user_id = %writer_user_id, "Match channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> match loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                let allowed = match client_msg {
                    ClientMsg::Tackle | ClientMsg::StartGame => rate_limiter.check_action(),
                    _ => rate_limiter.check_input(),
                };
                if !allowed {
                    debug!(user_id = %user_id, "Dropped client message");
                    continue;
                }

                let is_leave = matches!(client_msg, ClientMsg::LeaveMatch);
                let input = PlayerInput {
                    user_id,
                    msg: client_msg,
                    received_at: unix_millis(),
                };

                if input_tx.send(input).await.is_err() {
                    debug!(user_id = %user_id, "Input channel closed");
                    break;
                }
                if is_leave {
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(user_id = %user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Signal disconnect to match loop
    let _ = input_tx
        .send(PlayerInput {
            user_id,
            msg: ClientMsg::LeaveMatch,
            received_at: unix_millis(),
        })
        .await;

    // Abort writer task
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_trimmed_and_capped() {
        let id = Uuid::new_v4();
        assert_eq!(display_name_for(id, Some("  alice ")), "alice");
        assert_eq!(
            display_name_for(id, Some(&"x".repeat(100))).len(),
            MAX_NAME_LEN
        );
    }

    #[test]
    fn blank_name_falls_back_to_id() {
        let id = Uuid::new_v4();
        let name = display_name_for(id, Some("\n\t"));
        assert!(name.starts_with("Player_"));
        assert_eq!(display_name_for(id, None), name);
    }
}
