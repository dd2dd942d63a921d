//! WebSocket upgrade handler and per-connection event loop.
//!
//! Connection lifecycle:
//! 1. Extract the bearer token (query param or Authorization header)
//! 2. Verify it within the handshake deadline; reject with 401 otherwise
//! 3. Upgrade to WebSocket and send the `connected` frame
//! 4. Process client commands, room deliveries and heartbeats until the
//!    transport closes or goes silent
//! 5. Leave any joined room and emit the `user:left` presence event
//!
//! A connection that never authenticates never reaches step 3, so it can
//! never appear in any room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::application::Broadcaster;
use crate::config::WebSocketConfig;
use crate::domain::board::{BoardEvent, EventEnvelope, UserPresence};
use crate::domain::foundation::{AuthError, ConnectionId, Timestamp, UserId};
use crate::ports::TokenVerifier;

use super::messages::{
    ClientMessage, ConnectedFrame, ControlFrame, ErrorFrame, EventFrame, PongFrame,
};
use super::rooms::{RoomMembership, RoomRegistry};

/// Everything a connection needs, wired at startup.
#[derive(Clone)]
pub struct GatewayState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub rooms: Arc<RoomRegistry>,
    pub broadcaster: Broadcaster,
    pub settings: WebSocketConfig,
}

impl GatewayState {
    /// Creates the gateway state.
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        rooms: Arc<RoomRegistry>,
        broadcaster: Broadcaster,
        settings: WebSocketConfig,
    ) -> Self {
        Self {
            verifier,
            rooms,
            broadcaster,
            settings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// Builds the gateway router: the WebSocket endpoint plus health.
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Pulls the bearer token from the query string or Authorization header.
fn bearer_token(params: &WsParams, headers: &HeaderMap) -> Option<String> {
    params.token.clone().or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws?token=...`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    let Some(token) = bearer_token(&params, &headers) else {
        return unauthorized("Authentication required");
    };

    let verification =
        tokio::time::timeout(state.settings.auth_timeout(), state.verifier.verify(&token))
            .await
            .unwrap_or(Err(AuthError::Timeout));

    match verification {
        Ok(user_id) => ws.on_upgrade(move |socket| handle_socket(socket, user_id, state)),
        Err(err) => {
            tracing::debug!("Rejecting connection: {}", err);
            unauthorized("Authentication failed")
        }
    }
}

fn unauthorized(message: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, message).into_response()
}

/// Runs for the lifetime of one authenticated connection.
async fn handle_socket(socket: WebSocket, user_id: UserId, state: GatewayState) {
    let connection_id = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(
        connection_id = %connection_id,
        user_id = %user_id,
        "Connection active"
    );

    let connected = ControlFrame::Connected(ConnectedFrame {
        connection_id,
        user_id: user_id.clone(),
        timestamp: Timestamp::now().to_rfc3339(),
    });
    if send_control(&mut sender, &connected).await.is_err() {
        // Client disconnected before the handshake frame landed.
        return;
    }

    let mut membership: Option<RoomMembership> = None;
    let heartbeat_period = state.settings.heartbeat_interval();
    let mut heartbeat =
        tokio::time::interval_at(tokio::time::Instant::now() + heartbeat_period, heartbeat_period);
    let mut missed_pongs: u32 = 0;

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                let Some(Ok(message)) = inbound else {
                    // Stream closed or transport error.
                    break;
                };
                missed_pongs = 0;
                match message {
                    Message::Text(text) => {
                        let handled = handle_client_message(
                            &text,
                            connection_id,
                            &user_id,
                            &state,
                            &mut membership,
                            &mut sender,
                        )
                        .await;
                        if handled.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                        break;
                    }
                    Message::Binary(_) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            "Received unsupported binary message"
                        );
                    }
                    // Protocol-level ping is answered by axum; either way
                    // it counts as liveness, handled above.
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }

            delivery = next_room_event(membership.as_mut()) => {
                match delivery {
                    Ok(envelope) => {
                        if envelope.origin == Some(connection_id) {
                            // Never echo a connection's own presence back.
                            continue;
                        }
                        if send_event(&mut sender, envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            skipped,
                            "Connection too slow, dropped events"
                        );
                    }
                    Err(RecvError::Closed) => {
                        membership = None;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if missed_pongs >= state.settings.missed_pong_limit {
                    tracing::debug!(
                        connection_id = %connection_id,
                        "Connection silent, closing"
                    );
                    break;
                }
                missed_pongs += 1;
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Disconnect cleanup: the registry forgets the connection, and the
    // room it vacated hears about it.
    if let Some((board_id, left_user)) = state.rooms.leave_all(&connection_id).await {
        state
            .broadcaster
            .publish_from(
                &board_id,
                BoardEvent::UserLeft(UserPresence {
                    user_id: left_user,
                    connection_id,
                }),
                connection_id,
            )
            .await;
    }

    tracing::info!(connection_id = %connection_id, "Connection closed");
}

/// Receives the next room delivery, or parks forever when not joined.
async fn next_room_event(
    membership: Option<&mut RoomMembership>,
) -> Result<EventEnvelope, RecvError> {
    match membership {
        Some(membership) => membership.receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_client_message(
    text: &str,
    connection_id: ConnectionId,
    user_id: &UserId,
    state: &GatewayState,
    membership: &mut Option<RoomMembership>,
    sender: &mut SplitSink<WebSocket, Message>,
) -> Result<(), axum::Error> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(connection_id = %connection_id, "Bad client message: {}", err);
            return send_control(
                sender,
                &ControlFrame::Error(ErrorFrame {
                    code: "invalid_message".to_string(),
                    message: "Message could not be parsed".to_string(),
                    timestamp: Timestamp::now().to_rfc3339(),
                }),
            )
            .await;
        }
    };

    match message {
        ClientMessage::JoinBoard { board_id } => {
            if membership.as_ref().map(|m| m.board_id) == Some(board_id) {
                return Ok(());
            }

            let outcome = state
                .rooms
                .join(connection_id, user_id.clone(), board_id)
                .await;

            if let Some(previous) = outcome.left {
                state
                    .broadcaster
                    .publish_from(
                        &previous,
                        BoardEvent::UserLeft(UserPresence {
                            user_id: user_id.clone(),
                            connection_id,
                        }),
                        connection_id,
                    )
                    .await;
            }

            *membership = Some(outcome.membership);

            state
                .broadcaster
                .publish_from(
                    &board_id,
                    BoardEvent::UserJoined(UserPresence {
                        user_id: user_id.clone(),
                        connection_id,
                    }),
                    connection_id,
                )
                .await;

            tracing::debug!(
                connection_id = %connection_id,
                board_id = %board_id,
                "Joined board room"
            );
            Ok(())
        }

        ClientMessage::LeaveBoard { board_id } => {
            if state.rooms.leave(&connection_id, &board_id).await.is_some() {
                if membership.as_ref().map(|m| m.board_id) == Some(board_id) {
                    *membership = None;
                }
                state
                    .broadcaster
                    .publish_from(
                        &board_id,
                        BoardEvent::UserLeft(UserPresence {
                            user_id: user_id.clone(),
                            connection_id,
                        }),
                        connection_id,
                    )
                    .await;
                tracing::debug!(
                    connection_id = %connection_id,
                    board_id = %board_id,
                    "Left board room"
                );
            }
            Ok(())
        }

        ClientMessage::Ping => {
            send_control(
                sender,
                &ControlFrame::Pong(PongFrame {
                    timestamp: Timestamp::now().to_rfc3339(),
                }),
            )
            .await
        }
    }
}

async fn send_control(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ControlFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).expect("ControlFrame serialization should not fail");
    sender.send(Message::Text(json)).await
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    envelope: EventEnvelope,
) -> Result<(), axum::Error> {
    let frame = EventFrame::from_envelope(envelope);
    let json = serde_json::to_string(&frame).expect("EventFrame serialization should not fail");
    sender.send(Message::Text(json)).await
}
