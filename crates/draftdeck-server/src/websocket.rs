//! WebSocket connection handling.

use crate::state::AppState;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use draftdeck_core::ProcessEvent;
use draftdeck_types::{WsClientMessage, WsServerMessage};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Maximum size for text input messages (10KB)
const MAX_INPUT_SIZE: usize = 10 * 1024;

/// Maximum size for terminal input data (64KB - generous for paste operations)
const MAX_TERMINAL_INPUT_SIZE: usize = 64 * 1024;

pub async fn handle_websocket(
    socket: WebSocket,
    state: Arc<AppState>,
    session_id: Uuid,
) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Subscribe before the snapshot so nothing falls between them.
    let mut event_rx = state.session_manager.subscribe();

    // Replies produced by recv_task (pong, errors)
    let (outgoing_tx, mut outgoing_rx) = tokio::sync::mpsc::channel::<WsServerMessage>(32);

    if let Some(session) = state.session_manager.get_session(session_id) {
        send_message(&mut ws_tx, &WsServerMessage::SessionInit { session }).await?;
    }
    info!(target: "draftdeck::ws", "Client connected to session {}", session_id);

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(msg) = outgoing_rx.recv() => msg,
                event = event_rx.recv() => match event {
                    Ok(event) => match server_message(&event, session_id) {
                        Some(msg) => msg,
                        None => continue,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(target: "draftdeck::ws", "Client for session {} lagged, skipped {} events", session_id, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if let Err(e) = send_message(&mut ws_tx, &msg).await {
                debug!(
                    target: "draftdeck::ws",
                    "WebSocket send failed for session {} (client likely disconnected): {}",
                    session_id, e
                );
                break;
            }
        }
    });

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let client_msg = match serde_json::from_str::<WsClientMessage>(&text) {
                Ok(client_msg) => client_msg,
                Err(e) => {
                    debug!(target: "draftdeck::ws", "Ignoring malformed message for session {}: {}", session_id, e);
                    continue;
                }
            };

            let result = match client_msg {
                WsClientMessage::Input { content } => {
                    if content.len() > MAX_INPUT_SIZE {
                        warn!(
                            target: "draftdeck::ws",
                            "Input message too large ({} bytes) from session {}, max {} bytes",
                            content.len(),
                            session_id,
                            MAX_INPUT_SIZE
                        );
                        let _ = outgoing_tx
                            .send(too_large("input_too_large", content.len(), MAX_INPUT_SIZE))
                            .await;
                        continue;
                    }
                    state_clone
                        .session_manager
                        .send_input(session_id, &content)
                        .await
                }
                WsClientMessage::TerminalInput { data } => {
                    if data.len() > MAX_TERMINAL_INPUT_SIZE {
                        warn!(
                            target: "draftdeck::ws",
                            "Terminal input too large ({} bytes) from session {}, max {} bytes",
                            data.len(),
                            session_id,
                            MAX_TERMINAL_INPUT_SIZE
                        );
                        let _ = outgoing_tx
                            .send(too_large(
                                "terminal_input_too_large",
                                data.len(),
                                MAX_TERMINAL_INPUT_SIZE,
                            ))
                            .await;
                        continue;
                    }
                    state_clone
                        .session_manager
                        .send_terminal_input(session_id, &data)
                        .await
                }
                WsClientMessage::Resize { rows, cols } => {
                    debug!(target: "draftdeck::ws", "Resize for session {}: {}x{}", session_id, cols, rows);
                    state_clone
                        .session_manager
                        .resize(session_id, rows, cols)
                        .await
                }
                WsClientMessage::Ping { timestamp } => {
                    let _ = outgoing_tx.send(WsServerMessage::Pong { timestamp }).await;
                    trace!(target: "draftdeck::ws::ping", "Sent pong for timestamp: {}", timestamp);
                    Ok(())
                }
            };

            if let Err(e) = result {
                let _ = outgoing_tx
                    .send(WsServerMessage::Error {
                        code: "session_error".to_string(),
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    });

    // Either side finishing ends the connection.
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    info!(target: "draftdeck::ws", "Client disconnected from session {}", session_id);
    Ok(())
}

/// Translate a process event into the message for one session's clients.
pub fn server_message(event: &ProcessEvent, session_id: Uuid) -> Option<WsServerMessage> {
    if event.session_id() != session_id {
        return None;
    }

    let msg = match event {
        ProcessEvent::Parsed { event, .. } => WsServerMessage::Parsed {
            event: event.clone(),
        },
        ProcessEvent::TerminalOutput { data, .. } => {
            WsServerMessage::TerminalOutput { data: data.clone() }
        }
        ProcessEvent::Exited { exit_code, .. } => WsServerMessage::Exited {
            exit_code: *exit_code,
        },
        ProcessEvent::Error { message, .. } => WsServerMessage::Error {
            code: "process_error".to_string(),
            message: message.clone(),
        },
    };
    Some(msg)
}

fn too_large(code: &str, len: usize, max: usize) -> WsServerMessage {
    WsServerMessage::Error {
        code: code.to_string(),
        message: format!("Message too large ({} bytes, max {} bytes)", len, max),
    }
}

async fn send_message(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &WsServerMessage,
) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    ws_tx.send(Message::Text(json.into())).await?;
    Ok(())
}
