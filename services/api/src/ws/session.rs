//! Manages the WebSocket connection lifecycle for a learning session.

use super::{
    dispatch::{Dispatch, handle_client_message, handle_fetch_result},
    protocol::{ClientMessage, ServerMessage},
};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use kids_learning_core::{
    content::ContentServiceError,
    narration::WatchNarrator,
    session::{Fetched, LearningSession, PendingFetch, Ticket},
};
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

type FetchTasks = JoinSet<(Ticket, Result<Fetched, ContentServiceError>)>;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Entry point for a new connection. Each connection owns exactly one session.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id: u32 = rand::random();
    tracing::Span::current().record("session_id", session_id);
    info!("New learning session connected.");

    if let Err(e) = run_learning_session(socket, state).await {
        error!(error = ?e, "Learning session terminated with error.");
    }
    info!("Learning session finished.");
}

/// Spawns a content fetch. A new transition aborts the one still in flight.
fn spawn_fetch(
    tasks: &mut FetchTasks,
    transition_in_flight: &mut Option<AbortHandle>,
    state: &Arc<AppState>,
    pending: PendingFetch,
) {
    let client = state.content_client.clone();
    let PendingFetch { ticket, request } = pending;
    let handle = tasks.spawn(async move {
        let result = request.execute(client.as_ref()).await;
        (ticket, result)
    });
    if matches!(ticket, Ticket::Transition { .. }) {
        if let Some(previous) = transition_in_flight.replace(handle) {
            previous.abort();
        }
    }
}

/// The main event loop for an active learning session.
///
/// Client messages, finished fetches and narration commands are handled one at
/// a time, so the session is never observed half-way through a commit.
async fn run_learning_session(socket: WebSocket, state: Arc<AppState>) -> Result<()> {
    let (mut socket_tx, mut socket_rx) = socket.split();
    let (narrator, mut speech_rx) = WatchNarrator::channel();
    let mut session = LearningSession::new(state.content_client.clone(), Arc::new(narrator))
        .with_translation_locale(state.config.translation_locale.clone());

    let mut fetches = FetchTasks::new();
    let mut transition_in_flight: Option<AbortHandle> = None;

    loop {
        tokio::select! {
            // Handle messages from the client WebSocket.
            msg_result = socket_rx.next() => {
                let Some(msg_result) = msg_result else {
                    info!("Client disconnected.");
                    break;
                };
                match msg_result {
                    Ok(Message::Text(text)) => {
                        let parsed = serde_json::from_str::<ClientMessage>(&text);
                        let Dispatch { replies, fetch } = match parsed {
                            Ok(msg) => {
                                debug!(?msg, "Client message received");
                                handle_client_message(&mut session, msg)
                            }
                            Err(e) => {
                                warn!(error = %e, "Ignoring malformed client message.");
                                Dispatch {
                                    replies: vec![ServerMessage::bad_request(e.to_string())],
                                    fetch: None,
                                }
                            }
                        };
                        if let Some(pending) = fetch {
                            spawn_fetch(&mut fetches, &mut transition_in_flight, &state, pending);
                        }
                        for reply in replies {
                            send_msg(&mut socket_tx, reply).await?;
                        }
                    }
                    Ok(Message::Binary(_)) => warn!("Ignoring unexpected binary message."),
                    Ok(Message::Close(_)) => {
                        info!("Client sent close frame. Shutting down session.");
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Err(e) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            },
            // Commit finished fetches.
            Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                match joined {
                    Ok((ticket, result)) => {
                        for reply in handle_fetch_result(&mut session, ticket, result) {
                            send_msg(&mut socket_tx, reply).await?;
                        }
                    }
                    Err(e) if e.is_cancelled() => debug!("Superseded fetch cancelled."),
                    Err(e) => error!(error = ?e, "Fetch task failed."),
                }
            },
            // Forward narration; only the latest utterance is ever delivered.
            changed = speech_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let utterance = speech_rx.borrow_and_update().clone();
                if let Some(utterance) = utterance {
                    send_msg(&mut socket_tx, ServerMessage::Speak(utterance)).await?;
                }
            },
        }
    }

    fetches.abort_all();
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
