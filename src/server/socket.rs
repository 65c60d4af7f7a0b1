//! Persistent client channel over WebSocket.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

use super::observability::spans;
use crate::context::SyncContext;
use crate::hub::{ClientId, ClientMessage, CommandSession, ServerMessage};

/// Create the WebSocket router.
pub fn create_socket_router(context: Arc<SyncContext>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(context)
}

async fn websocket_handler(
    State(context): State<Arc<SyncContext>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move {
        let (id, rx) = context.hub().connect();
        handle_socket(socket, context, id, rx)
            .instrument(spans::client_span(id))
            .await;
    })
}

async fn handle_socket(
    socket: WebSocket,
    context: Arc<SyncContext>,
    id: ClientId,
    mut rx: mpsc::Receiver<ServerMessage>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Single writer per connection; everything for this client goes through rx.
    let mut writer = tokio::spawn(
        async move {
            while let Some(message) = rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to serialize message");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let session = context.command_session();
    let mut commands = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut writer => break,
            Some(_) = commands.join_next(), if !commands.is_empty() => {}
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    dispatch(&context, id, &session, &mut commands, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket receive failed");
                    break;
                }
            },
        }
    }

    context.hub().disconnect(id);
    commands.abort_all();
    writer.abort();
}

fn dispatch(
    context: &Arc<SyncContext>,
    id: ClientId,
    session: &CommandSession,
    commands: &mut JoinSet<()>,
    text: &str,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::ExecuteCommand { command }) => {
            let hub = Arc::clone(context.hub());
            let session = session.clone();
            let span = spans::command_span(id, &command);
            commands.spawn(
                async move { hub.execute_command(id, &session, &command).await }.instrument(span),
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable client message");
            if let Some(tx) = context.hub().sender(id) {
                let _ = tx.try_send(ServerMessage::Error {
                    message: format!("invalid message: {e}"),
                });
            }
        }
    }
}
