use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::server::message_router::RouteEffect;

use super::routes::AppState;

/// Handle a single upgraded WebSocket connection for its whole lifetime:
/// register it, pump outgoing broadcasts to the socket, dispatch incoming
/// frames through the message router, then tear down on disconnect.
pub(super) async fn handle_socket(socket: WebSocket, state: AppState, addr: SocketAddr) {
    let (mut sink, mut stream) = socket.split();

    let mut player_id = uuid::Uuid::new_v4().to_string();
    let reconnect_token = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(64);
    state.manager.broadcaster().register(player_id.clone(), tx).await;
    state.manager.sessions().connect(player_id.clone(), reconnect_token.clone()).await;
    state.manager.metrics().connection_opened();

    tracing::info!(%player_id, client_addr = %addr, "connection established");

    let lobbies = state.manager.lobby_list().await;
    state
        .manager
        .broadcaster()
        .send_to_peer(
            &player_id,
            ServerMessage::Connected { player_id: player_id.clone(), reconnect_token, lobbies },
        )
        .await;

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_json(&mut sink, &message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(%player_id, error = %err, "websocket read error");
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => continue,
        };

        let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
        let message = match parsed {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(%player_id, error = %err, "dropping malformed client frame");
                state
                    .manager
                    .broadcaster()
                    .send_to_peer(&player_id, ServerMessage::Error { message: "malformed message".into() })
                    .await;
                continue;
            }
        };

        let now = chrono::Utc::now().timestamp_millis();
        match state.router.dispatch(&player_id, now, message).await {
            RouteEffect::None => {}
            RouteEffect::Rebind { new_player_id } => {
                state.manager.broadcaster().rebind(&player_id, new_player_id.clone()).await;
                state.manager.sessions().forget(&player_id).await;
                player_id = new_player_id;
            }
        }
    }

    send_task.abort();
    let now = chrono::Utc::now().timestamp_millis();
    state.manager.broadcaster().unregister(&player_id).await;
    state.manager.sessions().disconnect(&player_id, now).await;
    state.manager.metrics().connection_closed();
    tracing::info!(%player_id, client_addr = %addr, "connection closed");
}

async fn send_json(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server message");
            return Ok(());
        }
    };
    sink.send(Message::Text(payload.into())).await
}
