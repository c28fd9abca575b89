//! WebSocket status feed

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, warn};

use crate::core::AppState;
use crate::events::Subscription;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    let mut subscription = state.broadcaster.subscribe();
    let subscriber_id = subscription.id;

    debug!("WebSocket client {} connected", subscriber_id);

    forward_events(&mut subscription, sender, receiver).await;

    state.broadcaster.unsubscribe(subscriber_id);
    debug!("WebSocket client {} disconnected", subscriber_id);
}

/// Send each queued event as a JSON text frame until the subscription
/// closes, the sink rejects a frame or the client closes. Inbound frames
/// are read only to notice the close.
pub async fn forward_events<Tx, Rx, E>(subscription: &mut Subscription, mut sender: Tx, mut receiver: Rx)
where
    Tx: Sink<WsMessage> + Unpin,
    Rx: Stream<Item = Result<WsMessage, E>> + Unpin,
{
    loop {
        tokio::select! {
            event = subscription.receiver.recv() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialise status event: {}", e);
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
