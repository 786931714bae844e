//! Websocket subscriber endpoint.
//!
//! Each connection is one hub subscription. Outbound frames are the hub's
//! serialized messages; inbound frames are ignored apart from close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::AppState;

/// GET /api/v1/ws
pub(super) async fn subscribe(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

async fn serve_subscriber(socket: WebSocket, state: AppState) {
    let mut subscription = state.hub.subscribe();
    let id = subscription.id();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(text) = outbound else {
                    tracing::debug!(subscriber = id, "ws: removed by hub");
                    break;
                };
                let frame = Message::Text(text.as_ref().into());
                match tokio::time::timeout(state.ws_send_timeout, sink.send(frame)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(subscriber = id, error = %e, "ws: send failed");
                        break;
                    }
                    Err(_) => {
                        tracing::warn!(subscriber = id, "ws: send timed out; dropping subscriber");
                        break;
                    }
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(subscriber = id, error = %e, "ws: receive failed");
                    break;
                }
            },
        }
    }

    subscription.close();
    let _ = tokio::time::timeout(state.ws_send_timeout, sink.close()).await;
}
