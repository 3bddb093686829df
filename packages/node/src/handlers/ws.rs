//! `GET /ws`: one JSON-RPC message per text frame.
//!
//! Notices a handler pushes are sent as separate frames, in order, ahead of
//! the frame carrying that message's response.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chainrpc::PushError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::AppState;

/// `GET /ws`
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(mut socket: WebSocket, state: AppState) {
    debug!("websocket connection established");
    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("websocket receive failed: {e}");
                break;
            }
        };
        if let Err(e) = respond(&mut socket, &state, text).await {
            warn!("websocket send failed: {e}");
            break;
        }
    }
    debug!("websocket connection closed");
}

/// Run one message, forwarding pushes while it executes, then send the response.
async fn respond(socket: &mut WebSocket, state: &AppState, text: String) -> Result<(), axum::Error> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let service = state.service.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        let push = |message: String| tx.send(message).map_err(|e| PushError(e.to_string()));
        service.handle_with_push(&text, &push)
    });

    let joined = loop {
        tokio::select! {
            Some(notice) = rx.recv() => socket.send(Message::Text(notice.into())).await?,
            joined = &mut task => break joined,
        }
    };
    while let Ok(notice) = rx.try_recv() {
        socket.send(Message::Text(notice.into())).await?;
    }

    match joined {
        Ok(response) => socket.send(Message::Text(response.into())).await,
        Err(e) => {
            warn!("rpc worker failed: {e}");
            Ok(())
        }
    }
}
