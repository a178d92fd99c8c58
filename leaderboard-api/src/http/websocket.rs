//! WebSocket subscription endpoint
//!
//! A connected client only listens. Each connection becomes a
//! `ConnectionSession` on the requested channel; inbound frames are read
//! solely to notice the client leaving.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{future, SinkExt, StreamExt};
use leaderboard_core::models::ChannelId;
use leaderboard_hub::ConnectionSession;
use tracing::info;

use super::{leaderboard::ChannelQuery, AppState};

pub async fn websocket_handler(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let channel = ChannelId::or_default(query.game_id);

    ws.max_message_size(state.settings.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, channel))
}

async fn handle_socket(socket: WebSocket, state: AppState, channel: ChannelId) {
    let session = ConnectionSession::open(
        state.hub.clone(),
        channel.clone(),
        state.settings.outbound_queue_capacity,
    );
    info!(session_id = %session.id(), channel = %channel, "WebSocket connection established");

    let (sink, stream) = socket.split();
    let sink = sink.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });
    let stream =
        stream.take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))));

    session.run(sink, stream).await;

    info!(channel = %channel, "WebSocket connection closed");
}
