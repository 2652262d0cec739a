//! Wire protocol: plain text frames in both directions.

use axum::extract::ws::{CloseFrame, Message, close_code};
use chat_gateway_core::{ErrorKind, GatewayError, Outbound};

/// What the socket loop should do with an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A user message.
    Text(String),
    /// The client is closing the connection.
    Close,
    /// Control or undecodable frame; nothing to do.
    Skip,
}

/// Decode an inbound WebSocket frame.
///
/// Binary frames are accepted when they carry UTF-8.
#[must_use]
pub fn decode(msg: Message) -> ClientFrame {
    match msg {
        Message::Text(text) => ClientFrame::Text(text.as_str().to_owned()),
        Message::Binary(data) => match String::from_utf8(data.to_vec()) {
            Ok(text) => ClientFrame::Text(text),
            Err(_) => ClientFrame::Skip,
        },
        Message::Close(_) => ClientFrame::Close,
        Message::Ping(_) | Message::Pong(_) => ClientFrame::Skip,
    }
}

/// Encode an outbound message as a text frame.
#[must_use]
pub fn encode(msg: Outbound) -> Message {
    Message::Text(msg.into_text().into())
}

/// Close frame sent when a connection cannot be given a session.
#[must_use]
pub fn refusal(err: &GatewayError) -> Message {
    let code = match err.kind() {
        ErrorKind::Capacity => close_code::AGAIN,
        _ => close_code::ERROR,
    };
    Message::Close(Some(CloseFrame {
        code,
        reason: err.to_string().into(),
    }))
}
