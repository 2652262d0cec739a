//! Transport layer for the conversational gateway.
//!
//! Provides:
//! - Wire protocol (plain text frames)
//! - WebSocket transport and HTTP status routes (feature: websocket)

#[cfg(feature = "websocket")]
pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "websocket")]
pub use protocol::ClientFrame;
#[cfg(feature = "websocket")]
pub use websocket::{DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PATH, WsState, create_router};
