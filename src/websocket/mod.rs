//! WebSocket event pipeline: raw frame classification and the persistent
//! client that feeds classified messages into the event broker.

mod client;
pub mod messages;

pub use client::{WebSocketClient, WebSocketState, MAX_CONNECTION_ATTEMPTS};
pub use messages::{
    EventMessage, PropertyChangeMessage, ResourceEventType, ResourcePropertyChangeType, WsMessage,
};
