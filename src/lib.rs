#![doc = include_str!("../README.md")]

#[macro_use]
mod macros;

mod auth;
mod bridge;
mod error;
mod events;
mod http;
pub mod jsonapi;
pub mod models;
pub mod controllers;
pub mod websocket;

pub use auth::{AuthController, LoginOutcome, OtpDestination, OtpType};
pub use bridge::{AlarmBridge, BridgeOpts};
pub use error::{Error, Result};
pub use events::{BrokerMessage, EventBroker, Handler, Subscription, Topic};
pub use http::{Accept, Credentials, HttpSession};
pub use models::{AnyResource, ResourceType, TypedResource};
pub use websocket::{WebSocketClient, WebSocketState};

pub use url::Url;
