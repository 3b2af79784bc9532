#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! `ArcSignaling`: the message-driven session/stream state machine of
//! §4.8. [`message`] defines the closed wire vocabulary (§6);
//! [`key_exchange`] drives the ECDH handshake a `Connect`/`ConnectAck`
//! pair carries; [`coordinator`] is the narrow capability trait
//! `SignalingEngine` uses to reach `StreamManager` without a direct
//! crate dependency; [`engine`] ties them into the actual state machine.

pub mod coordinator;
pub mod engine;
pub mod key_exchange;
pub mod message;

pub use coordinator::{StreamCoordinator, StreamParams};
pub use engine::{SessionState, SignalingEngine};
pub use message::SignalingMessage;
