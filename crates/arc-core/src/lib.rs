#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Session/stream lifecycle, routing and wiring for the media transport
//! core (§3, §4.7). [`session`] and [`stream`] hold the data model;
//! [`manager::StreamManager`] is the owning router that drives every
//! crypto/jitter/PLC/health/adapt pipeline; [`key_provider`] and
//! [`transport`] are the two capability interfaces an embedder must
//! supply; [`handle::SessionHandle`] lets `arc_signaling::SignalingEngine`
//! reach a shared `StreamManager` without depending on it directly.

pub mod handle;
pub mod key_provider;
pub mod manager;
pub mod session;
pub mod stream;
pub mod transport;

pub use handle::SessionHandle;
pub use key_provider::InMemoryKeyProvider;
pub use manager::{CreateStreamParams, DeliverOutcome, StreamManager};
pub use session::{Session, SessionState};
pub use stream::{MediaKind, Stats, Stream, StreamState};
pub use transport::TransportSink;
