#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Adaptive jitter buffer (§4.3) and packet-loss concealment (§4.4).
//!
//! These are sans-I/O stages: no sockets, no sleeping. A caller drives
//! [`JitterBuffer`] with `push`/`pop` and an explicit `Instant`, exactly
//! the way `rtc-interceptor`'s tests advance time manually instead of
//! mocking a ticker.

pub mod buffer;
pub mod plc;

pub use buffer::{JitterBuffer, PopOutcome};
pub use plc::PlcEngine;
