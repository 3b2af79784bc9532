//! [`TransportSink`]: the narrow capability a `StreamManager` needs to
//! hand sealed bytes off to the network (§4.8's `SignalingEngine` has the
//! same shape for its own JSON frames). Keeps this crate sans-I/O: it
//! never opens a socket itself, it just describes the one thing the
//! embedder must be able to do.

use std::net::SocketAddr;

use arc_shared::error::Result;

pub trait TransportSink {
    /// Send `bytes` to `peer`. Implementations decide retry/backoff
    /// policy; a failure here is always `ErrTransportWriteFailed`-shaped
    /// from the caller's point of view.
    fn send_to(&self, peer: SocketAddr, bytes: &[u8]) -> Result<()>;
}
