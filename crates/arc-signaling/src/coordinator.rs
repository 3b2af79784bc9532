//! The narrow slice of `StreamManager` that `SignalingEngine` needs,
//! expressed as a capability trait so the two crates don't depend on
//! each other directly — `arc-core` wires the real implementation in.

use arc_shared::error::Result;

use crate::message::StreamType;

/// Wire parameters of a `StreamStart` message (§6), handed to
/// [`StreamCoordinator::create_stream`] without requiring `arc-signaling`
/// to depend on `arc-core`'s concrete `Stream` type.
#[derive(Debug, Clone)]
pub struct StreamParams {
    pub ssrc: u32,
    pub stream_type: StreamType,
    pub codec: String,
    pub encryption_enabled: bool,
    pub key_id: String,
}

/// Stream-level request issued by a `StreamStart`/`StreamStop` message.
pub trait StreamCoordinator {
    /// Create and activate a stream for the given wire parameters.
    fn create_stream(&mut self, stream_id: &str, params: StreamParams) -> Result<()>;

    /// Stop a previously created stream.
    fn stop_stream(&mut self, stream_id: &str) -> Result<()>;

    /// Forward a quality-adaptation request to the stream's encoder
    /// interface.
    fn adapt_quality(&mut self, stream_id: &str, bitrate: u32, resolution: &str, fps: u32) -> Result<()>;

    /// Tear down every stream owned by this session, e.g. on session
    /// close or fatal error.
    fn stop_all(&mut self);
}
