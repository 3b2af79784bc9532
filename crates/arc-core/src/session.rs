//! [`Session`]: a negotiated association between two peers, §3. Created
//! by `SignalingEngine` on an accepted `CONNECT`, owning zero or more
//! `Stream`s until explicit close, fatal error, or heartbeat timeout.

use std::time::Instant;

use arc_shared::config::CryptoSuite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Negotiating,
    Established,
    Closing,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub local_peer_id: String,
    pub remote_peer_id: String,
    pub suite: CryptoSuite,
    pub created_at: Instant,
    pub state: SessionState,
    pub(crate) stream_ids: Vec<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        local_peer_id: impl Into<String>,
        remote_peer_id: impl Into<String>,
        suite: CryptoSuite,
        created_at: Instant,
    ) -> Self {
        Self {
            id: id.into(),
            local_peer_id: local_peer_id.into(),
            remote_peer_id: remote_peer_id.into(),
            suite,
            created_at,
            state: SessionState::Negotiating,
            stream_ids: Vec::new(),
        }
    }

    pub fn stream_ids(&self) -> &[String] {
        &self.stream_ids
    }
}
