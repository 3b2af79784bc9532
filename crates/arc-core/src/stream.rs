//! [`Stream`]: a unidirectional media flow, §3. Exclusively owned by
//! `StreamManager`; in turn it exclusively owns its `CryptoContext`,
//! `JitterBuffer`, `PlcEngine` and `HealthMonitor` — the per-stream
//! single-writer invariant of §5 that removes the need for locking
//! inside any of those four.

use arc_adapt::{AdaptController, QualityLevel};
use arc_health::HealthMonitor;
use arc_jitter::plc::MediaKind as PlcMediaKind;
use arc_jitter::{JitterBuffer, PlcEngine};
use arc_rtp::sequence::RolloverTracker;
use arc_shared::config::{AdaptConfig, JitterConfig};
use arc_shared::error::{Error, Result};
use arc_srtp::CryptoContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    fn as_plc(self) -> PlcMediaKind {
        match self {
            MediaKind::Audio => PlcMediaKind::Audio,
            MediaKind::Video => PlcMediaKind::Video,
        }
    }

    /// RTP clock rate assumed for jitter computation, matching the
    /// `opus`/`vp8` defaults used throughout the loopback scenarios
    /// (§8, Scenario A uses a 960-sample audio step at an 8kHz quotient
    /// consistent with `arc-health`'s own tests).
    pub fn clock_rate_hz(self) -> u32 {
        match self {
            MediaKind::Audio => 48_000,
            MediaKind::Video => 90_000,
        }
    }
}

/// Stream lifecycle state, §3/§4.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Initializing,
    Active,
    Paused,
    Stopped,
    Error,
}

impl StreamState {
    /// Whether moving from `self` to `next` is one of the transitions
    /// enumerated in §4.7. `Error` is reachable from any state and is
    /// terminal; every other transition not listed is `InvalidTransition`.
    pub fn can_transition_to(self, next: StreamState) -> bool {
        use StreamState::*;
        match next {
            Error => self != Error,
            Active => matches!(self, Initializing | Paused),
            Paused => matches!(self, Active),
            Stopped => matches!(self, Initializing | Active | Paused),
            Initializing => false,
        }
    }
}

pub struct Stream {
    pub id: String,
    pub session_id: String,
    pub kind: MediaKind,
    pub ssrc: u32,
    pub payload_type: u8,
    pub codec: String,
    pub target_bitrate_bps: u32,
    pub resolution: Option<(u32, u32)>,
    pub encryption_enabled: bool,
    pub state: StreamState,

    pub(crate) crypto: Option<CryptoContext>,
    pub(crate) roc_tracker: RolloverTracker,
    pub(crate) jitter: JitterBuffer,
    pub(crate) plc: PlcEngine,
    pub(crate) health: HealthMonitor,
    pub(crate) adapt: AdaptController,

    pub(crate) packets_received: u64,
    pub(crate) packets_sent: u64,
    pub(crate) replayed: u64,
    pub(crate) auth_failed: u64,
    pub(crate) concealed: u64,
}

impl Stream {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        session_id: String,
        kind: MediaKind,
        ssrc: u32,
        payload_type: u8,
        codec: String,
        encryption_enabled: bool,
        crypto: Option<CryptoContext>,
        jitter_cfg: &JitterConfig,
        plc_max_conceal_packets: u32,
        adapt_cfg: AdaptConfig,
        initial_level: QualityLevel,
    ) -> Self {
        let target_bitrate_bps = match kind {
            MediaKind::Audio => initial_level.audio_bitrate_bps(),
            MediaKind::Video => initial_level.video_target().bitrate_bps,
        };
        let resolution = match kind {
            MediaKind::Audio => None,
            MediaKind::Video => {
                let t = initial_level.video_target();
                Some((t.width, t.height))
            }
        };
        Self {
            id,
            session_id,
            kind,
            ssrc,
            payload_type,
            codec,
            target_bitrate_bps,
            resolution,
            encryption_enabled,
            state: StreamState::Initializing,
            crypto,
            roc_tracker: RolloverTracker::new(),
            jitter: JitterBuffer::new(jitter_cfg.min_depth_ms, jitter_cfg.max_depth_ms, jitter_cfg.initial_depth_ms),
            plc: PlcEngine::new(kind.as_plc(), plc_max_conceal_packets),
            health: HealthMonitor::new(kind.clock_rate_hz(), target_bitrate_bps as f64),
            adapt: AdaptController::new(adapt_cfg, initial_level, target_bitrate_bps as f64),
            packets_received: 0,
            packets_sent: 0,
            replayed: 0,
            auth_failed: 0,
            concealed: 0,
        }
    }

    pub fn transition(&mut self, next: StreamState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::ErrInvalidTransition);
        }
        self.state = next;
        Ok(())
    }

    pub fn quality_level(&self) -> QualityLevel {
        self.adapt.level()
    }
}

/// Snapshot of a stream's counters, returned by `StreamManager::get_stats`
/// (§4.7, §7's user-visible error surface).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub state: StreamState,
    pub quality_level: QualityLevel,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub replayed: u64,
    pub auth_failed: u64,
    pub concealed: u64,
    pub loss_rate: f64,
    pub jitter_ms: f64,
    pub rtt_ms: f64,
    pub bandwidth_estimate_bps: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions_per_table() {
        assert!(StreamState::Initializing.can_transition_to(StreamState::Active));
        assert!(StreamState::Active.can_transition_to(StreamState::Paused));
        assert!(StreamState::Paused.can_transition_to(StreamState::Active));
        assert!(StreamState::Active.can_transition_to(StreamState::Stopped));
        assert!(StreamState::Initializing.can_transition_to(StreamState::Stopped));
        assert!(StreamState::Paused.can_transition_to(StreamState::Stopped));
        assert!(StreamState::Active.can_transition_to(StreamState::Error));
        assert!(StreamState::Stopped.can_transition_to(StreamState::Error));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        assert!(!StreamState::Stopped.can_transition_to(StreamState::Active));
        assert!(!StreamState::Error.can_transition_to(StreamState::Active));
        assert!(!StreamState::Initializing.can_transition_to(StreamState::Paused));
        assert!(!StreamState::Error.can_transition_to(StreamState::Error));
    }
}
