//! Layered configuration shared across the transport core.
//!
//! Each component owns a small `Default`-implementing options struct;
//! `ArcConfig` aggregates them the way `rtc`'s `RTCConfiguration` composes
//! its sub-configs. Nothing here reads the environment or process
//! arguments directly — that is left to whatever binary embeds the core
//! (see the `loopback` demo, which maps `clap` flags onto these fields).

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_multiplier: u32,
    pub signaling_reply_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 5_000,
            heartbeat_timeout_multiplier: 3,
            signaling_reply_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoSuite {
    Aes128Gcm,
    Aes256Gcm,
}

impl Default for CryptoSuite {
    fn default() -> Self {
        CryptoSuite::Aes128Gcm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoConfig {
    pub suite: CryptoSuite,
    pub key_rotation_packets: u64,
    pub key_rotation_interval_s: u64,
    pub replay_window_size: u64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            suite: CryptoSuite::default(),
            key_rotation_packets: 1 << 31,
            key_rotation_interval_s: 86_400,
            replay_window_size: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterConfig {
    pub min_depth_ms: u32,
    pub max_depth_ms: u32,
    pub initial_depth_ms: u32,
    pub adapt_interval_ms: u32,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            min_depth_ms: 5,
            max_depth_ms: 50,
            initial_depth_ms: 10,
            adapt_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlcConfig {
    pub enabled: bool,
    pub max_conceal_packets: u32,
    pub audio_fade_out_frames: u32,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_conceal_packets: 5,
            audio_fade_out_frames: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptConfig {
    pub loss_step_down: f64,
    pub rtt_step_down_ms: f64,
    pub loss_step_up: f64,
    pub rtt_step_up_ms: f64,
    pub min_dwell_ms: u64,
    pub emergency_loss_threshold: f64,
}

impl Default for AdaptConfig {
    fn default() -> Self {
        Self {
            loss_step_down: 0.05,
            rtt_step_down_ms: 100.0,
            loss_step_up: 0.01,
            rtt_step_up_ms: 50.0,
            min_dwell_ms: 2_000,
            emergency_loss_threshold: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Aggregate configuration for one `StreamManager`/`SignalingEngine` pair.
#[derive(Debug, Clone, Default)]
pub struct ArcConfig {
    pub session: SessionConfig,
    pub crypto: CryptoConfig,
    pub jitter: JitterConfig,
    pub plc: PlcConfig,
    pub adapt: AdaptConfig,
    pub logging: LoggingConfig,
}

impl ArcConfig {
    /// Validate cross-field invariants. Called once at construction time;
    /// the core refuses to start on a `ConfigurationError`.
    pub fn validate(&self) -> Result<()> {
        let size = self.crypto.replay_window_size;
        let is_pow2_in_range = (6..=15).any(|i| size == 1 << i);
        if !is_pow2_in_range {
            return Err(Error::ErrInvalidConfiguration(
                "crypto.replay_window_size must be a power of two in [64, 32768]",
            ));
        }
        if !(self.jitter.min_depth_ms <= self.jitter.initial_depth_ms
            && self.jitter.initial_depth_ms <= self.jitter.max_depth_ms)
        {
            return Err(Error::ErrInvalidConfiguration(
                "jitter depths must satisfy min <= initial <= max",
            ));
        }
        if self.adapt.loss_step_down <= self.adapt.loss_step_up {
            return Err(Error::ErrInvalidConfiguration(
                "adapt.loss_step_down must be looser (larger) than adapt.loss_step_up",
            ));
        }
        if self.adapt.rtt_step_down_ms <= self.adapt.rtt_step_up_ms {
            return Err(Error::ErrInvalidConfiguration(
                "adapt.rtt_step_down_ms must be looser (larger) than adapt.rtt_step_up_ms",
            ));
        }
        Ok(())
    }
}
