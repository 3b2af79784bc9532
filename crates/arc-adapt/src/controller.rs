//! [`AdaptController`]: translates [`HealthSample`]s into quality-ladder
//! decisions (§4.6).

use std::time::{Duration, Instant};

use arc_health::HealthSample;
use arc_shared::config::AdaptConfig;

use crate::quality::QualityLevel;

const SUSTAINED_WINDOW_MS: u64 = 5_000;

/// Why a decision was made, surfaced to signaling as the `reason` field
/// of a `QualityAdapt` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptReason {
    Network,
    Bandwidth,
    Keyframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptDecision {
    StepDown(QualityLevel, AdaptReason),
    StepUp(QualityLevel, AdaptReason),
    Hold,
}

/// AIMD quality controller for one stream. Holds the current level and
/// enforces the minimum dwell time between changes (bypassed only by an
/// emergency downgrade, property 6, §8).
pub struct AdaptController {
    config: AdaptConfig,
    level: QualityLevel,
    last_change: Option<Instant>,
    good_streak_start: Option<Instant>,
    current_bitrate_bps: f64,
}

impl AdaptController {
    pub fn new(config: AdaptConfig, initial_level: QualityLevel, initial_bitrate_bps: f64) -> Self {
        Self {
            config,
            level: initial_level,
            last_change: None,
            good_streak_start: None,
            current_bitrate_bps: initial_bitrate_bps,
        }
    }

    pub fn level(&self) -> QualityLevel {
        self.level
    }

    /// Evaluate one health sample and decide whether to change level.
    /// `now` must be monotonic with samples fed on previous calls.
    pub fn evaluate(&mut self, sample: &HealthSample, now: Instant) -> AdaptDecision {
        let emergency = sample.loss_rate > self.config.emergency_loss_threshold;
        let dwell_elapsed = self
            .last_change
            .map(|t| now.saturating_duration_since(t) >= Duration::from_millis(self.config.min_dwell_ms))
            .unwrap_or(true);

        let should_step_down =
            sample.loss_rate > self.config.loss_step_down || sample.rtt_ms > self.config.rtt_step_down_ms;

        if should_step_down && (emergency || dwell_elapsed) {
            self.good_streak_start = None;
            return self.apply_step_down(now);
        }

        if !dwell_elapsed {
            return AdaptDecision::Hold;
        }

        let is_good = sample.loss_rate < self.config.loss_step_up && sample.rtt_ms < self.config.rtt_step_up_ms;
        let headroom_ok = sample.bandwidth_estimate_bps >= 1.5 * self.current_bitrate_bps;

        if is_good && headroom_ok {
            let streak_start = *self.good_streak_start.get_or_insert(now);
            if now.saturating_duration_since(streak_start) >= Duration::from_millis(SUSTAINED_WINDOW_MS) {
                return self.apply_step_up(now);
            }
            AdaptDecision::Hold
        } else {
            self.good_streak_start = None;
            AdaptDecision::Hold
        }
    }

    fn apply_step_down(&mut self, now: Instant) -> AdaptDecision {
        let next = self.level.step_down();
        let changed = next != self.level;
        self.level = next;
        self.last_change = Some(now);
        self.current_bitrate_bps = self.current_target_bitrate_bps();
        if changed {
            AdaptDecision::StepDown(self.level, AdaptReason::Network)
        } else {
            AdaptDecision::Hold
        }
    }

    fn apply_step_up(&mut self, now: Instant) -> AdaptDecision {
        let next = self.level.step_up();
        let changed = next != self.level;
        self.level = next;
        self.last_change = Some(now);
        self.good_streak_start = None;
        self.current_bitrate_bps = self.current_target_bitrate_bps();
        if changed {
            AdaptDecision::StepUp(self.level, AdaptReason::Bandwidth)
        } else {
            AdaptDecision::Hold
        }
    }

    fn current_target_bitrate_bps(&self) -> f64 {
        self.level.video_target().bitrate_bps as f64
    }
}
