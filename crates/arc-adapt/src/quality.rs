//! Discrete quality ladder (§4.6) and the per-level bitrate/resolution/
//! framerate targets `AdaptController` steps between.

/// One rung of the quality ladder, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityLevel {
    pub fn step_down(self) -> Self {
        match self {
            QualityLevel::Ultra => QualityLevel::High,
            QualityLevel::High => QualityLevel::Medium,
            QualityLevel::Medium => QualityLevel::Low,
            QualityLevel::Low => QualityLevel::VeryLow,
            QualityLevel::VeryLow => QualityLevel::VeryLow,
        }
    }

    pub fn step_up(self) -> Self {
        match self {
            QualityLevel::VeryLow => QualityLevel::Low,
            QualityLevel::Low => QualityLevel::Medium,
            QualityLevel::Medium => QualityLevel::High,
            QualityLevel::High => QualityLevel::Ultra,
            QualityLevel::Ultra => QualityLevel::Ultra,
        }
    }

    /// Target encoder parameters for video streams at this level.
    pub fn video_target(self) -> VideoTarget {
        match self {
            QualityLevel::Ultra => VideoTarget { bitrate_bps: 4_000_000, width: 1920, height: 1080, fps: 30 },
            QualityLevel::High => VideoTarget { bitrate_bps: 2_000_000, width: 1280, height: 720, fps: 30 },
            QualityLevel::Medium => VideoTarget { bitrate_bps: 1_000_000, width: 854, height: 480, fps: 30 },
            QualityLevel::Low => VideoTarget { bitrate_bps: 500_000, width: 640, height: 360, fps: 20 },
            QualityLevel::VeryLow => VideoTarget { bitrate_bps: 150_000, width: 320, height: 180, fps: 15 },
        }
    }

    /// Target bitrate for audio streams at this level (no resolution/fps).
    pub fn audio_bitrate_bps(self) -> u32 {
        match self {
            QualityLevel::Ultra => 128_000,
            QualityLevel::High => 64_000,
            QualityLevel::Medium => 32_000,
            QualityLevel::Low => 16_000,
            QualityLevel::VeryLow => 8_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTarget {
    pub bitrate_bps: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_clamp_at_the_ends() {
        assert_eq!(QualityLevel::Ultra.step_up(), QualityLevel::Ultra);
        assert_eq!(QualityLevel::VeryLow.step_down(), QualityLevel::VeryLow);
    }

    #[test]
    fn ladder_is_ordered() {
        assert!(QualityLevel::VeryLow < QualityLevel::Low);
        assert!(QualityLevel::Low < QualityLevel::Medium);
        assert!(QualityLevel::Medium < QualityLevel::High);
        assert!(QualityLevel::High < QualityLevel::Ultra);
    }

    #[test]
    fn video_targets_decrease_monotonically_down_the_ladder() {
        assert!(QualityLevel::Ultra.video_target().bitrate_bps > QualityLevel::High.video_target().bitrate_bps);
        assert!(QualityLevel::High.video_target().bitrate_bps > QualityLevel::Medium.video_target().bitrate_bps);
    }
}
