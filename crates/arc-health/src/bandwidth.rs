//! Hybrid loss/delay-based bandwidth estimator, §4.5.
//!
//! The estimate reported is the smaller of two independently maintained
//! tracks: a loss-based one (multiplicative decrease on loss bursts,
//! additive increase when loss is negligible) and a delay-based one
//! (multiplicative decrease when recent arrival-time deltas show a
//! sustained upward trend — a sign of queueing before loss appears).
//! The AIMD constants are the implementer decision recorded in
//! `DESIGN.md` for the spec's open question on this estimator.

use std::collections::VecDeque;

const LOSS_INCREASE_STEP_BPS: f64 = 50_000.0;
const LOSS_DECREASE_FACTOR: f64 = 0.85;
const DELAY_DECREASE_FACTOR: f64 = 0.90;
const DELAY_TREND_WINDOW: usize = 5;
const LOSS_STEP_DOWN_THRESHOLD: f64 = 0.05;
const LOSS_STEP_UP_THRESHOLD: f64 = 0.01;

pub struct BandwidthEstimator {
    loss_based_bps: f64,
    delay_based_bps: f64,
    delay_deltas: VecDeque<f64>,
}

impl BandwidthEstimator {
    pub fn new(initial_bps: f64) -> Self {
        Self {
            loss_based_bps: initial_bps,
            delay_based_bps: initial_bps,
            delay_deltas: VecDeque::with_capacity(DELAY_TREND_WINDOW),
        }
    }

    /// Current hybrid estimate: the smaller of the two tracks.
    pub fn estimate_bps(&self) -> f64 {
        self.loss_based_bps.min(self.delay_based_bps)
    }

    /// Adjust the loss-based track for one observation tick.
    pub fn on_loss_tick(&mut self, loss_rate: f64) {
        if loss_rate > LOSS_STEP_DOWN_THRESHOLD {
            self.loss_based_bps *= LOSS_DECREASE_FACTOR;
        } else if loss_rate <= LOSS_STEP_UP_THRESHOLD {
            self.loss_based_bps += LOSS_INCREASE_STEP_BPS;
        }
    }

    /// Feed one inter-arrival delta (ms, "arrival gap minus expected
    /// timestamp gap") into the delay-trend detector.
    pub fn on_arrival_delta(&mut self, delta_ms: f64) {
        if self.delay_deltas.len() == DELAY_TREND_WINDOW {
            self.delay_deltas.pop_front();
        }
        self.delay_deltas.push_back(delta_ms);

        if self.delay_deltas.len() == DELAY_TREND_WINDOW && self.has_positive_trend() {
            self.delay_based_bps *= DELAY_DECREASE_FACTOR;
        }
    }

    /// A sustained upward trend: every consecutive pair in the window
    /// increases.
    fn has_positive_trend(&self) -> bool {
        self.delay_deltas.iter().zip(self.delay_deltas.iter().skip(1)).all(|(a, b)| b > a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decreases_on_sustained_loss() {
        let mut est = BandwidthEstimator::new(1_000_000.0);
        for _ in 0..3 {
            est.on_loss_tick(0.08);
        }
        assert!(est.estimate_bps() < 1_000_000.0);
    }

    #[test]
    fn increases_additively_when_loss_negligible() {
        let mut est = BandwidthEstimator::new(1_000_000.0);
        est.on_loss_tick(0.005);
        assert!(est.estimate_bps() > 1_000_000.0);
    }

    #[test]
    fn holds_in_the_dead_zone() {
        let mut est = BandwidthEstimator::new(1_000_000.0);
        est.on_loss_tick(0.03);
        assert_eq!(est.estimate_bps(), 1_000_000.0);
    }

    #[test]
    fn delay_trend_decreases_estimate() {
        let mut est = BandwidthEstimator::new(1_000_000.0);
        for delta in [1.0, 2.0, 3.0, 4.0, 5.0] {
            est.on_arrival_delta(delta);
        }
        assert!(est.estimate_bps() < 1_000_000.0);
    }

    #[test]
    fn estimate_is_the_smaller_track() {
        let mut est = BandwidthEstimator::new(1_000_000.0);
        est.on_loss_tick(0.005); // loss track goes up
        for delta in [1.0, 2.0, 3.0, 4.0, 5.0] {
            est.on_arrival_delta(delta); // delay track goes down
        }
        assert_eq!(est.estimate_bps(), est.delay_based_bps);
    }
}
