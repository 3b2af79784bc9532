//! [`HealthMonitor`]: per-stream rolling quality metrics computed from
//! RTP arrivals and RTCP reports, §4.5.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::bandwidth::BandwidthEstimator;
use crate::sample::HealthSample;

const JITTER_SMOOTHING: f64 = 1.0 / 16.0;
const DEFAULT_SAMPLE_RING_CAPACITY: usize = 64;
const MAX_RTT_SAMPLES: usize = 16;
/// §4.5: loss rate is windowed over the last N seconds, default 5.
const DEFAULT_LOSS_WINDOW: Duration = Duration::from_secs(5);

/// A threshold watch: fires `on_cross` the first tick a sample satisfies
/// `predicate` after a tick where it did not.
struct ThresholdWatch {
    predicate: Box<dyn Fn(&HealthSample) -> bool + Send>,
    was_crossed: bool,
}

pub struct HealthMonitor {
    clock_rate: u32,
    loss_window: Duration,
    /// Arrival time and extended sequence of each packet received within
    /// the last `loss_window` (§4.5's "windowed over the last N seconds").
    arrivals: VecDeque<(Instant, u64)>,

    jitter_estimate: f64,
    prev_arrival: Option<Instant>,
    prev_timestamp: Option<u32>,

    rtt_samples: VecDeque<f64>,
    bandwidth: BandwidthEstimator,

    samples: VecDeque<HealthSample>,
    sample_capacity: usize,

    thresholds: Vec<ThresholdWatch>,
    on_threshold_crossed: Option<Box<dyn FnMut(&HealthSample) + Send>>,
}

impl HealthMonitor {
    pub fn new(clock_rate: u32, initial_bandwidth_bps: f64) -> Self {
        Self {
            clock_rate,
            loss_window: DEFAULT_LOSS_WINDOW,
            arrivals: VecDeque::new(),
            jitter_estimate: 0.0,
            prev_arrival: None,
            prev_timestamp: None,
            rtt_samples: VecDeque::with_capacity(16),
            bandwidth: BandwidthEstimator::new(initial_bandwidth_bps),
            samples: VecDeque::with_capacity(DEFAULT_SAMPLE_RING_CAPACITY),
            sample_capacity: DEFAULT_SAMPLE_RING_CAPACITY,
            thresholds: Vec::new(),
            on_threshold_crossed: None,
        }
    }

    /// Register a callback invoked the first time any registered
    /// threshold predicate transitions from false to true. Call
    /// `watch_threshold` first to register predicates.
    pub fn on_threshold_crossed(&mut self, callback: impl FnMut(&HealthSample) + Send + 'static) {
        self.on_threshold_crossed = Some(Box::new(callback));
    }

    pub fn watch_threshold(&mut self, predicate: impl Fn(&HealthSample) -> bool + Send + 'static) {
        self.thresholds.push(ThresholdWatch {
            predicate: Box::new(predicate),
            was_crossed: false,
        });
    }

    /// Record one RTP packet's arrival for loss and jitter accounting.
    pub fn record_arrival(&mut self, extended_seq: u64, timestamp: u32, arrival: Instant) {
        self.arrivals.push_back((arrival, extended_seq));
        while let Some(&(oldest, _)) = self.arrivals.front() {
            if arrival.saturating_duration_since(oldest) > self.loss_window {
                self.arrivals.pop_front();
            } else {
                break;
            }
        }

        if let (Some(prev_arrival), Some(prev_ts)) = (self.prev_arrival, self.prev_timestamp) {
            let arrival_gap_s = arrival.saturating_duration_since(prev_arrival).as_secs_f64();
            let timestamp_gap_s = (timestamp.wrapping_sub(prev_ts)) as f64 / self.clock_rate as f64;
            let d = (arrival_gap_s - timestamp_gap_s) * 1000.0; // ms
            self.jitter_estimate += (d.abs() - self.jitter_estimate) * JITTER_SMOOTHING;
            self.bandwidth.on_arrival_delta(d);
        }
        self.prev_arrival = Some(arrival);
        self.prev_timestamp = Some(timestamp);
    }

    /// Loss rate over the last `loss_window` (default 5s, §4.5):
    /// `(expected - received) / expected`, clamped to `[0, 1]`. `base` and
    /// `highest` are the min/max extended sequence still in the window —
    /// arrival order, not sequence order, so reordered packets can't be
    /// read off the deque's ends.
    pub fn loss_rate(&self) -> f64 {
        if self.arrivals.is_empty() {
            return 0.0;
        }
        let base = self.arrivals.iter().map(|&(_, seq)| seq).min().unwrap();
        let highest = self.arrivals.iter().map(|&(_, seq)| seq).max().unwrap();
        let expected = (highest - base + 1) as f64;
        if expected <= 0.0 {
            return 0.0;
        }
        ((expected - self.arrivals.len() as f64) / expected).clamp(0.0, 1.0)
    }

    pub fn jitter_ms(&self) -> f64 {
        self.jitter_estimate
    }

    /// Record one RTT observation (from a signaling heartbeat ack or an
    /// RTCP SR/RR LSR/DLSR computation).
    pub fn record_rtt_sample(&mut self, rtt_ms: f64) {
        if self.rtt_samples.len() == MAX_RTT_SAMPLES {
            self.rtt_samples.pop_front();
        }
        self.rtt_samples.push_back(rtt_ms);
    }

    pub fn rtt_ms(&self) -> f64 {
        if self.rtt_samples.is_empty() {
            return 0.0;
        }
        self.rtt_samples.iter().sum::<f64>() / self.rtt_samples.len() as f64
    }

    pub fn bandwidth_estimate_bps(&self) -> f64 {
        self.bandwidth.estimate_bps()
    }

    /// Advance the loss-based bandwidth track and snapshot a sample into
    /// the ring, firing any newly crossed threshold.
    pub fn tick(&mut self, now: Instant) -> HealthSample {
        self.bandwidth.on_loss_tick(self.loss_rate());

        let sample = HealthSample {
            loss_rate: self.loss_rate(),
            jitter_ms: self.jitter_ms(),
            rtt_ms: self.rtt_ms(),
            bandwidth_estimate_bps: self.bandwidth_estimate_bps(),
            timestamp: now,
        };

        if self.samples.len() == self.sample_capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        for watch in &mut self.thresholds {
            let crossed = (watch.predicate)(&sample);
            if crossed && !watch.was_crossed {
                if let Some(cb) = &mut self.on_threshold_crossed {
                    cb(&sample);
                }
            }
            watch.was_crossed = crossed;
        }

        sample
    }

    pub fn samples(&self) -> impl Iterator<Item = &HealthSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clean_loopback_has_zero_loss_and_near_zero_jitter() {
        let mut hm = HealthMonitor::new(8000, 1_000_000.0);
        let t0 = Instant::now();
        for i in 0..100u64 {
            hm.record_arrival(1000 + i, (i as u32) * 160, t0 + Duration::from_millis(i * 20));
        }
        assert_eq!(hm.loss_rate(), 0.0);
        assert!(hm.jitter_ms() < 1.0);
    }

    #[test]
    fn missing_sequence_raises_loss_rate() {
        let mut hm = HealthMonitor::new(8000, 1_000_000.0);
        let t0 = Instant::now();
        for seq in [1000u64, 1001, 1002, 1003, 1004, 1006, 1007, 1008, 1009] {
            hm.record_arrival(seq, seq as u32 * 160, t0 + Duration::from_millis(seq * 20));
        }
        assert!(hm.loss_rate() > 0.0);
    }

    #[test]
    fn loss_rate_only_reflects_the_last_window() {
        let mut hm = HealthMonitor::new(8000, 1_000_000.0);
        let t0 = Instant::now();
        // A burst with a gap, old enough to have fully aged out of the window...
        hm.record_arrival(1000, 0, t0);
        hm.record_arrival(1002, 320, t0 + Duration::from_millis(40));
        // ...followed by a clean run inside the window.
        for i in 0..50u64 {
            hm.record_arrival(2000 + i, (i as u32) * 160, t0 + Duration::from_secs(10) + Duration::from_millis(i * 20));
        }
        assert_eq!(hm.loss_rate(), 0.0);
    }

    #[test]
    fn rtt_is_averaged_over_samples() {
        let mut hm = HealthMonitor::new(8000, 1_000_000.0);
        hm.record_rtt_sample(10.0);
        hm.record_rtt_sample(20.0);
        assert_eq!(hm.rtt_ms(), 15.0);
    }

    #[test]
    fn threshold_callback_fires_once_on_crossing() {
        use std::sync::{Arc, Mutex};
        let mut hm = HealthMonitor::new(8000, 1_000_000.0);
        hm.watch_threshold(|s| s.loss_rate > 0.0);
        let fired = Arc::new(Mutex::new(0));
        let fired_clone = fired.clone();
        hm.on_threshold_crossed(move |_| {
            *fired_clone.lock().unwrap() += 1;
        });

        let t0 = Instant::now();
        hm.tick(t0); // loss_rate 0.0, no crossing
        hm.record_arrival(1000, 0, t0);
        hm.record_arrival(1002, 320, t0 + Duration::from_millis(40)); // gap at 1001
        hm.tick(t0);
        hm.tick(t0);
        assert_eq!(*fired.lock().unwrap(), 1);
    }
}
