use std::time::Instant;

/// A single point-in-time quality reading for one stream, §3.
#[derive(Debug, Clone, Copy)]
pub struct HealthSample {
    pub loss_rate: f64,
    pub jitter_ms: f64,
    pub rtt_ms: f64,
    pub bandwidth_estimate_bps: f64,
    pub timestamp: Instant,
}
