#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Rolling connection-quality metrics (§4.5): loss rate, RFC 3550
//! interarrival jitter, RTT and a hybrid loss/delay-based bandwidth
//! estimate. Feeds `arc-adapt`'s quality decisions.

mod bandwidth;
mod monitor;
mod sample;

pub use bandwidth::BandwidthEstimator;
pub use monitor::HealthMonitor;
pub use sample::HealthSample;
