#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Quality adaptation (§4.6): an AIMD controller that steps a stream up
//! or down a discrete quality ladder in response to `arc-health` samples.

mod controller;
mod quality;

pub use controller::{AdaptController, AdaptDecision, AdaptReason};
pub use quality::{QualityLevel, VideoTarget};
