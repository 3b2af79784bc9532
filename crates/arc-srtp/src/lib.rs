#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! SRTP (RFC 3711/7714) sealing, opening and key derivation, §4.2.
//!
//! [`CryptoSession`] holds the negotiated suite and policy (rotation
//! threshold, replay window size); [`CryptoContext`] holds the per-SSRC
//! derived keys, rollover tracker and replay window it acts on.

mod cipher;
pub mod context;
mod key_derivation;
pub mod protection_profile;

pub use context::{CryptoContext, CryptoSession};
pub use protection_profile::ProtectionProfile;
