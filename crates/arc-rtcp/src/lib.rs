#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! RTCP packet parsing and construction (RFC 3550 §6, RFC 4585).
//!
//! Every packet type here obeys the same round-trip law as `arc-rtp`:
//! `unmarshal(marshal(p)) == p`. [`Packet`] additionally parses and
//! serializes *compound* RTCP packets (several packets back to back in
//! one datagram), terminating when the header length accumulator reaches
//! the end of the buffer, per RFC 3550 §6.1.

pub mod goodbye;
pub mod header;
pub mod nack;
pub mod packet;
pub mod payload_feedbacks;
pub mod receiver_report;
pub mod reception_report;
pub mod sender_report;
pub mod source_description;

pub use goodbye::Goodbye;
pub use header::{Header, PacketType};
pub use nack::TransportLayerNack;
pub use packet::Packet;
pub use payload_feedbacks::PictureLossIndication;
pub use receiver_report::ReceiverReport;
pub use reception_report::ReceptionReport;
pub use sender_report::SenderReport;
pub use source_description::SourceDescription;
