//! [`StreamManager`]: owns every live `Stream`, enforces the state
//! machine of §4.7, and routes inbound/outbound packets through each
//! stream's crypto/jitter/PLC/health pipeline.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;

use arc_adapt::{AdaptDecision, QualityLevel};
use arc_health::HealthSample;
use arc_jitter::PopOutcome;
use arc_rtcp::Packet as RtcpPacket;
use arc_rtp::extension::Extension;
use arc_rtp::header::Header;
use arc_rtp::packet::Packet as RtpPacket;
use arc_shared::config::{ArcConfig, CryptoSuite};
use arc_shared::crypto::KeyProvider;
use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, Unmarshal};
use arc_shared::time::SystemInstant;
use arc_shared::util::is_rtcp;
use arc_srtp::{CryptoSession, ProtectionProfile};

use crate::session::{Session, SessionState};
use crate::stream::{MediaKind, Stats, Stream, StreamState};

/// Codecs this workspace's encoder interface (external collaborator)
/// knows how to drive. A closed set, per §4.7's `UnsupportedCodec`.
const SUPPORTED_CODECS: &[&str] = &["opus", "vp8", "vp9", "h264"];

/// Outcome of a [`StreamManager::pop_stream`] call: either a delivered
/// packet, a PLC-synthesized substitute for a gap, or nothing ready yet.
pub enum DeliverOutcome {
    Delivered(RtpPacket),
    Concealed { seq: u16, payload: Bytes },
    NotYet,
}

/// Wire parameters for [`StreamManager::create_stream`], mirroring a
/// `STREAM_START` message's fields (§6) without depending on
/// `arc-signaling`'s wire types directly.
pub struct CreateStreamParams {
    pub ssrc: u32,
    pub kind: MediaKind,
    pub payload_type: u8,
    pub codec: String,
    pub encryption_enabled: bool,
    pub key_id: String,
}

fn profile_for(suite: CryptoSuite) -> ProtectionProfile {
    match suite {
        CryptoSuite::Aes128Gcm => ProtectionProfile::Aes128Gcm,
        CryptoSuite::Aes256Gcm => ProtectionProfile::Aes256Gcm,
    }
}

pub struct StreamManager<K: KeyProvider> {
    config: ArcConfig,
    crypto: CryptoSession,
    key_provider: K,
    clock_anchor: SystemInstant,

    sessions: HashMap<String, Session>,
    streams: HashMap<String, Stream>,
    ssrc_index: HashMap<u32, String>,
}

impl<K: KeyProvider> StreamManager<K> {
    pub fn new(config: ArcConfig, key_provider: K) -> Result<Self> {
        config.validate()?;
        let crypto = CryptoSession::new(
            profile_for(config.crypto.suite),
            config.crypto.key_rotation_packets,
            config.crypto.replay_window_size,
        );
        Ok(Self {
            config,
            crypto,
            key_provider,
            clock_anchor: SystemInstant::now(),
            sessions: HashMap::new(),
            streams: HashMap::new(),
            ssrc_index: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ArcConfig {
        &self.config
    }

    // --- Session bookkeeping -------------------------------------------------

    pub fn open_session(&mut self, id: impl Into<String>, local_peer_id: impl Into<String>, remote_peer_id: impl Into<String>, now: Instant) {
        let session = Session::new(id, local_peer_id, remote_peer_id, self.config.crypto.suite, now);
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn establish_session(&mut self, session_id: &str) -> Result<()> {
        let session = self.sessions.get_mut(session_id).ok_or(Error::ErrUnknownSession)?;
        session.state = SessionState::Established;
        Ok(())
    }

    /// Tear down every stream owned by `session_id` and drop the session
    /// record (explicit close, fatal error, or heartbeat timeout, §3).
    pub fn close_session(&mut self, session_id: &str) {
        let Some(session) = self.sessions.remove(session_id) else { return };
        for stream_id in &session.stream_ids {
            if let Some(stream) = self.streams.remove(stream_id) {
                self.ssrc_index.remove(&stream.ssrc);
            }
        }
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    // --- Stream lifecycle (§4.7) ---------------------------------------------

    pub fn create_stream(&mut self, session_id: &str, stream_id: &str, params: CreateStreamParams) -> Result<()> {
        if self.ssrc_index.contains_key(&params.ssrc) {
            return Err(Error::ErrDuplicateSsrc);
        }
        if !SUPPORTED_CODECS.contains(&params.codec.as_str()) {
            return Err(Error::ErrUnsupportedCodec);
        }
        let session = self.sessions.get_mut(session_id).ok_or(Error::ErrUnknownSession)?;

        let crypto_ctx = if params.encryption_enabled {
            let (master_key, master_salt) = self.key_provider.get(&params.key_id)?;
            Some(self.crypto.derive(&master_key, &master_salt, params.ssrc)?)
        } else {
            None
        };

        let stream = Stream::new(
            stream_id.to_string(),
            session_id.to_string(),
            params.kind,
            params.ssrc,
            params.payload_type,
            params.codec,
            params.encryption_enabled,
            crypto_ctx,
            &self.config.jitter,
            self.config.plc.max_conceal_packets,
            self.config.adapt,
            QualityLevel::High,
        );

        self.streams.insert(stream_id.to_string(), stream);
        self.ssrc_index.insert(params.ssrc, stream_id.to_string());
        session.stream_ids.push(stream_id.to_string());
        Ok(())
    }

    pub fn update_state(&mut self, stream_id: &str, new_state: StreamState) -> Result<()> {
        let stream = self.streams.get_mut(stream_id).ok_or(Error::ErrUnknownStream)?;
        stream.transition(new_state)
    }

    pub fn stream_state(&self, stream_id: &str) -> Result<StreamState> {
        self.streams.get(stream_id).map(|s| s.state).ok_or(Error::ErrUnknownStream)
    }

    /// Apply an out-of-band bitrate/resolution target to `stream_id`,
    /// e.g. one requested by the peer over a `QUALITY_ADAPT` message
    /// rather than computed locally by `AdaptController` (§4.6).
    pub fn set_target(&mut self, stream_id: &str, bitrate_bps: u32, resolution: Option<(u32, u32)>) -> Result<()> {
        let stream = self.streams.get_mut(stream_id).ok_or(Error::ErrUnknownStream)?;
        stream.target_bitrate_bps = bitrate_bps;
        if resolution.is_some() {
            stream.resolution = resolution;
        }
        Ok(())
    }

    // --- Packet routing (§4.7, §2 control flow) -------------------------------

    /// Parse `bytes` off the wire, dispatch to the owning stream's
    /// crypto/jitter pipeline (RTP), or fold RTCP reception reports into
    /// the owning stream's `HealthMonitor` (RTCP) for RTT (§4.5's
    /// supplemented LSR/DLSR path).
    pub fn route_inbound(&mut self, bytes: &[u8], now: Instant) -> Result<()> {
        if is_rtcp(bytes) {
            self.route_inbound_rtcp(bytes, now);
            return Ok(());
        }

        if bytes.len() < 12 {
            return Err(Error::ErrMalformedPacket);
        }
        let ssrc = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let stream_id = self.ssrc_index.get(&ssrc).cloned().ok_or(Error::ErrUnknownSsrc)?;
        let stream = self.streams.get_mut(&stream_id).expect("ssrc_index is consistent with streams");

        let (extended_seq, packet) = if let Some(ctx) = stream.crypto.as_mut() {
            let mut peek: &[u8] = bytes;
            let header = Header::unmarshal(&mut peek).map_err(|_| Error::ErrMalformedPacket)?;
            let extended_seq = ctx.resolve_extended_seq(header.sequence_number);
            match self.crypto.open(ctx, bytes) {
                Ok(packet) => (extended_seq, packet),
                Err(Error::ErrReplayDetected) => {
                    stream.replayed += 1;
                    return Err(Error::ErrReplayDetected);
                }
                Err(Error::ErrAuthFailed) => {
                    stream.auth_failed += 1;
                    return Err(Error::ErrAuthFailed);
                }
                Err(e) => return Err(e),
            }
        } else {
            let mut cursor = Bytes::copy_from_slice(bytes);
            let packet = RtpPacket::unmarshal(&mut cursor).map_err(|_| Error::ErrMalformedPacket)?;
            let extended_seq = stream.roc_tracker.accept(packet.header.sequence_number);
            (extended_seq, packet)
        };

        stream.health.record_arrival(extended_seq, packet.header.timestamp, now);
        stream.jitter.push(extended_seq, packet, now);
        stream.packets_received += 1;
        Ok(())
    }

    fn route_inbound_rtcp(&mut self, bytes: &[u8], now: Instant) {
        let mut cursor = Bytes::copy_from_slice(bytes);
        while !cursor.is_empty() {
            let packet = match RtcpPacket::unmarshal(&mut cursor) {
                Ok(p) => p,
                Err(_) => break,
            };
            let reports = match &packet {
                RtcpPacket::SenderReport(sr) => &sr.reports[..],
                RtcpPacket::ReceiverReport(rr) => &rr.reports[..],
                _ => continue,
            };
            for report in reports {
                if report.last_sender_report == 0 {
                    continue;
                }
                let Some(stream_id) = self.ssrc_index.get(&report.ssrc).cloned() else { continue };
                let Some(stream) = self.streams.get_mut(&stream_id) else { continue };
                if let Some(rtt_ms) = self.rtt_from_lsr_dlsr(report.last_sender_report, report.delay, now) {
                    stream.health.record_rtt_sample(rtt_ms);
                }
            }
        }
    }

    /// RTT from an RTCP reception report's LSR/DLSR fields, RFC 3550
    /// §6.4.1: `rtt = now_mid32 - LSR - DLSR`, expressed in 1/65536s units.
    fn rtt_from_lsr_dlsr(&self, lsr: u32, dlsr: u32, now: Instant) -> Option<f64> {
        let now_ntp = self.clock_anchor.ntp(now);
        let now_mid32 = ((now_ntp >> 16) & 0xFFFF_FFFF) as u32;
        let elapsed = now_mid32.wrapping_sub(lsr).wrapping_sub(dlsr);
        if elapsed == 0 || elapsed > (u32::MAX / 2) {
            return None;
        }
        Some(elapsed as f64 / 65536.0 * 1000.0)
    }

    /// Pop the next ready packet from `stream_id`'s jitter buffer, or a
    /// PLC-concealed substitute for a gap (§4.3, §4.4).
    pub fn pop_stream(&mut self, stream_id: &str, now: Instant) -> Result<DeliverOutcome> {
        let stream = self.streams.get_mut(stream_id).ok_or(Error::ErrUnknownStream)?;
        match stream.jitter.pop(now) {
            PopOutcome::Delivered(packet) => {
                stream.plc.observe_delivered(packet.payload.clone());
                Ok(DeliverOutcome::Delivered(packet))
            }
            PopOutcome::Gap(seq) => {
                let payload = stream.plc.conceal(seq);
                stream.concealed += 1;
                if stream.plc.needs_keyframe() {
                    log::info!("stream {stream_id} needs a keyframe after concealment run");
                }
                Ok(DeliverOutcome::Concealed { seq, payload })
            }
            PopOutcome::NotYet => Ok(DeliverOutcome::NotYet),
        }
    }

    /// Apply crypto (if enabled) and serialize `packet` for `stream_id`,
    /// ready to hand to a `TransportSink`.
    pub fn route_outbound(&mut self, stream_id: &str, packet: &RtpPacket) -> Result<Bytes> {
        let stream = self.streams.get_mut(stream_id).ok_or(Error::ErrUnknownStream)?;
        let bytes = if let Some(ctx) = stream.crypto.as_mut() {
            self.crypto.seal(ctx, packet)?
        } else {
            packet.marshal()?
        };
        stream.packets_sent += 1;
        Ok(bytes)
    }

    // --- Health / adaptation --------------------------------------------------

    /// Advance `stream_id`'s jitter-buffer depth adaptation and health
    /// sample ring, then evaluate `AdaptController` against the fresh
    /// sample (§4.3, §4.5, §4.6).
    pub fn tick_adapt(&mut self, stream_id: &str, now: Instant) -> Result<(HealthSample, AdaptDecision)> {
        let stream = self.streams.get_mut(stream_id).ok_or(Error::ErrUnknownStream)?;
        let sample = stream.health.tick(now);
        stream.jitter.adapt(sample.jitter_ms, sample.loss_rate);
        let decision = stream.adapt.evaluate(&sample, now);
        match decision {
            AdaptDecision::StepDown(level, _) | AdaptDecision::StepUp(level, _) => {
                stream.target_bitrate_bps = match stream.kind {
                    MediaKind::Audio => level.audio_bitrate_bps(),
                    MediaKind::Video => level.video_target().bitrate_bps,
                };
                if stream.kind == MediaKind::Video {
                    let t = level.video_target();
                    stream.resolution = Some((t.width, t.height));
                }
            }
            AdaptDecision::Hold => {}
        }
        Ok((sample, decision))
    }

    /// Build the in-band quality/priority RTP extension for `stream_id`'s
    /// current quality level (§4.6's "immediate in-band adjustment").
    pub fn quality_extension(&self, stream_id: &str, priority: u8) -> Result<Extension> {
        let stream = self.streams.get(stream_id).ok_or(Error::ErrUnknownStream)?;
        let quality_indicator = match stream.quality_level() {
            QualityLevel::Ultra => 3,
            QualityLevel::High => 2,
            QualityLevel::Medium => 1,
            QualityLevel::Low | QualityLevel::VeryLow => 0,
        };
        Ok(Extension::quality_priority(quality_indicator, priority))
    }

    pub fn get_stats(&self, stream_id: &str) -> Result<Stats> {
        let stream = self.streams.get(stream_id).ok_or(Error::ErrUnknownStream)?;
        let (loss_rate, jitter_ms, rtt_ms, bandwidth_estimate_bps) = (
            stream.health.loss_rate(),
            stream.health.jitter_ms(),
            stream.health.rtt_ms(),
            stream.health.bandwidth_estimate_bps(),
        );
        Ok(Stats {
            state: stream.state,
            quality_level: stream.quality_level(),
            packets_received: stream.packets_received,
            packets_sent: stream.packets_sent,
            replayed: stream.replayed,
            auth_failed: stream.auth_failed,
            concealed: stream.concealed,
            loss_rate,
            jitter_ms,
            rtt_ms,
            bandwidth_estimate_bps,
        })
    }
}
