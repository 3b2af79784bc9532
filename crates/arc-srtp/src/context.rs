//! Per-stream SRTP state ([`CryptoContext`]) and the sealing/opening
//! operations that act on it ([`CryptoSession`]), §4.2.

use bytes::{Buf, Bytes};

use arc_rtp::header::Header;
use arc_rtp::packet::Packet as RtpPacket;
use arc_rtp::sequence::RolloverTracker;
use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};
use arc_shared::replay::ReplayWindow;

use crate::cipher::AeadCipher;
use crate::key_derivation::{self, DerivedKeys};
use crate::protection_profile::ProtectionProfile;

/// Per-SSRC SRTP crypto state. Exclusively owned by the `Stream` it
/// protects (§3); never shared across sessions.
pub struct CryptoContext {
    ssrc: u32,
    profile: ProtectionProfile,
    master_salt: Vec<u8>,
    keys: DerivedKeys,
    cipher: AeadCipher,
    roc_tracker: RolloverTracker,
    replay_window: ReplayWindow,
    packets_sealed: u64,
}

impl CryptoContext {
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn roc(&self) -> u32 {
        self.roc_tracker.roc()
    }

    pub fn highest_received_seq(&self) -> Option<u64> {
        self.replay_window.highest()
    }

    pub fn packets_sealed(&self) -> u64 {
        self.packets_sealed
    }

    /// Resolve a wire sequence number to its 48-bit extended form under
    /// this context's current rollover state, without mutating anything.
    /// Lets a caller (e.g. `arc-core`'s `JitterBuffer` wiring) compute the
    /// ordering key for a packet it is about to pass to
    /// [`CryptoSession::open`], since `open` itself only returns the
    /// decrypted [`RtpPacket`] and not the resolved sequence.
    pub fn resolve_extended_seq(&self, seq: u16) -> u64 {
        self.roc_tracker.peek(seq)
    }
}

/// Stateless sealing/opening operations, parameterized by the negotiated
/// suite and a packet-count rotation threshold (§6 `crypto.key_rotation_packets`).
#[derive(Debug, Clone, Copy)]
pub struct CryptoSession {
    profile: ProtectionProfile,
    key_rotation_packets: u64,
    replay_window_size: u64,
}

impl CryptoSession {
    pub fn new(profile: ProtectionProfile, key_rotation_packets: u64, replay_window_size: u64) -> Self {
        Self {
            profile,
            key_rotation_packets,
            replay_window_size,
        }
    }

    /// Derive a fresh [`CryptoContext`] for `ssrc` from a session's master
    /// key material.
    pub fn derive(&self, master_key: &[u8], master_salt: &[u8], ssrc: u32) -> Result<CryptoContext> {
        let keys = key_derivation::derive(master_key, master_salt, ssrc, self.profile)?;
        let cipher = AeadCipher::new(self.profile, &keys.encryption_key)?;
        let replay_window = ReplayWindow::new(self.replay_window_size)
            .ok_or(Error::ErrInvalidConfiguration("replay_window_size must be a power of two in [64, 32768]"))?;
        Ok(CryptoContext {
            ssrc,
            profile: self.profile,
            master_salt: master_salt.to_vec(),
            keys,
            cipher,
            roc_tracker: RolloverTracker::new(),
            replay_window,
            packets_sealed: 0,
        })
    }

    /// Encrypt `packet` under `ctx`, returning the wire-ready SRTP bytes
    /// (RTP header, unauthenticated-but-AAD-covered, followed by
    /// ciphertext and the 16-byte GCM tag).
    pub fn seal(&self, ctx: &mut CryptoContext, packet: &RtpPacket) -> Result<Bytes> {
        if ctx.ssrc != packet.header.ssrc {
            return Err(Error::ErrSsrcMismatch(packet.header.ssrc));
        }
        if ctx.packets_sealed >= self.key_rotation_packets {
            return Err(Error::ErrRotationRequired);
        }

        let extended = ctx.roc_tracker.accept(packet.header.sequence_number);
        let roc = (extended >> 16) as u32;

        let aad = packet.header.marshal()?;
        let iv = key_derivation::build_iv(&ctx.keys.salt, ctx.ssrc, roc, packet.header.sequence_number);
        // The encrypted portion is the RTP payload plus any trailing
        // padding (RFC 3711 §3.1) — both travel inside the same AEAD seal.
        let mut plaintext = Vec::with_capacity(packet.payload.len() + packet.padding.len());
        plaintext.extend_from_slice(&packet.payload);
        plaintext.extend_from_slice(&packet.padding);
        let sealed_payload = ctx.cipher.seal(&iv, &aad, &plaintext)?;

        let mut out = Vec::with_capacity(aad.len() + sealed_payload.len());
        out.extend_from_slice(&aad);
        out.extend_from_slice(&sealed_payload);

        ctx.packets_sealed += 1;
        Ok(Bytes::from(out))
    }

    /// Decrypt and authenticate `srtp_bytes` under `ctx`, reconstructing
    /// the extended sequence number and enforcing the replay window.
    pub fn open(&self, ctx: &mut CryptoContext, srtp_bytes: &[u8]) -> Result<RtpPacket> {
        let mut cursor = Bytes::copy_from_slice(srtp_bytes);
        let before = cursor.remaining();
        let header = Header::unmarshal(&mut cursor)?;
        let consumed = before - cursor.remaining();
        if header.ssrc != ctx.ssrc {
            return Err(Error::ErrSsrcMismatch(header.ssrc));
        }

        let tag_len = ctx.profile.tag_len();
        if cursor.remaining() < tag_len {
            return Err(Error::ErrShortPacket);
        }

        let extended_seq = ctx.roc_tracker.peek(header.sequence_number);
        if !ctx.replay_window.would_accept(extended_seq) {
            return Err(Error::ErrReplayDetected);
        }

        let roc = (extended_seq >> 16) as u32;
        let aad = &srtp_bytes[..consumed];
        let ciphertext_and_tag = &srtp_bytes[consumed..];
        let iv = key_derivation::build_iv(&ctx.keys.salt, ctx.ssrc, roc, header.sequence_number);
        let mut plaintext = Bytes::from(ctx.cipher.open(&iv, aad, ciphertext_and_tag)?);

        let padding = if header.padding {
            let len = plaintext.len();
            if len == 0 {
                return Err(Error::ErrBadPadding);
            }
            let pad_count = plaintext[len - 1] as usize;
            if pad_count == 0 || pad_count > len {
                return Err(Error::ErrBadPadding);
            }
            plaintext.split_off(len - pad_count)
        } else {
            Bytes::new()
        };

        // Only commit sequence-tracking state once the tag has verified,
        // so a forged packet can never advance the replay window.
        ctx.roc_tracker.accept(header.sequence_number);
        if !ctx.replay_window.check_and_update(extended_seq) {
            return Err(Error::ErrReplayDetected);
        }

        Ok(RtpPacket {
            header,
            payload: plaintext,
            padding,
        })
    }

    /// Re-derive `ctx`'s keys under `new_master_key`, keeping the same
    /// salt and SSRC. The caller must have already cloned `ctx` if it
    /// needs to keep decrypting under the old keys during the grace
    /// window (§4.2); this call overwrites `ctx` in place.
    pub fn rotate(&self, ctx: &mut CryptoContext, new_master_key: &[u8]) -> Result<()> {
        let keys = key_derivation::derive(new_master_key, &ctx.master_salt, ctx.ssrc, self.profile)?;
        let cipher = AeadCipher::new(self.profile, &keys.encryption_key)?;
        ctx.keys = keys;
        ctx.cipher = cipher;
        ctx.packets_sealed = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_rtp::header::Header as RtpHeader;

    fn session() -> CryptoSession {
        CryptoSession::new(ProtectionProfile::Aes128Gcm, 1 << 31, 64)
    }

    fn packet(seq: u16, ssrc: u32) -> RtpPacket {
        RtpPacket {
            header: RtpHeader {
                sequence_number: seq,
                ssrc,
                timestamp: seq as u32 * 960,
                ..Default::default()
            },
            payload: Bytes::from_static(&[0xAA; 160]),
            padding: Bytes::new(),
        }
    }

    #[test]
    fn seal_then_open_round_trips() {
        let session = session();
        let mut seal_ctx = session.derive(&[1u8; 16], &[2u8; 12], 12345).unwrap();
        let mut open_ctx = session.derive(&[1u8; 16], &[2u8; 12], 12345).unwrap();

        let p = packet(1000, 12345);
        let sealed = session.seal(&mut seal_ctx, &p).unwrap();
        let opened = session.open(&mut open_ctx, &sealed).unwrap();
        assert_eq!(opened, p);
    }

    #[test]
    fn rejects_replayed_packet() {
        let session = session();
        let mut seal_ctx = session.derive(&[1u8; 16], &[2u8; 12], 1).unwrap();
        let mut open_ctx = session.derive(&[1u8; 16], &[2u8; 12], 1).unwrap();

        let p = packet(2000, 1);
        let sealed = session.seal(&mut seal_ctx, &p).unwrap();
        assert!(session.open(&mut open_ctx, &sealed).is_ok());
        assert_eq!(
            session.open(&mut open_ctx, &sealed),
            Err(Error::ErrReplayDetected)
        );
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let session = session();
        let mut seal_ctx = session.derive(&[1u8; 16], &[2u8; 12], 1).unwrap();
        let mut open_ctx = session.derive(&[1u8; 16], &[2u8; 12], 1).unwrap();

        let p = packet(1, 1);
        let mut sealed = session.seal(&mut seal_ctx, &p).unwrap().to_vec();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert_eq!(session.open(&mut open_ctx, &sealed), Err(Error::ErrAuthFailed));
    }

    #[test]
    fn sequence_wrap_advances_roc_exactly_once() {
        let session = session();
        let mut seal_ctx = session.derive(&[1u8; 16], &[2u8; 12], 9).unwrap();
        let mut open_ctx = session.derive(&[1u8; 16], &[2u8; 12], 9).unwrap();

        for seq in [65534u16, 65535, 0, 1, 2] {
            let p = packet(seq, 9);
            let sealed = session.seal(&mut seal_ctx, &p).unwrap();
            let opened = session.open(&mut open_ctx, &sealed).unwrap();
            assert_eq!(opened.header.sequence_number, seq);
        }
        assert_eq!(open_ctx.roc(), 1);
    }

    #[test]
    fn rotate_changes_subsequent_ciphertext() {
        let session = session();
        let mut ctx = session.derive(&[1u8; 16], &[2u8; 12], 1).unwrap();
        let p = packet(1, 1);
        let before = session.seal(&mut ctx, &p.clone()).unwrap();

        session.rotate(&mut ctx, &[9u8; 16]).unwrap();
        let p2 = packet(1, 1);
        let after = session.seal(&mut ctx, &p2).unwrap();
        assert_ne!(before, after);
        assert_eq!(ctx.packets_sealed(), 1);
    }
}
