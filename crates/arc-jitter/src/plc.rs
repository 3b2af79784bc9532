//! Packet-loss concealment (§4.4): synthesizes a substitute payload when
//! [`crate::JitterBuffer::pop`] reports a [`crate::PopOutcome::Gap`].

use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

pub struct PlcEngine {
    kind: MediaKind,
    max_conceal_packets: u32,
    last_decoded: Option<Bytes>,
    consecutive_conceals: u32,
    needs_keyframe: bool,
    degraded: bool,
    last_conceal: Option<(u16, Bytes)>,
}

impl PlcEngine {
    pub fn new(kind: MediaKind, max_conceal_packets: u32) -> Self {
        Self {
            kind,
            max_conceal_packets,
            last_decoded: None,
            consecutive_conceals: 0,
            needs_keyframe: false,
            degraded: false,
            last_conceal: None,
        }
    }

    /// Record a successfully delivered frame so future concealment has a
    /// basis to repeat/freeze from. Resets the consecutive-conceal run.
    pub fn observe_delivered(&mut self, payload: Bytes) {
        self.last_decoded = Some(payload);
        self.consecutive_conceals = 0;
        self.needs_keyframe = false;
    }

    pub fn needs_keyframe(&self) -> bool {
        self.needs_keyframe
    }

    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// Synthesize a substitute payload for `seq`. Idempotent: calling
    /// this again for the same `seq` without an intervening
    /// `observe_delivered` returns the same bytes rather than continuing
    /// to advance the fade-out/keyframe-escalation state.
    pub fn conceal(&mut self, seq: u16) -> Bytes {
        if let Some((cached_seq, payload)) = &self.last_conceal {
            if *cached_seq == seq {
                return payload.clone();
            }
        }

        self.consecutive_conceals += 1;
        let payload = match self.kind {
            MediaKind::Audio => self.conceal_audio(),
            MediaKind::Video => self.conceal_video(),
        };
        self.last_conceal = Some((seq, payload.clone()));
        payload
    }

    fn conceal_audio(&mut self) -> Bytes {
        const MAX_CONCEAL_CONSECUTIVE: u32 = 3;
        if self.consecutive_conceals > MAX_CONCEAL_CONSECUTIVE {
            self.degraded = true;
            self.needs_keyframe = true;
            return Bytes::new();
        }
        match &self.last_decoded {
            Some(last) => {
                let fade = 1.0 - (self.consecutive_conceals as f32 / (MAX_CONCEAL_CONSECUTIVE + 1) as f32);
                Bytes::from(last.iter().map(|&b| ((b as f32) * fade) as u8).collect::<Vec<u8>>())
            }
            None => Bytes::new(),
        }
    }

    fn conceal_video(&mut self) -> Bytes {
        if self.consecutive_conceals > self.max_conceal_packets {
            self.needs_keyframe = true;
        }
        self.last_decoded.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conceal_is_idempotent_per_sequence() {
        let mut plc = PlcEngine::new(MediaKind::Audio, 5);
        plc.observe_delivered(Bytes::from_static(&[100; 4]));
        let a = plc.conceal(1005);
        let b = plc.conceal(1005);
        assert_eq!(a, b);
    }

    #[test]
    fn audio_fades_out_then_degrades() {
        let mut plc = PlcEngine::new(MediaKind::Audio, 5);
        plc.observe_delivered(Bytes::from_static(&[200; 4]));
        let f1 = plc.conceal(1);
        let f2 = plc.conceal(2);
        assert!(f1.iter().sum::<u8>() >= f2.iter().sum::<u8>());
        plc.conceal(3);
        plc.conceal(4);
        assert!(plc.degraded());
    }

    #[test]
    fn video_freezes_last_frame_then_requests_keyframe() {
        let mut plc = PlcEngine::new(MediaKind::Video, 2);
        plc.observe_delivered(Bytes::from_static(&[7, 7, 7]));
        let frame = plc.conceal(1);
        assert_eq!(frame, Bytes::from_static(&[7, 7, 7]));
        plc.conceal(2);
        plc.conceal(3);
        assert!(plc.needs_keyframe());
    }
}
