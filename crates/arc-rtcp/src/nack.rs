//! Generic NACK (RFC 4585 §6.2.1), a Transport-Layer Feedback (PT=205)
//! message with FMT=1. `HealthMonitor`/`AdaptController` use this to tell
//! a sender which sequence numbers a jitter buffer gave up waiting for,
//! distinct from the keyframe-level [`crate::PictureLossIndication`].

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType};

pub const NACK_FMT: u8 = 1;
const SSRC_PAIR_LENGTH: usize = 8;
const NACK_PAIR_LENGTH: usize = 4;

/// One `(PID, BLP)` feedback-control-information entry: `pid` is the
/// sequence number of the first lost packet in the run, `blp` is a
/// bitmask of up to 16 additional lost packets immediately following it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NackPair {
    pub packet_id: u16,
    pub lost_bitmask: u16,
}

impl NackPair {
    /// Every sequence number this pair marks as lost, `packet_id` first.
    pub fn sequence_numbers(&self) -> Vec<u16> {
        let mut out = vec![self.packet_id];
        for bit in 0..16u16 {
            if self.lost_bitmask & (1 << bit) != 0 {
                out.push(self.packet_id.wrapping_add(bit + 1));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportLayerNack {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
    pub nacks: Vec<NackPair>,
}

impl TransportLayerNack {
    /// Build the minimal set of `NackPair`s covering `missing`, a
    /// strictly ascending list of 16-bit sequence numbers.
    pub fn from_missing_sequences(sender_ssrc: u32, media_ssrc: u32, missing: &[u16]) -> Self {
        let mut nacks = Vec::new();
        let mut iter = missing.iter().copied();
        if let Some(mut packet_id) = iter.next() {
            let mut bitmask = 0u16;
            for seq in iter {
                let delta = seq.wrapping_sub(packet_id);
                if delta >= 1 && delta <= 16 {
                    bitmask |= 1 << (delta - 1);
                } else {
                    nacks.push(NackPair {
                        packet_id,
                        lost_bitmask: bitmask,
                    });
                    packet_id = seq;
                    bitmask = 0;
                }
            }
            nacks.push(NackPair {
                packet_id,
                lost_bitmask: bitmask,
            });
        }
        TransportLayerNack {
            sender_ssrc,
            media_ssrc,
            nacks,
        }
    }

    pub fn missing_sequence_numbers(&self) -> Vec<u16> {
        self.nacks.iter().flat_map(NackPair::sequence_numbers).collect()
    }
}

impl MarshalSize for TransportLayerNack {
    fn marshal_size(&self) -> usize {
        Header::default().marshal_size() + SSRC_PAIR_LENGTH + self.nacks.len() * NACK_PAIR_LENGTH
    }
}

impl Marshal for TransportLayerNack {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if self.nacks.len() > 0x1f {
            return Err(Error::ErrTooManyReports);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }
        let header = Header {
            padding: false,
            count: NACK_FMT,
            packet_type_raw: PacketType::TransportSpecificFeedback.into(),
            length: (size / 4 - 1) as u16,
        };
        let mut offset = header.marshal_to(buf)?;
        {
            let mut w = &mut buf[offset..];
            w.put_u32(self.sender_ssrc);
            w.put_u32(self.media_ssrc);
        }
        offset += SSRC_PAIR_LENGTH;
        for pair in &self.nacks {
            let mut w = &mut buf[offset..];
            w.put_u16(pair.packet_id);
            w.put_u16(pair.lost_bitmask);
            offset += NACK_PAIR_LENGTH;
        }
        Ok(offset)
    }
}

impl Unmarshal for TransportLayerNack {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if !matches!(header.packet_type(), PacketType::TransportSpecificFeedback) || header.count != NACK_FMT
        {
            return Err(Error::ErrWrongType);
        }
        if buf.remaining() < SSRC_PAIR_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        let body_len = header.length as usize * 4;
        if body_len < SSRC_PAIR_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        let fci_len = body_len - SSRC_PAIR_LENGTH;
        if fci_len % NACK_PAIR_LENGTH != 0 || buf.remaining() < fci_len {
            return Err(Error::ErrHeaderTooSmall);
        }
        let count = fci_len / NACK_PAIR_LENGTH;
        let mut nacks = Vec::with_capacity(count);
        for _ in 0..count {
            nacks.push(NackPair {
                packet_id: buf.get_u16(),
                lost_bitmask: buf.get_u16(),
            });
        }
        Ok(TransportLayerNack {
            sender_ssrc,
            media_ssrc,
            nacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips() {
        let nack = TransportLayerNack {
            sender_ssrc: 1,
            media_ssrc: 2,
            nacks: vec![NackPair {
                packet_id: 100,
                lost_bitmask: 0b101,
            }],
        };
        let encoded = nack.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(TransportLayerNack::unmarshal(&mut buf).unwrap(), nack);
    }

    #[test]
    fn compresses_contiguous_run_into_one_pair() {
        let missing: Vec<u16> = (1000..1010).collect();
        let nack = TransportLayerNack::from_missing_sequences(1, 2, &missing);
        assert_eq!(nack.nacks.len(), 1);
        assert_eq!(nack.missing_sequence_numbers(), missing);
    }

    #[test]
    fn splits_runs_further_than_16_apart() {
        let missing = vec![100u16, 200u16];
        let nack = TransportLayerNack::from_missing_sequences(1, 2, &missing);
        assert_eq!(nack.nacks.len(), 2);
        assert_eq!(nack.missing_sequence_numbers(), missing);
    }
}
