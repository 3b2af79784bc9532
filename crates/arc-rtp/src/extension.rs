//! Profile-specific RTP header extension (RFC 3550 §5.3.1) carrying the
//! in-band quality indicator and priority fields `AdaptController` uses to
//! reconfigure a receiver without waiting on a signaling round trip.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

/// Reserved profile id for the single-word quality/priority extension.
///
/// Chosen to avoid the well-known one-byte (`0xBEDE`) and two-byte
/// (`0x1000`..`0x1FFF`) RFC 5285 extension profile ranges.
pub const QUALITY_PROFILE: u16 = 0xAC01;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extension {
    pub profile: u16,
    /// Raw extension payload, always a whole number of 32-bit words.
    pub payload: Vec<u8>,
}

impl Extension {
    /// Build the one-word quality/priority extension.
    ///
    /// `quality` and `priority` are each clamped to their 2-bit range;
    /// the remaining bits of the word are reserved zero.
    pub fn quality_priority(quality: u8, priority: u8) -> Self {
        let b0 = ((quality & 0b11) << 2) | (priority & 0b11);
        Extension {
            profile: QUALITY_PROFILE,
            payload: vec![b0, 0, 0, 0],
        }
    }

    /// Extract `(quality, priority)` if this is a quality/priority
    /// extension with a well-formed one-word payload.
    pub fn as_quality_priority(&self) -> Option<(u8, u8)> {
        if self.profile != QUALITY_PROFILE || self.payload.len() != 4 {
            return None;
        }
        let b0 = self.payload[0];
        Some(((b0 >> 2) & 0b11, b0 & 0b11))
    }
}

impl MarshalSize for Extension {
    fn marshal_size(&self) -> usize {
        4 + self.payload.len()
    }
}

impl Marshal for Extension {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if self.payload.len() % 4 != 0 {
            return Err(Error::ErrTruncatedExtension);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut w = &mut buf[..];
        w.put_u16(self.profile);
        w.put_u16((self.payload.len() / 4) as u16);
        w.put_slice(&self.payload);
        Ok(size)
    }
}

impl Unmarshal for Extension {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        if buf.remaining() < 4 {
            return Err(Error::ErrHeaderSizeInsufficientForExtension);
        }
        let profile = buf.get_u16();
        let length_words = buf.get_u16() as usize;
        let length_bytes = length_words * 4;
        if buf.remaining() < length_bytes {
            return Err(Error::ErrTruncatedExtension);
        }
        let mut payload = vec![0u8; length_bytes];
        buf.copy_to_slice(&mut payload);
        Ok(Extension { profile, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips_quality_priority() {
        let ext = Extension::quality_priority(3, 1);
        let encoded = ext.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        let decoded = Extension::unmarshal(&mut buf).unwrap();
        assert_eq!(ext, decoded);
        assert_eq!(decoded.as_quality_priority(), Some((3, 1)));
    }

    #[test]
    fn reserved_bits_stay_zero() {
        let ext = Extension::quality_priority(0b111, 0b101);
        // only the low 2 bits of each field survive
        assert_eq!(ext.as_quality_priority(), Some((0b11, 0b01)));
    }

    #[test]
    fn rejects_truncated_extension() {
        let bytes = [0xACu8, 0x01, 0, 1];
        let mut buf = Bytes::copy_from_slice(&bytes);
        assert_eq!(
            Extension::unmarshal(&mut buf),
            Err(Error::ErrTruncatedExtension)
        );
    }
}
