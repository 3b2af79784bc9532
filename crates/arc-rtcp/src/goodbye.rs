//! Goodbye (RFC 3550 §6.6), packet type 203.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Goodbye {
    pub sources: Vec<u32>,
    pub reason: String,
}

impl Goodbye {
    fn reason_encoded_len(&self) -> usize {
        if self.reason.is_empty() {
            0
        } else {
            (1 + self.reason.len()).div_ceil(4) * 4
        }
    }
}

impl MarshalSize for Goodbye {
    fn marshal_size(&self) -> usize {
        Header::default().marshal_size() + self.sources.len() * 4 + self.reason_encoded_len()
    }
}

impl Marshal for Goodbye {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if self.sources.len() > 0x1f {
            return Err(Error::ErrTooManySources);
        }
        if self.reason.len() > 0xff {
            return Err(Error::ErrReasonTooLong);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }

        let header = Header {
            padding: false,
            count: self.sources.len() as u8,
            packet_type_raw: PacketType::Goodbye.into(),
            length: (size / 4 - 1) as u16,
        };
        let mut offset = header.marshal_to(buf)?;

        for ssrc in &self.sources {
            buf[offset..offset + 4].copy_from_slice(&ssrc.to_be_bytes());
            offset += 4;
        }

        if !self.reason.is_empty() {
            let start = offset;
            buf[offset] = self.reason.len() as u8;
            offset += 1;
            buf[offset..offset + self.reason.len()].copy_from_slice(self.reason.as_bytes());
            offset += self.reason.len();
            let padded = (offset - start).div_ceil(4) * 4;
            for b in &mut buf[offset..start + padded] {
                *b = 0;
            }
            offset = start + padded;
        }

        Ok(offset)
    }
}

impl Unmarshal for Goodbye {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if !matches!(header.packet_type(), PacketType::Goodbye) {
            return Err(Error::ErrWrongType);
        }
        let body_len = header.length as usize * 4;
        if buf.remaining() < body_len {
            return Err(Error::ErrHeaderTooSmall);
        }
        let mut remaining = body_len;

        if remaining < header.count as usize * 4 {
            return Err(Error::ErrHeaderTooSmall);
        }
        let mut sources = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            sources.push(buf.get_u32());
            remaining -= 4;
        }

        let reason = if remaining > 0 {
            let len = buf.get_u8() as usize;
            remaining -= 1;
            if remaining < len {
                return Err(Error::ErrReasonTooLong);
            }
            let mut bytes = vec![0u8; len];
            buf.copy_to_slice(&mut bytes);
            remaining -= len;
            let consumed = 1 + len;
            let padding = consumed.div_ceil(4) * 4 - consumed;
            if remaining < padding {
                return Err(Error::ErrHeaderTooSmall);
            }
            buf.advance(padding);
            String::from_utf8(bytes).map_err(|_| Error::ErrReasonTooLong)?
        } else {
            String::new()
        };

        Ok(Goodbye { sources, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips_with_reason() {
        let bye = Goodbye {
            sources: vec![1, 2],
            reason: "bandwidth".to_string(),
        };
        let encoded = bye.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(Goodbye::unmarshal(&mut buf).unwrap(), bye);
    }

    #[test]
    fn round_trips_without_reason() {
        let bye = Goodbye {
            sources: vec![42],
            reason: String::new(),
        };
        let encoded = bye.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(Goodbye::unmarshal(&mut buf).unwrap(), bye);
    }
}
