//! RTP fixed header (RFC 3550 §5.1) plus the CSRC list and optional
//! extension header.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::extension::Extension;

pub const VERSION: u8 = 2;
const FIXED_HEADER_SIZE: usize = 12;
const CSRC_SIZE: usize = 4;

/// Parsed RTP header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub extension: Option<Extension>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        let mut size = FIXED_HEADER_SIZE + self.csrc.len() * CSRC_SIZE;
        if let Some(ext) = &self.extension {
            size += ext.marshal_size();
        }
        size
    }
}

impl Marshal for Header {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }
        if self.csrc.len() > 15 {
            return Err(Error::ErrTooManySources);
        }

        let mut w = &mut buf[..];
        let mut b0 = (VERSION << 6) | (self.csrc.len() as u8);
        if self.padding {
            b0 |= 1 << 5;
        }
        if self.extension.is_some() {
            b0 |= 1 << 4;
        }
        w.put_u8(b0);

        let mut b1 = self.payload_type & 0x7f;
        if self.marker {
            b1 |= 1 << 7;
        }
        w.put_u8(b1);

        w.put_u16(self.sequence_number);
        w.put_u32(self.timestamp);
        w.put_u32(self.ssrc);
        for csrc in &self.csrc {
            w.put_u32(*csrc);
        }

        let written = size - w.len();
        if let Some(ext) = &self.extension {
            let n = ext.marshal_to(w)?;
            return Ok(written + n);
        }
        Ok(written)
    }
}

impl Unmarshal for Header {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        if buf.remaining() < FIXED_HEADER_SIZE {
            return Err(Error::ErrHeaderSizeInsufficient);
        }

        let b0 = buf.get_u8();
        let version = b0 >> 6;
        if version != VERSION {
            return Err(Error::ErrUnsupportedVersion);
        }
        let padding = (b0 & 0b0010_0000) != 0;
        let has_extension = (b0 & 0b0001_0000) != 0;
        let csrc_count = (b0 & 0b0000_1111) as usize;

        let b1 = buf.get_u8();
        let marker = (b1 & 0b1000_0000) != 0;
        let payload_type = b1 & 0b0111_1111;

        let sequence_number = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        if buf.remaining() < csrc_count * CSRC_SIZE {
            return Err(Error::ErrHeaderSizeInsufficient);
        }
        let mut csrc = Vec::with_capacity(csrc_count);
        for _ in 0..csrc_count {
            csrc.push(buf.get_u32());
        }

        let extension = if has_extension {
            Some(Extension::unmarshal(buf)?)
        } else {
            None
        };

        Ok(Header {
            padding,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips_minimal_header() {
        let h = Header {
            marker: true,
            payload_type: 96,
            sequence_number: 1000,
            timestamp: 96000,
            ssrc: 0xdead_beef,
            ..Default::default()
        };
        let encoded = h.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        let decoded = Header::unmarshal(&mut buf).unwrap();
        assert_eq!(h, decoded);
    }

    #[test]
    fn round_trips_with_csrc_and_extension() {
        let h = Header {
            padding: false,
            marker: false,
            payload_type: 111,
            sequence_number: 65535,
            timestamp: 1,
            ssrc: 42,
            csrc: vec![1, 2, 3],
            extension: Some(Extension::quality_priority(2, 1)),
        };
        let encoded = h.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        let decoded = Header::unmarshal(&mut buf).unwrap();
        assert_eq!(h, decoded);
    }

    #[test]
    fn rejects_wrong_version() {
        let bytes = [0x00u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut buf = Bytes::copy_from_slice(&bytes);
        assert_eq!(Header::unmarshal(&mut buf), Err(Error::ErrUnsupportedVersion));
    }

    #[test]
    fn rejects_short_header() {
        let bytes = [0x80u8, 96, 0, 0];
        let mut buf = Bytes::copy_from_slice(&bytes);
        assert_eq!(
            Header::unmarshal(&mut buf),
            Err(Error::ErrHeaderSizeInsufficient)
        );
    }
}
