//! A parsed RTP packet: [`Header`] plus payload bytes.

use bytes::{Buf, Bytes};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::Header;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
    /// Raw trailing padding when `header.padding` is set, including the
    /// final pad-count byte (RFC 3550 §5.1). Empty when unpadded.
    pub padding: Bytes,
}

impl MarshalSize for Packet {
    fn marshal_size(&self) -> usize {
        self.header.marshal_size() + self.payload.len() + self.padding.len()
    }
}

impl Marshal for Packet {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let header_len = self.header.marshal_to(buf)?;
        let payload_end = header_len + self.payload.len();
        buf[header_len..payload_end].copy_from_slice(&self.payload);
        let end = payload_end + self.padding.len();
        buf[payload_end..end].copy_from_slice(&self.padding);
        Ok(end)
    }
}

impl Unmarshal for Packet {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        let mut rest = buf.copy_to_bytes(buf.remaining());
        let padding = if header.padding {
            let len = rest.len();
            if len == 0 {
                return Err(Error::ErrBadPadding);
            }
            let pad_count = rest[len - 1] as usize;
            if pad_count == 0 || pad_count > len {
                return Err(Error::ErrBadPadding);
            }
            rest.split_off(len - pad_count)
        } else {
            Bytes::new()
        };
        Ok(Packet { header, payload: rest, padding })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_packet_with_payload() {
        let p = Packet {
            header: Header {
                marker: true,
                payload_type: 96,
                sequence_number: 7,
                timestamp: 12345,
                ssrc: 9,
                ..Default::default()
            },
            payload: Bytes::from_static(&[1, 2, 3, 4, 5]),
            padding: Bytes::new(),
        };
        let encoded = p.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        let decoded = Packet::unmarshal(&mut buf).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn round_trips_packet_with_padding() {
        let p = Packet {
            header: Header {
                padding: true,
                payload_type: 96,
                sequence_number: 7,
                timestamp: 12345,
                ssrc: 9,
                ..Default::default()
            },
            payload: Bytes::from_static(&[1, 2, 3]),
            padding: Bytes::from_static(&[0, 0, 3]),
        };
        let encoded = p.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        let decoded = Packet::unmarshal(&mut buf).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn rejects_zero_pad_count() {
        let h = Header {
            padding: true,
            payload_type: 96,
            sequence_number: 7,
            timestamp: 12345,
            ssrc: 9,
            ..Default::default()
        };
        let mut encoded = h.marshal().unwrap().to_vec();
        encoded.extend_from_slice(&[1, 2, 0]);
        let mut buf = Bytes::from(encoded);
        assert_eq!(Packet::unmarshal(&mut buf), Err(Error::ErrBadPadding));
    }
}
