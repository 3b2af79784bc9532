//! Common RTCP packet header (RFC 3550 §6.1).

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const VERSION: u8 = 2;
pub const HEADER_LENGTH: usize = 4;

/// RTCP payload type identifiers this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    SenderReport,
    ReceiverReport,
    SourceDescription,
    Goodbye,
    TransportSpecificFeedback,
    PayloadSpecificFeedback,
    Unsupported(u8),
}

impl From<u8> for PacketType {
    fn from(b: u8) -> Self {
        match b {
            200 => PacketType::SenderReport,
            201 => PacketType::ReceiverReport,
            202 => PacketType::SourceDescription,
            203 => PacketType::Goodbye,
            205 => PacketType::TransportSpecificFeedback,
            206 => PacketType::PayloadSpecificFeedback,
            other => PacketType::Unsupported(other),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(t: PacketType) -> Self {
        match t {
            PacketType::SenderReport => 200,
            PacketType::ReceiverReport => 201,
            PacketType::SourceDescription => 202,
            PacketType::Goodbye => 203,
            PacketType::TransportSpecificFeedback => 205,
            PacketType::PayloadSpecificFeedback => 206,
            PacketType::Unsupported(b) => b,
        }
    }
}

/// The 4-byte RTCP header shared by every packet type.
///
/// `count` doubles as the feedback message type (FMT) for the two feedback
/// packet types, and as the report/chunk count for everything else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    pub count: u8,
    pub packet_type_raw: u8,
    /// Length of the packet body in 32-bit words, not including this header.
    pub length: u16,
}

impl Header {
    pub fn packet_type(&self) -> PacketType {
        PacketType::from(self.packet_type_raw)
    }
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH
    }
}

impl Marshal for Header {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < HEADER_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        if self.count > 0x1f {
            return Err(Error::ErrTooManyReports);
        }
        let mut w = &mut buf[..];
        let mut b0 = (VERSION << 6) | self.count;
        if self.padding {
            b0 |= 1 << 5;
        }
        w.put_u8(b0);
        w.put_u8(self.packet_type_raw);
        w.put_u16(self.length);
        Ok(HEADER_LENGTH)
    }
}

impl Unmarshal for Header {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        if buf.remaining() < HEADER_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        let b0 = buf.get_u8();
        let version = b0 >> 6;
        if version != VERSION {
            return Err(Error::ErrBadVersion);
        }
        let padding = (b0 & 0b0010_0000) != 0;
        let count = b0 & 0b0001_1111;
        let packet_type_raw = buf.get_u8();
        let length = buf.get_u16();
        Ok(Header {
            padding,
            count,
            packet_type_raw,
            length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips() {
        let h = Header {
            padding: false,
            count: 1,
            packet_type_raw: 200,
            length: 6,
        };
        let encoded = h.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(Header::unmarshal(&mut buf).unwrap(), h);
    }

    #[test]
    fn rejects_bad_version() {
        let bytes = [0x00u8, 200, 0, 6];
        let mut buf = Bytes::copy_from_slice(&bytes);
        assert_eq!(Header::unmarshal(&mut buf), Err(Error::ErrBadVersion));
    }
}
