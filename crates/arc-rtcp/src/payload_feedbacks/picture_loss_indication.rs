//! Picture Loss Indication (RFC 4585 §6.3.1), a Payload-Specific Feedback
//! (PT=206) message with FMT=1. `AdaptController` emits this to request a
//! keyframe after PLC exhausts its concealment budget.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType};

pub const PLI_FMT: u8 = 1;
const BODY_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PictureLossIndication {
    pub sender_ssrc: u32,
    pub media_ssrc: u32,
}

impl MarshalSize for PictureLossIndication {
    fn marshal_size(&self) -> usize {
        Header::default().marshal_size() + BODY_LENGTH
    }
}

impl Marshal for PictureLossIndication {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }
        let header = Header {
            padding: false,
            count: PLI_FMT,
            packet_type_raw: PacketType::PayloadSpecificFeedback.into(),
            length: (size / 4 - 1) as u16,
        };
        let mut offset = header.marshal_to(buf)?;
        {
            let mut w = &mut buf[offset..];
            w.put_u32(self.sender_ssrc);
            w.put_u32(self.media_ssrc);
        }
        offset += BODY_LENGTH;
        Ok(offset)
    }
}

impl Unmarshal for PictureLossIndication {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if !matches!(header.packet_type(), PacketType::PayloadSpecificFeedback) || header.count != PLI_FMT
        {
            return Err(Error::ErrWrongType);
        }
        if buf.remaining() < BODY_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        Ok(PictureLossIndication {
            sender_ssrc: buf.get_u32(),
            media_ssrc: buf.get_u32(),
        })
    }
}
