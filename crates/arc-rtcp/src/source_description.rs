//! Source Description (RFC 3550 §6.5), packet type 202.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdesType {
    Cname,
    Name,
    Email,
    Phone,
    Loc,
    Tool,
    Note,
    Priv,
}

impl From<u8> for SdesType {
    fn from(b: u8) -> Self {
        match b {
            1 => SdesType::Cname,
            2 => SdesType::Name,
            3 => SdesType::Email,
            4 => SdesType::Phone,
            5 => SdesType::Loc,
            6 => SdesType::Tool,
            7 => SdesType::Note,
            _ => SdesType::Priv,
        }
    }
}

impl From<SdesType> for u8 {
    fn from(t: SdesType) -> Self {
        match t {
            SdesType::Cname => 1,
            SdesType::Name => 2,
            SdesType::Email => 3,
            SdesType::Phone => 4,
            SdesType::Loc => 5,
            SdesType::Tool => 6,
            SdesType::Note => 7,
            SdesType::Priv => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptionItem {
    pub sdes_type: SdesType,
    pub text: String,
}

impl SourceDescriptionItem {
    fn encoded_len(&self) -> usize {
        2 + self.text.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDescriptionChunk {
    pub ssrc: u32,
    pub items: Vec<SourceDescriptionItem>,
}

impl SourceDescriptionChunk {
    fn encoded_len(&self) -> usize {
        let items_len: usize = self.items.iter().map(SourceDescriptionItem::encoded_len).sum();
        let raw = 4 + items_len + 1; // +1 for the null terminator octet
        raw.div_ceil(4) * 4
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDescription {
    pub chunks: Vec<SourceDescriptionChunk>,
}

impl MarshalSize for SourceDescription {
    fn marshal_size(&self) -> usize {
        Header::default().marshal_size()
            + self
                .chunks
                .iter()
                .map(SourceDescriptionChunk::encoded_len)
                .sum::<usize>()
    }
}

impl Marshal for SourceDescription {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if self.chunks.len() > 0x1f {
            return Err(Error::ErrTooManyChunks);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }

        let header = Header {
            padding: false,
            count: self.chunks.len() as u8,
            packet_type_raw: PacketType::SourceDescription.into(),
            length: (size / 4 - 1) as u16,
        };
        let mut offset = header.marshal_to(buf)?;

        for chunk in &self.chunks {
            let start = offset;
            {
                let mut w = &mut buf[offset..];
                w.put_u32(chunk.ssrc);
            }
            offset += 4;
            for item in &chunk.items {
                if item.text.len() > 0xff {
                    return Err(Error::ErrSdesTextTooLong);
                }
                buf[offset] = item.sdes_type.into();
                buf[offset + 1] = item.text.len() as u8;
                buf[offset + 2..offset + 2 + item.text.len()].copy_from_slice(item.text.as_bytes());
                offset += 2 + item.text.len();
            }
            buf[offset] = 0; // null terminator
            offset += 1;
            let chunk_len = offset - start;
            let padded = chunk_len.div_ceil(4) * 4;
            for b in &mut buf[offset..start + padded] {
                *b = 0;
            }
            offset = start + padded;
        }
        Ok(offset)
    }
}

impl Unmarshal for SourceDescription {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if !matches!(header.packet_type(), PacketType::SourceDescription) {
            return Err(Error::ErrWrongType);
        }
        let body_len = header.length as usize * 4;
        if buf.remaining() < body_len {
            return Err(Error::ErrHeaderTooSmall);
        }
        let mut remaining = body_len;
        let mut chunks = Vec::with_capacity(header.count as usize);

        for _ in 0..header.count {
            if remaining < 4 {
                return Err(Error::ErrHeaderTooSmall);
            }
            let ssrc = buf.get_u32();
            remaining -= 4;
            let mut consumed = 4;
            let mut items = Vec::new();
            loop {
                if remaining == 0 {
                    return Err(Error::ErrSdesMissingType);
                }
                let type_byte = buf.get_u8();
                remaining -= 1;
                consumed += 1;
                if type_byte == 0 {
                    break;
                }
                if remaining == 0 {
                    return Err(Error::ErrHeaderTooSmall);
                }
                let len = buf.get_u8() as usize;
                remaining -= 1;
                consumed += 1;
                if remaining < len {
                    return Err(Error::ErrHeaderTooSmall);
                }
                let mut text_bytes = vec![0u8; len];
                buf.copy_to_slice(&mut text_bytes);
                remaining -= len;
                consumed += len;
                let text = String::from_utf8(text_bytes).map_err(|_| Error::ErrSdesTextTooLong)?;
                items.push(SourceDescriptionItem {
                    sdes_type: type_byte.into(),
                    text,
                });
            }
            let padding = consumed.div_ceil(4) * 4 - consumed;
            if remaining < padding {
                return Err(Error::ErrHeaderTooSmall);
            }
            buf.advance(padding);
            remaining -= padding;

            chunks.push(SourceDescriptionChunk { ssrc, items });
        }

        Ok(SourceDescription { chunks })
    }
}
