//! Receiver Report (RFC 3550 §6.4.2), packet type 201.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType};
use crate::reception_report::{REPORT_LENGTH, ReceptionReport};

const SSRC_LENGTH: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverReport {
    pub ssrc: u32,
    pub reports: Vec<ReceptionReport>,
}

impl MarshalSize for ReceiverReport {
    fn marshal_size(&self) -> usize {
        Header::default().marshal_size() + SSRC_LENGTH + self.reports.len() * REPORT_LENGTH
    }
}

impl Marshal for ReceiverReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if self.reports.len() > 0x1f {
            return Err(Error::ErrTooManyReports);
        }
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(Error::ErrBufferTooSmall);
        }

        let header = Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type_raw: PacketType::ReceiverReport.into(),
            length: (size / 4 - 1) as u16,
        };
        let mut offset = header.marshal_to(buf)?;
        buf[offset..offset + SSRC_LENGTH].copy_from_slice(&self.ssrc.to_be_bytes());
        offset += SSRC_LENGTH;

        for report in &self.reports {
            offset += report.marshal_to(&mut buf[offset..])?;
        }
        Ok(offset)
    }
}

impl Unmarshal for ReceiverReport {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if !matches!(header.packet_type(), PacketType::ReceiverReport) {
            return Err(Error::ErrWrongType);
        }
        if buf.remaining() < SSRC_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        let ssrc = buf.get_u32();
        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(buf)?);
        }
        Ok(ReceiverReport { ssrc, reports })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips() {
        let rr = ReceiverReport {
            ssrc: 7,
            reports: vec![ReceptionReport {
                ssrc: 8,
                fraction_lost: 5,
                total_lost: 1,
                last_sequence_number: 99,
                jitter: 2,
                last_sender_report: 3,
                delay: 4,
            }],
        };
        let encoded = rr.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(ReceiverReport::unmarshal(&mut buf).unwrap(), rr);
    }
}
