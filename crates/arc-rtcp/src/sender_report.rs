//! Sender Report (RFC 3550 §6.4.1), packet type 200.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType};
use crate::reception_report::{REPORT_LENGTH, ReceptionReport};

const SSRC_LENGTH: usize = 4;
const SENDER_INFO_LENGTH: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderReport {
    pub ssrc: u32,
    /// Full 64-bit NTP timestamp of this report.
    pub ntp_time: u64,
    pub rtp_time: u32,
    pub packet_count: u32,
    pub octet_count: u32,
    pub reports: Vec<ReceptionReport>,
}

impl MarshalSize for SenderReport {
    fn marshal_size(&self) -> usize {
        Header::default().marshal_size()
            + SSRC_LENGTH
            + SENDER_INFO_LENGTH
            + self.reports.len() * REPORT_LENGTH
    }
}

impl Marshal for SenderReport {
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
            packet_type_raw: PacketType::SenderReport.into(),
            length: (size / 4 - 1) as u16,
        };
        let mut offset = header.marshal_to(buf)?;

        {
            let mut w = &mut buf[offset..];
            w.put_u32(self.ssrc);
            w.put_u64(self.ntp_time);
            w.put_u32(self.rtp_time);
            w.put_u32(self.packet_count);
            w.put_u32(self.octet_count);
        }
        offset += SSRC_LENGTH + SENDER_INFO_LENGTH;

        for report in &self.reports {
            offset += report.marshal_to(&mut buf[offset..])?;
        }
        Ok(offset)
    }
}

impl Unmarshal for SenderReport {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if !matches!(header.packet_type(), PacketType::SenderReport) {
            return Err(Error::ErrWrongType);
        }
        if buf.remaining() < SSRC_LENGTH + SENDER_INFO_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        let ssrc = buf.get_u32();
        let ntp_time = buf.get_u64();
        let rtp_time = buf.get_u32();
        let packet_count = buf.get_u32();
        let octet_count = buf.get_u32();

        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(buf)?);
        }

        Ok(SenderReport {
            ssrc,
            ntp_time,
            rtp_time,
            packet_count,
            octet_count,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips_with_reports() {
        let sr = SenderReport {
            ssrc: 1,
            ntp_time: 0x1122_3344_5566_7788,
            rtp_time: 96_000,
            packet_count: 100,
            octet_count: 16_000,
            reports: vec![ReceptionReport {
                ssrc: 2,
                fraction_lost: 0,
                total_lost: 0,
                last_sequence_number: 1000,
                jitter: 0,
                last_sender_report: 0,
                delay: 0,
            }],
        };
        let encoded = sr.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(SenderReport::unmarshal(&mut buf).unwrap(), sr);
    }

    #[test]
    fn round_trips_without_reports() {
        let sr = SenderReport {
            ssrc: 9,
            ntp_time: 1,
            rtp_time: 2,
            packet_count: 3,
            octet_count: 4,
            reports: vec![],
        };
        let encoded = sr.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(SenderReport::unmarshal(&mut buf).unwrap(), sr);
    }
}
