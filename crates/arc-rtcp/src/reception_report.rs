//! Per-source reception report block (RFC 3550 §6.4.1), embedded in both
//! Sender Report and Receiver Report packets.

use bytes::{Buf, BufMut};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

pub const REPORT_LENGTH: usize = 24;
const MAX_TOTAL_LOST: u32 = 0x00ff_ffff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceptionReport {
    pub ssrc: u32,
    /// Fraction of packets lost since the previous report, as an 8-bit
    /// fixed-point number (256 == 1.0).
    pub fraction_lost: u8,
    /// Cumulative number of packets lost, a signed 24-bit value.
    pub total_lost: u32,
    /// Extended highest sequence number received.
    pub last_sequence_number: u32,
    /// Interarrival jitter estimate, in timestamp units.
    pub jitter: u32,
    /// Middle 32 bits of the NTP timestamp of the last SR received (LSR).
    pub last_sender_report: u32,
    /// Delay since the last SR was received, in units of 1/65536 seconds (DLSR).
    pub delay: u32,
}

impl MarshalSize for ReceptionReport {
    fn marshal_size(&self) -> usize {
        REPORT_LENGTH
    }
}

impl Marshal for ReceptionReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < REPORT_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        if self.total_lost > MAX_TOTAL_LOST {
            return Err(Error::ErrTooManyReports);
        }
        let mut w = &mut buf[..];
        w.put_u32(self.ssrc);
        w.put_u8(self.fraction_lost);
        w.put_uint(self.total_lost as u64, 3);
        w.put_u32(self.last_sequence_number);
        w.put_u32(self.jitter);
        w.put_u32(self.last_sender_report);
        w.put_u32(self.delay);
        Ok(REPORT_LENGTH)
    }
}

impl Unmarshal for ReceptionReport {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        if buf.remaining() < REPORT_LENGTH {
            return Err(Error::ErrHeaderTooSmall);
        }
        let ssrc = buf.get_u32();
        let fraction_lost = buf.get_u8();
        let total_lost = buf.get_uint(3) as u32;
        let last_sequence_number = buf.get_u32();
        let jitter = buf.get_u32();
        let last_sender_report = buf.get_u32();
        let delay = buf.get_u32();
        Ok(ReceptionReport {
            ssrc,
            fraction_lost,
            total_lost,
            last_sequence_number,
            jitter,
            last_sender_report,
            delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips() {
        let r = ReceptionReport {
            ssrc: 1,
            fraction_lost: 10,
            total_lost: 42,
            last_sequence_number: 1000,
            jitter: 5,
            last_sender_report: 0x1234,
            delay: 0x5678,
        };
        let encoded = r.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(ReceptionReport::unmarshal(&mut buf).unwrap(), r);
    }
}
