//! [`Packet`], a closed union over every RTCP packet type this crate
//! understands, plus compound-packet (de)serialization.

use bytes::{Buf, Bytes};

use arc_shared::error::{Error, Result};
use arc_shared::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::goodbye::Goodbye;
use crate::header::{Header, PacketType};
use crate::nack::{NACK_FMT, TransportLayerNack};
use crate::payload_feedbacks::PictureLossIndication;
use crate::payload_feedbacks::picture_loss_indication::PLI_FMT;
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;
use crate::source_description::SourceDescription;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(SourceDescription),
    Goodbye(Goodbye),
    PictureLossIndication(PictureLossIndication),
    TransportLayerNack(TransportLayerNack),
}

impl MarshalSize for Packet {
    fn marshal_size(&self) -> usize {
        match self {
            Packet::SenderReport(p) => p.marshal_size(),
            Packet::ReceiverReport(p) => p.marshal_size(),
            Packet::SourceDescription(p) => p.marshal_size(),
            Packet::Goodbye(p) => p.marshal_size(),
            Packet::PictureLossIndication(p) => p.marshal_size(),
            Packet::TransportLayerNack(p) => p.marshal_size(),
        }
    }
}

impl Marshal for Packet {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Packet::SenderReport(p) => p.marshal_to(buf),
            Packet::ReceiverReport(p) => p.marshal_to(buf),
            Packet::SourceDescription(p) => p.marshal_to(buf),
            Packet::Goodbye(p) => p.marshal_to(buf),
            Packet::PictureLossIndication(p) => p.marshal_to(buf),
            Packet::TransportLayerNack(p) => p.marshal_to(buf),
        }
    }
}

impl Unmarshal for Packet {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        // Peek the header without consuming, so the per-type unmarshal
        // implementations can each re-read it from the start.
        let header_bytes = buf.chunk();
        if header_bytes.len() < 4 {
            return Err(Error::ErrHeaderTooSmall);
        }
        let mut peek = Bytes::copy_from_slice(&header_bytes[..4]);
        let header = Header::unmarshal(&mut peek)?;
        let body_len = header.length as usize * 4;
        let total_len = 4 + body_len;
        if buf.remaining() < total_len {
            return Err(Error::ErrHeaderTooSmall);
        }
        let mut whole = buf.copy_to_bytes(total_len);

        match header.packet_type() {
            PacketType::SenderReport => Ok(Packet::SenderReport(SenderReport::unmarshal(&mut whole)?)),
            PacketType::ReceiverReport => Ok(Packet::ReceiverReport(ReceiverReport::unmarshal(&mut whole)?)),
            PacketType::SourceDescription => {
                Ok(Packet::SourceDescription(SourceDescription::unmarshal(&mut whole)?))
            }
            PacketType::Goodbye => Ok(Packet::Goodbye(Goodbye::unmarshal(&mut whole)?)),
            PacketType::PayloadSpecificFeedback if header.count == PLI_FMT => Ok(
                Packet::PictureLossIndication(PictureLossIndication::unmarshal(&mut whole)?),
            ),
            PacketType::TransportSpecificFeedback if header.count == NACK_FMT => Ok(
                Packet::TransportLayerNack(TransportLayerNack::unmarshal(&mut whole)?),
            ),
            _ => Err(Error::ErrBadFirstPacket),
        }
    }
}

/// Parse a compound RTCP datagram: a sequence of packets back to back,
/// terminated when the accumulated length reaches the end of `buf`
/// (RFC 3550 §6.1). The first packet in a compliant compound packet is
/// always an SR or RR; that is enforced by callers that care (this
/// function accepts any mix so a single generic NACK or PLI can also be
/// parsed on its own).
pub fn unmarshal_compound(buf: &mut Bytes) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    while buf.has_remaining() {
        packets.push(Packet::unmarshal(buf)?);
    }
    if packets.is_empty() {
        return Err(Error::ErrEmptyCompound);
    }
    Ok(packets)
}

/// Serialize a compound RTCP datagram as the concatenation of each
/// packet's own serialization, in order.
pub fn marshal_compound(packets: &[Packet]) -> Result<Bytes> {
    if packets.is_empty() {
        return Err(Error::ErrEmptyCompound);
    }
    let size: usize = packets.iter().map(Packet::marshal_size).sum();
    let mut buf = vec![0u8; size];
    let mut offset = 0;
    for packet in packets {
        offset += packet.marshal_to(&mut buf[offset..])?;
    }
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nack::NackPair;
    use crate::reception_report::ReceptionReport;

    #[test]
    fn round_trips_single_packet() {
        let p = Packet::Goodbye(Goodbye {
            sources: vec![42],
            reason: String::new(),
        });
        let encoded = p.marshal().unwrap();
        let mut buf = Bytes::from(encoded.to_vec());
        assert_eq!(Packet::unmarshal(&mut buf).unwrap(), p);
    }

    #[test]
    fn round_trips_compound_sr_then_sdes() {
        let sr = Packet::SenderReport(SenderReport {
            ssrc: 1,
            ntp_time: 2,
            rtp_time: 3,
            packet_count: 4,
            octet_count: 5,
            reports: vec![ReceptionReport {
                ssrc: 6,
                ..Default::default()
            }],
        });
        let sdes = Packet::SourceDescription(SourceDescription::default());
        let packets = vec![sr, sdes];
        let encoded = marshal_compound(&packets).unwrap();
        let mut buf = encoded.clone();
        let decoded = unmarshal_compound(&mut buf).unwrap();
        assert_eq!(decoded, packets);
    }

    #[test]
    fn round_trips_compound_with_nack_and_pli() {
        let packets = vec![
            Packet::TransportLayerNack(TransportLayerNack {
                sender_ssrc: 1,
                media_ssrc: 2,
                nacks: vec![NackPair {
                    packet_id: 10,
                    lost_bitmask: 1,
                }],
            }),
            Packet::PictureLossIndication(PictureLossIndication {
                sender_ssrc: 1,
                media_ssrc: 2,
            }),
        ];
        let encoded = marshal_compound(&packets).unwrap();
        let mut buf = encoded.clone();
        assert_eq!(unmarshal_compound(&mut buf).unwrap(), packets);
    }

    #[test]
    fn rejects_empty_compound() {
        let mut buf = Bytes::new();
        assert!(unmarshal_compound(&mut buf).is_err());
    }
}
