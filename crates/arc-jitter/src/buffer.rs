//! [`JitterBuffer`]: a per-stream ring keyed by extended sequence number
//! (§4.3). `push` inserts using the caller-supplied extended sequence
//! (resolved upstream by `arc-srtp`'s rollover tracker); `pop` drains in
//! strictly ascending order, synthesizing `Gap` markers for packets that
//! never arrive within `target_depth_ms`.

use std::time::{Duration, Instant};

use arc_rtp::packet::Packet;

/// Large enough to hold several times `max_depth_ms` of packets at any
/// sane media bitrate/packetization interval without wrapping into data
/// that hasn't been delivered yet.
const RING_CAPACITY: u64 = 2048;

struct Slot {
    extended_seq: u64,
    packet: Packet,
    arrival: Instant,
}

/// Result of [`JitterBuffer::pop`].
#[derive(Debug)]
pub enum PopOutcome {
    /// A packet was ready at `head`.
    Delivered(Packet),
    /// `head` has been missing long enough that the caller should
    /// conceal it and move on. Carries the 16-bit wire sequence number
    /// for the benefit of loss counters/NACK generation.
    Gap(u16),
    /// `head` hasn't arrived yet and hasn't been waiting long enough to
    /// declare a gap; try again later.
    NotYet,
}

pub struct JitterBuffer {
    slots: Vec<Option<Slot>>,
    head: Option<u64>,
    newest_arrival: Option<Instant>,
    min_depth_ms: u32,
    max_depth_ms: u32,
    target_depth_ms: u32,
}

impl JitterBuffer {
    pub fn new(min_depth_ms: u32, max_depth_ms: u32, initial_depth_ms: u32) -> Self {
        let mut slots = Vec::with_capacity(RING_CAPACITY as usize);
        slots.resize_with(RING_CAPACITY as usize, || None);
        Self {
            slots,
            head: None,
            newest_arrival: None,
            min_depth_ms,
            max_depth_ms,
            target_depth_ms: initial_depth_ms.clamp(min_depth_ms, max_depth_ms),
        }
    }

    pub fn target_depth_ms(&self) -> u32 {
        self.target_depth_ms
    }

    pub fn head(&self) -> Option<u64> {
        self.head
    }

    /// Insert `packet`, arrived at `arrival`, at `extended_seq`. Drops
    /// packets older than `head` (already delivered) and packets so far
    /// ahead they would overwrite undeliverd ring slots.
    pub fn push(&mut self, extended_seq: u64, packet: Packet, arrival: Instant) {
        let head = match self.head {
            None => {
                self.head = Some(extended_seq);
                extended_seq
            }
            Some(h) => h,
        };

        if extended_seq < head {
            log::trace!("jitter buffer dropping late packet seq={extended_seq} head={head}");
            return;
        }
        if extended_seq - head >= RING_CAPACITY {
            log::trace!("jitter buffer dropping far-future packet seq={extended_seq} head={head}");
            return;
        }

        self.newest_arrival = Some(match self.newest_arrival {
            Some(prev) if prev >= arrival => prev,
            _ => arrival,
        });

        let slot = (extended_seq % RING_CAPACITY) as usize;
        self.slots[slot] = Some(Slot {
            extended_seq,
            packet,
            arrival,
        });
    }

    /// Attempt to deliver the packet at `head`. `now` is compared against
    /// the arrival time of the newest packet seen so far to decide
    /// whether `head` has been missing long enough to synthesize a gap.
    pub fn pop(&mut self, now: Instant) -> PopOutcome {
        let head = match self.head {
            None => return PopOutcome::NotYet,
            Some(h) => h,
        };
        let slot_idx = (head % RING_CAPACITY) as usize;

        if let Some(slot) = &self.slots[slot_idx] {
            if slot.extended_seq == head {
                let slot = self.slots[slot_idx].take().unwrap();
                self.head = Some(head + 1);
                return PopOutcome::Delivered(slot.packet);
            }
        }

        let stale = match self.newest_arrival {
            Some(newest) => now.saturating_duration_since(newest) >= Duration::from_millis(self.target_depth_ms as u64),
            None => false,
        };

        if stale {
            self.head = Some(head + 1);
            PopOutcome::Gap((head & 0xFFFF) as u16)
        } else {
            PopOutcome::NotYet
        }
    }

    /// Recompute `target_depth_ms` from the current jitter estimate `j`
    /// (ms) and loss rate `l` ([0,1]), per §4.3's adaptation rule.
    pub fn adapt(&mut self, jitter_ms: f64, loss_rate: f64) {
        let raw = 2.0 * jitter_ms + 5.0 * loss_rate * self.max_depth_ms as f64;
        let clamped = raw.round().clamp(self.min_depth_ms as f64, self.max_depth_ms as f64);
        self.target_depth_ms = clamped as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_rtp::header::Header;
    use bytes::Bytes;
    use std::time::Duration;

    fn packet(seq: u16) -> Packet {
        Packet {
            header: Header {
                sequence_number: seq,
                ..Default::default()
            },
            payload: Bytes::from_static(&[0xAA; 4]),
            padding: Bytes::new(),
        }
    }

    #[test]
    fn delivers_in_order_clean_loopback() {
        let mut jb = JitterBuffer::new(5, 50, 10);
        let t0 = Instant::now();
        for seq in 1000u64..1100 {
            jb.push(seq, packet(seq as u16), t0 + Duration::from_millis(seq - 1000));
        }
        let mut delivered = Vec::new();
        loop {
            match jb.pop(t0 + Duration::from_millis(99)) {
                PopOutcome::Delivered(p) => delivered.push(p.header.sequence_number),
                PopOutcome::NotYet => break,
                PopOutcome::Gap(seq) => delivered.push(seq),
            }
        }
        let expected: Vec<u16> = (1000..1100).collect();
        assert_eq!(delivered, expected);
    }

    #[test]
    fn absorbs_reorder_within_window() {
        let mut jb = JitterBuffer::new(5, 50, 10);
        let t0 = Instant::now();
        let order = [1000u64, 1001, 1003, 1002, 1004];
        for (i, seq) in order.iter().enumerate() {
            jb.push(*seq, packet(*seq as u16), t0 + Duration::from_millis(20 * i as u64));
        }
        let mut delivered = Vec::new();
        for _ in 0..5 {
            if let PopOutcome::Delivered(p) = jb.pop(t0 + Duration::from_millis(200)) {
                delivered.push(p.header.sequence_number);
            }
        }
        assert_eq!(delivered, vec![1000, 1001, 1002, 1003, 1004]);
    }

    #[test]
    fn reports_gap_for_missing_packet_after_target_depth() {
        let mut jb = JitterBuffer::new(5, 50, 10);
        let t0 = Instant::now();
        for seq in [1000u64, 1001, 1002, 1003, 1004, 1006, 1007, 1008, 1009] {
            jb.push(seq, packet(seq as u16), t0 + Duration::from_millis(seq - 1000));
        }
        let mut outcomes = Vec::new();
        for _ in 0..10 {
            match jb.pop(t0 + Duration::from_millis(100)) {
                PopOutcome::Delivered(p) => outcomes.push(p.header.sequence_number as u64),
                PopOutcome::Gap(seq) => outcomes.push(seq as u64),
                PopOutcome::NotYet => break,
            }
        }
        assert_eq!(
            outcomes,
            vec![1000, 1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008, 1009]
        );
    }

    #[test]
    fn target_depth_adapts_within_configured_bounds() {
        let mut jb = JitterBuffer::new(5, 50, 10);
        jb.adapt(30.0, 0.5);
        assert_eq!(jb.target_depth_ms(), 50); // clamped to max
        jb.adapt(0.0, 0.0);
        assert_eq!(jb.target_depth_ms(), 5); // clamped to min
        jb.adapt(4.0, 0.02);
        assert_eq!(jb.target_depth_ms(), 8);
    }
}
