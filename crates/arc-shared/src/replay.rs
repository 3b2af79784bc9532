//! Sliding-window replay protection over a 64-bit extended sequence space.
//!
//! Used by `arc-srtp`'s `CryptoContext` to reject duplicated or too-old
//! packets (RFC 3711 §3.3.2). The bitmap tracking approach mirrors the
//! circular receive log used elsewhere in this workspace for NACK
//! generation, but anchors the window at the highest *extended* sequence
//! number seen rather than a 16-bit one, since SRTP replay protection must
//! survive rollover-counter advances.

/// Tracks which of the last `size` extended sequence numbers have been seen.
///
/// `size` must be a power of two in `[64, 32768]`.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    bits: Vec<u64>,
    size: u64,
    highest: Option<u64>,
}

impl ReplayWindow {
    pub fn new(size: u64) -> Option<Self> {
        let is_valid = (6..=15).any(|i| size == 1 << i);
        if !is_valid {
            return None;
        }
        Some(Self {
            bits: vec![0u64; (size / 64) as usize],
            size,
            highest: None,
        })
    }

    /// Highest extended sequence number accepted so far, if any.
    pub fn highest(&self) -> Option<u64> {
        self.highest
    }

    /// Non-mutating check: would `seq` be accepted by [`Self::check_and_update`]
    /// right now? Used by callers (e.g. `arc-srtp`) that must validate an
    /// authentication tag before committing a sequence number as seen.
    pub fn would_accept(&self, seq: u64) -> bool {
        let highest = match self.highest {
            None => return true,
            Some(h) => h,
        };
        if seq > highest {
            true
        } else {
            let diff = highest - seq;
            if diff >= self.size {
                false
            } else {
                !self.get(seq)
            }
        }
    }

    /// Check whether `seq` is acceptable and, if so, mark it as seen.
    ///
    /// Returns `true` if `seq` should be processed, `false` if it is a
    /// replay or falls outside the trailing window and must be discarded.
    pub fn check_and_update(&mut self, seq: u64) -> bool {
        let highest = match self.highest {
            None => {
                self.highest = Some(seq);
                self.set(seq);
                return true;
            }
            Some(h) => h,
        };

        if seq > highest {
            let advance = seq - highest;
            if advance >= self.size {
                for b in self.bits.iter_mut() {
                    *b = 0;
                }
            } else {
                // Sequence numbers strictly between the old and new highest
                // are skipped (not yet received); clear their slots so a
                // stale bit from a previous rotation through the ring
                // doesn't falsely mark them as already seen.
                let mut i = highest + 1;
                while i < seq {
                    self.clear(i);
                    i += 1;
                }
            }
            self.highest = Some(seq);
            self.set(seq);
            true
        } else {
            let diff = highest - seq;
            if diff >= self.size {
                return false;
            }
            if self.get(seq) {
                return false;
            }
            self.set(seq);
            true
        }
    }

    fn slot(&self, seq: u64) -> (usize, u32) {
        let pos = seq % self.size;
        ((pos / 64) as usize, (pos % 64) as u32)
    }

    fn set(&mut self, seq: u64) {
        let (block, bit) = self.slot(seq);
        self.bits[block] |= 1 << bit;
    }

    fn clear(&mut self, seq: u64) {
        let (block, bit) = self.slot(seq);
        self.bits[block] &= !(1u64 << bit);
    }

    fn get(&self, seq: u64) -> bool {
        let (block, bit) = self.slot(seq);
        (self.bits[block] & (1 << bit)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_sizes() {
        assert!(ReplayWindow::new(5).is_none());
        assert!(ReplayWindow::new(100).is_none());
        assert!(ReplayWindow::new(64).is_some());
        assert!(ReplayWindow::new(32768).is_some());
    }

    #[test]
    fn accepts_monotonically_increasing() {
        let mut w = ReplayWindow::new(64).unwrap();
        for seq in 1000u64..1100 {
            assert!(w.check_and_update(seq));
        }
    }

    #[test]
    fn rejects_exact_replay() {
        let mut w = ReplayWindow::new(64).unwrap();
        assert!(w.check_and_update(2000));
        assert!(!w.check_and_update(2000));
    }

    #[test]
    fn accepts_reorder_within_window() {
        let mut w = ReplayWindow::new(64).unwrap();
        assert!(w.check_and_update(100));
        assert!(w.check_and_update(102));
        assert!(w.check_and_update(101));
        assert!(!w.check_and_update(101));
    }

    #[test]
    fn rejects_beyond_window() {
        let mut w = ReplayWindow::new(64).unwrap();
        assert!(w.check_and_update(1000));
        assert!(w.check_and_update(1000 + 64));
        // 1000 is now exactly `size` behind the new highest: outside the window.
        assert!(!w.check_and_update(1000));
    }

    #[test]
    fn would_accept_does_not_mutate() {
        let mut w = ReplayWindow::new(64).unwrap();
        assert!(w.check_and_update(100));
        assert!(w.would_accept(101));
        assert!(w.would_accept(101)); // calling twice doesn't consume it
        assert!(w.check_and_update(101));
        assert!(!w.would_accept(101));
    }

    #[test]
    fn large_jump_clears_window() {
        let mut w = ReplayWindow::new(64).unwrap();
        assert!(w.check_and_update(10));
        assert!(w.check_and_update(10_000));
        assert!(w.check_and_update(9_999));
    }
}
