use rand::{Rng, rng};

/// Returns true if `buf` looks like an RTCP packet (payload type 192..=223),
/// as opposed to RTP, per the demuxing convention of RFC 7983 §4 applied to
/// packets already classified as RTP/RTCP (first byte in [128..191]).
pub fn is_rtcp(buf: &[u8]) -> bool {
    if buf.len() < 4 {
        return false;
    }
    let rtcp_packet_type = buf[1];
    (192..=223).contains(&rtcp_packet_type)
}

const RUNES_ALPHA_NUMBER: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random alphanumeric identifier, used for session and stream
/// identifiers where a full UUID would be overkill.
pub fn random_id(n: usize) -> String {
    let mut r = rng();
    (0..n)
        .map(|_| {
            let idx = r.random_range(0..RUNES_ALPHA_NUMBER.len());
            RUNES_ALPHA_NUMBER[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_rtcp_payload_types() {
        assert!(is_rtcp(&[0x80, 200, 0, 0]));
        assert!(is_rtcp(&[0x80, 223, 0, 0]));
        assert!(!is_rtcp(&[0x80, 96, 0, 0]));
        assert!(!is_rtcp(&[0x80]));
    }

    #[test]
    fn random_id_has_requested_length() {
        assert_eq!(random_id(16).len(), 16);
    }
}
