//! Binary (de)serialization traits shared by the RTP and RTCP packet types.
//!
//! Mirrors the `Marshal`/`Unmarshal` split used throughout the rest of the
//! webrtc-rs family: `MarshalSize` lets a caller size a buffer exactly once,
//! `Marshal` writes into caller-owned storage (or allocates via `marshal()`),
//! and `Unmarshal` parses in place from a `Buf` without copying the payload.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Result;

/// Types that know their own wire size without actually encoding.
pub trait MarshalSize {
    /// Size, in bytes, of this value once marshaled.
    fn marshal_size(&self) -> usize;
}

/// Types that can be encoded to bytes.
pub trait Marshal: MarshalSize {
    /// Encode `self` into `buf`, returning the number of bytes written.
    ///
    /// `buf` must have at least `self.marshal_size()` bytes of capacity.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    /// Encode `self` into a freshly allocated buffer.
    fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.marshal_size());
        buf.resize(self.marshal_size(), 0);
        let n = self.marshal_to(&mut buf)?;
        buf.truncate(n);
        Ok(buf.freeze())
    }
}

/// Types that can be decoded from bytes.
///
/// Implementors should advance `buf` by exactly the number of bytes they
/// consumed, so callers can parse a sequence of values (e.g. a compound
/// RTCP packet) by calling `unmarshal` repeatedly until `buf` is empty.
pub trait Unmarshal: Sized {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf;
}
