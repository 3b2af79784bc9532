#![allow(dead_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the media transport core.
///
/// Each component of the pipeline (codec, crypto, jitter buffer, signaling,
/// transport) contributes its own closed set of variants here rather than
/// boxing an opaque `dyn Error`, so callers can match on exactly what went
/// wrong and decide whether it is a per-packet, per-stream or per-session
/// failure.
#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // --- PacketCodec / RTP ---
    #[error("packet is not large enough")]
    ErrShortPacket,
    #[error("RTP header size insufficient")]
    ErrHeaderSizeInsufficient,
    #[error("RTP header size insufficient for extension")]
    ErrHeaderSizeInsufficientForExtension,
    #[error("unsupported RTP version")]
    ErrUnsupportedVersion,
    #[error("invalid padding value")]
    ErrBadPadding,
    #[error("extension_payload must be in 32-bit words")]
    ErrTruncatedExtension,
    #[error("buffer too small")]
    ErrBufferTooSmall,
    #[error("extension not enabled")]
    ErrHeaderExtensionsNotEnabled,
    #[error("extension not found")]
    ErrHeaderExtensionNotFound,

    // --- PacketCodec / RTCP ---
    #[error("packet contains an invalid header")]
    ErrInvalidHeader,
    #[error("invalid packet version")]
    ErrBadVersion,
    #[error("packet contains empty compound")]
    ErrEmptyCompound,
    #[error("first packet in compound must be SR or RR")]
    ErrBadFirstPacket,
    #[error("wrong packet type")]
    ErrWrongType,
    #[error("too many reports")]
    ErrTooManyReports,
    #[error("too many chunks")]
    ErrTooManyChunks,
    #[error("too many sources")]
    ErrTooManySources,
    #[error("SDES must be < 255 octets long")]
    ErrSdesTextTooLong,
    #[error("SDES item missing type")]
    ErrSdesMissingType,
    #[error("reason must be < 255 octets long")]
    ErrReasonTooLong,
    #[error("header length is too small")]
    ErrHeaderTooSmall,
    #[error("wrong marshal size")]
    ErrWrongMarshalSize,

    // --- CryptoSession / SRTP ---
    #[error("failed to verify auth tag")]
    ErrAuthFailed,
    #[error("duplicated or out-of-window packet")]
    ErrReplayDetected,
    #[error("key rotation required, context exhausted")]
    ErrRotationRequired,
    #[error("SRTP master key is not long enough")]
    ErrShortSrtpMasterKey,
    #[error("SRTP master salt is not long enough")]
    ErrShortSrtpMasterSalt,
    #[error("no such SRTP protection profile")]
    ErrNoSuchSrtpProfile,
    #[error("SSRC {0} not present in this crypto context")]
    ErrSsrcMismatch(u32),

    // --- JitterBuffer / PlcEngine ---
    #[error("extended sequence number before window, discarded")]
    ErrLatePacket,
    #[error("concealment requested for unknown stream")]
    ErrUnknownConcealTarget,

    // --- StreamManager / stream lifecycle ---
    #[error("stream with this SSRC already exists")]
    ErrDuplicateSsrc,
    #[error("unsupported codec")]
    ErrUnsupportedCodec,
    #[error("invalid state transition")]
    ErrInvalidTransition,
    #[error("unknown stream")]
    ErrUnknownStream,
    #[error("unknown session")]
    ErrUnknownSession,
    #[error("no stream owns this SSRC")]
    ErrUnknownSsrc,
    #[error("malformed packet")]
    ErrMalformedPacket,

    // --- SignalingEngine ---
    #[error("stream_start received before connection is established")]
    ErrPrematureStreamStart,
    #[error("unrecognized signaling message type")]
    ErrUnknownMessageType,
    #[error("signaling message missing required field: {0}")]
    ErrMissingField(&'static str),
    #[error("key exchange failed")]
    ErrKeyExchangeFailed,

    // --- Transport ---
    #[error("transport write failed")]
    ErrTransportWriteFailed,
    #[error("transport read failed")]
    ErrTransportReadFailed,
    #[error("transport operation timed out")]
    ErrTransportTimeout,

    // --- Configuration ---
    #[error("invalid configuration: {0}")]
    ErrInvalidConfiguration(&'static str),

    #[error("{0}")]
    ErrOther(String),
}
