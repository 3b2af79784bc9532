//! Wire format for `ArcSignaling`, §6: a closed, tagged union of JSON
//! messages. An unrecognized `type` is a hard parse error, never
//! silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use arc_shared::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SignalingMessage {
    #[serde(rename = "CONNECT")]
    Connect {
        version: u32,
        session_id: String,
        peer_id: String,
        capabilities: Capabilities,
        network_info: ConnectNetworkInfo,
        timestamp: i64,
    },
    #[serde(rename = "CONNECT_ACK")]
    ConnectAck {
        session_id: String,
        peer_id: String,
        accepted: bool,
        selected_codecs: SelectedCodecs,
        network_info: ConnectAckNetworkInfo,
        encryption: EncryptionChoice,
        timestamp: i64,
    },
    #[serde(rename = "STREAM_START")]
    StreamStart {
        session_id: String,
        stream_id: String,
        stream_type: StreamType,
        codec: Value,
        ssrc: u32,
        encryption: StreamEncryption,
        timestamp: i64,
    },
    #[serde(rename = "STREAM_STOP")]
    StreamStop { session_id: String, stream_id: String, reason: StreamStopReason, timestamp: i64 },
    #[serde(rename = "QUALITY_ADAPT")]
    QualityAdapt {
        session_id: String,
        stream_id: String,
        quality: QualityParams,
        reason: QualityAdaptReason,
        timestamp: i64,
    },
    #[serde(rename = "HEARTBEAT")]
    Heartbeat { session_id: String, sequence: u64, timestamp: i64 },
    #[serde(rename = "HEARTBEAT_ACK")]
    HeartbeatAck {
        session_id: String,
        sequence: u64,
        original_timestamp: i64,
        response_timestamp: i64,
        latency_ms: i64,
    },
}

impl SignalingMessage {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::ErrOther(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|_| Error::ErrUnknownMessageType)
    }

    pub fn session_id(&self) -> &str {
        match self {
            SignalingMessage::Connect { session_id, .. }
            | SignalingMessage::ConnectAck { session_id, .. }
            | SignalingMessage::StreamStart { session_id, .. }
            | SignalingMessage::StreamStop { session_id, .. }
            | SignalingMessage::QualityAdapt { session_id, .. }
            | SignalingMessage::Heartbeat { session_id, .. }
            | SignalingMessage::HeartbeatAck { session_id, .. } => session_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Capabilities {
    pub codecs: Vec<String>,
    pub resolutions: Vec<String>,
    pub encryption: Vec<String>,
    pub transport: Vec<String>,
    /// Base64-encoded X25519 public key for the ECDH exchange this
    /// `Connect` initiates (§4.8). Not named explicitly in §6's field
    /// table, but carried here rather than inventing a new top-level
    /// message field: it travels with the rest of the peer's negotiated
    /// capabilities.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_exchange_public: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectNetworkInfo {
    pub public_ip: String,
    pub public_port: u16,
    pub nat_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SelectedCodecs {
    pub audio: String,
    pub video: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConnectAckNetworkInfo {
    pub relay_servers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncryptionChoice {
    pub algorithm: String,
    pub key_exchange: String,
    /// Base64-encoded X25519 public key completing the initiator's
    /// exchange (the counterpart of `Capabilities::key_exchange_public`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_exchange_public: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Audio,
    Video,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamEncryption {
    pub key_id: String,
    pub algorithm: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamStopReason {
    UserRequest,
    Error,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityParams {
    pub bitrate: u32,
    pub resolution: String,
    pub fps: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualityAdaptReason {
    Bandwidth,
    Cpu,
    Network,
    Keyframe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_round_trips() {
        let msg = SignalingMessage::Connect {
            version: 1,
            session_id: "sess-1".into(),
            peer_id: "peer-a".into(),
            capabilities: Capabilities {
                codecs: vec!["opus".into(), "vp8".into()],
                resolutions: vec!["1280x720".into()],
                encryption: vec!["aes128_gcm".into()],
                transport: vec!["udp".into()],
                key_exchange_public: "Zm9v".into(),
            },
            network_info: ConnectNetworkInfo {
                public_ip: "203.0.113.9".into(),
                public_port: 50000,
                nat_type: "full_cone".into(),
            },
            timestamp: 1_700_000_000,
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"CONNECT\""));
        let back = SignalingMessage::from_json(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn heartbeat_ack_round_trips() {
        let msg = SignalingMessage::HeartbeatAck {
            session_id: "sess-1".into(),
            sequence: 42,
            original_timestamp: 1000,
            response_timestamp: 1010,
            latency_ms: 10,
        };
        let json = msg.to_json().unwrap();
        let back = SignalingMessage::from_json(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn unrecognized_type_is_rejected() {
        let err = SignalingMessage::from_json(r#"{"type":"BOGUS"}"#).unwrap_err();
        assert_eq!(err, Error::ErrUnknownMessageType);
    }

    #[test]
    fn stream_stop_reason_serializes_snake_case() {
        let msg = SignalingMessage::StreamStop {
            session_id: "s".into(),
            stream_id: "st".into(),
            reason: StreamStopReason::UserRequest,
            timestamp: 0,
        };
        assert!(msg.to_json().unwrap().contains("\"user_request\""));
    }
}
