//! [`SessionHandle`]: implements `arc_signaling::StreamCoordinator` over a
//! shared [`StreamManager`], so one manager can serve many concurrently
//! negotiating `SignalingEngine`s (one per session) without
//! `arc-signaling` depending on `arc-core` directly (§3's "SignalingEngine
//! holds a narrow handle to StreamManager" design note).

use std::sync::{Arc, Mutex};

use arc_signaling::coordinator::StreamParams;
use arc_signaling::message::StreamType;
use arc_signaling::StreamCoordinator;
use arc_shared::crypto::KeyProvider;
use arc_shared::error::{Error, Result};

use crate::manager::{CreateStreamParams, StreamManager};
use crate::stream::{MediaKind, StreamState};

pub struct SessionHandle<K: KeyProvider> {
    session_id: String,
    manager: Arc<Mutex<StreamManager<K>>>,
}

impl<K: KeyProvider> SessionHandle<K> {
    pub fn new(session_id: impl Into<String>, manager: Arc<Mutex<StreamManager<K>>>) -> Self {
        Self { session_id: session_id.into(), manager }
    }
}

fn parse_resolution(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

impl<K: KeyProvider> StreamCoordinator for SessionHandle<K> {
    fn create_stream(&mut self, stream_id: &str, params: StreamParams) -> Result<()> {
        let kind = match params.stream_type {
            StreamType::Audio => MediaKind::Audio,
            StreamType::Video => MediaKind::Video,
            // A single `Stream` is one unidirectional media flow (§3); a
            // combined audio+video request needs two SSRCs and two
            // `STREAM_START` messages, not one.
            StreamType::Both => return Err(Error::ErrMalformedPacket),
        };
        let mut manager = self.manager.lock().expect("stream manager lock poisoned");
        manager.create_stream(
            &self.session_id,
            stream_id,
            CreateStreamParams {
                ssrc: params.ssrc,
                kind,
                payload_type: 0,
                codec: params.codec,
                encryption_enabled: params.encryption_enabled,
                key_id: params.key_id,
            },
        )?;
        manager.update_state(stream_id, StreamState::Active)
    }

    fn stop_stream(&mut self, stream_id: &str) -> Result<()> {
        let mut manager = self.manager.lock().expect("stream manager lock poisoned");
        manager.update_state(stream_id, StreamState::Stopped)
    }

    fn adapt_quality(&mut self, stream_id: &str, bitrate: u32, resolution: &str, _fps: u32) -> Result<()> {
        let mut manager = self.manager.lock().expect("stream manager lock poisoned");
        manager.set_target(stream_id, bitrate, parse_resolution(resolution))
    }

    fn stop_all(&mut self) {
        let mut manager = self.manager.lock().expect("stream manager lock poisoned");
        manager.close_session(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Instant;

    #[derive(Default)]
    struct MemKeyProvider(RefCell<HashMap<String, (Vec<u8>, Vec<u8>)>>);

    impl KeyProvider for MemKeyProvider {
        fn get(&self, key_id: &str) -> Result<(Vec<u8>, Vec<u8>)> {
            self.0.borrow().get(key_id).cloned().ok_or(Error::ErrUnknownSession)
        }
        fn put(&self, key_id: &str, master_key: &[u8], master_salt: &[u8]) -> Result<()> {
            self.0.borrow_mut().insert(key_id.to_string(), (master_key.to_vec(), master_salt.to_vec()));
            Ok(())
        }
        fn rotate(&self, _key_id: &str, _new_master_key: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn create_stream_activates_it_through_the_shared_manager() {
        use arc_shared::config::ArcConfig;

        let key_provider = MemKeyProvider::default();
        key_provider.put("sess-1", &[1u8; 16], &[2u8; 12]).unwrap();
        let manager = Arc::new(Mutex::new(StreamManager::new(ArcConfig::default(), key_provider).unwrap()));
        manager.lock().unwrap().open_session("sess-1", "local", "remote", Instant::now());
        manager.lock().unwrap().establish_session("sess-1").unwrap();

        let mut handle = SessionHandle::new("sess-1", manager.clone());
        handle
            .create_stream(
                "stream-1",
                StreamParams {
                    ssrc: 42,
                    stream_type: StreamType::Audio,
                    codec: "opus".into(),
                    encryption_enabled: true,
                    key_id: "sess-1".into(),
                },
            )
            .unwrap();

        assert_eq!(manager.lock().unwrap().stream_state("stream-1").unwrap(), StreamState::Active);
    }

    #[test]
    fn combined_audio_video_stream_type_is_rejected() {
        use arc_shared::config::ArcConfig;
        let manager = Arc::new(Mutex::new(StreamManager::new(ArcConfig::default(), MemKeyProvider::default()).unwrap()));
        manager.lock().unwrap().open_session("sess-1", "local", "remote", Instant::now());
        let mut handle = SessionHandle::new("sess-1", manager);
        let err = handle
            .create_stream(
                "stream-1",
                StreamParams { ssrc: 1, stream_type: StreamType::Both, codec: "opus".into(), encryption_enabled: false, key_id: String::new() },
            )
            .unwrap_err();
        assert_eq!(err, Error::ErrMalformedPacket);
    }
}
