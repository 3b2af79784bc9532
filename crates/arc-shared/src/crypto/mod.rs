use std::sync::Arc;

use crate::error::Result;

/// Capability interface for supplying session key material.
///
/// Sits in `arc-shared` so `arc-srtp` and `arc-signaling` can both depend
/// on it without a direct dependency between them, the same reasoning the
/// teacher's `KeyingMaterialExporter` uses to sit between `dtls` and `srtp`.
pub trait KeyProvider {
    /// Fetch the master key and salt previously installed for `key_id`.
    fn get(&self, key_id: &str) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Install or replace the master key and salt for `key_id`.
    fn put(&self, key_id: &str, master_key: &[u8], master_salt: &[u8]) -> Result<()>;

    /// Rotate `key_id` to a new master key, keeping the same salt.
    fn rotate(&self, key_id: &str, new_master_key: &[u8]) -> Result<()>;
}

/// Lets a single `KeyProvider` implementation be shared, via `Arc`,
/// between a `SignalingEngine` (which owns its key provider by value) and
/// a `StreamManager` serving the same session.
impl<T: KeyProvider + ?Sized> KeyProvider for Arc<T> {
    fn get(&self, key_id: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        (**self).get(key_id)
    }

    fn put(&self, key_id: &str, master_key: &[u8], master_salt: &[u8]) -> Result<()> {
        (**self).put(key_id, master_key, master_salt)
    }

    fn rotate(&self, key_id: &str, new_master_key: &[u8]) -> Result<()> {
        (**self).rotate(key_id, new_master_key)
    }
}
