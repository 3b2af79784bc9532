//! A trivial in-process [`KeyProvider`], for embedders (and the loopback
//! demo) that manage their own out-of-band key distribution and just need
//! somewhere to stash the resulting master key/salt pairs.

use std::collections::HashMap;
use std::sync::RwLock;

use arc_shared::crypto::KeyProvider;
use arc_shared::error::{Error, Result};

#[derive(Default)]
pub struct InMemoryKeyProvider {
    keys: RwLock<HashMap<String, (Vec<u8>, Vec<u8>)>>,
}

impl InMemoryKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn get(&self, key_id: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        self.keys
            .read()
            .expect("key provider lock poisoned")
            .get(key_id)
            .cloned()
            .ok_or_else(|| Error::ErrInvalidConfiguration("no key material installed for this key id"))
    }

    fn put(&self, key_id: &str, master_key: &[u8], master_salt: &[u8]) -> Result<()> {
        self.keys
            .write()
            .expect("key provider lock poisoned")
            .insert(key_id.to_string(), (master_key.to_vec(), master_salt.to_vec()));
        Ok(())
    }

    fn rotate(&self, key_id: &str, new_master_key: &[u8]) -> Result<()> {
        let mut keys = self.keys.write().expect("key provider lock poisoned");
        let entry = keys
            .get_mut(key_id)
            .ok_or_else(|| Error::ErrInvalidConfiguration("no key material installed for this key id"))?;
        entry.0 = new_master_key.to_vec();
        Ok(())
    }
}
