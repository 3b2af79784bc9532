//! AEAD sealing/opening over the two supported [`ProtectionProfile`]s.

use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};

use arc_shared::error::{Error, Result};

use crate::protection_profile::ProtectionProfile;

/// Either AEAD cipher, selected once at [`crate::context::CryptoContext`]
/// construction time by the negotiated [`ProtectionProfile`].
pub enum AeadCipher {
    Aes128Gcm(Box<Aes128Gcm>),
    Aes256Gcm(Box<Aes256Gcm>),
}

impl AeadCipher {
    pub fn new(profile: ProtectionProfile, encryption_key: &[u8]) -> Result<Self> {
        match profile {
            ProtectionProfile::Aes128Gcm => {
                let cipher = Aes128Gcm::new_from_slice(encryption_key)
                    .map_err(|_| Error::ErrShortSrtpMasterKey)?;
                Ok(AeadCipher::Aes128Gcm(Box::new(cipher)))
            }
            ProtectionProfile::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(encryption_key)
                    .map_err(|_| Error::ErrShortSrtpMasterKey)?;
                Ok(AeadCipher::Aes256Gcm(Box::new(cipher)))
            }
        }
    }

    /// Encrypt `plaintext`, authenticating `aad`, returning ciphertext with
    /// the 16-byte GCM tag appended.
    pub fn seal(&self, iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(iv);
        let payload = Payload { msg: plaintext, aad };
        match self {
            AeadCipher::Aes128Gcm(c) => c.encrypt(nonce, payload),
            AeadCipher::Aes256Gcm(c) => c.encrypt(nonce, payload),
        }
        .map_err(|_| Error::ErrAuthFailed)
    }

    /// Decrypt `ciphertext_and_tag`, verifying `aad`. Returns `AuthFailed`
    /// on any tag mismatch or malformed input — never partial plaintext.
    pub fn open(&self, iv: &[u8], aad: &[u8], ciphertext_and_tag: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(iv);
        let payload = Payload {
            msg: ciphertext_and_tag,
            aad,
        };
        match self {
            AeadCipher::Aes128Gcm(c) => c.decrypt(nonce, payload),
            AeadCipher::Aes256Gcm(c) => c.decrypt(nonce, payload),
        }
        .map_err(|_| Error::ErrAuthFailed)
    }
}
