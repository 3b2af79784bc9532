//! HKDF-SHA256 key derivation (§4.2) and SRTP IV formation.
//!
//! Unlike RFC 3711's AES-CM-based key derivation, this workspace derives
//! session keys with plain HKDF-SHA256 over three fixed labels, per-SSRC,
//! which keeps `arc-srtp` free of the CTR-mode PRF machinery the original
//! SRTP KDF needs — reasonable since this is a closed protocol between
//! this implementation's own peers, not a general SRTP interop layer.

use hkdf::Hkdf;
use sha2::Sha256;

use arc_shared::error::{Error, Result};

use crate::protection_profile::ProtectionProfile;

const LABEL_ENC: &[u8] = b"arcrtc-enc";
const LABEL_AUTH: &[u8] = b"arcrtc-auth";
const LABEL_SALT: &[u8] = b"arcrtc-salt";
const AUTH_KEY_LEN: usize = 32;

/// Keys derived for one `(master_key, master_salt, ssrc)` triple.
#[derive(Clone)]
pub struct DerivedKeys {
    pub encryption_key: Vec<u8>,
    pub auth_key: Vec<u8>,
    pub salt: Vec<u8>,
}

/// Derive `(encryption_key, auth_key, salt)` for `ssrc` under `profile`.
///
/// Deterministic in its inputs: the same `(master_key, master_salt, ssrc)`
/// always yields the same `DerivedKeys`.
pub fn derive(master_key: &[u8], master_salt: &[u8], ssrc: u32, profile: ProtectionProfile) -> Result<DerivedKeys> {
    if master_key.len() != profile.key_len() {
        return Err(Error::ErrShortSrtpMasterKey);
    }
    if master_salt.is_empty() {
        return Err(Error::ErrShortSrtpMasterSalt);
    }

    let hk = Hkdf::<Sha256>::new(Some(master_salt), master_key);
    let ssrc_be = ssrc.to_be_bytes();

    let mut encryption_key = vec![0u8; profile.key_len()];
    expand(&hk, LABEL_ENC, &ssrc_be, &mut encryption_key)?;

    let mut auth_key = vec![0u8; AUTH_KEY_LEN];
    expand(&hk, LABEL_AUTH, &ssrc_be, &mut auth_key)?;

    let mut salt = vec![0u8; profile.salt_len()];
    expand(&hk, LABEL_SALT, &ssrc_be, &mut salt)?;

    Ok(DerivedKeys {
        encryption_key,
        auth_key,
        salt,
    })
}

fn expand(hk: &Hkdf<Sha256>, label: &[u8], ssrc_be: &[u8; 4], out: &mut [u8]) -> Result<()> {
    let mut info = Vec::with_capacity(label.len() + 4);
    info.extend_from_slice(label);
    info.extend_from_slice(ssrc_be);
    hk.expand(&info, out).map_err(|_| Error::ErrOther("HKDF expand failed".to_string()))
}

/// Build the AEAD nonce for `(salt, ssrc, roc, seq)`:
/// `salt XOR (SSRC(4) || ROC(4) || seq(2) || 0x0000)`.
pub fn build_iv(salt: &[u8], ssrc: u32, roc: u32, seq: u16) -> Vec<u8> {
    let mut block = [0u8; 12];
    block[0..4].copy_from_slice(&ssrc.to_be_bytes());
    block[4..8].copy_from_slice(&roc.to_be_bytes());
    block[8..10].copy_from_slice(&seq.to_be_bytes());
    // block[10..12] stays zero.

    let mut iv = vec![0u8; salt.len()];
    for (i, b) in iv.iter_mut().enumerate() {
        *b = salt[i] ^ block[i];
    }
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let key = vec![1u8; 16];
        let salt = vec![2u8; 12];
        let a = derive(&key, &salt, 42, ProtectionProfile::Aes128Gcm).unwrap();
        let b = derive(&key, &salt, 42, ProtectionProfile::Aes128Gcm).unwrap();
        assert_eq!(a.encryption_key, b.encryption_key);
        assert_eq!(a.auth_key, b.auth_key);
        assert_eq!(a.salt, b.salt);
    }

    #[test]
    fn different_ssrc_yields_different_keys() {
        let key = vec![1u8; 16];
        let salt = vec![2u8; 12];
        let a = derive(&key, &salt, 1, ProtectionProfile::Aes128Gcm).unwrap();
        let b = derive(&key, &salt, 2, ProtectionProfile::Aes128Gcm).unwrap();
        assert_ne!(a.encryption_key, b.encryption_key);
    }

    #[test]
    fn rejects_wrong_key_length() {
        let key = vec![1u8; 8];
        let salt = vec![2u8; 12];
        assert!(derive(&key, &salt, 1, ProtectionProfile::Aes128Gcm).is_err());
    }

    #[test]
    fn iv_changes_with_sequence() {
        let salt = vec![0u8; 12];
        let a = build_iv(&salt, 1, 0, 1);
        let b = build_iv(&salt, 1, 0, 2);
        assert_ne!(a, b);
    }
}
