//! The negotiated SRTP encryption suite (§6 `crypto.suite`).
//!
//! A closed enum so an unsupported suite is a construction-time error,
//! never a silent fallback to something weaker.

/// AEAD suite used to seal/open SRTP packets for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectionProfile {
    Aes128Gcm,
    Aes256Gcm,
}

impl ProtectionProfile {
    /// Master/derived encryption key length, in bytes.
    pub const fn key_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128Gcm => 16,
            ProtectionProfile::Aes256Gcm => 32,
        }
    }

    /// Derived session salt length, in bytes. Chosen to match the AES-GCM
    /// 96-bit nonce once XORed with the 12-byte `SSRC || ROC || seq || 0x0000`
    /// construction (`key_derivation::build_iv`), rather than the 14-byte
    /// salt RFC 3711's AES-CM mode uses.
    pub const fn salt_len(&self) -> usize {
        12
    }

    /// GCM authentication tag length, in bytes.
    pub const fn tag_len(&self) -> usize {
        16
    }
}

impl Default for ProtectionProfile {
    fn default() -> Self {
        ProtectionProfile::Aes128Gcm
    }
}
