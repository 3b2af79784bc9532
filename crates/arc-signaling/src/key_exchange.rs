//! X25519 ECDH key agreement driven by `Connect`/`ConnectAck` (§4.8).

use x25519_dalek::{PublicKey, StaticSecret};

/// One side of an in-progress key exchange. Holds the ephemeral secret
/// until the peer's public key arrives, then collapses into a shared
/// secret handed to the `KeyProvider`.
pub struct KeyExchange {
    secret: StaticSecret,
}

impl KeyExchange {
    pub fn generate() -> Self {
        Self { secret: StaticSecret::random_from_rng(rand_core::OsRng) }
    }

    pub fn public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.secret).to_bytes()
    }

    /// Complete the exchange with the peer's public key, producing the
    /// raw shared secret used to derive session keys.
    pub fn complete(self, peer_public: &[u8; 32]) -> [u8; 32] {
        let peer = PublicKey::from(*peer_public);
        self.secret.diffie_hellman(&peer).to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_derive_the_same_shared_secret() {
        let alice = KeyExchange::generate();
        let bob = KeyExchange::generate();

        let alice_public = alice.public_key();
        let bob_public = bob.public_key();

        let alice_shared = alice.complete(&bob_public);
        let bob_shared = bob.complete(&alice_public);

        assert_eq!(alice_shared, bob_shared);
    }
}
