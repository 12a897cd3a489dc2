use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::{CryptoError, Result};

/// Stable 64-bit hash of a public key's canonical encoding, used as the PKI
/// lookup key. Collisions are not handled specially: at demo scale (tens of
/// nodes) a 64-bit hash is effectively unique, matching the original design's
/// `hash(node.public_key)` directory key.
pub type Fingerprint = u64;

/// An Ed25519 public key. Plays the role the spec's "2048-bit RSA-PKCS1
/// equivalent" asymmetric scheme requires — fixed-size, unforgeable
/// signatures over arbitrary byte strings — via the idiomatic Rust choice of
/// `ed25519-dalek` rather than RSA.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("expected 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&arr)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.0.verify(message, &signature.0).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}…)", &self.to_hex()[..8])
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

/// An Ed25519 signature.
#[derive(Clone, Serialize, Deserialize)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("expected 64-byte signature".into()))?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&arr)))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &hex::encode(self.to_bytes())[..8])
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}
impl Eq for Signature {}

impl PartialOrd for Signature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Signature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

/// An Ed25519 key pair, owned exclusively by one node for the node's lifetime.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Keypair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = PublicKey(signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key)
    }
}

/// Derives the stable PKI fingerprint of a public key's canonical encoding.
pub fn fingerprint(key: &PublicKey) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(key.to_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("digest is >= 8 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keypair = Keypair::generate();
        let message = b"cast a ballot";
        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"original");
        assert!(!keypair.public_key().verify(b"tampered", &signature));
    }

    #[test]
    fn fingerprint_is_stable_and_distinct() {
        let a = Keypair::generate();
        let b = Keypair::generate();
        assert_eq!(fingerprint(&a.public_key()), fingerprint(&a.public_key()));
        assert_ne!(fingerprint(&a.public_key()), fingerprint(&b.public_key()));
    }

    #[test]
    fn public_key_byte_roundtrip() {
        let keypair = Keypair::generate();
        let bytes = keypair.public_key().to_bytes();
        let restored = PublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(keypair.public_key(), restored);
    }
}
