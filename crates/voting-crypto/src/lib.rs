pub mod hash;
pub mod keys;

use thiserror::Error;

/// Core cryptographic errors encountered by the voting ledgers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CryptoError {
    #[error("invalid key encoding: {0}")]
    InvalidKey(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("invalid hash encoding: {0}")]
    InvalidHash(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

// Re-export commonly used types.
pub use hash::Hash256;
pub use keys::{fingerprint, Fingerprint, Keypair, PublicKey, Signature};
