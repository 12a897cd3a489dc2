use thiserror::Error;

/// Errors raised by the network collaborator itself, distinct from the
/// ledger-semantic [`voting_core::VotingError`] a node's validation returns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("no node registered for fingerprint {0}")]
    UnknownPeer(u64),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
