use thiserror::Error;

/// Semantic error taxonomy for the replicated ledgers. Rejections that a node
/// records in `last_round_rejection_reasons` carry one of these variants
/// rather than a fatal propagation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VotingError {
    #[error("unknown voter")]
    UnknownVoter,

    #[error("voter has no tickets")]
    NotEnoughBallotClaimTickets,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("ticket already consumed")]
    TicketAlreadyConsumed,

    #[error("insufficient signatures this round")]
    InsufficientSignatures,

    #[error("selection does not match ballot template: {reason}")]
    MalformedSelection { reason: String },

    #[error("node outside majority consensus cohort this round")]
    ChainDivergence,

    #[error("ballot template mutated after finalize")]
    BallotTemplateFinalized,

    #[error("ballot template item not finalized")]
    BallotTemplateNotFinalized,

    #[error("chain invariant violated: {reason}")]
    InvalidChain { reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cryptographic error: {0}")]
    Crypto(#[from] voting_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, VotingError>;
