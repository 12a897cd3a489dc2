use serde::{Deserialize, Serialize};
use voting_crypto::{Keypair, PublicKey, Signature};

use crate::voter::VoterId;

/// An opaque, single-use token attesting that `voter_id` has been authorized
/// to cast one ballot (spec §3). The nonce makes two tickets issued for the
/// same voter distinct (and hence separately hashable/trackable as
/// "consumed"), matching a real claim-check system rather than keying solely
/// off voter id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotClaimTicket {
    pub voter_id: VoterId,
    pub nonce: u64,
    pub issuer: PublicKey,
    pub issuer_signature: Signature,
}

impl BallotClaimTicket {
    /// Builds and signs a ticket for `voter_id` using `issuer`'s key. `nonce`
    /// is caller-supplied so issuance stays deterministic and testable;
    /// production callers should draw it from an RNG.
    pub fn issue(voter_id: VoterId, nonce: u64, issuer: &Keypair) -> Self {
        let payload = Self::signing_payload(voter_id, nonce, &issuer.public_key());
        let issuer_signature = issuer.sign(&payload);
        Self {
            voter_id,
            nonce,
            issuer: issuer.public_key(),
            issuer_signature,
        }
    }

    fn signing_payload(voter_id: VoterId, nonce: u64, issuer: &PublicKey) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + 32);
        buf.extend_from_slice(&voter_id.to_be_bytes());
        buf.extend_from_slice(&nonce.to_be_bytes());
        buf.extend_from_slice(&issuer.to_bytes());
        buf
    }

    /// True iff the issuer's signature over this ticket's payload is valid.
    pub fn signature_valid(&self) -> bool {
        let payload = Self::signing_payload(self.voter_id, self.nonce, &self.issuer);
        self.issuer.verify(&payload, &self.issuer_signature)
    }

    /// Stable content-addressed identity for this ticket, used to detect
    /// reuse/double-consumption across the chain.
    pub fn id(&self) -> voting_crypto::Hash256 {
        let payload = Self::signing_payload(self.voter_id, self.nonce, &self.issuer);
        voting_crypto::hash::content_hash(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_ticket_has_valid_signature() {
        let issuer = Keypair::generate();
        let ticket = BallotClaimTicket::issue(1, 42, &issuer);
        assert!(ticket.signature_valid());
    }

    #[test]
    fn tampered_ticket_fails_signature_check() {
        let issuer = Keypair::generate();
        let mut ticket = BallotClaimTicket::issue(1, 42, &issuer);
        ticket.voter_id = 2;
        assert!(!ticket.signature_valid());
    }

    #[test]
    fn distinct_nonces_give_distinct_ids() {
        let issuer = Keypair::generate();
        let t1 = BallotClaimTicket::issue(1, 1, &issuer);
        let t2 = BallotClaimTicket::issue(1, 2, &issuer);
        assert_ne!(t1.id(), t2.id());
    }
}
