use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use voting_crypto::{hash::content_hash, Fingerprint, Hash256, Keypair, PublicKey, Signature};

use crate::ballot::BallotSelection;
use crate::pki::Pki;
use crate::ticket::BallotClaimTicket;
use crate::voter::VoterId;

/// The typed payload a transaction carries — one of the two ledgers'
/// variants (spec §1, §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    AuthTicketIssued {
        voter_id: VoterId,
        ticket: BallotClaimTicket,
    },
    BallotCast {
        ticket: BallotClaimTicket,
        selections: BallotSelection,
    },
}

/// A tagged, signed record proposed by one issuer and co-signed by peers
/// (spec §3 "Transaction"). A transaction is *verified* once signatures from
/// a strict majority of the ledger's peers are collected (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payload: TransactionPayload,
    pub timestamp: u64,
    pub issuer: PublicKey,
    /// Countersignatures gathered during gossip, keyed by signer fingerprint
    /// so a `BTreeMap` gives both dedup-by-signer and deterministic
    /// iteration for free.
    signatures: BTreeMap<Fingerprint, Signature>,
}

impl Transaction {
    fn new(payload: TransactionPayload, timestamp: u64, issuer: &Keypair) -> Self {
        let mut tx = Self {
            payload,
            timestamp,
            issuer: issuer.public_key(),
            signatures: BTreeMap::new(),
        };
        let sig = issuer.sign(&tx.canonical_payload_bytes());
        tx.signatures.insert(
            voting_crypto::fingerprint(&issuer.public_key()),
            sig,
        );
        tx
    }

    pub fn new_auth_ticket(voter_id: VoterId, ticket: BallotClaimTicket, timestamp: u64, issuer: &Keypair) -> Self {
        Self::new(
            TransactionPayload::AuthTicketIssued { voter_id, ticket },
            timestamp,
            issuer,
        )
    }

    pub fn new_ballot_cast(
        ticket: BallotClaimTicket,
        selections: BallotSelection,
        timestamp: u64,
        issuer: &Keypair,
    ) -> Self {
        Self::new(
            TransactionPayload::BallotCast { ticket, selections },
            timestamp,
            issuer,
        )
    }

    /// The bytes that are signed and hashed: payload, timestamp and issuer —
    /// deliberately excluding the signature set, so every peer's copy of a
    /// gossiping transaction hashes identically regardless of how many
    /// countersignatures it has accumulated so far.
    pub fn canonical_payload_bytes(&self) -> Vec<u8> {
        bincode::serialize(&(&self.payload, self.timestamp, &self.issuer))
            .expect("transaction payload is always serializable")
    }

    /// Stable content-addressed transaction id, also used as the canonical
    /// commit ordering key (spec §4.5: "ordered by transaction hash
    /// ascending").
    pub fn tx_hash(&self) -> Hash256 {
        content_hash(&self.canonical_payload_bytes())
    }

    /// Appends a peer's signature over this transaction's canonical payload.
    /// The caller (the peer performing `cosign_request`) is responsible for
    /// having verified the signature before calling this — see
    /// [`Transaction::valid_signature_count`] for a way to recheck later.
    pub fn add_signature(&mut self, fingerprint: Fingerprint, signature: Signature) {
        self.signatures.insert(fingerprint, signature);
    }

    /// Unions another cohort member's view of the same transaction's
    /// signatures into this one. Two nodes' local pools may each have
    /// gossip-collected a different subset of countersignatures for the
    /// transaction with this hash (spec §5: "accumulated signatures on the
    /// local copy are not visible to other nodes until the next gossip
    /// exchange or consensus tally") — the consensus round is that tally
    /// point, and merges every cohort copy before counting.
    pub fn merge_signatures(&mut self, other: &Transaction) {
        for (fp, sig) in &other.signatures {
            self.signatures.entry(*fp).or_insert_with(|| sig.clone());
        }
    }

    pub fn has_signature_from(&self, fingerprint: Fingerprint) -> bool {
        self.signatures.contains_key(&fingerprint)
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Recomputes how many of this transaction's recorded signatures are
    /// actually valid for a known peer — an unknown fingerprint or a forged
    /// signature simply doesn't count, per spec §4.2 ("an unknown fingerprint
    /// is a rejection, not a fatal error").
    pub fn valid_signature_count(&self, pki: &Pki) -> usize {
        let payload = self.canonical_payload_bytes();
        self.signatures
            .iter()
            .filter(|(fp, sig)| match pki.lookup(**fp) {
                Some(peer) => peer.public_key.verify(&payload, sig),
                None => false,
            })
            .count()
    }

    /// True iff distinct valid signatures meet the agreement threshold for a
    /// cohort of `peer_count` peers (spec §4.2 `is_verified`).
    pub fn is_verified(&self, pki: &Pki, minimum_agreement_pct: f64, peer_count: usize) -> bool {
        let threshold = (minimum_agreement_pct * peer_count as f64).ceil() as usize;
        self.valid_signature_count(pki) >= threshold.max(1)
    }
}
