use serde::{Deserialize, Serialize};
use voting_crypto::hash::{content_hash, merkle_root};
use voting_crypto::Hash256;

use crate::state::StateSnapshot;
use crate::transaction::Transaction;

/// An immutable, committed block (spec §3 "Block"). `hash` is recomputed from
/// the other fields on construction and never mutated afterward — the type
/// has no public mutators once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub prev_hash: Hash256,
    pub transactions: Vec<Transaction>,
    pub state: StateSnapshot,
    pub timestamp: u64,
    hash: Hash256,
}

impl Block {
    /// `H(index || prev_hash || H(transactions) || H(state) || timestamp)`,
    /// exactly the formula in spec §3.
    fn compute_hash(
        index: u64,
        prev_hash: &Hash256,
        transactions: &[Transaction],
        state: &StateSnapshot,
        timestamp: u64,
    ) -> Hash256 {
        let tx_hashes: Vec<Hash256> = transactions.iter().map(Transaction::tx_hash).collect();
        let tx_root = merkle_root(tx_hashes.iter());
        let state_bytes = bincode::serialize(state).expect("state is always serializable");
        let state_hash = content_hash(&state_bytes);

        let mut buf = Vec::new();
        buf.extend_from_slice(&index.to_be_bytes());
        buf.extend_from_slice(prev_hash.as_bytes());
        buf.extend_from_slice(tx_root.as_bytes());
        buf.extend_from_slice(state_hash.as_bytes());
        buf.extend_from_slice(&timestamp.to_be_bytes());
        content_hash(&buf)
    }

    pub fn genesis(state: StateSnapshot, timestamp: u64) -> Self {
        let prev_hash = Hash256::zero();
        let transactions = Vec::new();
        let hash = Self::compute_hash(0, &prev_hash, &transactions, &state, timestamp);
        Self {
            index: 0,
            prev_hash,
            transactions,
            state,
            timestamp,
            hash,
        }
    }

    pub fn new(
        index: u64,
        prev_hash: Hash256,
        transactions: Vec<Transaction>,
        state: StateSnapshot,
        timestamp: u64,
    ) -> Self {
        let hash = Self::compute_hash(index, &prev_hash, &transactions, &state, timestamp);
        Self {
            index,
            prev_hash,
            transactions,
            state,
            timestamp,
            hash,
        }
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// Recomputes the hash from this block's own fields and compares it to
    /// the stored one — used by [`crate::chain::Chain::validate`] to detect
    /// any byte of tampering (spec §8 property 1).
    pub fn hash_is_consistent(&self) -> bool {
        let recomputed = Self::compute_hash(
            self.index,
            &self.prev_hash,
            &self.transactions,
            &self.state,
            self.timestamp,
        );
        recomputed == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voter::{VoterRecord, VoterRoll};

    #[test]
    fn genesis_hash_is_consistent() {
        let roll = VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]);
        let block = Block::genesis(StateSnapshot::genesis_voter(&roll), 1000);
        assert!(block.hash_is_consistent());
    }

    #[test]
    fn mutating_timestamp_breaks_hash_consistency() {
        let roll = VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]);
        let mut block = Block::genesis(StateSnapshot::genesis_voter(&roll), 1000);
        block.timestamp += 1;
        assert!(!block.hash_is_consistent());
    }
}
