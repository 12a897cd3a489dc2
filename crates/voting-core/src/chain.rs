use tracing::{info, warn};

use crate::ballot::BallotTemplate;
use crate::block::Block;
use crate::error::{Result, VotingError};
use crate::state::StateSnapshot;
use crate::transaction::Transaction;

/// An ordered, append-only sequence of blocks beginning with a genesis block
/// (spec §3 "Chain"). Owned exclusively by one [`voting_node`]-crate `Node`;
/// nothing outside that node ever mutates it directly (spec §5).
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn new(genesis: Block) -> Self {
        assert_eq!(genesis.index, 0, "first block must be the genesis block");
        Self {
            blocks: vec![genesis],
        }
    }

    pub fn current_tip(&self) -> &Block {
        self.blocks.last().expect("chain always has at least a genesis block")
    }

    pub fn height(&self) -> u64 {
        self.current_tip().index
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_at(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Appends a new block built from `transactions` applied to the current
    /// tip's state, in canonical hash order (spec §4.5, §4.6 step 3).
    /// Returns the error from the first transaction whose application would
    /// violate a chain invariant, refusing to append rather than committing
    /// an inconsistent state (spec §7).
    pub fn append(
        &mut self,
        mut transactions: Vec<Transaction>,
        timestamp: u64,
        template: Option<&BallotTemplate>,
    ) -> Result<&Block> {
        transactions.sort_by_key(Transaction::tx_hash);

        let mut state = self.current_tip().state.clone();
        for tx in &transactions {
            state = state.apply(tx, template)?;
        }

        let prev_hash = self.current_tip().hash();
        let index = self.current_tip().index + 1;
        let block = Block::new(index, prev_hash, transactions, state, timestamp);
        info!(index, hash = %block.hash(), "block appended");
        self.blocks.push(block);
        Ok(self.current_tip())
    }

    /// Appends a block whose transactions and final state were already
    /// folded by the caller (the consensus round, which must skip individual
    /// transactions whose application fails rather than aborting the whole
    /// batch — see `voting-node`'s `Node::finalize_consensus_round`). Unlike
    /// [`Chain::append`], this never reapplies transactions; it only
    /// recomputes the hash and enforces `prev_hash` linkage, exactly the
    /// spec's `append(chain, txs, new_state) -> Block`.
    pub fn append_built(
        &mut self,
        transactions: Vec<Transaction>,
        new_state: StateSnapshot,
        timestamp: u64,
    ) -> &Block {
        let prev_hash = self.current_tip().hash();
        let index = self.current_tip().index + 1;
        let block = Block::new(index, prev_hash, transactions, new_state, timestamp);
        info!(index, hash = %block.hash(), "pre-tallied block appended");
        self.blocks.push(block);
        self.current_tip()
    }

    /// Rechecks every hash linkage and replays every state transition from
    /// genesis, failing on the first inconsistency (spec §4.3, §8 property 1).
    pub fn validate(&self, template: Option<&BallotTemplate>) -> Result<()> {
        let mut expected_state = self.blocks[0].state.clone();
        if !self.blocks[0].hash_is_consistent() {
            warn!("genesis block hash inconsistent with its contents");
            return Err(VotingError::InvalidChain {
                reason: "genesis block hash inconsistent with its contents".into(),
            });
        }

        for window in self.blocks.windows(2) {
            let (prev, current) = (&window[0], &window[1]);
            if !current.hash_is_consistent() {
                warn!(index = current.index, "block hash inconsistent with its contents");
                return Err(VotingError::InvalidChain {
                    reason: format!("block {} hash inconsistent with its contents", current.index),
                });
            }
            if current.prev_hash != prev.hash() {
                warn!(index = current.index, prev = prev.index, "block does not chain to its predecessor");
                return Err(VotingError::InvalidChain {
                    reason: format!("block {} does not chain to block {}", current.index, prev.index),
                });
            }
            if current.index != prev.index + 1 {
                warn!(index = current.index, prev = prev.index, "block is not sequential after its predecessor");
                return Err(VotingError::InvalidChain {
                    reason: format!("block {} is not sequential after block {}", current.index, prev.index),
                });
            }

            let mut ordered = current.transactions.clone();
            ordered.sort_by_key(Transaction::tx_hash);
            if ordered != current.transactions {
                warn!(index = current.index, "block transactions are not in canonical hash order");
                return Err(VotingError::InvalidChain {
                    reason: format!("block {} transactions are not in canonical hash order", current.index),
                });
            }

            for tx in &current.transactions {
                expected_state = expected_state.apply(tx, template)?;
            }
            if expected_state != current.state {
                warn!(index = current.index, "block state does not match replayed transactions");
                return Err(VotingError::InvalidChain {
                    reason: format!("block {} state does not match replayed transactions", current.index),
                });
            }
        }
        Ok(())
    }
}
