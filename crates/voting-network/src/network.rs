use tracing::debug;
use voting_core::{Result as CoreResult, Transaction};
use voting_crypto::{Fingerprint, Hash256};
use voting_node::Node;

use crate::errors::{NetworkError, Result};

/// Owns every node for one ledger and mediates gossip/cosign dispatch
/// between them (Design Notes §9: "the node-lookup for gossip goes through a
/// separate network collaborator that owns the nodes"). This is what breaks
/// the original design's cyclic node<->PKI reference: [`voting_core::Pki`]
/// stays a read-only, cheaply-cloned map of fingerprint to public identity,
/// while the exclusive, mutable mapping from fingerprint to live [`Node`]
/// lives here instead.
///
/// Gossip is modeled as direct, synchronous method invocation (spec §5:
/// "there is no network transport in the core") — no sockets, no async
/// runtime, just this collaborator calling each peer's `cosign_request` in
/// turn.
#[derive(Default)]
pub struct NodeNetwork {
    nodes: Vec<Node>,
}

impl NodeNetwork {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn register(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = Fingerprint> + '_ {
        self.nodes.iter().map(Node::fingerprint)
    }

    fn index_of(&self, fp: Fingerprint) -> Result<usize> {
        self.nodes
            .iter()
            .position(|n| n.fingerprint() == fp)
            .ok_or(NetworkError::UnknownPeer(fp))
    }

    pub fn node(&self, fp: Fingerprint) -> Result<&Node> {
        Ok(&self.nodes[self.index_of(fp)?])
    }

    pub fn node_mut(&mut self, fp: Fingerprint) -> Result<&mut Node> {
        let idx = self.index_of(fp)?;
        Ok(&mut self.nodes[idx])
    }

    /// Submits `tx` at `proposer`, then gossips it to every other registered
    /// node for cosigning, and merges every signature collected back into
    /// the proposer's own pool entry (spec §4.5: node "validates tx locally
    /// ... and gossips signature requests to peers").
    ///
    /// A peer that rejects the transaction (unknown peer fingerprint inside
    /// the payload, invalid signature, etc.) is simply skipped — spec §4.5:
    /// "peer verifies the payload locally; on success appends its
    /// signature; otherwise records a rejection reason" and §7's
    /// `ChainDivergence`/rejection handling, neither of which is fatal to
    /// the gossip round as a whole.
    pub fn submit_and_gossip(&mut self, proposer: Fingerprint, tx: Transaction) -> CoreResult<Hash256> {
        let hash = tx.tx_hash();
        self.node_mut(proposer)
            .map_err(|_| voting_core::VotingError::ChainDivergence)?
            .submit(tx.clone())?;

        let mut gathered = tx;
        for fp in self.fingerprints().collect::<Vec<_>>() {
            if fp == proposer {
                continue;
            }
            let Ok(peer) = self.node_mut(fp) else { continue };
            if let Ok(sig) = peer.cosign_request(&gathered) {
                gathered.add_signature(fp, sig);
                debug!(%fp, %hash, "peer cosigned transaction");
            }
        }

        if let Ok(proposer_node) = self.node_mut(proposer) {
            proposer_node.begin_consensus_round([gathered]);
        }
        Ok(hash)
    }
}
