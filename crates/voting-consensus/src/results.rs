use std::collections::BTreeMap;
use voting_core::{ElectionConfig, StateSnapshot};
use voting_crypto::Hash256;
use voting_network::NodeNetwork;

/// Result of a results query (spec §6 "Results query"). Mirrors the
/// original program's `display_results`, which prints the state of
/// whichever block hash a `MINIMUM_AGREEMENT_PCT` share of nodes hold and
/// otherwise reports "Blocks are not in sync."
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsQuery {
    InSync { tip_hash: Hash256, state: StateSnapshot },
    OutOfSync,
}

/// Returns the committed state of any block whose hash is held by at least
/// `minimum_agreement_pct` of `network`'s nodes, or [`ResultsQuery::OutOfSync`]
/// if no such block exists yet (spec §6). The caller may retry after the
/// next consensus round.
pub fn query_results(network: &NodeNetwork, config: &ElectionConfig) -> ResultsQuery {
    let total = network.len();
    if total == 0 {
        return ResultsQuery::OutOfSync;
    }

    let mut counts: BTreeMap<Hash256, usize> = BTreeMap::new();
    let mut states: BTreeMap<Hash256, StateSnapshot> = BTreeMap::new();
    for node in network.nodes() {
        let tip = node.chain().current_tip();
        *counts.entry(tip.hash()).or_insert(0) += 1;
        states.entry(tip.hash()).or_insert_with(|| tip.state.clone());
    }

    let threshold = config.threshold(total);
    for (hash, count) in counts {
        if count >= threshold {
            return ResultsQuery::InSync {
                tip_hash: hash,
                state: states.remove(&hash).expect("state recorded alongside count"),
            };
        }
    }
    ResultsQuery::OutOfSync
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voting_core::{Block, Chain, Pki, VoterRecord, VoterRoll};
    use voting_crypto::Keypair;
    use voting_node::{LedgerContext, Node, NodePolicy};

    fn fresh_network(n: usize, roll: &Arc<VoterRoll>) -> NodeNetwork {
        let keypairs: Vec<Keypair> = (0..n).map(|_| Keypair::generate()).collect();
        let pki = Arc::new(Pki::from_public_keys(
            keypairs.iter().map(|k| (k.public_key(), false)),
        ));
        let mut network = NodeNetwork::new();
        for kp in keypairs {
            let genesis = Block::genesis(StateSnapshot::genesis_voter(roll), 1000);
            let chain = Chain::new(genesis);
            network.register(Node::new(
                kp,
                chain,
                pki.clone(),
                LedgerContext::Voter { roll: roll.clone() },
                NodePolicy::Honest,
            ));
        }
        network
    }

    #[test]
    fn fresh_network_agrees_on_genesis() {
        let roll = Arc::new(VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]));
        let network = fresh_network(5, &roll);
        let config = ElectionConfig {
            total_nodes: 5,
            ..Default::default()
        };
        assert!(matches!(query_results(&network, &config), ResultsQuery::InSync { .. }));
    }

    #[test]
    fn empty_network_is_out_of_sync() {
        let network = NodeNetwork::new();
        let config = ElectionConfig::default();
        assert_eq!(query_results(&network, &config), ResultsQuery::OutOfSync);
    }
}
