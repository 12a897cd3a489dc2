use std::collections::BTreeMap;
use tracing::info;
use voting_core::{BallotTemplate, ElectionConfig, Transaction, VotingError};
use voting_crypto::{Fingerprint, Hash256};
use voting_network::NodeNetwork;

/// Outcome of one periodic consensus tick (spec §4.6). When `committed` is
/// false the largest tip-hash partition never reached the majority
/// threshold and no cohort node appended a block this round — every node
/// simply waits for the next tick (spec §5: "If no majority cohort exists
/// ... the round commits nothing and returns").
#[derive(Debug, Clone)]
pub struct ConsensusRoundReport {
    pub committed: bool,
    pub cohort_size: usize,
    pub total_nodes: usize,
    pub cohort: Vec<Fingerprint>,
    pub new_tip_hash: Option<Hash256>,
    pub approved: usize,
    pub rejected: usize,
    pub rejection_reasons: Vec<VotingError>,
}

impl ConsensusRoundReport {
    fn no_quorum(total_nodes: usize) -> Self {
        Self {
            committed: false,
            cohort_size: 0,
            total_nodes,
            cohort: Vec::new(),
            new_tip_hash: None,
            approved: 0,
            rejected: 0,
            rejection_reasons: Vec::new(),
        }
    }
}

/// Partitions `network`'s nodes by their current tip hash and returns the
/// largest partition, ties broken lexicographically on the hash itself
/// (spec §4.6 step 1). `BTreeMap` iterates hashes in ascending order, so
/// scanning forward and only replacing the incumbent on a strictly greater
/// count gives "first (lexicographically smallest) hash wins ties" for
/// free.
fn majority_partition(network: &NodeNetwork) -> (Hash256, Vec<Fingerprint>) {
    let mut partitions: BTreeMap<Hash256, Vec<Fingerprint>> = BTreeMap::new();
    for node in network.nodes() {
        partitions.entry(node.tip_hash()).or_default().push(node.fingerprint());
    }
    let mut best: Option<(Hash256, Vec<Fingerprint>)> = None;
    for (hash, members) in partitions {
        match &best {
            Some((_, incumbent)) if incumbent.len() >= members.len() => {}
            _ => best = Some((hash, members)),
        }
    }
    best.expect("network has at least one node")
}

/// Runs one consensus round over every node in `network` (spec §4.6). Steps
/// 2-4 (tally, commit, reporting) are delegated to each cohort node's own
/// `begin_consensus_round`/`finalize_consensus_round` (spec §4.5) — this
/// function's job is step 1 (tip agreement) plus gathering the cohort's
/// merged transaction pool and the resulting report.
pub fn run_consensus_round(
    network: &mut NodeNetwork,
    config: &ElectionConfig,
    template: Option<&BallotTemplate>,
    timestamp: u64,
) -> ConsensusRoundReport {
    let total_nodes = network.len();
    if total_nodes == 0 {
        return ConsensusRoundReport::no_quorum(0);
    }

    let (tip_hash, cohort) = majority_partition(network);
    let quorum = config.threshold(total_nodes);
    if cohort.len() < quorum {
        info!(
            cohort_size = cohort.len(),
            quorum, total_nodes, "no tip-hash partition reached quorum this round"
        );
        return ConsensusRoundReport::no_quorum(total_nodes);
    }

    let mut merged: BTreeMap<Hash256, Transaction> = BTreeMap::new();
    for &fp in &cohort {
        let node = network.node(fp).expect("cohort member must be registered");
        for tx in node.open_pool() {
            merged
                .entry(tx.tx_hash())
                .and_modify(|existing| existing.merge_signatures(tx))
                .or_insert_with(|| tx.clone());
        }
    }

    for &fp in &cohort {
        let node = network.node_mut(fp).expect("cohort member must be registered");
        node.begin_consensus_round(merged.values().cloned());
        node.finalize_consensus_round(cohort.len(), config.minimum_agreement_pct, timestamp, template);
    }

    let reporter = network
        .node(cohort[0])
        .expect("cohort member must be registered");
    let report = ConsensusRoundReport {
        committed: true,
        cohort_size: cohort.len(),
        total_nodes,
        cohort: cohort.clone(),
        new_tip_hash: Some(reporter.tip_hash()),
        approved: reporter.last_round_approvals().len(),
        rejected: reporter.last_round_rejections().len(),
        rejection_reasons: reporter.last_round_rejection_reasons().to_vec(),
    };
    info!(
        cohort_size = report.cohort_size,
        approved = report.approved,
        rejected = report.rejected,
        tip = %tip_hash,
        "consensus round finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voting_core::{BallotClaimTicket, Block, Chain, Pki, StateSnapshot, VoterRecord, VoterRoll};
    use voting_crypto::Keypair;
    use voting_node::{LedgerContext, Node, NodePolicy};

    fn honest_network(n: usize, roll: &Arc<VoterRoll>) -> NodeNetwork {
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
    fn quorum_cohort_commits_and_converges() {
        let roll = Arc::new(VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]));
        let mut network = honest_network(5, &roll);
        let config = ElectionConfig {
            minimum_agreement_pct: 2.0 / 3.0,
            total_nodes: 5,
            ..Default::default()
        };

        let issuer = Keypair::generate();
        let ticket = BallotClaimTicket::issue(1, 1, &issuer);
        let tx = Transaction::new_auth_ticket(1, ticket, 0, &issuer);
        let proposer = network.fingerprints().next().unwrap();
        network.submit_and_gossip(proposer, tx).unwrap();

        let report = run_consensus_round(&mut network, &config, None, 1001);
        assert!(report.committed);
        assert_eq!(report.approved, 1);

        let tips: Vec<_> = network.nodes().iter().map(|n| n.tip_hash()).collect();
        assert!(tips.windows(2).all(|w| w[0] == w[1]), "property 7: cohort converges");
    }

    #[test]
    fn below_quorum_partition_commits_nothing() {
        let roll = Arc::new(VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]));
        let mut network = honest_network(3, &roll);
        // Force a 3-way split below any 2/3 majority by advancing one node's
        // chain independently first.
        network
            .node_mut(network.fingerprints().nth(1).unwrap())
            .unwrap()
            .begin_consensus_round([]);
        network
            .node_mut(network.fingerprints().nth(1).unwrap())
            .unwrap()
            .finalize_consensus_round(1, 2.0 / 3.0, 999, None);
        network
            .node_mut(network.fingerprints().nth(2).unwrap())
            .unwrap()
            .begin_consensus_round([]);
        network
            .node_mut(network.fingerprints().nth(2).unwrap())
            .unwrap()
            .finalize_consensus_round(1, 1.0, 1000, None);

        let config = ElectionConfig {
            minimum_agreement_pct: 2.0 / 3.0,
            total_nodes: 3,
            ..Default::default()
        };
        let report = run_consensus_round(&mut network, &config, None, 1001);
        assert!(!report.committed);
    }
}
