use std::sync::Arc;

use voting_core::{BallotTemplate, Block, Chain, ElectionConfig, Pki, StateSnapshot, VoterRoll};
use voting_crypto::Keypair;
use voting_network::NodeNetwork;
use voting_node::{LedgerContext, Node, NodePolicy};

/// The default ballot template used by the interactive/simulated demo,
/// matching `original_source`'s "U.S. 2020 Federal Election" setup
/// (`votingprogram.py::VotingProgram.setup`) — two single-choice contests.
pub fn default_ballot_template() -> BallotTemplate {
    let mut template = BallotTemplate::new();
    template
        .add_item(
            "President",
            "Head of executive branch",
            vec!["Obama(D)".into(), "Bloomberg(R)".into()],
            1,
        )
        .expect("template not yet finalized");
    template
        .add_item(
            "Vice President",
            "Executive right below President",
            vec!["Joe Biden(D)".into(), "Bradley Tusk(R)".into()],
            1,
        )
        .expect("template not yet finalized");
    template.finalize();
    template
}

/// Builds the voter-authentication ledger's node network (spec §1 "voter
/// ledger"). `config.adversarial_mode` draws `config.adversary_bound()`
/// nodes running [`NodePolicy::AuthBypass`] — the variant
/// `original_source`'s `setup()` selects by default — leaving the rest
/// honest.
pub fn build_voter_network(roll: &Arc<VoterRoll>, config: &ElectionConfig, timestamp: u64) -> (NodeNetwork, Arc<Pki>) {
    let adversaries = if config.adversarial_mode { config.adversary_bound() } else { 0 };
    let keypairs: Vec<Keypair> = (0..config.total_nodes).map(|_| Keypair::generate()).collect();
    let pki = Arc::new(Pki::from_public_keys(keypairs.iter().enumerate().map(|(i, kp)| {
        (kp.public_key(), i < adversaries)
    })));

    let mut network = NodeNetwork::new();
    for (i, keypair) in keypairs.into_iter().enumerate() {
        let policy = if i < adversaries { NodePolicy::AuthBypass } else { NodePolicy::Honest };
        let genesis = Block::genesis(StateSnapshot::genesis_voter(roll), timestamp);
        let chain = Chain::new(genesis);
        network.register(Node::new(
            keypair,
            chain,
            pki.clone(),
            LedgerContext::Voter { roll: roll.clone() },
            policy,
        ));
    }
    (network, pki)
}

/// Builds the ballot ledger's node network, parameterized by the voter
/// ledger's PKI so a ballot node can check a claim ticket's issuer is a
/// legitimate auth booth (spec §4.5). Adversary nodes here run
/// [`NodePolicy::BallotForger`], `original_source`'s `AdversaryVotingComputer`.
pub fn build_ballot_network(
    template: &Arc<BallotTemplate>,
    auth_pki: Arc<Pki>,
    config: &ElectionConfig,
    timestamp: u64,
) -> NodeNetwork {
    let adversaries = if config.adversarial_mode { config.adversary_bound() } else { 0 };
    let keypairs: Vec<Keypair> = (0..config.total_nodes).map(|_| Keypair::generate()).collect();
    let pki = Arc::new(Pki::from_public_keys(keypairs.iter().enumerate().map(|(i, kp)| {
        (kp.public_key(), i < adversaries)
    })));

    let mut network = NodeNetwork::new();
    for (i, keypair) in keypairs.into_iter().enumerate() {
        let policy = if i < adversaries { NodePolicy::BallotForger } else { NodePolicy::Honest };
        let genesis = Block::genesis(StateSnapshot::genesis_ballot(template), timestamp);
        let chain = Chain::new(genesis);
        network.register(Node::new(
            keypair,
            chain,
            pki.clone(),
            LedgerContext::Ballot {
                template: template.clone(),
                auth_pki: auth_pki.clone(),
            },
            policy,
        ));
    }
    network
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_core::VoterRecord;

    #[test]
    fn adversarial_mode_assigns_forger_policy_to_a_bounded_minority() {
        let roll = Arc::new(VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]));
        let config = ElectionConfig {
            total_nodes: 30,
            adversarial_mode: true,
            minimum_agreement_pct: 2.0 / 3.0,
            ..Default::default()
        };
        let (network, _pki) = build_voter_network(&roll, &config, 1000);
        let adversaries = network.nodes().iter().filter(|n| n.is_adversary()).count();
        assert_eq!(adversaries, config.adversary_bound());
        assert!(adversaries < network.len() - adversaries, "adversaries stay a minority");
    }
}
