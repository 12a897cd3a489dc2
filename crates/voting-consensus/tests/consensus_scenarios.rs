//! End-to-end scenarios straight out of the worked examples in the
//! specification this crate implements: a clean election, a double-vote
//! attempt, a minority adversary that cannot forge a commit, a divergent-tip
//! recovery, a too-early results query, and an adversary sized exactly at the
//! tolerated bound.

use std::sync::Arc;

use voting_consensus::{query_results, run_consensus_round, ResultsQuery};
use voting_core::{
    BallotSelection, BallotTemplate, Block, Chain, ElectionConfig, Pki, StateSnapshot, VoterRecord,
    VoterRoll,
};
use voting_crypto::Keypair;
use voting_network::NodeNetwork;
use voting_node::{LedgerContext, Node, NodePolicy};

fn template() -> BallotTemplate {
    let mut t = BallotTemplate::new();
    t.add_item("position", "single contest", vec!["A".into(), "B".into()], 1)
        .unwrap();
    t.finalize();
    t
}

fn voter_network(n: usize, roll: &Arc<VoterRoll>, adversaries: usize, policy: NodePolicy) -> NodeNetwork {
    let keypairs: Vec<Keypair> = (0..n).map(|_| Keypair::generate()).collect();
    let pki = Arc::new(Pki::from_public_keys(
        keypairs.iter().enumerate().map(|(i, k)| (k.public_key(), i < adversaries)),
    ));
    let mut network = NodeNetwork::new();
    for (i, kp) in keypairs.into_iter().enumerate() {
        let node_policy = if i < adversaries { policy } else { NodePolicy::Honest };
        let genesis = Block::genesis(StateSnapshot::genesis_voter(roll), 1000);
        let chain = Chain::new(genesis);
        network.register(Node::new(
            kp,
            chain,
            pki.clone(),
            LedgerContext::Voter { roll: roll.clone() },
            node_policy,
        ));
    }
    network
}

fn ballot_network(n: usize, template: &Arc<BallotTemplate>, auth_pki: Arc<Pki>) -> NodeNetwork {
    let keypairs: Vec<Keypair> = (0..n).map(|_| Keypair::generate()).collect();
    let pki = Arc::new(Pki::from_public_keys(keypairs.iter().map(|k| (k.public_key(), false))));
    let mut network = NodeNetwork::new();
    for kp in keypairs {
        let genesis = Block::genesis(StateSnapshot::genesis_ballot(template), 1000);
        let chain = Chain::new(genesis);
        network.register(Node::new(
            kp,
            chain,
            pki.clone(),
            LedgerContext::Ballot {
                template: template.clone(),
                auth_pki: auth_pki.clone(),
            },
            NodePolicy::Honest,
        ));
    }
    network
}

fn three_voter_roll() -> Arc<VoterRoll> {
    Arc::new(VoterRoll::new(vec![
        VoterRecord { name: "v1".into(), num_claim_tickets: 1 },
        VoterRecord { name: "v2".into(), num_claim_tickets: 1 },
        VoterRecord { name: "v3".into(), num_claim_tickets: 1 },
    ]))
}

/// S1 — clean election: 3 voters, each 1 ticket, 5 honest nodes per ledger,
/// every voter chooses A on the single contest. After one consensus round
/// per ledger, every ballot node's tip state tallies `{A: 3, B: 0}`.
#[test]
fn s1_clean_election_converges_on_expected_tally() {
    let roll = three_voter_roll();
    let template = Arc::new(template());
    let config = ElectionConfig {
        minimum_agreement_pct: 2.0 / 3.0,
        total_nodes: 5,
        ..Default::default()
    };

    let mut voters = voter_network(5, &roll, 0, NodePolicy::Honest);
    let voter_pki = Arc::new(Pki::from_public_keys(
        voters.nodes().iter().map(|n| (n.public_key(), false)),
    ));
    let mut ballots = ballot_network(5, &template, voter_pki);

    for voter in roll.iter() {
        let auth_fp = voters.fingerprints().next().unwrap();
        let (ticket, tx) = voters.node_mut(auth_fp).unwrap().issue_ticket(voter.id, 1, 1001).unwrap();
        voters.submit_and_gossip(auth_fp, tx).unwrap();

        let mut selection = BallotSelection::new();
        selection.select("position", [0]);
        let ballot_fp = ballots.fingerprints().next().unwrap();
        let vote_tx = ballots
            .node_mut(ballot_fp)
            .unwrap()
            .cast_vote(ticket, selection, 1002)
            .unwrap();
        ballots.submit_and_gossip(ballot_fp, vote_tx).unwrap();
    }

    run_consensus_round(&mut voters, &config, None, 1100);
    let ballot_report = run_consensus_round(&mut ballots, &config, Some(&template), 1100);
    assert!(ballot_report.committed);
    assert_eq!(ballot_report.approved, 3);

    for node in ballots.nodes() {
        let tallies = node.chain().current_tip().state.tallies().unwrap();
        assert_eq!(tallies["position"]["A"], 3);
        assert_eq!(tallies["position"]["B"], 0);
    }
}

/// S2 — double-vote attempt: v1 submits two `BallotCast` transactions using
/// the same ticket to two different voting-computer nodes. Exactly one
/// commits; the other's rejection reason is `TicketAlreadyConsumed`.
#[test]
fn s2_double_vote_commits_once_and_rejects_the_replay() {
    let roll = three_voter_roll();
    let template = Arc::new(template());
    let config = ElectionConfig {
        minimum_agreement_pct: 2.0 / 3.0,
        total_nodes: 5,
        ..Default::default()
    };

    let mut voters = voter_network(5, &roll, 0, NodePolicy::Honest);
    let voter_pki = Arc::new(Pki::from_public_keys(
        voters.nodes().iter().map(|n| (n.public_key(), false)),
    ));
    let mut ballots = ballot_network(5, &template, voter_pki);

    let auth_fp = voters.fingerprints().next().unwrap();
    let (ticket, tx) = voters.node_mut(auth_fp).unwrap().issue_ticket(1, 1, 1001).unwrap();
    voters.submit_and_gossip(auth_fp, tx).unwrap();
    run_consensus_round(&mut voters, &config, None, 1100);

    let mut fps = ballots.fingerprints();
    let first = fps.next().unwrap();
    let second = fps.next().unwrap();
    drop(fps);

    let mut selection = BallotSelection::new();
    selection.select("position", [0]);
    let tx1 = ballots
        .node_mut(first)
        .unwrap()
        .cast_vote(ticket.clone(), selection.clone(), 1002)
        .unwrap();
    ballots.submit_and_gossip(first, tx1).unwrap();

    let tx2 = ballots.node_mut(second).unwrap().cast_vote(ticket, selection, 1003).unwrap();
    ballots.submit_and_gossip(second, tx2).unwrap();

    let report = run_consensus_round(&mut ballots, &config, Some(&template), 1200);
    assert!(report.committed);
    assert_eq!(report.approved, 1, "only the first submission commits");
    assert!(
        report.rejection_reasons.iter().any(|r| matches!(r, voting_core::VotingError::TicketAlreadyConsumed)),
        "the replay is rejected as TicketAlreadyConsumed, reasons were {:?}",
        report.rejection_reasons
    );
}

/// S3 — minority adversary: 9 total nodes, 2 adversarial `AuthBypass`
/// authenticators. An adversary issues a ticket for a non-roll voter id, but
/// it never reaches the 6-signature threshold, so nothing commits and honest
/// nodes still report the real reason.
#[test]
fn s3_minority_adversary_forgery_never_commits() {
    let roll = three_voter_roll();
    let config = ElectionConfig {
        minimum_agreement_pct: 2.0 / 3.0,
        total_nodes: 9,
        ..Default::default()
    };

    let mut voters = voter_network(9, &roll, 2, NodePolicy::AuthBypass);
    let adversary_fp = voters
        .nodes()
        .iter()
        .find(|n| n.is_adversary())
        .unwrap()
        .fingerprint();

    let forger = Keypair::generate();
    let mallory_ticket = voting_core::BallotClaimTicket::issue(99, 1, &forger);
    let forged_tx = voting_core::Transaction::new_auth_ticket(99, mallory_ticket, 1001, &forger);
    // The adversary accepts its own forged ticket locally; honest peers that
    // gossip-cosign it reject for UnknownVoter and never add a signature.
    voters.submit_and_gossip(adversary_fp, forged_tx).unwrap();

    let report = run_consensus_round(&mut voters, &config, None, 1100);
    assert!(report.committed, "a block still commits, just an empty one");
    assert_eq!(report.approved, 0);

    let honest_fp = voters.nodes().iter().find(|n| !n.is_adversary()).unwrap().fingerprint();
    let honest_reasons = voters.node(honest_fp).unwrap().last_round_rejection_reasons();
    assert!(
        honest_reasons.iter().any(|r| matches!(r, voting_core::VotingError::UnknownVoter)),
        "honest nodes record the real rejection reason, got {honest_reasons:?}"
    );
}

/// S4 — divergent tip: two nodes commit an extra local block (simulating
/// missed gossip) before the shared tick; the remaining up-to-date majority
/// still forms a quorum and commits, leaving the stragglers on their stale
/// tip for this round.
#[test]
fn s4_divergent_tip_majority_still_commits() {
    let roll = three_voter_roll();
    let config = ElectionConfig {
        minimum_agreement_pct: 2.0 / 3.0,
        total_nodes: 7,
        ..Default::default()
    };
    let mut network = voter_network(7, &roll, 0, NodePolicy::Honest);

    let laggards: Vec<_> = network.fingerprints().take(2).collect();
    for fp in &laggards {
        let node = network.node_mut(*fp).unwrap();
        node.begin_consensus_round([]);
        node.finalize_consensus_round(1, 1.0, 999, None);
    }
    assert_eq!(network.node(laggards[0]).unwrap().chain().height(), 1);

    let auth_fp = network
        .fingerprints()
        .find(|fp| !laggards.contains(fp))
        .unwrap();
    let (_ticket, tx) = network.node_mut(auth_fp).unwrap().issue_ticket(1, 1, 1001).unwrap();
    network.submit_and_gossip(auth_fp, tx).unwrap();

    let report = run_consensus_round(&mut network, &config, None, 1100);
    assert!(report.committed);
    assert_eq!(report.cohort_size, 5, "the 5 up-to-date nodes form the cohort");
    for fp in &laggards {
        assert!(
            !report.cohort.contains(fp),
            "a lagging node does not join this round's committing cohort"
        );
    }
}

/// S5 — results before sync: each node having locally committed its own
/// block at a different timestamp (no shared consensus round has run),
/// querying results finds no tip hash held by the required 2/3 majority and
/// reports out of sync.
#[test]
fn s5_results_before_consensus_round_are_out_of_sync() {
    let template = Arc::new(template());
    let config = ElectionConfig {
        minimum_agreement_pct: 2.0 / 3.0,
        total_nodes: 5,
        ..Default::default()
    };
    let auth_pki = Arc::new(Pki::from_public_keys(std::iter::empty::<(
        voting_crypto::PublicKey,
        bool,
    )>()));
    let mut ballots = ballot_network(5, &template, auth_pki);

    for (i, fp) in ballots.fingerprints().collect::<Vec<_>>().into_iter().enumerate() {
        let node = ballots.node_mut(fp).unwrap();
        node.begin_consensus_round([]);
        node.finalize_consensus_round(1, 1.0, 2000 + i as u64, Some(&template));
    }

    assert_eq!(query_results(&ballots, &config), ResultsQuery::OutOfSync);
}

/// S6 — exactly-bound adversary: with 30 total nodes the tolerated adversary
/// count is `floor((1 - 2/3) * 30) - 1 = 9`. Every forged ticket still fails
/// to reach threshold, and an honest transaction submitted alongside commits
/// normally in the same round.
#[test]
fn s6_exactly_bound_adversary_count_still_cannot_forge_a_commit() {
    let roll = three_voter_roll();
    let config = ElectionConfig {
        minimum_agreement_pct: 2.0 / 3.0,
        total_nodes: 30,
        ..Default::default()
    };
    assert_eq!(config.adversary_bound(), 9);

    let mut network = voter_network(30, &roll, 9, NodePolicy::AuthBypass);
    let adversary_fp = network
        .nodes()
        .iter()
        .find(|n| n.is_adversary())
        .unwrap()
        .fingerprint();
    let honest_fp = network
        .nodes()
        .iter()
        .find(|n| !n.is_adversary())
        .unwrap()
        .fingerprint();

    let forger = Keypair::generate();
    let forged_ticket = voting_core::BallotClaimTicket::issue(999, 1, &forger);
    let forged_tx = voting_core::Transaction::new_auth_ticket(999, forged_ticket, 1001, &forger);
    network.submit_and_gossip(adversary_fp, forged_tx).unwrap();

    let (_ticket, honest_tx) = network.node_mut(honest_fp).unwrap().issue_ticket(1, 1, 1002).unwrap();
    network.submit_and_gossip(honest_fp, honest_tx).unwrap();

    let report = run_consensus_round(&mut network, &config, None, 1100);
    assert!(report.committed);
    assert_eq!(report.approved, 1, "only the honest ticket issuance commits");

    let honest_reasons = network.node(honest_fp).unwrap().last_round_rejection_reasons();
    assert!(
        honest_reasons.iter().any(|r| matches!(r, voting_core::VotingError::UnknownVoter)),
        "honest nodes still record the real rejection reason, got {honest_reasons:?}"
    );
}
