use anyhow::Context;
use rand::seq::SliceRandom;
use voting_consensus::{query_results, run_consensus_round, ConsensusRoundReport, ResultsQuery};
use voting_core::{BallotSelection, BallotTemplate, ElectionConfig};
use voting_core::{BallotClaimTicket, VoterId};
use voting_crypto::Fingerprint;
use voting_network::NodeNetwork;

/// Thin wrappers over the core's node/network contract (spec §6
/// "Driver-to-core operations"). None of these carry ledger or consensus
/// logic themselves — they just pick a node (mirroring
/// `original_source`'s `random.choice(self.voter_authentication_booths)`)
/// and forward to it.
pub fn authenticate_voter(network: &NodeNetwork, voter_id: VoterId) -> bool {
    network
        .nodes()
        .choose(&mut rand::thread_rng())
        .map(|n| n.authenticate_voter(voter_id))
        .unwrap_or(false)
}

/// Picks a random node's fingerprint to act as proposer, mirroring the same
/// `random.choice` pattern.
pub fn random_proposer(network: &NodeNetwork) -> Option<Fingerprint> {
    network
        .nodes()
        .choose(&mut rand::thread_rng())
        .map(|n| n.fingerprint())
}

pub fn issue_ticket(
    network: &mut NodeNetwork,
    proposer: Fingerprint,
    voter_id: VoterId,
    timestamp: u64,
) -> anyhow::Result<BallotClaimTicket> {
    let nonce = rand::random();
    let (ticket, tx) = network
        .node_mut(proposer)
        .context("selecting auth booth node")?
        .issue_ticket(voter_id, nonce, timestamp)?;
    network.submit_and_gossip(proposer, tx)?;
    Ok(ticket)
}

pub fn cast_vote(
    network: &mut NodeNetwork,
    proposer: Fingerprint,
    ticket: BallotClaimTicket,
    selections: BallotSelection,
    timestamp: u64,
) -> anyhow::Result<()> {
    let tx = network
        .node_mut(proposer)
        .context("selecting voting computer node")?
        .cast_vote(ticket, selections, timestamp)?;
    network.submit_and_gossip(proposer, tx)?;
    Ok(())
}

/// Runs one consensus round over a ledger's network (spec §6
/// `run_consensus`).
pub fn run_consensus(
    network: &mut NodeNetwork,
    config: &ElectionConfig,
    template: Option<&BallotTemplate>,
    timestamp: u64,
) -> ConsensusRoundReport {
    run_consensus_round(network, config, template, timestamp)
}

/// Queries the ballot ledger's converged results, or an "out of sync"
/// indicator if no block hash yet commands a `MINIMUM_AGREEMENT_PCT`
/// majority (spec §6 "Results query").
pub fn query_ballot_results(network: &NodeNetwork, config: &ElectionConfig) -> ResultsQuery {
    query_results(network, config)
}
