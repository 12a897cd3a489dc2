use voting_core::{BallotSelection, BallotTemplate, ElectionConfig, StateSnapshot, VoterRoll};
use voting_network::NodeNetwork;

use crate::driver;

/// Drives every voter on `roll` through authenticate -> issue ticket -> cast
/// vote, then runs consensus on both ledgers, mirroring
/// `original_source`'s `Simulation` subclass (which overrides `setup`,
/// `begin_program`, and `_authenticate_voter` to run the whole program against
/// `n` synthetic voters with no stdin). `candidate_one_percentage` reproduces
/// the same 60/40-style split the original used to make the simulated
/// election's outcome deterministic and readable, applied to the first
/// contest on the template; every other contest's first choice always wins
/// the synthetic vote.
pub fn run_simulation(
    voter_network: &mut NodeNetwork,
    ballot_network: &mut NodeNetwork,
    roll: &VoterRoll,
    template: &BallotTemplate,
    config: &ElectionConfig,
    candidate_one_percentage: f64,
    mut timestamp: u64,
) -> anyhow::Result<SimulationReport> {
    let mut issued = 0usize;
    let mut cast = 0usize;
    let mut authentication_failures = 0usize;

    for (i, voter) in roll.iter().enumerate() {
        if !driver::authenticate_voter(voter_network, voter.id) {
            authentication_failures += 1;
            continue;
        }

        let auth_proposer = driver::random_proposer(voter_network)
            .ok_or_else(|| anyhow::anyhow!("no auth booth nodes registered"))?;
        let ticket = match driver::issue_ticket(voter_network, auth_proposer, voter.id, timestamp) {
            Ok(ticket) => ticket,
            Err(_) => continue,
        };
        issued += 1;

        let mut selections = BallotSelection::new();
        for (pos_idx, item) in template.items().iter().enumerate() {
            let choice = if pos_idx == 0 {
                vote_split_choice(i, candidate_one_percentage)
            } else {
                0
            };
            selections.select(item.position.clone(), [choice]);
        }

        let ballot_proposer = driver::random_proposer(ballot_network)
            .ok_or_else(|| anyhow::anyhow!("no voting-computer nodes registered"))?;
        if driver::cast_vote(ballot_network, ballot_proposer, ticket, selections, timestamp).is_ok() {
            cast += 1;
        }
        timestamp += 1;
    }

    let voter_report = driver::run_consensus(voter_network, config, None, timestamp);
    let ballot_report = driver::run_consensus(ballot_network, config, Some(template), timestamp);

    let results = driver::query_ballot_results(ballot_network, config);
    let tallies = match results {
        voting_consensus::ResultsQuery::InSync {
            state: StateSnapshot::Ballot { tallies, .. },
            ..
        } => Some(tallies),
        _ => None,
    };

    Ok(SimulationReport {
        voters_authenticated: roll.len() - authentication_failures,
        tickets_issued: issued,
        ballots_cast: cast,
        voter_ledger_committed: voter_report.committed,
        ballot_ledger_committed: ballot_report.committed,
        tallies,
    })
}

/// Deterministic stand-in for the original's `random.random() <
/// candidate_one_percentage` draw — evenly distributes the first
/// `round(n * percentage)` voters (by roll order) onto choice 0 and the rest
/// onto choice 1, so repeated runs over the same roll always agree.
fn vote_split_choice(voter_index: usize, candidate_one_percentage: f64) -> usize {
    let threshold = candidate_one_percentage.clamp(0.0, 1.0);
    let fractional = ((voter_index as f64) * 0.618_033_988_75) % 1.0;
    if fractional < threshold {
        0
    } else {
        1
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub voters_authenticated: usize,
    pub tickets_issued: usize,
    pub ballots_cast: usize,
    pub voter_ledger_committed: bool,
    pub ballot_ledger_committed: bool,
    pub tallies: Option<std::collections::BTreeMap<String, std::collections::BTreeMap<String, u64>>>,
}
