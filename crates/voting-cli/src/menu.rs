use std::io::{self, BufRead, Write};
use std::sync::Arc;

use voting_consensus::ResultsQuery;
use voting_core::{BallotSelection, BallotTemplate, ElectionConfig, StateSnapshot, VoterRoll};
use voting_network::NodeNetwork;

use crate::driver;
use crate::logging::LogTail;

/// Everything the interactive session needs on hand between menu choices —
/// both ledgers' networks plus the shared roll/template/config, reimplementing
/// `original_source`'s `VotingProgram.begin_program` loop without its
/// screen-clearing and blocking `input()` calls baked directly into the same
/// function as the business logic.
pub struct Session {
    pub voter_network: NodeNetwork,
    pub ballot_network: NodeNetwork,
    pub roll: Arc<VoterRoll>,
    pub template: Arc<BallotTemplate>,
    pub config: ElectionConfig,
    pub log_tail: LogTail,
}

enum MenuChoice {
    Vote,
    LookupVoterId,
    ViewResults,
    ViewLogs,
    RunConsensus,
    Exit,
    Invalid,
}

fn parse_choice(line: &str) -> MenuChoice {
    match line.trim() {
        "1" => MenuChoice::Vote,
        "2" => MenuChoice::LookupVoterId,
        "3" => MenuChoice::ViewResults,
        "4" => MenuChoice::ViewLogs,
        "5" => MenuChoice::RunConsensus,
        "6" | "exit" | "quit" => MenuChoice::Exit,
        _ => MenuChoice::Invalid,
    }
}

fn display_menu() {
    println!();
    println!("1) Vote");
    println!("2) Look up voter id");
    println!("3) View current results");
    println!("4) View logs");
    println!("5) Run a consensus round");
    println!("6) Exit");
    print!("> ");
    let _ = io::stdout().flush();
}

/// Runs the interactive driver loop (spec §6) until the voter picks "exit" or
/// stdin closes, one clock tick (`timestamp`) per iteration supplied by the
/// caller so runs stay reproducible under a [`voting_core::ManualClock`] in
/// tests.
pub fn run_interactive(session: &mut Session, mut timestamp: u64) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("U.S. 2020 Federal Election — replicated ledger demo");
    loop {
        display_menu();
        let Some(line) = lines.next() else { break };
        let line = line?;
        match parse_choice(&line) {
            MenuChoice::Vote => {
                if let Err(e) = handle_vote(session, &mut lines, timestamp) {
                    println!("vote not recorded: {e}");
                }
                timestamp += 1;
            }
            MenuChoice::LookupVoterId => handle_lookup(session, &mut lines),
            MenuChoice::ViewResults => handle_results(session),
            MenuChoice::ViewLogs => handle_logs(session),
            MenuChoice::RunConsensus => {
                handle_consensus(session, timestamp);
                timestamp += 1;
            }
            MenuChoice::Exit => {
                println!("Goodbye.");
                break;
            }
            MenuChoice::Invalid => println!("unrecognized choice"),
        }
    }
    Ok(())
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, text: &str) -> anyhow::Result<String> {
    print!("{text}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(line?),
        None => anyhow::bail!("input closed"),
    }
}

fn handle_vote(
    session: &mut Session,
    lines: &mut impl Iterator<Item = io::Result<String>>,
    timestamp: u64,
) -> anyhow::Result<()> {
    let name = prompt(lines, "voter name: ")?;
    let voters = session.roll.by_name(&name);
    let Some(voter) = voters.first() else {
        anyhow::bail!("'{name}' is not on the voter roll");
    };
    let voter_id = voter.id;

    if !driver::authenticate_voter(&session.voter_network, voter_id) {
        anyhow::bail!("authentication failed for voter {voter_id}");
    }

    let proposer = driver::random_proposer(&session.voter_network)
        .ok_or_else(|| anyhow::anyhow!("no auth booth nodes registered"))?;
    let ticket = driver::issue_ticket(&mut session.voter_network, proposer, voter_id, timestamp)?;

    let mut selections = BallotSelection::new();
    for item in session.template.items() {
        let raw = prompt(lines, &format!("{} — choose index (0-{}): ", item.position, item.choices.len() - 1))?;
        let idx: usize = raw.trim().parse().map_err(|_| anyhow::anyhow!("'{raw}' is not a choice index"))?;
        selections.select(item.position.clone(), [idx]);
    }
    session.template.validate_selection(&selections)?;

    let proposer = driver::random_proposer(&session.ballot_network)
        .ok_or_else(|| anyhow::anyhow!("no voting-computer nodes registered"))?;
    driver::cast_vote(&mut session.ballot_network, proposer, ticket, selections, timestamp)?;
    println!("ballot recorded (pending consensus)");
    Ok(())
}

fn handle_lookup(session: &Session, lines: &mut impl Iterator<Item = io::Result<String>>) {
    let Ok(name) = prompt(lines, "voter name: ") else { return };
    match session.roll.by_name(&name).first() {
        Some(voter) => println!("voter id for '{name}': {}", voter.id),
        None => println!("'{name}' is not on the voter roll"),
    }
}

fn handle_results(session: &Session) {
    match driver::query_ballot_results(&session.ballot_network, &session.config) {
        ResultsQuery::InSync { tip_hash, state } => {
            println!("results as of block {tip_hash}:");
            if let StateSnapshot::Ballot { tallies, .. } = state {
                for (position, counts) in tallies {
                    println!("  {position}:");
                    for (choice, count) in counts {
                        println!("    {choice}: {count}");
                    }
                }
            }
        }
        ResultsQuery::OutOfSync => println!("Blocks are not in sync yet."),
    }
}

fn handle_logs(session: &Session) {
    for line in session.log_tail.last(20) {
        println!("{line}");
    }
}

fn handle_consensus(session: &mut Session, timestamp: u64) {
    let voter_report = driver::run_consensus(&mut session.voter_network, &session.config, None, timestamp);
    let ballot_report = driver::run_consensus(
        &mut session.ballot_network,
        &session.config,
        Some(&session.template),
        timestamp,
    );
    println!(
        "voter ledger: committed={} approved={} rejected={}",
        voter_report.committed, voter_report.approved, voter_report.rejected
    );
    println!(
        "ballot ledger: committed={} approved={} rejected={}",
        ballot_report.committed, ballot_report.approved, ballot_report.rejected
    );
}
