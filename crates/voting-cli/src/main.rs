mod driver;
mod logging;
mod menu;
mod roll;
mod setup;
mod simulate;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use voting_core::{Clock, ElectionConfig, SystemClock};

/// A replicated, tamper-evident voting ledger demonstrator: two independent
/// chains (voter authentication, ballot casting) kept in sync by a
/// majority-cohort consensus round, reimplementing
/// `original_source/votingprogram.py`'s menu-driven program over that
/// architecture instead of a single shared in-memory list.
#[derive(Parser, Debug)]
#[command(name = "voting-cli", version, about)]
struct Cli {
    /// Path to a JSON voter roll (array of {name, num_claim_tickets}).
    /// Ignored when --simulate is given and the file does not exist.
    #[arg(long, default_value = "voter_roll.json")]
    roll_path: PathBuf,

    /// Run non-interactively with N synthetic voters instead of opening the
    /// menu (mirrors `original_source`'s `Simulation` class).
    #[arg(long)]
    simulate: Option<usize>,

    /// Number of replica nodes per ledger.
    #[arg(long, default_value_t = 50)]
    total_nodes: usize,

    /// Run a minority of nodes under an adversarial policy per ledger
    /// (spec §4.7's `AuthBypass`/`BallotForger` variants).
    #[arg(long)]
    adversarial: bool,

    /// Required agreement fraction for both quorum and signature thresholds.
    #[arg(long, default_value_t = 2.0 / 3.0)]
    minimum_agreement_pct: f64,

    /// How often consensus runs, in seconds (advisory; the interactive menu
    /// also exposes a manual "run a consensus round" option).
    #[arg(long, default_value_t = 30)]
    consensus_round_interval_secs: u64,
}

fn main() -> anyhow::Result<()> {
    let log_tail = logging::init();
    let cli = Cli::parse();

    let config = ElectionConfig {
        minimum_agreement_pct: cli.minimum_agreement_pct,
        consensus_round_interval_secs: cli.consensus_round_interval_secs,
        total_nodes: cli.total_nodes,
        adversarial_mode: cli.adversarial,
    };

    let timestamp = SystemClock.now_unix_secs();

    let roll = if let Some(n) = cli.simulate {
        if cli.roll_path.exists() {
            Arc::new(roll::load_voter_roll(&cli.roll_path)?)
        } else {
            Arc::new(roll::synthetic_voter_roll(n))
        }
    } else {
        Arc::new(roll::load_voter_roll(&cli.roll_path)?)
    };

    let template = Arc::new(setup::default_ballot_template());

    tracing::info!(
        voters = roll.len(),
        total_nodes = config.total_nodes,
        adversarial = config.adversarial_mode,
        "election setup complete"
    );

    let (voter_network, voter_pki) = setup::build_voter_network(&roll, &config, timestamp);
    let ballot_network = setup::build_ballot_network(&template, voter_pki, &config, timestamp);

    if let Some(n) = cli.simulate {
        let mut voter_network = voter_network;
        let mut ballot_network = ballot_network;
        let report = simulate::run_simulation(
            &mut voter_network,
            &mut ballot_network,
            &roll,
            &template,
            &config,
            0.6,
            timestamp + 1,
        )?;
        println!("simulated {n} voters:");
        println!("  authenticated: {}", report.voters_authenticated);
        println!("  tickets issued: {}", report.tickets_issued);
        println!("  ballots cast: {}", report.ballots_cast);
        println!(
            "  voter ledger committed: {}, ballot ledger committed: {}",
            report.voter_ledger_committed, report.ballot_ledger_committed
        );
        if let Some(tallies) = report.tallies {
            for (position, counts) in tallies {
                println!("  {position}:");
                for (choice, count) in counts {
                    println!("    {choice}: {count}");
                }
            }
        }
        return Ok(());
    }

    let mut session = menu::Session {
        voter_network,
        ballot_network,
        roll,
        template,
        config,
        log_tail,
    };
    menu::run_interactive(&mut session, timestamp + 1)
}
