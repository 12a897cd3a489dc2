use std::path::Path;

use anyhow::Context;
use voting_core::{VoterRecord, VoterRoll};

/// Loads a voter roll from a UTF-8 JSON file containing an array of
/// `{name, num_claim_tickets}` records (spec §6 "Voter-roll input"), the
/// encoding `original_source/votingprogram.py`'s `load_voter_roll` uses.
/// Name trimming/lowercasing and monotonic id assignment happen inside
/// [`VoterRoll::new`].
pub fn load_voter_roll(path: &Path) -> anyhow::Result<VoterRoll> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading voter roll from {}", path.display()))?;
    let records: Vec<VoterRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing voter roll {}", path.display()))?;
    Ok(VoterRoll::new(records))
}

/// Builds a synthetic roll of `n` voters, each with one claim ticket,
/// mirroring `original_source`'s `Simulation.load_voter_roll` used to drive
/// `--simulate` runs without a roll file on disk.
pub fn synthetic_voter_roll(n: usize) -> VoterRoll {
    let records = (1..=n)
        .map(|i| VoterRecord {
            name: format!("voter{i}"),
            num_claim_tickets: 1,
        })
        .collect();
    VoterRoll::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_normalizes_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"[{{"name": "  Alice  "}}, {{"name": "BOB", "num_claim_tickets": 3}}]"#).unwrap();
        let roll = load_voter_roll(file.path()).unwrap();
        assert_eq!(roll.len(), 2);
        assert_eq!(roll.get(1).unwrap().name, "alice");
        assert_eq!(roll.get(1).unwrap().num_claim_tickets, 1);
        assert_eq!(roll.get(2).unwrap().num_claim_tickets, 3);
    }

    #[test]
    fn missing_file_is_a_reportable_error() {
        let err = load_voter_roll(Path::new("/nonexistent/voter_roll.json")).unwrap_err();
        assert!(err.to_string().contains("reading voter roll"));
    }

    #[test]
    fn synthetic_roll_has_requested_size() {
        let roll = synthetic_voter_roll(10);
        assert_eq!(roll.len(), 10);
        assert_eq!(roll.get(1).unwrap().name, "voter1");
    }
}
