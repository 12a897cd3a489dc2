use serde::{Deserialize, Serialize};

/// One record read off the voter roll. File parsing itself lives in the CLI
/// driver (an external collaborator, spec §1); this is the parsed shape it
/// hands to [`VoterRoll::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub name: String,
    #[serde(default = "default_tickets")]
    pub num_claim_tickets: u64,
}

fn default_tickets() -> u64 {
    1
}

pub type VoterId = u64;

/// An immutable voter identity. `num_claim_tickets` is the voter's *initial*
/// allotment — remaining balance lives in ledger state, not here (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterId,
    pub name: String,
    pub num_claim_tickets: u64,
}

/// The voter roll loaded at election setup. Ids are assigned monotonically
/// starting at 1 in file order (spec §6); names are trimmed and lowercased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoterRoll {
    voters: Vec<Voter>,
}

impl VoterRoll {
    pub fn new(records: Vec<VoterRecord>) -> Self {
        let voters = records
            .into_iter()
            .filter_map(|record| {
                let name = record.name.trim().to_lowercase();
                if name.is_empty() {
                    None
                } else {
                    Some((name, record.num_claim_tickets))
                }
            })
            .enumerate()
            .map(|(idx, (name, num_claim_tickets))| Voter {
                id: idx as VoterId + 1,
                name,
                num_claim_tickets,
            })
            .collect();
        Self { voters }
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }

    pub fn get(&self, id: VoterId) -> Option<&Voter> {
        self.voters.iter().find(|v| v.id == id)
    }

    pub fn by_name(&self, name: &str) -> Vec<&Voter> {
        let needle = name.trim().to_lowercase();
        self.voters.iter().filter(|v| v.name == needle).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voter> {
        self.voters.iter()
    }

    /// Initial per-voter ticket balances, the genesis state of the voter
    /// ledger (spec §3 "Chain").
    pub fn initial_ticket_state(&self) -> std::collections::BTreeMap<VoterId, u64> {
        self.voters
            .iter()
            .map(|v| (v.id, v.num_claim_tickets))
            .collect()
    }
}
