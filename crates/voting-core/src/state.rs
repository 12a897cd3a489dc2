use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use voting_crypto::Hash256;

use crate::ballot::BallotTemplate;
use crate::error::{Result, VotingError};
use crate::transaction::{Transaction, TransactionPayload};
use crate::voter::{VoterId, VoterRoll};

/// The committed aggregate embedded in each block (spec §3 "State
/// snapshot"). A pure function of the previous block's state plus the
/// block's ordered transactions — see [`StateSnapshot::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateSnapshot {
    /// voter_id -> remaining claim tickets.
    Voter(BTreeMap<VoterId, u64>),
    /// position -> candidate label -> running count, plus the set of ticket
    /// ids already consumed anywhere on this chain (so double-voting is
    /// caught across blocks, not just within one).
    Ballot {
        tallies: BTreeMap<String, BTreeMap<String, u64>>,
        consumed_tickets: BTreeSet<Hash256>,
    },
}

impl StateSnapshot {
    pub fn genesis_voter(roll: &VoterRoll) -> Self {
        StateSnapshot::Voter(roll.initial_ticket_state())
    }

    pub fn genesis_ballot(template: &BallotTemplate) -> Self {
        StateSnapshot::Ballot {
            tallies: template.initial_tally_state(),
            consumed_tickets: BTreeSet::new(),
        }
    }

    pub fn remaining_tickets(&self, voter_id: VoterId) -> Option<u64> {
        match self {
            StateSnapshot::Voter(map) => map.get(&voter_id).copied(),
            StateSnapshot::Ballot { .. } => None,
        }
    }

    pub fn ticket_consumed(&self, ticket_id: &Hash256) -> bool {
        match self {
            StateSnapshot::Ballot { consumed_tickets, .. } => consumed_tickets.contains(ticket_id),
            StateSnapshot::Voter(_) => false,
        }
    }

    pub fn tallies(&self) -> Option<&BTreeMap<String, BTreeMap<String, u64>>> {
        match self {
            StateSnapshot::Ballot { tallies, .. } => Some(tallies),
            StateSnapshot::Voter(_) => None,
        }
    }

    /// Applies one already-approved transaction's state transition. Callers
    /// are expected to have validated signatures and approval thresholds
    /// beforehand — this only encodes the pure data transition of spec §4.3,
    /// and returns a definitive error (not a transient rejection) for
    /// invariant violations that must never reach a committed block.
    pub fn apply(&self, tx: &Transaction, template: Option<&BallotTemplate>) -> Result<Self> {
        match (self, &tx.payload) {
            (StateSnapshot::Voter(balances), TransactionPayload::AuthTicketIssued { voter_id, .. }) => {
                let mut next = balances.clone();
                let remaining = next.get_mut(voter_id).ok_or(VotingError::UnknownVoter)?;
                if *remaining == 0 {
                    return Err(VotingError::NotEnoughBallotClaimTickets);
                }
                *remaining -= 1;
                debug!(voter_id = *voter_id, remaining = *remaining, "auth ticket issuance applied");
                Ok(StateSnapshot::Voter(next))
            }
            (
                StateSnapshot::Ballot {
                    tallies,
                    consumed_tickets,
                },
                TransactionPayload::BallotCast { ticket, selections },
            ) => {
                let ticket_id = ticket.id();
                if consumed_tickets.contains(&ticket_id) {
                    return Err(VotingError::TicketAlreadyConsumed);
                }
                let template = template.ok_or_else(|| VotingError::InvalidChain {
                    reason: "ballot ledger requires a ballot template".into(),
                })?;
                template.validate_selection(selections)?;

                let mut next_tallies = tallies.clone();
                template.tally_into(selections, &mut next_tallies);
                let mut next_consumed = consumed_tickets.clone();
                next_consumed.insert(ticket_id);
                debug!(ticket_id = %ticket_id, "ballot cast applied");
                Ok(StateSnapshot::Ballot {
                    tallies: next_tallies,
                    consumed_tickets: next_consumed,
                })
            }
            _ => Err(VotingError::InvalidChain {
                reason: "transaction payload does not match ledger kind".into(),
            }),
        }
    }
}
