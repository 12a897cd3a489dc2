use serde::{Deserialize, Serialize};
use std::sync::Arc;
use voting_core::{
    BallotSelection, BallotTemplate, Pki, Result, StateSnapshot, Transaction, TransactionPayload,
    VoterRoll, VotingError,
};

/// Which ledger a node replicates, and the read-only context it needs to
/// validate that ledger's transactions (spec §4.5). Both ledger instances
/// run the same `Node` machinery, parameterized by this (spec §1: "Two
/// ledger instances share this machinery with differing transaction
/// payloads").
#[derive(Clone)]
pub enum LedgerContext {
    Voter { roll: Arc<VoterRoll> },
    Ballot {
        template: Arc<BallotTemplate>,
        /// The voter ledger's PKI, so a ballot-ledger node can check that a
        /// claim ticket's issuer is a legitimate auth booth (spec §4.5:
        /// "ticket signature chains to a known auth-booth peer") — a small,
        /// intentional cross-ledger read, not a write.
        auth_pki: Arc<Pki>,
    },
}

/// The taxonomy of node behaviors (spec §4.7 "Adversary variants"). The
/// consensus round is oblivious to which variant a node runs (Design Notes
/// §9) — only the per-node local validation in [`validate_payload`] differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodePolicy {
    Honest,
    /// Authenticator that authenticates any voter id, roll membership and
    /// ticket balance notwithstanding.
    AuthBypass,
    /// Authenticator that issues tickets for voter ids absent from the roll.
    UnrecognizedAuth,
    /// Voting computer that accepts fabricated/reused claim tickets and
    /// malformed ballot selections.
    BallotForger,
}

impl NodePolicy {
    pub fn is_adversary(self) -> bool {
        !matches!(self, NodePolicy::Honest)
    }
}

/// Validates `tx` against `state` under `ledger` and `policy` (spec §4.5's
/// `submit`/`cosign_request` rule set). Shared by both the proposer's local
/// `submit` and a peer's `cosign_request` — the rules are identical, only
/// the caller differs.
pub fn validate_payload(
    tx: &Transaction,
    state: &StateSnapshot,
    ledger: &LedgerContext,
    policy: NodePolicy,
) -> Result<()> {
    match (&tx.payload, ledger) {
        (TransactionPayload::AuthTicketIssued { voter_id, ticket }, LedgerContext::Voter { roll }) => {
            match policy {
                NodePolicy::AuthBypass => {
                    // Authenticates anyone, regardless of roll membership or
                    // remaining balance.
                }
                NodePolicy::UnrecognizedAuth => {
                    // Bypasses roll membership only; an id that *is* on the
                    // roll still has to obey its remaining-ticket balance.
                    if let Some(remaining) = state.remaining_tickets(*voter_id) {
                        if remaining == 0 {
                            return Err(VotingError::NotEnoughBallotClaimTickets);
                        }
                    }
                }
                NodePolicy::Honest | NodePolicy::BallotForger => {
                    if roll.get(*voter_id).is_none() {
                        return Err(VotingError::UnknownVoter);
                    }
                    match state.remaining_tickets(*voter_id) {
                        Some(0) | None => return Err(VotingError::NotEnoughBallotClaimTickets),
                        Some(_) => {}
                    }
                }
            }
            if !ticket.signature_valid() {
                return Err(VotingError::InvalidSignature);
            }
            Ok(())
        }
        (
            TransactionPayload::BallotCast { ticket, selections },
            LedgerContext::Ballot { template, auth_pki },
        ) => {
            if policy != NodePolicy::BallotForger {
                if !ticket.signature_valid() {
                    return Err(VotingError::InvalidSignature);
                }
                if auth_pki.lookup_key(&ticket.issuer).is_none() {
                    return Err(VotingError::InvalidSignature);
                }
                if state.ticket_consumed(&ticket.id()) {
                    return Err(VotingError::TicketAlreadyConsumed);
                }
                validate_selection(template, selections)?;
            }
            Ok(())
        }
        _ => Err(VotingError::InvalidChain {
            reason: "transaction payload does not match this node's ledger".into(),
        }),
    }
}

fn validate_selection(template: &BallotTemplate, selections: &BallotSelection) -> Result<()> {
    template.validate_selection(selections)
}
