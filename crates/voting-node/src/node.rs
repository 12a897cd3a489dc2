use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voting_core::{BallotClaimTicket, Chain, Pki, Result, Transaction, VoterId, VotingError};
use voting_crypto::{fingerprint, Fingerprint, Hash256, Keypair, PublicKey, Signature};

use crate::policy::{validate_payload, LedgerContext, NodePolicy};

/// A single ledger replica (spec §3 "Node", §4.5). Exclusively owns its chain
/// and open transaction pool; the PKI is a read-only shared view established
/// at setup (spec §5). Both ledger instances run this same type,
/// parameterized by [`LedgerContext`] (spec §1).
pub struct Node {
    keypair: Keypair,
    pki: Arc<Pki>,
    ledger: LedgerContext,
    policy: NodePolicy,
    chain: Chain,
    /// Unverified/partially-verified transactions awaiting enough
    /// cosignatures, keyed by the transaction's own content hash so
    /// cohort-merge (spec §4.6 step 2) and canonical ordering (spec §4.5)
    /// come for free from the map's key order.
    open_pool: BTreeMap<Hash256, Transaction>,
    /// Rejections observed between rounds — at `submit` time (a proposer's
    /// own malformed transaction) or `cosign_request` time (a peer declining
    /// to sign someone else's) — drained into `last_round_rejection_reasons`
    /// at the next `finalize_consensus_round` so they show up in
    /// observability even when the offending transaction never accumulates
    /// enough signatures to reach the tally step at all (spec §4.7: "Honest
    /// nodes MUST record the rejection reasons").
    pending_rejections: Vec<(Hash256, VotingError)>,
    last_round_approvals: Vec<Hash256>,
    last_round_rejections: Vec<Hash256>,
    last_round_rejection_reasons: Vec<VotingError>,
}

impl Node {
    pub fn new(keypair: Keypair, chain: Chain, pki: Arc<Pki>, ledger: LedgerContext, policy: NodePolicy) -> Self {
        Self {
            keypair,
            pki,
            ledger,
            policy,
            chain,
            open_pool: BTreeMap::new(),
            pending_rejections: Vec::new(),
            last_round_approvals: Vec::new(),
            last_round_rejections: Vec::new(),
            last_round_rejection_reasons: Vec::new(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.keypair.public_key())
    }

    pub fn is_adversary(&self) -> bool {
        self.policy.is_adversary()
    }

    pub fn policy(&self) -> NodePolicy {
        self.policy
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn pki(&self) -> &Pki {
        &self.pki
    }

    pub fn tip_hash(&self) -> Hash256 {
        self.chain.current_tip().hash()
    }

    pub fn open_pool(&self) -> impl Iterator<Item = &Transaction> {
        self.open_pool.values()
    }

    pub fn last_round_approvals(&self) -> &[Hash256] {
        &self.last_round_approvals
    }

    pub fn last_round_rejections(&self) -> &[Hash256] {
        &self.last_round_rejections
    }

    pub fn last_round_rejection_reasons(&self) -> &[VotingError] {
        &self.last_round_rejection_reasons
    }

    /// Local entry point (spec §4.5 `submit`). Validates `tx` against the
    /// node's current chain-tip state under this node's policy; on success
    /// the transaction (already bearing the issuer's own signature, per
    /// [`Transaction::new_auth_ticket`]/[`Transaction::new_ballot_cast`]) is
    /// placed in the open pool for gossip. Gossip dispatch itself is an
    /// external collaborator's job (`voting-network`), not this node's.
    pub fn submit(&mut self, tx: Transaction) -> Result<()> {
        if let Err(e) = validate_payload(&tx, &self.chain.current_tip().state, &self.ledger, self.policy) {
            warn!(reason = %e, "submit rejected");
            self.pending_rejections.push((tx.tx_hash(), e.clone()));
            return Err(e);
        }
        let hash = tx.tx_hash();
        self.open_pool
            .entry(hash)
            .and_modify(|existing| existing.merge_signatures(&tx))
            .or_insert(tx);
        debug!(%hash, "transaction accepted into open pool");
        Ok(())
    }

    /// Peer-side validation, following the same rules as [`Node::submit`]
    /// (spec §4.5 `cosign_request`). Returns this node's signature over
    /// `tx`'s canonical payload on success, or the rejection reason. A
    /// rejection is buffered (see `pending_rejections`) but otherwise this
    /// doesn't touch this node's open pool or chain — per spec §5 a peer
    /// never reaches into another node's state, and the converse holds
    /// too: cosigning one's view of a transaction doesn't retroactively
    /// change this node's own pool.
    pub fn cosign_request(&mut self, tx: &Transaction) -> Result<Signature> {
        match validate_payload(tx, &self.chain.current_tip().state, &self.ledger, self.policy) {
            Ok(()) => Ok(self.keypair.sign(&tx.canonical_payload_bytes())),
            Err(e) => {
                self.pending_rejections.push((tx.tx_hash(), e.clone()));
                Err(e)
            }
        }
    }

    /// Authenticates `voter_id` against this node's ledger under its
    /// current policy (spec §6 `authenticate_voter`). Only meaningful on a
    /// voter-ledger node; a ballot-ledger node always returns `false`.
    pub fn authenticate_voter(&self, voter_id: VoterId) -> bool {
        let LedgerContext::Voter { roll } = &self.ledger else {
            return false;
        };
        match self.policy {
            NodePolicy::AuthBypass => true,
            NodePolicy::UnrecognizedAuth => match self.chain.current_tip().state.remaining_tickets(voter_id) {
                Some(remaining) => remaining > 0,
                None => true,
            },
            NodePolicy::Honest | NodePolicy::BallotForger => {
                roll.get(voter_id).is_some()
                    && matches!(
                        self.chain.current_tip().state.remaining_tickets(voter_id),
                        Some(remaining) if remaining > 0
                    )
            }
        }
    }

    /// Issues and locally submits a ballot claim ticket for `voter_id`
    /// (spec §6 `issue_ticket`), signed by this node's own key as the
    /// authenticating booth. Fails with [`VotingError::UnknownVoter`] or
    /// [`VotingError::NotEnoughBallotClaimTickets`] under the same local
    /// validation `submit` applies — an adversary policy that bypasses that
    /// validation can still successfully issue a ticket here, but the
    /// forged `AuthTicketIssued` transaction it produces will fail to
    /// commit once the honest cohort majority applies the real state rule
    /// (spec §4.7, §8 property 6).
    ///
    /// Returns the minted ticket alongside the submitted transaction so a
    /// caller holding a handle to the wider network (`voting-network`) can
    /// gossip the same transaction to this node's peers without
    /// reconstructing it.
    pub fn issue_ticket(
        &mut self,
        voter_id: VoterId,
        nonce: u64,
        timestamp: u64,
    ) -> Result<(BallotClaimTicket, Transaction)> {
        let ticket = BallotClaimTicket::issue(voter_id, nonce, &self.keypair);
        let tx = Transaction::new_auth_ticket(voter_id, ticket.clone(), timestamp, &self.keypair);
        self.submit(tx.clone())?;
        Ok((ticket, tx))
    }

    /// Casts a ballot using a previously-issued claim ticket (spec §6
    /// `cast_vote`), signed and locally submitted by this voting-computer
    /// node. Returns the submitted transaction for the same reason
    /// [`Node::issue_ticket`] does.
    pub fn cast_vote(
        &mut self,
        ticket: BallotClaimTicket,
        selections: voting_core::BallotSelection,
        timestamp: u64,
    ) -> Result<Transaction> {
        let tx = Transaction::new_ballot_cast(ticket, selections, timestamp, &self.keypair);
        self.submit(tx.clone())?;
        Ok(tx)
    }

    /// Establishes this round's candidate transaction set (spec §4.5
    /// `begin_consensus_round`). The caller (the consensus round in
    /// `voting-consensus`) has already unioned every cohort member's open
    /// pool and merged overlapping signature sets; this just replaces the
    /// node's working view with that union so the tally in
    /// [`Node::finalize_consensus_round`] sees every cohort-visible
    /// signature, not just the ones this node personally gossiped for.
    pub fn begin_consensus_round(&mut self, cohort_pool: impl IntoIterator<Item = Transaction>) {
        for tx in cohort_pool {
            let hash = tx.tx_hash();
            self.open_pool
                .entry(hash)
                .and_modify(|existing| existing.merge_signatures(&tx))
                .or_insert(tx);
        }
    }

    /// Tallies, orders, and commits approved transactions into a new block
    /// (spec §4.5 `finalize_consensus_round`, §4.6 steps 2-4). `cohort_size`
    /// is the number of peers in this round's majority cohort, used for the
    /// approval threshold. Transactions below threshold stay in the pool
    /// (transient); transactions at/above threshold but whose state
    /// transition turns out invalid against the still-unfolding block (e.g.
    /// a second ticket redemption racing the first within the same round)
    /// are dropped for good (definitive, spec §7/§9c).
    pub fn finalize_consensus_round(
        &mut self,
        cohort_size: usize,
        minimum_agreement_pct: f64,
        timestamp: u64,
        template: Option<&voting_core::BallotTemplate>,
    ) {
        self.last_round_approvals.clear();
        self.last_round_rejections.clear();
        self.last_round_rejection_reasons.clear();

        for (hash, reason) in self.pending_rejections.drain(..) {
            self.last_round_rejections.push(hash);
            self.last_round_rejection_reasons.push(reason);
        }

        let threshold = ((minimum_agreement_pct * cohort_size as f64).ceil() as usize).max(1);

        let mut committed = Vec::new();
        let mut state = self.chain.current_tip().state.clone();
        let mut to_drop = Vec::new();

        // BTreeMap iteration is already canonical-hash-ascending order
        // (spec §4.5: "ordered by transaction hash ascending").
        for (hash, tx) in self.open_pool.iter() {
            let signatures = tx.valid_signature_count(&self.pki);
            if signatures < threshold {
                self.last_round_rejections.push(*hash);
                self.last_round_rejection_reasons
                    .push(VotingError::InsufficientSignatures);
                continue;
            }
            match state.apply(tx, template) {
                Ok(next_state) => {
                    state = next_state;
                    committed.push(tx.clone());
                    self.last_round_approvals.push(*hash);
                }
                Err(reason) => {
                    warn!(%hash, %reason, "approved transaction dropped at commit time");
                    self.last_round_rejections.push(*hash);
                    self.last_round_rejection_reasons.push(reason);
                    to_drop.push(*hash);
                }
            }
        }

        for hash in &self.last_round_approvals {
            self.open_pool.remove(hash);
        }
        for hash in &to_drop {
            self.open_pool.remove(hash);
        }

        let block = self.chain.append_built(committed, state, timestamp);
        info!(
            index = block.index,
            hash = %block.hash(),
            approved = self.last_round_approvals.len(),
            rejected = self.last_round_rejections.len(),
            "consensus round committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voting_core::{Block, BallotClaimTicket, StateSnapshot, VoterRecord, VoterRoll};

    fn voter_node(policy: NodePolicy) -> (Node, Keypair, Arc<VoterRoll>) {
        let roll = Arc::new(VoterRoll::new(vec![VoterRecord {
            name: "alice".into(),
            num_claim_tickets: 1,
        }]));
        let genesis = Block::genesis(StateSnapshot::genesis_voter(&roll), 1000);
        let chain = Chain::new(genesis);
        let keypair = Keypair::generate();
        let pki = Arc::new(Pki::from_public_keys([(keypair.public_key(), false)]));
        let node = Node::new(
            keypair.clone(),
            chain,
            pki,
            LedgerContext::Voter { roll: roll.clone() },
            policy,
        );
        (node, keypair, roll)
    }

    #[test]
    fn submit_rejects_unknown_voter() {
        let (mut node, _issuer, _roll) = voter_node(NodePolicy::Honest);
        let issuer = Keypair::generate();
        let ticket = BallotClaimTicket::issue(99, 1, &issuer);
        let tx = Transaction::new_auth_ticket(99, ticket, 0, &issuer);
        let err = node.submit(tx).unwrap_err();
        assert_eq!(err, VotingError::UnknownVoter);
    }

    #[test]
    fn submit_accepts_then_finalize_commits_with_enough_signatures() {
        let (mut node, _issuer, _roll) = voter_node(NodePolicy::Honest);
        let issuer = Keypair::generate();
        let ticket = BallotClaimTicket::issue(1, 1, &issuer);
        let tx = Transaction::new_auth_ticket(1, ticket, 0, &issuer);
        node.submit(tx).unwrap();

        // Single-node cohort: the issuer's own signature already clears a
        // ceil(2/3 * 1) = 1 threshold.
        node.finalize_consensus_round(1, 2.0 / 3.0, 1001, None);
        assert_eq!(node.last_round_approvals().len(), 1);
        assert_eq!(node.chain().height(), 1);
    }

    #[test]
    fn finalize_leaves_under_threshold_transactions_in_pool() {
        let (mut node, _issuer, _roll) = voter_node(NodePolicy::Honest);
        let issuer = Keypair::generate();
        let ticket = BallotClaimTicket::issue(1, 1, &issuer);
        let tx = Transaction::new_auth_ticket(1, ticket, 0, &issuer);
        node.submit(tx).unwrap();

        // Cohort of 3 needs ceil(2/3*3) = 2 signatures; only 1 present.
        node.finalize_consensus_round(3, 2.0 / 3.0, 1001, None);
        assert_eq!(node.last_round_approvals().len(), 0);
        assert_eq!(node.open_pool().count(), 1);
        assert_eq!(node.chain().height(), 1, "a block still commits, just empty");
    }

    #[test]
    fn cosign_request_does_not_mutate_peer_pool() {
        let (mut node, _issuer, _roll) = voter_node(NodePolicy::Honest);
        let issuer = Keypair::generate();
        let ticket = BallotClaimTicket::issue(1, 1, &issuer);
        let tx = Transaction::new_auth_ticket(1, ticket, 0, &issuer);
        let sig = node.cosign_request(&tx).unwrap();
        assert!(node.public_key().verify(&tx.canonical_payload_bytes(), &sig));
        assert_eq!(node.open_pool().count(), 0);
    }

    #[test]
    fn cosign_rejection_surfaces_in_next_round_report() {
        let (mut node, _issuer, _roll) = voter_node(NodePolicy::Honest);
        let forger = Keypair::generate();
        let ticket = BallotClaimTicket::issue(99, 1, &forger);
        let tx = Transaction::new_auth_ticket(99, ticket, 0, &forger);
        assert!(node.cosign_request(&tx).is_err());

        node.finalize_consensus_round(1, 2.0 / 3.0, 1001, None);
        assert_eq!(
            node.last_round_rejection_reasons(),
            &[VotingError::UnknownVoter]
        );
    }

    #[test]
    fn issue_ticket_then_authenticate_reflects_remaining_balance() {
        let (mut node, _issuer, _roll) = voter_node(NodePolicy::Honest);
        assert!(node.authenticate_voter(1));
        node.issue_ticket(1, 1, 1000).unwrap();
        node.finalize_consensus_round(1, 2.0 / 3.0, 1001, None);
        assert_eq!(node.chain().current_tip().state.remaining_tickets(1), Some(0));
    }
}
