use serde::{Deserialize, Serialize};

/// Election-wide configuration constants (spec §6). Shared by both ledger
/// instances; individual nodes don't carry their own copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Fraction of cohort peers whose valid signatures a transaction needs to
    /// be considered verified, and the fraction of the total network a
    /// partition needs to become the majority tip-agreement cohort.
    pub minimum_agreement_pct: f64,
    /// Wall-clock seconds between consensus ticks in the interactive driver.
    pub consensus_round_interval_secs: u64,
    /// Total node count per ledger.
    pub total_nodes: usize,
    /// Whether a minority of nodes per ledger run an adversary policy.
    pub adversarial_mode: bool,
}

impl ElectionConfig {
    /// Smallest integer `k` such that `k >= minimum_agreement_pct * n`.
    pub fn threshold(&self, n: usize) -> usize {
        (self.minimum_agreement_pct * n as f64).ceil() as usize
    }

    /// The adversary bound from spec §4.7 / §8 property 6: the largest
    /// adversarial node count that still cannot forge a commit, i.e.
    /// `floor((1 - minimum_agreement_pct) * total_nodes) - 1`, clamped at 0.
    pub fn adversary_bound(&self) -> usize {
        let raw = (1.0 - self.minimum_agreement_pct) * self.total_nodes as f64;
        (raw.floor() as i64 - 1).max(0) as usize
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            minimum_agreement_pct: 2.0 / 3.0,
            consensus_round_interval_secs: 30,
            total_nodes: 50,
            adversarial_mode: false,
        }
    }
}
