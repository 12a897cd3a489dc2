use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, VotingError};

/// One contest on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotItem {
    pub position: String,
    pub description: String,
    pub choices: Vec<String>,
    pub max_choices: u32,
}

/// The ordered collection of ballot items, finalized once before election
/// start (spec §3). Mutation after `finalize()` is forbidden.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallotTemplate {
    items: Vec<BallotItem>,
    finalized: bool,
}

impl BallotTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(
        &mut self,
        position: impl Into<String>,
        description: impl Into<String>,
        choices: Vec<String>,
        max_choices: u32,
    ) -> Result<()> {
        if self.finalized {
            return Err(VotingError::BallotTemplateFinalized);
        }
        self.items.push(BallotItem {
            position: position.into(),
            description: description.into(),
            choices,
            max_choices: max_choices.max(1),
        });
        Ok(())
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn items(&self) -> &[BallotItem] {
        &self.items
    }

    pub fn item(&self, position: &str) -> Option<&BallotItem> {
        self.items.iter().find(|i| i.position == position)
    }

    /// The zero tally genesis state of the ballot ledger (spec §3).
    pub fn initial_tally_state(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        self.items
            .iter()
            .map(|item| {
                let counts = item.choices.iter().cloned().map(|c| (c, 0u64)).collect();
                (item.position.clone(), counts)
            })
            .collect()
    }

    /// Checks a selection against this (finalized) template: every position
    /// must exist, every choice index must be in range, and
    /// `|subset| <= max_choices` (spec §3 "BallotSelection").
    pub fn validate_selection(&self, selection: &BallotSelection) -> Result<()> {
        if !self.finalized {
            return Err(VotingError::BallotTemplateNotFinalized);
        }
        for (position, chosen) in &selection.0 {
            let item = self.item(position).ok_or_else(|| VotingError::MalformedSelection {
                reason: format!("unknown position '{position}'"),
            })?;
            if chosen.len() > item.max_choices as usize {
                return Err(VotingError::MalformedSelection {
                    reason: format!(
                        "{} choices selected for '{}', max is {}",
                        chosen.len(),
                        position,
                        item.max_choices
                    ),
                });
            }
            for &idx in chosen {
                if idx >= item.choices.len() {
                    return Err(VotingError::MalformedSelection {
                        reason: format!("choice index {idx} out of range for '{position}'"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies a validated selection's votes into a running tally.
    pub fn tally_into(
        &self,
        selection: &BallotSelection,
        tallies: &mut BTreeMap<String, BTreeMap<String, u64>>,
    ) {
        for (position, chosen) in &selection.0 {
            let Some(item) = self.item(position) else {
                continue;
            };
            let entry = tallies.entry(position.clone()).or_default();
            for &idx in chosen {
                if let Some(label) = item.choices.get(idx) {
                    *entry.entry(label.clone()).or_insert(0) += 1;
                }
            }
        }
    }
}

/// A voter's selections, position -> subset of choice indices. Produced by a
/// voting computer from a voter's input (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotSelection(BTreeMap<String, BTreeSet<usize>>);

impl BallotSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, position: impl Into<String>, choices: impl IntoIterator<Item = usize>) {
        self.0.insert(position.into(), choices.into_iter().collect());
    }

    pub fn positions(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}
