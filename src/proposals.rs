//! Proposal registry
//!
//! This module creates and stores proposal records keyed by a monotonically
//! increasing identifier. It owns proposal existence and the immutable fields;
//! tallies are mutated by the voting engine and the executed flag by the
//! execution path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AccountId, Proposal, TreasuryError, TreasuryResult};

/// Shortest accepted voting period: 1 hour in seconds
pub const MIN_VOTING_PERIOD: u64 = 3_600;

/// Longest accepted voting period: 30 days in seconds
pub const MAX_VOTING_PERIOD: u64 = 2_592_000;

/// Storage and allocation of proposal records.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: HashMap<u64, Proposal>,
    /// Last allocated identifier; ids start at 1 and are never reused
    last_id: u64,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a proposal and allocate its identifier.
    ///
    /// `available` is the pool's transferable balance at creation time, the
    /// upper bound for the requested amount.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        proposer: AccountId,
        recipient: AccountId,
        amount: u128,
        title: String,
        description: String,
        voting_period: u64,
        available: u128,
        now: u64,
    ) -> TreasuryResult<u64> {
        if recipient.is_null() {
            return Err(TreasuryError::Validation(
                "recipient must not be the null identity".to_string(),
            ));
        }
        if amount == 0 {
            return Err(TreasuryError::Validation(
                "requested amount must be positive".to_string(),
            ));
        }
        if !(MIN_VOTING_PERIOD..=MAX_VOTING_PERIOD).contains(&voting_period) {
            return Err(TreasuryError::Validation(format!(
                "voting period must be between {MIN_VOTING_PERIOD} and {MAX_VOTING_PERIOD} seconds, got {voting_period}"
            )));
        }
        if amount > available {
            return Err(TreasuryError::Validation(format!(
                "requested amount {amount} exceeds available pool balance {available}"
            )));
        }

        self.last_id += 1;
        let id = self.last_id;

        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                recipient,
                amount,
                title,
                description,
                created_at: now,
                voting_deadline: now + voting_period,
                votes_for: 0,
                votes_against: 0,
                executed: false,
            },
        );

        Ok(id)
    }

    /// Whether a proposal with this identifier exists. Id 0 never does.
    pub fn exists(&self, id: u64) -> bool {
        self.proposals.contains_key(&id)
    }

    /// Seconds of voting time remaining; 0 if the proposal is unknown or its
    /// deadline has passed.
    pub fn time_left(&self, id: u64, now: u64) -> u64 {
        self.proposals
            .get(&id)
            .map(|p| p.voting_deadline.saturating_sub(now))
            .unwrap_or(0)
    }

    pub fn get(&self, id: u64) -> TreasuryResult<&Proposal> {
        self.proposals.get(&id).ok_or(TreasuryError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: u64) -> TreasuryResult<&mut Proposal> {
        self.proposals
            .get_mut(&id)
            .ok_or(TreasuryError::NotFound(id))
    }

    /// All proposals, sorted by identifier.
    pub fn proposals(&self) -> Vec<Proposal> {
        let mut all: Vec<Proposal> = self.proposals.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        all
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }
}
