//! Weighted voting and quorum evaluation
//!
//! One vote per (proposal, voter) pair, weighted by the voter's ledger
//! balance at cast time. Quorum is evaluated fresh at execution time against
//! the current pool total, so late contributions raise the bar for pending
//! proposals.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{AccountId, Proposal, TreasuryError, TreasuryResult};

/// Records which (proposal, voter) pairs have voted and folds weights into
/// the proposal tallies. Entries are presence-only and immutable: there is no
/// vote change or retraction.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VoteBook {
    voted: HashSet<(u64, AccountId)>,
}

impl VoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record a weighted vote on an open proposal.
    ///
    /// `weight` is the voter's ledger balance read by the caller at cast
    /// time; it is folded into the tally and never adjusted afterwards.
    /// Returns the weight applied.
    pub fn cast_vote(
        &mut self,
        proposal: &mut Proposal,
        voter: &AccountId,
        support: bool,
        weight: u128,
        now: u64,
    ) -> TreasuryResult<u128> {
        if now > proposal.voting_deadline {
            return Err(TreasuryError::Timing(format!(
                "voting on proposal {} closed at {}",
                proposal.id, proposal.voting_deadline
            )));
        }
        if weight == 0 {
            return Err(TreasuryError::Unauthorized(format!(
                "{voter} has no contribution and therefore no voting weight"
            )));
        }

        let key = (proposal.id, voter.clone());
        if self.voted.contains(&key) {
            return Err(TreasuryError::DuplicateVote {
                proposal_id: proposal.id,
                voter: voter.clone(),
            });
        }
        self.voted.insert(key);

        if support {
            proposal.votes_for += weight;
        } else {
            proposal.votes_against += weight;
        }

        Ok(weight)
    }

    /// Whether this voter already voted on this proposal.
    pub fn has_voted(&self, proposal_id: u64, voter: &AccountId) -> bool {
        self.voted.contains(&(proposal_id, voter.clone()))
    }
}

/// For-votes required for a proposal to pass: the floor of
/// `quorum_percent` percent of the pool total.
pub fn required_votes(pool_total: u128, quorum_percent: u8) -> u128 {
    u128::from(quorum_percent) * pool_total / 100
}

/// Whether accumulated for-votes meet the required fraction of the current
/// pool total.
pub fn quorum_reached(proposal: &Proposal, pool_total: u128, quorum_percent: u8) -> bool {
    proposal.votes_for >= required_votes(pool_total, quorum_percent)
}
