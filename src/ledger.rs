//! Contribution ledger for the shared pool
//!
//! This module tracks each participant's cumulative deposited amount and the
//! pool totals. It is pure bookkeeping: it makes no governance decisions and
//! holds no proposal state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AccountId, TreasuryError, TreasuryResult};

/// Tracks cumulative contributions and the pool's two balances.
///
/// `pool_total` is the accounting sum of contributions and only ever shrinks
/// through an emergency withdrawal; it is the quorum base. `available` is the
/// transferable balance actually held, debited by every successful outbound
/// transfer. The two figures diverge after an emergency withdrawal, which is
/// documented behavior rather than a bug to reconcile.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ContributionLedger {
    /// Participant identity -> cumulative deposited amount, append-only
    balances: HashMap<AccountId, u128>,
    /// Accounting sum of contributions; the quorum base
    pool_total: u128,
    /// Transferable balance actually held by the pool
    available: u128,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit, incrementing the participant's cumulative balance
    /// and both pool figures. Returns the new pool total.
    pub fn deposit(&mut self, participant: &AccountId, amount: u128) -> TreasuryResult<u128> {
        if amount == 0 {
            return Err(TreasuryError::Validation(
                "contribution amount must be positive".to_string(),
            ));
        }

        *self.balances.entry(participant.clone()).or_insert(0) += amount;
        self.pool_total += amount;
        self.available += amount;

        Ok(self.pool_total)
    }

    /// Current cumulative balance for a participant; doubles as their voting
    /// weight, read at vote time and never recomputed for past votes.
    pub fn weight_of(&self, participant: &AccountId) -> u128 {
        self.balances.get(participant).copied().unwrap_or(0)
    }

    /// Accounting sum of all contributions.
    pub fn pool_total(&self) -> u128 {
        self.pool_total
    }

    /// Transferable balance currently held.
    pub fn available(&self) -> u128 {
        self.available
    }

    /// Number of distinct participants with a recorded contribution.
    pub fn contributor_count(&self) -> usize {
        self.balances.len()
    }

    /// Debit the transferable balance for a proposal disbursement. The
    /// accounting total is untouched so pending proposals keep their quorum
    /// base. Caller must have checked sufficiency.
    pub(crate) fn debit_available(&mut self, amount: u128) {
        debug_assert!(amount <= self.available);
        self.available -= amount;
    }

    /// Reverse a [`debit_available`](Self::debit_available) after a failed
    /// transfer.
    pub(crate) fn credit_available(&mut self, amount: u128) {
        self.available += amount;
    }

    /// Debit both balances for an emergency withdrawal. Per-participant
    /// records are untouched, so `pool_total` diverges from the contribution
    /// sum from this point on.
    pub(crate) fn emergency_debit(&mut self, amount: u128) {
        debug_assert!(amount <= self.available);
        self.available -= amount;
        self.pool_total = self.pool_total.saturating_sub(amount);
    }

    /// Reverse an [`emergency_debit`](Self::emergency_debit) after a failed
    /// transfer.
    pub(crate) fn emergency_credit(&mut self, amount: u128) {
        self.available += amount;
        self.pool_total += amount;
    }

    /// Whether `pool_total` still equals the sum of contribution records.
    /// False only after an emergency withdrawal.
    pub fn accounting_consistent(&self) -> bool {
        self.pool_total == self.balances.values().sum::<u128>()
    }
}
