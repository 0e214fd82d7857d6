//! Reentrancy-safe proposal execution
//!
//! Fund release follows checks-effects-interactions: every precondition is
//! checked and the internal state finalized (executed flag set, transferable
//! balance debited) before the external value transfer runs. A single
//! reentrancy lock guards both execution and emergency withdrawal; it is
//! held across the transfer and released on every exit path, so a nested
//! call from recipient-supplied code fails fast instead of deadlocking.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::manager::TreasuryState;
use crate::voting::{quorum_reached, required_votes};
use crate::{AccountId, TreasuryError, TreasuryResult};

/// External collaborator that moves value out of the pool.
///
/// Implementations may hand control to recipient-supplied code; the engine
/// assumes nothing about them beyond the returned result. A failure aborts
/// the surrounding operation and rolls its state changes back.
#[async_trait]
pub trait ValueTransfer: Send + Sync {
    /// Transfer `amount` to `to`. Runs after the engine has finalized its
    /// own state for the operation.
    async fn transfer(&self, to: &AccountId, amount: u128) -> anyhow::Result<()>;
}

/// Scoped lock rejecting nested entry into guarded operations.
///
/// Acquired at the start of any operation that performs an external
/// transfer; the permit releases it on drop, success or failure alike.
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    held: AtomicBool,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, failing with [`TreasuryError::Reentrancy`] if it is
    /// already held by an in-flight guarded operation.
    pub fn try_acquire(&self) -> TreasuryResult<ReentrancyPermit<'_>> {
        if self
            .held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_ok()
        {
            Ok(ReentrancyPermit { lock: self })
        } else {
            Err(TreasuryError::Reentrancy)
        }
    }

    /// Whether a guarded operation is currently in flight.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// RAII permit for [`ReentrancyLock`]; dropping it releases the lock.
#[derive(Debug)]
pub struct ReentrancyPermit<'a> {
    lock: &'a ReentrancyLock,
}

impl Drop for ReentrancyPermit<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}

/// State finalized before the external transfer, kept so a failed transfer
/// can be rolled back to the pre-execution state.
#[derive(Debug, Clone)]
pub(crate) struct PendingTransfer {
    pub proposal_id: u64,
    pub recipient: AccountId,
    pub amount: u128,
}

/// Run every execution precondition and, if all pass, finalize internal
/// state: mark the proposal executed and debit the transferable balance.
/// Called under the state write lock, before any external interaction.
pub(crate) fn prepare_execution(
    state: &mut TreasuryState,
    proposal_id: u64,
    now: u64,
) -> TreasuryResult<PendingTransfer> {
    let pool_total = state.ledger.pool_total();
    let available = state.ledger.available();
    let quorum_percent = state.quorum_percent;

    let proposal = state.proposals.get_mut(proposal_id)?;

    if proposal.executed {
        return Err(TreasuryError::AlreadyExecuted(proposal_id));
    }
    if now <= proposal.voting_deadline {
        return Err(TreasuryError::Timing(format!(
            "voting on proposal {} is open until {}",
            proposal_id, proposal.voting_deadline
        )));
    }
    if proposal.amount > available {
        return Err(TreasuryError::InsufficientFunds {
            requested: proposal.amount,
            available,
        });
    }
    if pool_total == 0 {
        return Err(TreasuryError::NoContributions);
    }
    if !quorum_reached(proposal, pool_total, quorum_percent) {
        return Err(TreasuryError::QuorumNotMet {
            votes_for: proposal.votes_for,
            required: required_votes(pool_total, quorum_percent),
        });
    }

    // Effects before interactions: a reentrant observer sees the proposal
    // as already executed.
    proposal.executed = true;
    let pending = PendingTransfer {
        proposal_id,
        recipient: proposal.recipient.clone(),
        amount: proposal.amount,
    };
    state.ledger.debit_available(pending.amount);

    Ok(pending)
}

/// Undo [`prepare_execution`] after the external transfer reported failure,
/// restoring the proposal and the balance as if execution was never
/// attempted.
pub(crate) fn rollback_execution(state: &mut TreasuryState, pending: &PendingTransfer) {
    state.ledger.credit_available(pending.amount);
    if let Ok(proposal) = state.proposals.get_mut(pending.proposal_id) {
        proposal.executed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_rejects_nested_acquisition() {
        let lock = ReentrancyLock::new();
        let permit = lock.try_acquire().unwrap();
        assert!(lock.is_held());
        assert_eq!(lock.try_acquire().unwrap_err(), TreasuryError::Reentrancy);
        drop(permit);
        assert!(!lock.is_held());
    }

    #[test]
    fn lock_releases_on_every_exit_path() {
        let lock = ReentrancyLock::new();

        // Success path
        {
            let _permit = lock.try_acquire().unwrap();
        }
        assert!(!lock.is_held());

        // Error path: the permit is dropped while unwinding the operation
        let failing: TreasuryResult<()> = (|| {
            let _permit = lock.try_acquire()?;
            Err(TreasuryError::Transfer("refused".to_string()))
        })();
        assert!(failing.is_err());
        assert!(!lock.is_held());

        assert!(lock.try_acquire().is_ok());
    }
}
