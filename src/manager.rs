//! Treasury manager
//!
//! This module wires the ledger, registry, voting, and execution components
//! behind the operation boundary: one facade owning the state store, the
//! reentrancy lock, and the injected collaborators. Operations are applied
//! one at a time under the state write lock; the lock is never held across
//! the external transfer, so the reentrancy lock alone decides whether a
//! nested guarded call is admitted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::events::{EventSink, TreasuryEvent};
use crate::execution::{prepare_execution, rollback_execution, ReentrancyLock, ValueTransfer};
use crate::ledger::ContributionLedger;
use crate::proposals::ProposalRegistry;
use crate::voting::VoteBook;
use crate::{AccountId, Clock, Proposal, TreasuryError, TreasuryResult};

/// Configuration for the governance engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Fraction of the pool total that for-votes must reach, in whole
    /// percent; valid range is 1 to 99 inclusive
    pub quorum_percent: u8,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self { quorum_percent: 50 }
    }
}

fn validate_quorum_percent(percent: u8) -> TreasuryResult<()> {
    if !(1..=99).contains(&percent) {
        return Err(TreasuryError::Validation(format!(
            "quorum percent must be between 1 and 99, got {percent}"
        )));
    }
    Ok(())
}

/// The explicit store for all governance state.
///
/// Created once per engine and mutated only by the operations on
/// [`TreasuryManager`], each under the single state write lock.
#[derive(Debug, Default)]
pub struct TreasuryState {
    pub(crate) ledger: ContributionLedger,
    pub(crate) proposals: ProposalRegistry,
    pub(crate) votes: VoteBook,
    pub(crate) owner: Option<AccountId>,
    pub(crate) quorum_percent: u8,
}

impl TreasuryState {
    fn initialized_owner(&self) -> TreasuryResult<&AccountId> {
        self.owner.as_ref().ok_or(TreasuryError::NotInitialized)
    }

    fn require_owner(&self, caller: &AccountId) -> TreasuryResult<()> {
        let owner = self.initialized_owner()?;
        if caller != owner {
            return Err(TreasuryError::Unauthorized(format!(
                "{caller} is not the treasury owner"
            )));
        }
        Ok(())
    }
}

/// The treasury governance engine.
pub struct TreasuryManager {
    /// All mutable governance state, serialized behind one lock
    state: RwLock<TreasuryState>,
    /// Guard shared by execution and emergency withdrawal
    guard: ReentrancyLock,
    /// External collaborator performing the actual value movement
    transfer: Arc<dyn ValueTransfer>,
    /// Append-only observability log
    events: Arc<dyn EventSink>,
    /// Time source for deadlines
    clock: Arc<dyn Clock>,
}

impl TreasuryManager {
    /// Create a new engine with the given collaborators. Fails with
    /// ValidationError if the configured quorum percent is out of range.
    pub fn new(
        config: GovernanceConfig,
        transfer: Arc<dyn ValueTransfer>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> TreasuryResult<Self> {
        validate_quorum_percent(config.quorum_percent)?;

        Ok(Self {
            state: RwLock::new(TreasuryState {
                quorum_percent: config.quorum_percent,
                ..TreasuryState::default()
            }),
            guard: ReentrancyLock::new(),
            transfer,
            events,
            clock,
        })
    }

    /// Record an event with the sink and mirror it to the structured log.
    /// Sink failures are logged and swallowed; observability never fails an
    /// operation that already committed.
    async fn emit(&self, event: TreasuryEvent) {
        match event.to_json() {
            Ok(json) => debug!(target: "treasury::events", "{}", json),
            Err(e) => debug!(target: "treasury::events", "unserializable event: {}", e),
        }
        if let Err(e) = self.events.record(&event).await {
            error!("failed to record treasury event: {}", e);
        }
    }

    /// Assign the caller as owner, exactly once.
    pub async fn initialize(&self, caller: AccountId) -> TreasuryResult<()> {
        if caller.is_null() {
            return Err(TreasuryError::Validation(
                "owner must not be the null identity".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if state.owner.is_some() {
            return Err(TreasuryError::AlreadyInitialized);
        }
        state.owner = Some(caller.clone());

        info!("treasury initialized with owner {}", caller);
        Ok(())
    }

    /// Deposit value into the pool, increasing the participant's voting
    /// weight and both pool balances.
    pub async fn contribute(&self, participant: AccountId, amount: u128) -> TreasuryResult<()> {
        let pool_total = {
            let mut state = self.state.write().await;
            state.initialized_owner()?;
            state.ledger.deposit(&participant, amount)?
        };

        info!(
            "contribution of {} from {}, pool total now {}",
            amount, participant, pool_total
        );
        self.emit(TreasuryEvent::ContributionReceived {
            participant,
            amount,
            pool_total,
        })
        .await;
        Ok(())
    }

    /// Unsolicited value received without an explicit call; treated exactly
    /// as a contribution.
    pub async fn receive_value(&self, from: AccountId, amount: u128) -> TreasuryResult<()> {
        debug!("unsolicited transfer of {} from {}", amount, from);
        self.contribute(from, amount).await
    }

    /// Create a disbursement proposal; returns the allocated identifier.
    pub async fn propose(
        &self,
        proposer: AccountId,
        recipient: AccountId,
        amount: u128,
        title: String,
        description: String,
        voting_period: u64,
    ) -> TreasuryResult<u64> {
        let now = self.clock.now();
        let (id, voting_deadline) = {
            let mut state = self.state.write().await;
            state.initialized_owner()?;
            let available = state.ledger.available();
            let id = state.proposals.create(
                proposer.clone(),
                recipient.clone(),
                amount,
                title,
                description,
                voting_period,
                available,
                now,
            )?;
            (id, now + voting_period)
        };

        info!(
            "proposal {} created by {}: {} to {}, voting until {}",
            id, proposer, amount, recipient, voting_deadline
        );
        self.emit(TreasuryEvent::ProposalCreated {
            id,
            proposer,
            recipient,
            amount,
            voting_deadline,
        })
        .await;
        Ok(id)
    }

    /// Cast one weighted vote on an open proposal. The weight applied is the
    /// voter's ledger balance at this moment and is never adjusted
    /// afterwards.
    pub async fn vote(
        &self,
        proposal_id: u64,
        voter: AccountId,
        support: bool,
    ) -> TreasuryResult<()> {
        let now = self.clock.now();
        let weight = {
            let mut state = self.state.write().await;
            state.initialized_owner()?;

            let current_weight = state.ledger.weight_of(&voter);
            let TreasuryState {
                proposals, votes, ..
            } = &mut *state;
            let proposal = proposals.get_mut(proposal_id)?;
            votes.cast_vote(proposal, &voter, support, current_weight, now)?
        };

        info!(
            "vote on proposal {} by {}: support={}, weight={}",
            proposal_id, voter, support, weight
        );
        self.emit(TreasuryEvent::VoteCast {
            proposal_id,
            voter,
            support,
            weight,
        })
        .await;
        Ok(())
    }

    /// Release a proposal's funds once its voting window has closed and
    /// quorum is met against the current pool total.
    ///
    /// State is finalized before the external transfer; a failed transfer
    /// rolls everything back, and a reentrant guarded call from within the
    /// transfer fails with ReentrancyError.
    pub async fn execute_proposal(&self, proposal_id: u64) -> TreasuryResult<()> {
        let _permit = self.guard.try_acquire()?;
        let now = self.clock.now();

        let pending = {
            let mut state = self.state.write().await;
            state.initialized_owner()?;
            prepare_execution(&mut state, proposal_id, now)?
        };

        match self
            .transfer
            .transfer(&pending.recipient, pending.amount)
            .await
        {
            Ok(()) => {
                info!(
                    "proposal {} executed: {} transferred to {}",
                    proposal_id, pending.amount, pending.recipient
                );
                self.emit(TreasuryEvent::ProposalExecuted {
                    id: proposal_id,
                    recipient: pending.recipient.clone(),
                    amount: pending.amount,
                })
                .await;
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.write().await;
                rollback_execution(&mut state, &pending);
                warn!(
                    "transfer for proposal {} failed, execution rolled back: {}",
                    proposal_id, e
                );
                Err(TreasuryError::Transfer(e.to_string()))
            }
        }
    }

    /// Owner-only change of the quorum percentage applied to all future
    /// quorum checks, pending proposals included.
    pub async fn set_quorum_percent(&self, caller: AccountId, percent: u8) -> TreasuryResult<()> {
        validate_quorum_percent(percent)?;

        let old_percent = {
            let mut state = self.state.write().await;
            state.require_owner(&caller)?;
            let old = state.quorum_percent;
            state.quorum_percent = percent;
            old
        };

        info!("quorum percent changed from {} to {}", old_percent, percent);
        self.emit(TreasuryEvent::QuorumChanged {
            old_percent,
            new_percent: percent,
        })
        .await;
        Ok(())
    }

    /// Owner-only direct withdrawal bypassing the proposal machinery.
    ///
    /// Reduces the transferable balance and the accounting total but leaves
    /// per-participant contribution records untouched, so the accounting sum
    /// diverges from the contribution records from here on. That divergence
    /// is accepted behavior.
    pub async fn owner_emergency_withdraw(
        &self,
        caller: AccountId,
        to: AccountId,
        amount: u128,
    ) -> TreasuryResult<()> {
        let _permit = self.guard.try_acquire()?;

        {
            let mut state = self.state.write().await;
            state.require_owner(&caller)?;

            if to.is_null() {
                return Err(TreasuryError::Validation(
                    "withdrawal target must not be the null identity".to_string(),
                ));
            }
            let available = state.ledger.available();
            if amount > available {
                return Err(TreasuryError::Validation(format!(
                    "withdrawal of {amount} exceeds available pool balance {available}"
                )));
            }
            state.ledger.emergency_debit(amount);
        }

        match self.transfer.transfer(&to, amount).await {
            Ok(()) => {
                warn!("emergency withdrawal of {} to {}", amount, to);
                self.emit(TreasuryEvent::EmergencyWithdrawal { to, amount })
                    .await;
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.write().await;
                state.ledger.emergency_credit(amount);
                warn!(
                    "transfer for emergency withdrawal failed, rolled back: {}",
                    e
                );
                Err(TreasuryError::Transfer(e.to_string()))
            }
        }
    }

    // ------------------------------------------------------------------
    // Read-only boundary
    // ------------------------------------------------------------------

    /// Whether a proposal with this identifier exists. Id 0 never does.
    pub async fn proposal_exists(&self, id: u64) -> bool {
        self.state.read().await.proposals.exists(id)
    }

    /// Seconds of voting time remaining; 0 if the proposal is unknown or
    /// its deadline has passed.
    pub async fn time_left_to_vote(&self, id: u64) -> u64 {
        self.state.read().await.proposals.time_left(id, self.clock.now())
    }

    pub async fn proposal(&self, id: u64) -> Option<Proposal> {
        self.state.read().await.proposals.get(id).ok().cloned()
    }

    /// All proposals, sorted by identifier.
    pub async fn proposals(&self) -> Vec<Proposal> {
        self.state.read().await.proposals.proposals()
    }

    pub async fn has_voted(&self, proposal_id: u64, voter: &AccountId) -> bool {
        self.state.read().await.votes.has_voted(proposal_id, voter)
    }

    pub async fn quorum_percent(&self) -> u8 {
        self.state.read().await.quorum_percent
    }

    /// Accounting sum of contributions; the quorum base.
    pub async fn pool_total(&self) -> u128 {
        self.state.read().await.ledger.pool_total()
    }

    /// Transferable balance actually held.
    pub async fn available_balance(&self) -> u128 {
        self.state.read().await.ledger.available()
    }

    pub async fn contribution_of(&self, participant: &AccountId) -> u128 {
        self.state.read().await.ledger.weight_of(participant)
    }

    pub async fn owner(&self) -> Option<AccountId> {
        self.state.read().await.owner.clone()
    }
}
