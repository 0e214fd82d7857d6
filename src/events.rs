//! Treasury event log
//!
//! Every state-changing operation emits one event carrying its key
//! parameters. The log is an external collaborator behind [`EventSink`], not
//! core state: a sink failure is logged and never aborts the operation that
//! produced the event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::AccountId;

/// Record of a completed state-changing treasury operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreasuryEvent {
    /// A deposit (explicit or unsolicited) was credited to the ledger
    ContributionReceived {
        participant: AccountId,
        amount: u128,
        pool_total: u128,
    },
    /// A proposal entered the registry
    ProposalCreated {
        id: u64,
        proposer: AccountId,
        recipient: AccountId,
        amount: u128,
        voting_deadline: u64,
    },
    /// A weighted vote was folded into a proposal tally
    VoteCast {
        proposal_id: u64,
        voter: AccountId,
        support: bool,
        weight: u128,
    },
    /// A proposal cleared quorum and its funds were released
    ProposalExecuted {
        id: u64,
        recipient: AccountId,
        amount: u128,
    },
    /// The owner changed the quorum percentage
    QuorumChanged { old_percent: u8, new_percent: u8 },
    /// The owner withdrew funds directly, bypassing voting
    EmergencyWithdrawal { to: AccountId, amount: u128 },
}

impl TreasuryEvent {
    /// JSON rendering used for structured logging and external sinks.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Append-only event log the engine writes to after each successful
/// state-changing operation.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Append one event. Errors are surfaced to the engine's log only; they
    /// never fail the operation that produced the event.
    async fn record(&self, event: &TreasuryEvent) -> anyhow::Result<()>;
}

/// In-memory [`EventSink`] for tests and embedders without their own log.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    entries: RwLock<Vec<TreasuryEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in append order.
    pub async fn events(&self) -> Vec<TreasuryEvent> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl EventSink for MemoryEventLog {
    async fn record(&self, event: &TreasuryEvent) -> anyhow::Result<()> {
        self.entries.write().await.push(event.clone());
        Ok(())
    }
}
