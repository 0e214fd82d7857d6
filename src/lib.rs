//! Collective treasury governance engine
//!
//! This crate implements the proposal lifecycle for a shared funding pool:
//! participants deposit value, propose disbursements, vote with weight
//! proportional to their cumulative deposit, and release funds once a
//! proposal clears a configurable quorum measured against the pool total.
//!
//! The engine owns bookkeeping and decisions only. Actual value movement,
//! event persistence, and time are external collaborators injected as trait
//! objects ([`execution::ValueTransfer`], [`events::EventSink`], [`Clock`]).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod events;
pub mod execution;
pub mod ledger;
pub mod manager;
pub mod proposals;
pub mod voting;

// Re-exports
pub use events::{EventSink, MemoryEventLog, TreasuryEvent};
pub use execution::ValueTransfer;
pub use ledger::ContributionLedger;
pub use manager::{GovernanceConfig, TreasuryManager};
pub use proposals::{ProposalRegistry, MAX_VOTING_PERIOD, MIN_VOTING_PERIOD};
pub use voting::{quorum_reached, required_votes, VoteBook};

/// Error types for treasury governance operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    /// The engine has not been initialized with an owner yet
    #[error("treasury is not initialized")]
    NotInitialized,

    /// `initialize` was called on an already-initialized engine
    #[error("treasury is already initialized")]
    AlreadyInitialized,

    /// Caller lacks the required role or voting weight
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed or out-of-range argument
    #[error("invalid argument: {0}")]
    Validation(String),

    /// Unknown proposal identifier
    #[error("proposal not found: {0}")]
    NotFound(u64),

    /// Voting window closed, or still open where it must be closed
    #[error("timing violation: {0}")]
    Timing(String),

    /// The (proposal, voter) pair already recorded a vote
    #[error("duplicate vote on proposal {proposal_id} by {voter}")]
    DuplicateVote { proposal_id: u64, voter: AccountId },

    /// The pool has no recorded contributions
    #[error("pool has no contributions")]
    NoContributions,

    /// Requested amount exceeds the transferable balance
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u128, available: u128 },

    /// For-votes fell short of the required fraction of the pool total
    #[error("quorum not met: {votes_for} for-votes, {required} required")]
    QuorumNotMet { votes_for: u128, required: u128 },

    /// The proposal was already executed
    #[error("proposal {0} already executed")]
    AlreadyExecuted(u64),

    /// A guarded operation was re-entered from within a value transfer
    #[error("reentrant call into a guarded operation")]
    Reentrancy,

    /// The external value transfer reported failure
    #[error("value transfer failed: {0}")]
    Transfer(String),
}

/// Result type for treasury governance operations
pub type TreasuryResult<T> = Result<T, TreasuryError>;

/// Identity of a pool participant, proposal recipient, or owner.
///
/// The empty string is the null identity and is never a valid recipient
/// or owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved null identity.
    pub fn null() -> Self {
        Self(String::new())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A recorded request to transfer a specific amount to a recipient,
/// subject to a weighted vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Sequential identifier, allocated from 1; 0 is reserved as
    /// "does not exist" and is never allocated
    pub id: u64,
    /// The participant that submitted the proposal
    pub proposer: AccountId,
    /// Where the funds go on execution
    pub recipient: AccountId,
    /// Requested disbursement amount
    pub amount: u128,
    /// Short human-readable title (opaque to the engine)
    pub title: String,
    /// Detailed description (opaque to the engine)
    pub description: String,
    /// When the proposal was created (epoch seconds)
    pub created_at: u64,
    /// Votes accepted while `now <= voting_deadline`
    pub voting_deadline: u64,
    /// Sum of the weights of distinct for-voters, fixed at cast time
    pub votes_for: u128,
    /// Sum of the weights of distinct against-voters, fixed at cast time
    pub votes_against: u128,
    /// One-way flag, set by execution before the external transfer
    pub executed: bool,
}

/// Current wall-clock time in seconds since the Unix epoch.
pub fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Time source for deadlines and timestamps.
///
/// Injected so embedders and tests control the clock; production code uses
/// [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// Wall-clock [`Clock`] backed by [`timestamp_secs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        timestamp_secs()
    }
}

/// Manually advanced [`Clock`] for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_account_id() {
        assert!(AccountId::null().is_null());
        assert!(!AccountId::from("alice").is_null());
        assert_eq!(AccountId::from("alice").to_string(), "alice");
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        assert!(clock.now() > 0);
    }

    #[test]
    fn manual_clock_is_controllable() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }
}
