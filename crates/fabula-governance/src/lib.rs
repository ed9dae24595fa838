//! Fabula Governance - Quadratic voting on chapter proposals.
//!
//! This crate provides:
//! - Voting power and quadratic cost (`weight^2` tokens per ballot)
//! - Time-boxed voting rounds with quorum and majority resolution
//! - Live tallies with per-proposal and per-direction breakdowns
//! - A thread-safe engine wired to a balance ledger, proposal store and clock

pub mod power;
pub mod ballot;
pub mod proposal;
pub mod tally;
pub mod round;
pub mod policy;
pub mod ledger;
pub mod store;
pub mod clock;
pub mod engine;
pub mod error;

pub use power::{integer_sqrt, max_weight_from_budget, quadratic_cost, VotingPower, Weight};
pub use ballot::{Ballot, VoteDirection, VoteRequest};
pub use proposal::{Proposal, ProposalKind, ProposalStatus};
pub use tally::{DirectionBreakdown, ProposalTally, TallySnapshot};
pub use round::{Candidate, Outcome, RoundPhase, VotingRound};
pub use policy::{GovernanceConfig, ReleasePolicy};
pub use ledger::{BalanceLedger, MemoryLedger};
pub use store::{MemoryProposalStore, ProposalStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{RoundSpec, VotingEngine};
pub use error::GovernanceError;
