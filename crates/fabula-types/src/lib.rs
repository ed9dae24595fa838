//! Fabula Types - Core type definitions shared across the Fabula crates.
//!
//! This crate provides:
//! - Opaque identifiers for accounts, stories, proposals and voting rounds
//! - Timestamps (whole seconds since the Unix epoch)
//! - Token amounts in the smallest token unit

pub mod id;
pub mod time;
pub mod amount;
pub mod error;

pub use id::{AccountId, ProposalId, RoundId, StoryId};
pub use time::Timestamp;
pub use amount::{amount_from_signed, TokenAmount};
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AccountId, ProposalId, RoundId, StoryId,
        Timestamp, TokenAmount, TypesError,
    };
}
