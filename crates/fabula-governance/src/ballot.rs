//! Ballots and vote requests.

use std::fmt;
use std::str::FromStr;
use fabula_types::{AccountId, ProposalId, RoundId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;
use crate::power::Weight;

/// Vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    /// Vote in favor
    For,
    /// Vote against
    Against,
    /// Abstain (counts toward quorum but not support)
    Abstain,
}

impl VoteDirection {
    pub const ALL: [VoteDirection; 3] = [
        VoteDirection::For,
        VoteDirection::Against,
        VoteDirection::Abstain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::For => "for",
            VoteDirection::Against => "against",
            VoteDirection::Abstain => "abstain",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "for" => Ok(VoteDirection::For),
            "against" => Ok(VoteDirection::Against),
            "abstain" => Ok(VoteDirection::Abstain),
            _ => Err(GovernanceError::InvalidDirection(s.to_string())),
        }
    }
}

/// One voter's recorded vote in a round. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "BallotRecord")]
pub struct Ballot {
    round_id: RoundId,
    proposal_id: ProposalId,
    voter: AccountId,
    direction: VoteDirection,
    weight: Weight,
    tokens_used: TokenAmount,
    cast_at: Timestamp,
}

/// Wire shape of a stored ballot, checked before it becomes a [`Ballot`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BallotRecord {
    round_id: RoundId,
    proposal_id: ProposalId,
    voter: AccountId,
    direction: VoteDirection,
    weight: Weight,
    tokens_used: TokenAmount,
    cast_at: Timestamp,
}

impl TryFrom<BallotRecord> for Ballot {
    type Error = GovernanceError;

    fn try_from(record: BallotRecord) -> Result<Self, Self::Error> {
        let expected = record.weight.cost();
        if record.tokens_used != expected {
            return Err(GovernanceError::InvalidInput(format!(
                "Ballot of weight {} must cost {} tokens, not {}",
                record.weight.get(),
                expected,
                record.tokens_used
            )));
        }
        Ok(Ballot::new(
            record.round_id,
            record.proposal_id,
            record.voter,
            record.direction,
            record.weight,
            record.cast_at,
        ))
    }
}

impl Ballot {
    pub(crate) fn new(
        round_id: RoundId,
        proposal_id: ProposalId,
        voter: AccountId,
        direction: VoteDirection,
        weight: Weight,
        cast_at: Timestamp,
    ) -> Self {
        Self {
            round_id,
            proposal_id,
            voter,
            direction,
            tokens_used: weight.cost(),
            weight,
            cast_at,
        }
    }

    pub fn round_id(&self) -> &RoundId {
        &self.round_id
    }

    pub fn proposal_id(&self) -> &ProposalId {
        &self.proposal_id
    }

    pub fn voter(&self) -> &AccountId {
        &self.voter
    }

    pub fn direction(&self) -> VoteDirection {
        self.direction
    }

    pub fn weight(&self) -> u64 {
        self.weight.get()
    }

    /// Always `weight^2`.
    pub fn tokens_used(&self) -> TokenAmount {
        self.tokens_used
    }

    pub fn cast_at(&self) -> Timestamp {
        self.cast_at
    }

    /// Whether this ballot backed `proposal_id`.
    pub fn supports(&self, proposal_id: &ProposalId) -> bool {
        self.direction == VoteDirection::For && &self.proposal_id == proposal_id
    }
}

/// Unvalidated vote as it arrives from the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub round_id: RoundId,
    pub proposal_id: ProposalId,
    pub voter: AccountId,
    pub direction: String,
    pub weight: i64,
    /// Client-computed cost; must match `weight^2` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_to_use: Option<TokenAmount>,
}

impl VoteRequest {
    /// Check direction, then weight, then the declared cost.
    pub fn validate(&self) -> Result<(VoteDirection, Weight), GovernanceError> {
        let direction: VoteDirection = self.direction.parse()?;
        let weight = Weight::from_signed(self.weight)?;

        if let Some(declared) = self.tokens_to_use {
            if declared != weight.cost() {
                return Err(GovernanceError::InvalidInput(format!(
                    "tokensToUse {} does not match weight {} (cost {})",
                    declared,
                    weight.get(),
                    weight.cost()
                )));
            }
        }

        Ok((direction, weight))
    }
}
