//! Chapter proposals.
//!
//! Proposals go through states: Draft -> Submitted -> Active -> Passed/Rejected/Expired -> Implemented

use std::fmt;
use fabula_types::{AccountId, ProposalId, StoryId, Timestamp};
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// Proposal status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    /// Being written, not yet submitted
    Draft,
    /// Submitted, waiting for a voting round
    Submitted,
    /// Competing in an open round
    Active,
    /// Won its round
    Passed,
    /// Lost its round
    Rejected,
    /// Round ended without quorum
    Expired,
    /// Published as the canonical chapter
    Implemented,
}

impl ProposalStatus {
    /// Check if the status is set only by round resolution (or later).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Passed
                | ProposalStatus::Rejected
                | ProposalStatus::Expired
                | ProposalStatus::Implemented
        )
    }

    /// Check if the proposal may be entered into a round.
    pub fn can_enter_round(&self) -> bool {
        matches!(self, ProposalStatus::Draft | ProposalStatus::Submitted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Submitted => "submitted",
            ProposalStatus::Active => "active",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Expired => "expired",
            ProposalStatus::Implemented => "implemented",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a proposal relates to the story so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalKind {
    /// Next chapter on the main line
    #[default]
    Continuation,
    /// Starts an alternative branch
    Branch,
    /// Reworks an existing chapter
    Remix,
    /// Joins two branches
    Merge,
}

/// A candidate chapter for a story's chapter slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    /// Unique proposal ID
    pub id: ProposalId,
    /// Story the chapter belongs to
    pub story_id: StoryId,
    /// Chapter slot, 1-based
    pub chapter_number: u32,
    /// Author account
    pub author: AccountId,
    /// Title
    pub title: String,
    /// Chapter text
    pub content: String,
    /// Proposal kind
    #[serde(default)]
    pub kind: ProposalKind,
    /// When it was submitted (tie-breaker in resolution)
    pub submission_time: Timestamp,
    /// Current status
    pub status: ProposalStatus,
}

impl Proposal {
    /// Create a new proposal in `Submitted` state.
    pub fn new(
        id: ProposalId,
        story_id: StoryId,
        chapter_number: u32,
        author: AccountId,
        title: String,
        content: String,
        submission_time: Timestamp,
    ) -> Result<Self, GovernanceError> {
        if chapter_number == 0 {
            return Err(GovernanceError::InvalidInput(
                "Chapter number must be positive".to_string()
            ));
        }

        Ok(Self {
            id,
            story_id,
            chapter_number,
            author,
            title,
            content,
            kind: ProposalKind::Continuation,
            submission_time,
            status: ProposalStatus::Submitted,
        })
    }

    /// Set the proposal kind.
    pub fn with_kind(mut self, kind: ProposalKind) -> Self {
        self.kind = kind;
        self
    }

    /// Put the proposal back into draft.
    pub fn into_draft(mut self) -> Self {
        self.status = ProposalStatus::Draft;
        self
    }

    /// Check if the proposal targets the given chapter slot.
    pub fn targets(&self, story_id: &StoryId, chapter_number: u32) -> bool {
        &self.story_id == story_id && self.chapter_number == chapter_number
    }
}
