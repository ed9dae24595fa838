use fabula_types::{AccountId, ProposalId, RoundId, Timestamp, TokenAmount, TypesError};
use thiserror::Error;

/// Errors that can occur in governance operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid vote direction: {0:?}")]
    InvalidDirection(String),

    #[error("Round {round_id} not active until {starts_at}")]
    RoundNotActive { round_id: RoundId, starts_at: Timestamp },

    #[error("Round {round_id} closed at {ended_at}")]
    RoundClosed { round_id: RoundId, ended_at: Timestamp },

    #[error("Round {round_id} still open until {ends_at}")]
    RoundNotClosed { round_id: RoundId, ends_at: Timestamp },

    #[error("{voter} already voted in round {round_id}")]
    AlreadyVoted { round_id: RoundId, voter: AccountId },

    #[error("Insufficient balance: cost {cost}, available {available}")]
    InsufficientBalance { cost: TokenAmount, available: TokenAmount },

    #[error("Vote would overflow the totals of round {round_id}")]
    TallyOverflow { round_id: RoundId },

    #[error("Round not found: {0}")]
    UnknownRound(RoundId),

    #[error("Proposal not found: {0}")]
    UnknownProposal(ProposalId),

    #[error("Round already exists: {0}")]
    DuplicateRound(RoundId),

    #[error("Balance ledger error: {0}")]
    Ledger(String),

    #[error("Proposal store error: {0}")]
    Store(String),
}

impl GovernanceError {
    /// Short text the voting UI shows for this failure.
    pub fn user_message(&self) -> String {
        match self {
            GovernanceError::RoundClosed { .. } => "Voting ended".to_string(),
            GovernanceError::RoundNotActive { .. } => "Voting has not started yet".to_string(),
            GovernanceError::AlreadyVoted { .. } => "You already voted in this round".to_string(),
            GovernanceError::InsufficientBalance { cost, available } => format!(
                "This vote costs {} tokens but only {} are available",
                cost, available
            ),
            GovernanceError::InvalidInput(_) | GovernanceError::InvalidDirection(_) => {
                "Invalid vote".to_string()
            }
            GovernanceError::UnknownRound(_) | GovernanceError::UnknownProposal(_) => {
                "Not found".to_string()
            }
            GovernanceError::TallyOverflow { .. } => "Vote weight too large".to_string(),
            GovernanceError::RoundNotClosed { .. }
            | GovernanceError::DuplicateRound(_)
            | GovernanceError::Ledger(_)
            | GovernanceError::Store(_) => "Something went wrong".to_string(),
        }
    }

    /// Whether the error is a referential-integrity miss.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GovernanceError::UnknownRound(_) | GovernanceError::UnknownProposal(_)
        )
    }
}

impl From<TypesError> for GovernanceError {
    fn from(e: TypesError) -> Self {
        GovernanceError::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernanceError::InvalidInput("weight must be at least 1".to_string());
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_insufficient_balance_carries_amounts() {
        let err = GovernanceError::InsufficientBalance { cost: 121, available: 100 };
        assert!(err.to_string().contains("121"));
        assert!(err.to_string().contains("100"));
        assert!(err.user_message().contains("121"));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let voted = GovernanceError::AlreadyVoted {
            round_id: RoundId::new("r1"),
            voter: AccountId::new("alice"),
        };
        let broke = GovernanceError::InsufficientBalance { cost: 4, available: 1 };
        assert_ne!(voted.user_message(), broke.user_message());
    }

    #[test]
    fn test_types_error_is_invalid_input() {
        let err: GovernanceError = TypesError::NegativeAmount(-3).into();
        assert!(matches!(err, GovernanceError::InvalidInput(_)));
    }

    #[test]
    fn test_not_found() {
        assert!(GovernanceError::UnknownRound(RoundId::new("x")).is_not_found());
        assert!(!GovernanceError::Ledger("down".into()).is_not_found());
    }
}
