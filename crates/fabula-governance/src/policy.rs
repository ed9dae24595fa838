//! Engine configuration.

use fabula_types::time::SECS_PER_DAY;
use fabula_types::Timestamp;
use serde::{Deserialize, Serialize};
use crate::error::GovernanceError;

/// What happens to tokens committed to ballots once a round is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Committed tokens stay spent
    #[default]
    Burn,
    /// Tokens come back to everyone except `for` voters on the winner
    RefundLosing,
    /// Every commitment is released
    RefundAll,
}

impl ReleasePolicy {
    /// Whether a ballot's commitment is released after resolution.
    pub fn releases(&self, backed_winner: bool) -> bool {
        match self {
            ReleasePolicy::Burn => false,
            ReleasePolicy::RefundLosing => !backed_winner,
            ReleasePolicy::RefundAll => true,
        }
    }
}

/// Governance configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Shortest allowed voting window (seconds)
    pub min_round_duration_secs: u64,
    /// Longest allowed voting window (seconds), unbounded if unset
    pub max_round_duration_secs: Option<u64>,
    /// Quorum used when a round does not name one
    pub default_quorum: u64,
    /// Cap on proposals competing in one round
    pub max_proposals_per_round: usize,
    /// Treatment of committed tokens after resolution
    pub release_policy: ReleasePolicy,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_round_duration_secs: 1,
            max_round_duration_secs: None,
            default_quorum: 0,
            max_proposals_per_round: 32,
            release_policy: ReleasePolicy::Burn,
        }
    }
}

impl GovernanceConfig {
    /// Rounds of 1 to 14 days, as offered when creating a proposal.
    pub fn storytelling() -> Self {
        Self {
            min_round_duration_secs: SECS_PER_DAY,
            max_round_duration_secs: Some(14 * SECS_PER_DAY),
            default_quorum: 100,
            ..Self::default()
        }
    }

    /// Set the release policy.
    pub fn with_release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.min_round_duration_secs == 0 {
            return Err(GovernanceError::InvalidInput(
                "min_round_duration_secs cannot be 0".to_string()
            ));
        }

        if let Some(max) = self.max_round_duration_secs {
            if max < self.min_round_duration_secs {
                return Err(GovernanceError::InvalidInput(format!(
                    "max_round_duration_secs ({}) below min_round_duration_secs ({})",
                    max, self.min_round_duration_secs
                )));
            }
        }

        if self.max_proposals_per_round == 0 {
            return Err(GovernanceError::InvalidInput(
                "max_proposals_per_round cannot be 0".to_string()
            ));
        }

        Ok(())
    }

    /// Check a voting window against the duration bounds.
    pub fn check_window(&self, start: Timestamp, end: Timestamp) -> Result<(), GovernanceError> {
        if end <= start {
            return Err(GovernanceError::InvalidInput(
                format!("Round must end after it starts ({} >= {})", start, end)
            ));
        }

        let duration = end.secs_since(start);
        if duration < self.min_round_duration_secs {
            return Err(GovernanceError::InvalidInput(format!(
                "Round lasts {}s, minimum is {}s",
                duration, self.min_round_duration_secs
            )));
        }

        if let Some(max) = self.max_round_duration_secs {
            if duration > max {
                return Err(GovernanceError::InvalidInput(format!(
                    "Round lasts {}s, maximum is {}s",
                    duration, max
                )));
            }
        }

        Ok(())
    }
}
