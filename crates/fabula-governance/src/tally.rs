//! Vote tallies.

use fabula_types::{ProposalId, RoundId, TokenAmount};
use serde::{Deserialize, Serialize};
use crate::ballot::{Ballot, VoteDirection};
use crate::round::RoundPhase;

/// Running counters for one proposal in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalTally {
    pub proposal_id: ProposalId,
    /// Weighted for votes
    pub for_votes: u64,
    /// Weighted against votes
    pub against_votes: u64,
    /// Weighted abstentions
    pub abstain_votes: u64,
    /// Ballots cast on this proposal
    pub voters: u32,
    /// Tokens spent on this proposal
    pub tokens_used: TokenAmount,
}

impl ProposalTally {
    pub fn new(proposal_id: ProposalId) -> Self {
        Self {
            proposal_id,
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
            voters: 0,
            tokens_used: 0,
        }
    }

    pub(crate) fn add(&mut self, ballot: &Ballot) {
        match ballot.direction() {
            VoteDirection::For => self.for_votes += ballot.weight(),
            VoteDirection::Against => self.against_votes += ballot.weight(),
            VoteDirection::Abstain => self.abstain_votes += ballot.weight(),
        }
        self.voters += 1;
        self.tokens_used += ballot.tokens_used();
    }

    pub fn total(&self) -> u64 {
        self.for_votes + self.against_votes + self.abstain_votes
    }

    /// Strictly more than half of the decisive (for + against) weight.
    pub fn has_majority(&self) -> bool {
        let decisive = self.for_votes as u128 + self.against_votes as u128;
        decisive > 0 && (self.for_votes as u128) * 2 > decisive
    }

    /// for / (for + against) as a percentage, 0 when nobody took a side.
    pub fn support_percentage(&self) -> f64 {
        support_percentage(self.for_votes, self.against_votes)
    }
}

pub(crate) fn support_percentage(for_votes: u64, against_votes: u64) -> f64 {
    let decisive = for_votes as f64 + against_votes as f64;
    if decisive == 0.0 {
        0.0
    } else {
        for_votes as f64 / decisive * 100.0
    }
}

/// Per-direction ballot statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionBreakdown {
    pub direction: VoteDirection,
    /// Number of ballots
    pub count: u32,
    /// Tokens spent
    pub total_tokens: TokenAmount,
    /// Mean ballot weight, 0 when no ballots
    pub average_weight: f64,
}

impl DirectionBreakdown {
    pub(crate) fn collect<'a>(ballots: impl Iterator<Item = &'a Ballot> + Clone) -> Vec<Self> {
        VoteDirection::ALL
            .iter()
            .map(|&direction| {
                let mut count = 0u32;
                let mut total_tokens: TokenAmount = 0;
                let mut total_weight = 0u128;
                for ballot in ballots.clone().filter(|b| b.direction() == direction) {
                    count += 1;
                    total_tokens += ballot.tokens_used();
                    total_weight += ballot.weight() as u128;
                }
                let average_weight = if count == 0 {
                    0.0
                } else {
                    total_weight as f64 / count as f64
                };
                Self { direction, count, total_tokens, average_weight }
            })
            .collect()
    }
}

/// Read-only view of a round's votes. Available at any phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySnapshot {
    pub round_id: RoundId,
    pub phase: RoundPhase,
    #[serde(rename = "for")]
    pub for_votes: u64,
    #[serde(rename = "against")]
    pub against_votes: u64,
    #[serde(rename = "abstain")]
    pub abstain_votes: u64,
    /// Sum of all ballot weights
    pub total: u64,
    /// for / (for + against) * 100
    pub support_percentage: f64,
    /// Distinct voters
    pub participants: u32,
    pub tokens_used: TokenAmount,
    pub quorum_threshold: u64,
    pub quorum_reached: bool,
    pub proposals: Vec<ProposalTally>,
    pub breakdown: Vec<DirectionBreakdown>,
}

impl TallySnapshot {
    /// Tally for a single proposal.
    pub fn proposal(&self, proposal_id: &ProposalId) -> Option<&ProposalTally> {
        self.proposals.iter().find(|t| &t.proposal_id == proposal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_types::{AccountId, Timestamp};
    use crate::power::Weight;

    fn ballot(voter: &str, direction: VoteDirection, weight: u64) -> Ballot {
        Ballot::new(
            RoundId::new("r"),
            ProposalId::new("p"),
            AccountId::new(voter),
            direction,
            Weight::new(weight).unwrap(),
            Timestamp::new(1),
        )
    }

    #[test]
    fn test_add_ballots() {
        let mut tally = ProposalTally::new(ProposalId::new("p"));
        tally.add(&ballot("a", VoteDirection::For, 6));
        tally.add(&ballot("b", VoteDirection::Against, 2));
        tally.add(&ballot("c", VoteDirection::Abstain, 3));

        assert_eq!(tally.for_votes, 6);
        assert_eq!(tally.against_votes, 2);
        assert_eq!(tally.abstain_votes, 3);
        assert_eq!(tally.total(), 11);
        assert_eq!(tally.voters, 3);
        assert_eq!(tally.tokens_used, 36 + 4 + 9);
        assert_eq!(tally.support_percentage(), 75.0);
        assert!(tally.has_majority());
    }

    #[test]
    fn test_exact_half_is_not_majority() {
        let mut tally = ProposalTally::new(ProposalId::new("p"));
        tally.for_votes = 5;
        tally.against_votes = 5;
        assert!(!tally.has_majority());
        assert_eq!(tally.support_percentage(), 50.0);
    }

    #[test]
    fn test_abstain_only_has_no_support() {
        let mut tally = ProposalTally::new(ProposalId::new("p"));
        tally.abstain_votes = 9;
        assert!(!tally.has_majority());
        assert_eq!(tally.support_percentage(), 0.0);
    }

    #[test]
    fn test_breakdown() {
        let ballots = vec![
            ballot("a", VoteDirection::For, 2),
            ballot("b", VoteDirection::For, 4),
            ballot("c", VoteDirection::Against, 1),
        ];
        let breakdown = DirectionBreakdown::collect(ballots.iter());
        assert_eq!(breakdown.len(), 3);

        let for_row = &breakdown[0];
        assert_eq!(for_row.direction, VoteDirection::For);
        assert_eq!(for_row.count, 2);
        assert_eq!(for_row.total_tokens, 20);
        assert_eq!(for_row.average_weight, 3.0);

        let abstain_row = &breakdown[2];
        assert_eq!(abstain_row.count, 0);
        assert_eq!(abstain_row.average_weight, 0.0);
    }
}
