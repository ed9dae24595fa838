//! Voting rounds.
//!
//! A round groups the proposals competing for one chapter slot. Its phase is a
//! pure function of the supplied `now`:
//!
//! Scheduled (now < start) -> Active (start <= now < end) -> Closed (now >= end) -> Finalized
//!
//! Only `finalize` moves a round into `Finalized`; everything before that is
//! re-derived from the clock on every call.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use fabula_types::{AccountId, ProposalId, RoundId, StoryId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use crate::ballot::{Ballot, VoteDirection};
use crate::error::GovernanceError;
use crate::power::Weight;
use crate::proposal::ProposalStatus;
use crate::tally::{support_percentage, DirectionBreakdown, ProposalTally, TallySnapshot};

/// Round phase, derived from time and finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Before the start time
    Scheduled,
    /// Accepting ballots
    Active,
    /// Window over, awaiting resolution
    Closed,
    /// Outcome recorded
    Finalized,
}

/// Final result of a round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// One proposal won with majority support
    Passed { winner: ProposalId },
    /// Quorum reached but no proposal had majority support
    Rejected,
    /// Quorum not reached
    Expired,
}

impl Outcome {
    pub fn winner(&self) -> Option<&ProposalId> {
        match self {
            Outcome::Passed { winner } => Some(winner),
            Outcome::Rejected | Outcome::Expired => None,
        }
    }

    /// Terminal status this outcome assigns to a proposal of the round.
    pub fn status_for(&self, proposal_id: &ProposalId) -> ProposalStatus {
        match self {
            Outcome::Passed { winner } if winner == proposal_id => ProposalStatus::Passed,
            Outcome::Passed { .. } | Outcome::Rejected => ProposalStatus::Rejected,
            Outcome::Expired => ProposalStatus::Expired,
        }
    }
}

/// A proposal entered in a round, with its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub proposal_id: ProposalId,
    pub submission_time: Timestamp,
    pub tally: ProposalTally,
}

/// Time-boxed competition among proposals for one chapter slot.
///
/// Only built through [`VotingRound::new`]; it serializes for reports but is
/// never read back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingRound {
    id: RoundId,
    story_id: StoryId,
    chapter_number: u32,
    candidates: Vec<Candidate>,
    start_time: Timestamp,
    end_time: Timestamp,
    quorum_threshold: u64,
    total_votes: u64,
    tokens_used: TokenAmount,
    ballots: HashMap<AccountId, Ballot>,
    outcome: Option<Outcome>,
    finalized_at: Option<Timestamp>,
}

impl VotingRound {
    /// Create a new round.
    ///
    /// `candidates` pairs each proposal with its submission time, in display
    /// order. The list must be non-empty and free of duplicates, and the
    /// window must have positive length.
    pub fn new(
        id: RoundId,
        story_id: StoryId,
        chapter_number: u32,
        candidates: Vec<(ProposalId, Timestamp)>,
        start_time: Timestamp,
        end_time: Timestamp,
        quorum_threshold: u64,
    ) -> Result<Self, GovernanceError> {
        if chapter_number == 0 {
            return Err(GovernanceError::InvalidInput(
                "Chapter number must be positive".to_string()
            ));
        }

        if candidates.is_empty() {
            return Err(GovernanceError::InvalidInput(
                format!("Round {} has no proposals", id)
            ));
        }

        let mut seen = HashSet::new();
        for (proposal_id, _) in &candidates {
            if !seen.insert(proposal_id) {
                return Err(GovernanceError::InvalidInput(
                    format!("Proposal {} listed twice in round {}", proposal_id, id)
                ));
            }
        }

        if end_time <= start_time {
            return Err(GovernanceError::InvalidInput(
                format!("Round {} must end after it starts", id)
            ));
        }

        let candidates = candidates
            .into_iter()
            .map(|(proposal_id, submission_time)| Candidate {
                tally: ProposalTally::new(proposal_id.clone()),
                proposal_id,
                submission_time,
            })
            .collect();

        Ok(Self {
            id,
            story_id,
            chapter_number,
            candidates,
            start_time,
            end_time,
            quorum_threshold,
            total_votes: 0,
            tokens_used: 0,
            ballots: HashMap::new(),
            outcome: None,
            finalized_at: None,
        })
    }

    pub fn id(&self) -> &RoundId {
        &self.id
    }

    pub fn story_id(&self) -> &StoryId {
        &self.story_id
    }

    pub fn chapter_number(&self) -> u32 {
        self.chapter_number
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Proposal ids in display order.
    pub fn proposal_ids(&self) -> impl Iterator<Item = &ProposalId> {
        self.candidates.iter().map(|c| &c.proposal_id)
    }

    pub fn contains(&self, proposal_id: &ProposalId) -> bool {
        self.candidates.iter().any(|c| &c.proposal_id == proposal_id)
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn quorum_threshold(&self) -> u64 {
        self.quorum_threshold
    }

    /// Sum of all ballot weights, abstentions included.
    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    /// Tokens spent on all ballots.
    pub fn tokens_used(&self) -> TokenAmount {
        self.tokens_used
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn winning_proposal(&self) -> Option<&ProposalId> {
        self.outcome.as_ref().and_then(Outcome::winner)
    }

    pub fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn finalized_at(&self) -> Option<Timestamp> {
        self.finalized_at
    }

    /// Phase at `now`.
    pub fn phase(&self, now: Timestamp) -> RoundPhase {
        if self.is_finalized() {
            RoundPhase::Finalized
        } else if now < self.start_time {
            RoundPhase::Scheduled
        } else if now < self.end_time {
            RoundPhase::Active
        } else {
            RoundPhase::Closed
        }
    }

    /// Seconds until voting ends, zero once closed.
    pub fn time_remaining(&self, now: Timestamp) -> u64 {
        if self.is_finalized() {
            0
        } else {
            self.end_time.secs_since(now)
        }
    }

    /// Fail unless ballots are accepted at `now`.
    pub fn ensure_active(&self, now: Timestamp) -> Result<(), GovernanceError> {
        match self.phase(now) {
            RoundPhase::Active => Ok(()),
            RoundPhase::Scheduled => Err(GovernanceError::RoundNotActive {
                round_id: self.id.clone(),
                starts_at: self.start_time,
            }),
            RoundPhase::Closed | RoundPhase::Finalized => Err(GovernanceError::RoundClosed {
                round_id: self.id.clone(),
                ended_at: self.end_time,
            }),
        }
    }

    pub fn has_voted(&self, voter: &AccountId) -> bool {
        self.ballots.contains_key(voter)
    }

    pub fn ballot(&self, voter: &AccountId) -> Option<&Ballot> {
        self.ballots.get(voter)
    }

    pub fn ballots(&self) -> impl Iterator<Item = &Ballot> + Clone {
        self.ballots.values()
    }

    /// Validate a vote without recording it.
    ///
    /// Checks, first failure wins: round active, weight >= 1, proposal in the
    /// round, voter has no ballot yet, cost within `available` tokens, round
    /// totals still representable.
    pub fn prepare_ballot(
        &self,
        now: Timestamp,
        voter: &AccountId,
        proposal_id: &ProposalId,
        direction: VoteDirection,
        weight: u64,
        available: TokenAmount,
    ) -> Result<Ballot, GovernanceError> {
        self.ensure_active(now)?;

        let weight = Weight::new(weight)?;

        if !self.contains(proposal_id) {
            return Err(GovernanceError::UnknownProposal(proposal_id.clone()));
        }

        if self.has_voted(voter) {
            return Err(GovernanceError::AlreadyVoted {
                round_id: self.id.clone(),
                voter: voter.clone(),
            });
        }

        let cost = weight.cost();
        if cost > available {
            return Err(GovernanceError::InsufficientBalance { cost, available });
        }

        self.checked_totals(weight.get(), cost)?;

        Ok(Ballot::new(
            self.id.clone(),
            proposal_id.clone(),
            voter.clone(),
            direction,
            weight,
            now,
        ))
    }

    /// Round totals after adding a ballot of `weight` costing `cost`.
    ///
    /// Per-proposal and per-direction counters never exceed the round totals,
    /// so checking these two covers every counter.
    fn checked_totals(&self, weight: u64, cost: TokenAmount) -> Result<(u64, TokenAmount), GovernanceError> {
        let overflow = || GovernanceError::TallyOverflow { round_id: self.id.clone() };
        let total_votes = self.total_votes.checked_add(weight).ok_or_else(overflow)?;
        let tokens_used = self.tokens_used.checked_add(cost).ok_or_else(overflow)?;
        Ok((total_votes, tokens_used))
    }

    /// Record a ballot produced by [`VotingRound::prepare_ballot`] on this
    /// round. Applying a second ballot for the same voter is refused.
    pub(crate) fn apply_ballot(&mut self, ballot: Ballot) -> Result<(), GovernanceError> {
        if ballot.round_id() != &self.id {
            return Err(GovernanceError::InvalidInput(
                format!("Ballot for round {} applied to round {}", ballot.round_id(), self.id)
            ));
        }

        if self.has_voted(ballot.voter()) {
            return Err(GovernanceError::AlreadyVoted {
                round_id: self.id.clone(),
                voter: ballot.voter().clone(),
            });
        }

        let (total_votes, tokens_used) = self.checked_totals(ballot.weight(), ballot.tokens_used())?;

        let candidate = self
            .candidates
            .iter_mut()
            .find(|c| &c.proposal_id == ballot.proposal_id())
            .ok_or_else(|| GovernanceError::UnknownProposal(ballot.proposal_id().clone()))?;

        candidate.tally.add(&ballot);
        self.total_votes = total_votes;
        self.tokens_used = tokens_used;
        self.ballots.insert(ballot.voter().clone(), ballot);
        Ok(())
    }

    /// Validate and record a vote in one step.
    pub fn cast_vote(
        &mut self,
        now: Timestamp,
        voter: &AccountId,
        proposal_id: &ProposalId,
        direction: VoteDirection,
        weight: u64,
        available: TokenAmount,
    ) -> Result<Ballot, GovernanceError> {
        let ballot = self.prepare_ballot(now, voter, proposal_id, direction, weight, available)?;
        self.apply_ballot(ballot.clone())?;
        Ok(ballot)
    }

    /// End an active round at `now` so it can be resolved.
    pub fn close_early(&mut self, now: Timestamp) -> Result<(), GovernanceError> {
        self.ensure_active(now)?;

        if now <= self.start_time {
            return Err(GovernanceError::InvalidInput(
                format!("Round {} cannot close at its start instant", self.id)
            ));
        }

        self.end_time = now;
        Ok(())
    }

    /// Work out the outcome without recording it.
    ///
    /// Returns the recorded outcome if the round is already finalized.
    pub fn evaluate(&self, now: Timestamp) -> Result<Outcome, GovernanceError> {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }

        if now < self.end_time {
            return Err(GovernanceError::RoundNotClosed {
                round_id: self.id.clone(),
                ends_at: self.end_time,
            });
        }

        if self.total_votes < self.quorum_threshold {
            return Ok(Outcome::Expired);
        }

        // Highest for-weight among majority-backed proposals; earlier
        // submission wins a tie, then listing order.
        let winner = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.tally.has_majority())
            .min_by_key(|(index, c)| (Reverse(c.tally.for_votes), c.submission_time, *index))
            .map(|(_, c)| c.proposal_id.clone());

        Ok(match winner {
            Some(winner) => Outcome::Passed { winner },
            None => Outcome::Rejected,
        })
    }

    /// Store an outcome. A finalized round keeps its first outcome.
    pub fn record_outcome(&mut self, outcome: Outcome, now: Timestamp) -> &Outcome {
        if self.outcome.is_none() {
            self.finalized_at = Some(now);
        }
        self.outcome.get_or_insert(outcome)
    }

    /// Resolve the round. Idempotent: later calls return the first outcome.
    pub fn finalize(&mut self, now: Timestamp) -> Result<Outcome, GovernanceError> {
        let outcome = self.evaluate(now)?;
        Ok(self.record_outcome(outcome, now).clone())
    }

    /// Snapshot of the counters at `now`.
    pub fn tally(&self, now: Timestamp) -> TallySnapshot {
        let mut for_votes = 0u64;
        let mut against_votes = 0u64;
        let mut abstain_votes = 0u64;

        for candidate in &self.candidates {
            for_votes += candidate.tally.for_votes;
            against_votes += candidate.tally.against_votes;
            abstain_votes += candidate.tally.abstain_votes;
        }

        TallySnapshot {
            round_id: self.id.clone(),
            phase: self.phase(now),
            for_votes,
            against_votes,
            abstain_votes,
            total: self.total_votes,
            support_percentage: support_percentage(for_votes, against_votes),
            participants: self.ballots.len() as u32,
            tokens_used: self.tokens_used,
            quorum_threshold: self.quorum_threshold,
            quorum_reached: self.total_votes >= self.quorum_threshold,
            proposals: self.candidates.iter().map(|c| c.tally.clone()).collect(),
            breakdown: DirectionBreakdown::collect(self.ballots.values()),
        }
    }

    /// Heaviest ballots first; earlier ballots win ties.
    pub fn top_voters(&self, limit: usize) -> Vec<&Ballot> {
        let mut ballots: Vec<&Ballot> = self.ballots.values().collect();
        ballots.sort_by(|a, b| {
            b.weight()
                .cmp(&a.weight())
                .then_with(|| a.cast_at().cmp(&b.cast_at()))
                .then_with(|| a.voter().cmp(b.voter()))
        });
        ballots.truncate(limit);
        ballots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> ProposalId {
        ProposalId::new(id)
    }

    fn voter(n: u32) -> AccountId {
        AccountId::new(format!("voter-{}", n))
    }

    fn round(quorum: u64) -> VotingRound {
        VotingRound::new(
            RoundId::new("round-1"),
            StoryId::new("story-1"),
            2,
            vec![(pid("p-1"), Timestamp::new(10)), (pid("p-2"), Timestamp::new(20))],
            Timestamp::new(100),
            Timestamp::new(200),
            quorum,
        )
        .unwrap()
    }

    #[test]
    fn test_round_creation_rules() {
        let empty = VotingRound::new(
            RoundId::new("r"), StoryId::new("s"), 1, vec![],
            Timestamp::new(0), Timestamp::new(10), 0,
        );
        assert!(matches!(empty, Err(GovernanceError::InvalidInput(_))));

        let dup = VotingRound::new(
            RoundId::new("r"), StoryId::new("s"), 1,
            vec![(pid("a"), Timestamp::EPOCH), (pid("a"), Timestamp::EPOCH)],
            Timestamp::new(0), Timestamp::new(10), 0,
        );
        assert!(dup.is_err());

        let backwards = VotingRound::new(
            RoundId::new("r"), StoryId::new("s"), 1,
            vec![(pid("a"), Timestamp::EPOCH)],
            Timestamp::new(10), Timestamp::new(10), 0,
        );
        assert!(backwards.is_err());
    }

    #[test]
    fn test_phases() {
        let r = round(0);
        assert_eq!(r.phase(Timestamp::new(99)), RoundPhase::Scheduled);
        assert_eq!(r.phase(Timestamp::new(100)), RoundPhase::Active);
        assert_eq!(r.phase(Timestamp::new(199)), RoundPhase::Active);
        assert_eq!(r.phase(Timestamp::new(200)), RoundPhase::Closed);
        assert_eq!(r.time_remaining(Timestamp::new(150)), 50);
        assert_eq!(r.time_remaining(Timestamp::new(250)), 0);
    }

    #[test]
    fn test_vote_outside_window() {
        let mut r = round(0);
        let early = r.cast_vote(Timestamp::new(50), &voter(1), &pid("p-1"), VoteDirection::For, 1, 10);
        assert!(matches!(early, Err(GovernanceError::RoundNotActive { .. })));

        let late = r.cast_vote(Timestamp::new(200), &voter(1), &pid("p-1"), VoteDirection::For, 1, 10);
        assert!(matches!(late, Err(GovernanceError::RoundClosed { .. })));
        assert_eq!(r.total_votes(), 0);
    }

    #[test]
    fn test_check_order() {
        let mut r = round(0);
        let now = Timestamp::new(150);

        // closed window beats a bad weight
        let err = r.cast_vote(Timestamp::new(300), &voter(1), &pid("p-1"), VoteDirection::For, 0, 0);
        assert!(matches!(err, Err(GovernanceError::RoundClosed { .. })));

        // bad weight beats an unknown proposal
        let err = r.cast_vote(now, &voter(1), &pid("nope"), VoteDirection::For, 0, 0);
        assert!(matches!(err, Err(GovernanceError::InvalidInput(_))));

        let err = r.cast_vote(now, &voter(1), &pid("nope"), VoteDirection::For, 1, 0);
        assert!(matches!(err, Err(GovernanceError::UnknownProposal(_))));

        r.cast_vote(now, &voter(1), &pid("p-1"), VoteDirection::For, 2, 4).unwrap();

        // already voted beats insufficient balance
        let err = r.cast_vote(now, &voter(1), &pid("p-2"), VoteDirection::For, 50, 0);
        assert!(matches!(err, Err(GovernanceError::AlreadyVoted { .. })));
    }

    #[test]
    fn test_insufficient_balance() {
        let mut r = round(0);
        let err = r
            .cast_vote(Timestamp::new(150), &voter(1), &pid("p-1"), VoteDirection::For, 11, 100)
            .unwrap_err();
        assert_eq!(err, GovernanceError::InsufficientBalance { cost: 121, available: 100 });

        let ballot = r
            .cast_vote(Timestamp::new(150), &voter(1), &pid("p-1"), VoteDirection::For, 10, 100)
            .unwrap();
        assert_eq!(ballot.tokens_used(), 100);
    }

    #[test]
    fn test_abstain_counts_toward_total_only() {
        let mut r = round(0);
        let now = Timestamp::new(150);
        r.cast_vote(now, &voter(1), &pid("p-1"), VoteDirection::Abstain, 3, 9).unwrap();
        r.cast_vote(now, &voter(2), &pid("p-1"), VoteDirection::For, 2, 4).unwrap();

        let tally = r.tally(now);
        assert_eq!(tally.total, 5);
        assert_eq!(tally.for_votes, 2);
        assert_eq!(tally.against_votes, 0);
        assert_eq!(tally.abstain_votes, 3);
        assert_eq!(tally.support_percentage, 100.0);
        assert_eq!(tally.participants, 2);
        assert_eq!(tally.tokens_used, 13);
    }

    #[test]
    fn test_finalize_requires_closed() {
        let mut r = round(0);
        let err = r.finalize(Timestamp::new(150)).unwrap_err();
        assert!(matches!(err, GovernanceError::RoundNotClosed { .. }));
        assert!(!r.is_finalized());
    }

    #[test]
    fn test_finalize_expired_below_quorum() {
        let mut r = round(10);
        r.cast_vote(Timestamp::new(150), &voter(1), &pid("p-1"), VoteDirection::For, 9, 81).unwrap();
        assert_eq!(r.finalize(Timestamp::new(200)).unwrap(), Outcome::Expired);
        assert_eq!(r.winning_proposal(), None);
        assert_eq!(r.phase(Timestamp::new(300)), RoundPhase::Finalized);
    }

    #[test]
    fn test_finalize_picks_highest_majority() {
        let mut r = round(0);
        let now = Timestamp::new(150);
        r.cast_vote(now, &voter(1), &pid("p-1"), VoteDirection::For, 5, 25).unwrap();
        r.cast_vote(now, &voter(2), &pid("p-2"), VoteDirection::For, 8, 64).unwrap();
        r.cast_vote(now, &voter(3), &pid("p-2"), VoteDirection::Against, 2, 4).unwrap();

        let outcome = r.finalize(Timestamp::new(200)).unwrap();
        assert_eq!(outcome, Outcome::Passed { winner: pid("p-2") });
        assert_eq!(outcome.status_for(&pid("p-2")), ProposalStatus::Passed);
        assert_eq!(outcome.status_for(&pid("p-1")), ProposalStatus::Rejected);
    }

    #[test]
    fn test_tie_goes_to_earlier_submission() {
        let mut r = VotingRound::new(
            RoundId::new("r"),
            StoryId::new("s"),
            1,
            vec![(pid("late"), Timestamp::new(50)), (pid("early"), Timestamp::new(5))],
            Timestamp::new(100),
            Timestamp::new(200),
            0,
        )
        .unwrap();
        let now = Timestamp::new(120);
        r.cast_vote(now, &voter(1), &pid("late"), VoteDirection::For, 4, 16).unwrap();
        r.cast_vote(now, &voter(2), &pid("early"), VoteDirection::For, 4, 16).unwrap();

        assert_eq!(
            r.finalize(Timestamp::new(200)).unwrap(),
            Outcome::Passed { winner: pid("early") }
        );
    }

    #[test]
    fn test_no_majority_is_rejected() {
        let mut r = round(0);
        let now = Timestamp::new(150);
        r.cast_vote(now, &voter(1), &pid("p-1"), VoteDirection::For, 3, 9).unwrap();
        r.cast_vote(now, &voter(2), &pid("p-1"), VoteDirection::Against, 3, 9).unwrap();

        assert_eq!(r.finalize(Timestamp::new(200)).unwrap(), Outcome::Rejected);
        assert_eq!(Outcome::Rejected.status_for(&pid("p-1")), ProposalStatus::Rejected);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut r = round(0);
        r.cast_vote(Timestamp::new(150), &voter(1), &pid("p-1"), VoteDirection::For, 1, 1).unwrap();
        let first = r.finalize(Timestamp::new(200)).unwrap();
        let second = r.finalize(Timestamp::new(900)).unwrap();
        assert_eq!(first, second);
        assert_eq!(r.finalized_at(), Some(Timestamp::new(200)));
    }

    #[test]
    fn test_close_early() {
        let mut r = round(0);
        assert!(r.close_early(Timestamp::new(100)).is_err());
        r.close_early(Timestamp::new(130)).unwrap();
        assert_eq!(r.end_time(), Timestamp::new(130));
        assert_eq!(r.phase(Timestamp::new(130)), RoundPhase::Closed);
        assert!(r.finalize(Timestamp::new(130)).is_ok());
        assert!(r.close_early(Timestamp::new(131)).is_err());
    }

    #[test]
    fn test_apply_ballot_rejects_foreign_round() {
        let mut a = round(0);
        let mut b = VotingRound::new(
            RoundId::new("round-2"), StoryId::new("story-1"), 2,
            vec![(pid("p-1"), Timestamp::EPOCH)],
            Timestamp::new(100), Timestamp::new(200), 0,
        )
        .unwrap();
        let ballot = b
            .cast_vote(Timestamp::new(150), &voter(1), &pid("p-1"), VoteDirection::For, 1, 1)
            .unwrap();
        assert!(a.apply_ballot(ballot).is_err());
    }

    #[test]
    fn test_oversized_vote_refused_before_counting() {
        let mut r = round(0);
        let now = Timestamp::new(150);
        let first = r
            .cast_vote(now, &voter(1), &pid("p-1"), VoteDirection::For, u64::MAX, TokenAmount::MAX)
            .unwrap();
        assert_eq!(r.tokens_used(), first.tokens_used());

        let err = r
            .prepare_ballot(now, &voter(2), &pid("p-2"), VoteDirection::Against, u64::MAX, TokenAmount::MAX)
            .unwrap_err();
        assert_eq!(err, GovernanceError::TallyOverflow { round_id: RoundId::new("round-1") });

        // a weight that still fits the tokens but not the vote total
        let err = r
            .prepare_ballot(now, &voter(2), &pid("p-2"), VoteDirection::Against, 1, TokenAmount::MAX)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::TallyOverflow { .. }));

        assert!(!r.has_voted(&voter(2)));
        assert_eq!(r.total_votes(), u64::MAX);
        let tally = r.tally(now);
        assert_eq!(tally.for_votes, u64::MAX);
        assert_eq!(tally.tokens_used, first.tokens_used());
    }

    #[test]
    fn test_apply_rechecks_totals() {
        let mut a = round(0);
        let mut b = round(0);
        let now = Timestamp::new(150);
        a.cast_vote(now, &voter(1), &pid("p-1"), VoteDirection::For, u64::MAX, TokenAmount::MAX).unwrap();
        let ballot = b
            .cast_vote(now, &voter(2), &pid("p-2"), VoteDirection::For, u64::MAX, TokenAmount::MAX)
            .unwrap();

        assert!(matches!(a.apply_ballot(ballot), Err(GovernanceError::TallyOverflow { .. })));
        assert_eq!(a.candidates()[1].tally.voters, 0);
        assert!(!a.has_voted(&voter(2)));
    }

    #[test]
    fn test_top_voters() {
        let mut r = round(0);
        r.cast_vote(Timestamp::new(110), &voter(1), &pid("p-1"), VoteDirection::For, 2, 4).unwrap();
        r.cast_vote(Timestamp::new(120), &voter(2), &pid("p-1"), VoteDirection::Against, 5, 25).unwrap();
        r.cast_vote(Timestamp::new(130), &voter(3), &pid("p-2"), VoteDirection::For, 5, 25).unwrap();

        let top = r.top_voters(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].voter(), &voter(2));
        assert_eq!(top[1].voter(), &voter(3));
    }
}
