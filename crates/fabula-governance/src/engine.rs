//! Voting engine.
//!
//! The single entry point for the API layer. The engine owns every round and
//! every ballot; proposal records stay with the [`ProposalStore`].
//!
//! Locking: each round sits behind its own `RwLock`, so votes on one round are
//! serialized while tallies and other rounds proceed. A voter's token
//! commitments are locked after the round lock and never the other way round.

use std::collections::HashMap;
use std::sync::Arc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fabula_types::{AccountId, ProposalId, RoundId, StoryId, Timestamp, TokenAmount};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::ballot::{Ballot, VoteDirection, VoteRequest};
use crate::clock::Clock;
use crate::error::GovernanceError;
use crate::ledger::BalanceLedger;
use crate::policy::GovernanceConfig;
use crate::power::VotingPower;
use crate::proposal::ProposalStatus;
use crate::round::{Outcome, RoundPhase, VotingRound};
use crate::store::ProposalStore;
use crate::tally::TallySnapshot;

/// Parameters for opening a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSpec {
    pub id: RoundId,
    pub story_id: StoryId,
    pub chapter_number: u32,
    /// Competing proposals, in display order
    pub proposal_ids: Vec<ProposalId>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Falls back to the configured default quorum
    #[serde(default)]
    pub quorum_threshold: Option<u64>,
}

type RoundHandle = Arc<RwLock<VotingRound>>;

/// Quadratic voting engine.
pub struct VotingEngine<L, S, C> {
    ledger: L,
    store: S,
    clock: C,
    config: GovernanceConfig,
    rounds: DashMap<RoundId, RoundHandle>,
    /// proposal -> round it is competing in
    assignments: DashMap<ProposalId, RoundId>,
    /// voter -> tokens committed per round
    commitments: DashMap<AccountId, HashMap<RoundId, TokenAmount>>,
}

impl<L, S, C> VotingEngine<L, S, C>
where
    L: BalanceLedger,
    S: ProposalStore,
    C: Clock,
{
    /// Create an engine with the default configuration.
    pub fn new(ledger: L, store: S, clock: C) -> Self {
        Self {
            ledger,
            store,
            clock,
            config: GovernanceConfig::default(),
            rounds: DashMap::new(),
            assignments: DashMap::new(),
            commitments: DashMap::new(),
        }
    }

    /// Create an engine with a validated configuration.
    pub fn with_config(
        ledger: L,
        store: S,
        clock: C,
        config: GovernanceConfig,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        let mut engine = Self::new(ledger, store, clock);
        engine.config = config;
        Ok(engine)
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn round_handle(&self, round_id: &RoundId) -> Result<RoundHandle, GovernanceError> {
        self.rounds
            .get(round_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GovernanceError::UnknownRound(round_id.clone()))
    }

    fn locked_tokens(&self, voter: &AccountId) -> TokenAmount {
        self.commitments
            .get(voter)
            .map(|locks| locks.values().sum())
            .unwrap_or(0)
    }

    /// Open a round for a chapter slot.
    ///
    /// Every proposal must exist, target the round's story and chapter, be in
    /// `draft` or `submitted`, and not compete in another round. On success the
    /// proposals move to `active`.
    pub fn open_round(&self, spec: RoundSpec) -> Result<VotingRound, GovernanceError> {
        if self.rounds.contains_key(&spec.id) {
            return Err(GovernanceError::DuplicateRound(spec.id));
        }

        self.config.check_window(spec.start_time, spec.end_time)?;

        if spec.proposal_ids.len() > self.config.max_proposals_per_round {
            return Err(GovernanceError::InvalidInput(format!(
                "Round {} lists {} proposals, limit is {}",
                spec.id,
                spec.proposal_ids.len(),
                self.config.max_proposals_per_round
            )));
        }

        let mut candidates = Vec::with_capacity(spec.proposal_ids.len());
        let mut previous = Vec::with_capacity(spec.proposal_ids.len());
        for proposal_id in &spec.proposal_ids {
            let proposal = self.store.proposal(proposal_id)?;

            if !proposal.targets(&spec.story_id, spec.chapter_number) {
                return Err(GovernanceError::InvalidInput(format!(
                    "Proposal {} targets {} chapter {}, not {} chapter {}",
                    proposal_id,
                    proposal.story_id,
                    proposal.chapter_number,
                    spec.story_id,
                    spec.chapter_number
                )));
            }

            if !proposal.status.can_enter_round() {
                return Err(GovernanceError::InvalidInput(format!(
                    "Proposal {} is {} and cannot enter a round",
                    proposal_id, proposal.status
                )));
            }

            candidates.push((proposal_id.clone(), proposal.submission_time));
            previous.push(proposal.status);
        }

        let quorum = spec.quorum_threshold.unwrap_or(self.config.default_quorum);
        let round = VotingRound::new(
            spec.id.clone(),
            spec.story_id,
            spec.chapter_number,
            candidates,
            spec.start_time,
            spec.end_time,
            quorum,
        )?;

        self.claim_proposals(&spec.id, &spec.proposal_ids)?;

        match self.rounds.entry(spec.id.clone()) {
            Entry::Occupied(_) => {
                self.release_proposals(&spec.proposal_ids);
                return Err(GovernanceError::DuplicateRound(spec.id));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(RwLock::new(round.clone())));
            }
        }

        for (index, proposal_id) in spec.proposal_ids.iter().enumerate() {
            if let Err(e) = self.store.set_status(proposal_id, ProposalStatus::Active) {
                warn!("Could not activate proposal {} for round {}: {}", proposal_id, spec.id, e);
                self.restore_statuses(&spec.proposal_ids[..index], &previous[..index]);
                self.rounds.remove(&spec.id);
                self.release_proposals(&spec.proposal_ids);
                return Err(e);
            }
        }

        info!(
            round = %spec.id,
            proposals = spec.proposal_ids.len(),
            quorum,
            start = %spec.start_time,
            end = %spec.end_time,
            "Voting round opened"
        );

        Ok(round)
    }

    /// Put back the statuses proposals had before a failed `open_round`.
    fn restore_statuses(&self, proposal_ids: &[ProposalId], statuses: &[ProposalStatus]) {
        for (proposal_id, status) in proposal_ids.iter().zip(statuses) {
            if let Err(e) = self.store.set_status(proposal_id, *status) {
                warn!("Could not restore proposal {} to {}: {}", proposal_id, status, e);
            }
        }
    }

    fn claim_proposals(&self, round_id: &RoundId, proposal_ids: &[ProposalId]) -> Result<(), GovernanceError> {
        for (index, proposal_id) in proposal_ids.iter().enumerate() {
            match self.assignments.entry(proposal_id.clone()) {
                Entry::Occupied(existing) => {
                    let other = existing.get().clone();
                    drop(existing);
                    self.release_proposals(&proposal_ids[..index]);
                    return Err(GovernanceError::InvalidInput(format!(
                        "Proposal {} already competes in round {}",
                        proposal_id, other
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(round_id.clone());
                }
            }
        }
        Ok(())
    }

    fn release_proposals(&self, proposal_ids: &[ProposalId]) {
        for proposal_id in proposal_ids {
            self.assignments.remove(proposal_id);
        }
    }

    /// Voting power of `voter`: ledger balance minus open commitments.
    pub fn voting_power(&self, voter: &AccountId) -> Result<VotingPower, GovernanceError> {
        let balance = self.ledger.balance_of(voter)?;
        Ok(VotingPower::compute(balance, self.locked_tokens(voter)))
    }

    /// Cast a vote.
    pub fn submit_vote(
        &self,
        round_id: &RoundId,
        proposal_id: &ProposalId,
        voter: &AccountId,
        direction: VoteDirection,
        weight: u64,
    ) -> Result<Ballot, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let now = self.clock.now();
        // A closed round must be reported before any ledger failure. The
        // window is checked again under the write lock.
        handle.read().ensure_active(now)?;

        let balance = self.ledger.balance_of(voter)?;
        let mut round = handle.write();
        self.commit_vote(&mut round, now, voter, proposal_id, direction, weight, balance)
    }

    /// Cast a vote from an unvalidated API request.
    ///
    /// Checks run in order: round active, direction, weight, declared cost,
    /// proposal, one ballot per voter, balance.
    pub fn submit_request(&self, request: &VoteRequest) -> Result<Ballot, GovernanceError> {
        let handle = self.round_handle(&request.round_id)?;
        let now = self.clock.now();
        // Window first, then the request's own fields.
        handle.read().ensure_active(now)?;

        let (direction, weight) = request.validate()?;

        let balance = self.ledger.balance_of(&request.voter)?;
        let mut round = handle.write();
        self.commit_vote(
            &mut round,
            now,
            &request.voter,
            &request.proposal_id,
            direction,
            weight.get(),
            balance,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_vote(
        &self,
        round: &mut VotingRound,
        now: Timestamp,
        voter: &AccountId,
        proposal_id: &ProposalId,
        direction: VoteDirection,
        weight: u64,
        balance: TokenAmount,
    ) -> Result<Ballot, GovernanceError> {
        let result = {
            let mut locks = self.commitments.entry(voter.clone()).or_default();
            self.commit_locked(round, &mut locks, now, voter, proposal_id, direction, weight, balance)
        };

        match &result {
            Ok(ballot) => info!(
                round = %ballot.round_id(),
                proposal = %ballot.proposal_id(),
                voter = %ballot.voter(),
                direction = %ballot.direction(),
                weight = ballot.weight(),
                tokens = %ballot.tokens_used(),
                "Vote recorded"
            ),
            Err(e) => {
                self.commitments.remove_if(voter, |_, locks| locks.is_empty());
                debug!(round = %round.id(), voter = %voter, "Vote rejected: {}", e);
            }
        }

        result
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_locked(
        &self,
        round: &mut VotingRound,
        locks: &mut HashMap<RoundId, TokenAmount>,
        now: Timestamp,
        voter: &AccountId,
        proposal_id: &ProposalId,
        direction: VoteDirection,
        weight: u64,
        balance: TokenAmount,
    ) -> Result<Ballot, GovernanceError> {
        let locked: TokenAmount = locks
            .iter()
            .filter(|(id, _)| *id != round.id())
            .map(|(_, amount)| *amount)
            .sum();
        let available = balance.saturating_sub(locked);

        let ballot = round.prepare_ballot(now, voter, proposal_id, direction, weight, available)?;
        self.store.record_ballot(&ballot)?;
        round.apply_ballot(ballot.clone())?;
        locks.insert(round.id().clone(), ballot.tokens_used());

        Ok(ballot)
    }

    /// Live counters for a round. Never blocks on other rounds.
    pub fn tally(&self, round_id: &RoundId) -> Result<TallySnapshot, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let now = self.clock.now();
        let round = handle.read();
        Ok(round.tally(now))
    }

    /// Finalize a closed round and push terminal statuses to its proposals.
    ///
    /// Idempotent. If a status write fails the round stays unfinalized so the
    /// call can be retried.
    pub fn resolve(&self, round_id: &RoundId) -> Result<Outcome, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let now = self.clock.now();
        let mut round = handle.write();

        if let Some(outcome) = round.outcome() {
            return Ok(outcome.clone());
        }

        let outcome = round.evaluate(now)?;

        let proposal_ids: Vec<ProposalId> = round.proposal_ids().cloned().collect();
        for proposal_id in &proposal_ids {
            let status = outcome.status_for(proposal_id);
            if let Err(e) = self.store.set_status(proposal_id, status) {
                warn!("Could not mark proposal {} {} in round {}: {}", proposal_id, status, round_id, e);
                return Err(e);
            }
        }

        round.record_outcome(outcome.clone(), now);
        self.release_commitments(&round, &outcome);
        self.release_proposals(&proposal_ids);

        info!(
            round = %round_id,
            total_votes = round.total_votes(),
            quorum = round.quorum_threshold(),
            outcome = ?outcome,
            "Voting round resolved"
        );

        Ok(outcome)
    }

    fn release_commitments(&self, round: &VotingRound, outcome: &Outcome) {
        let policy = self.config.release_policy;
        for ballot in round.ballots() {
            let backed_winner = outcome.winner().is_some_and(|w| ballot.supports(w));
            if !policy.releases(backed_winner) {
                continue;
            }

            let emptied = match self.commitments.get_mut(ballot.voter()) {
                Some(mut locks) => {
                    locks.remove(round.id());
                    locks.is_empty()
                }
                None => false,
            };
            if emptied {
                self.commitments.remove_if(ballot.voter(), |_, locks| locks.is_empty());
            }

            debug!(
                round = %round.id(),
                voter = %ballot.voter(),
                tokens = %ballot.tokens_used(),
                "Commitment released"
            );
        }
    }

    /// Whether `voter` has a ballot in the round.
    pub fn has_voted(&self, round_id: &RoundId, voter: &AccountId) -> Result<bool, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let round = handle.read();
        Ok(round.has_voted(voter))
    }

    /// The voter's ballot in the round, if any.
    pub fn ballot(&self, round_id: &RoundId, voter: &AccountId) -> Result<Option<Ballot>, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let round = handle.read();
        Ok(round.ballot(voter).cloned())
    }

    /// All ballots a voter has cast, oldest first.
    pub fn ballots_by_voter(&self, voter: &AccountId) -> Vec<Ballot> {
        let handles: Vec<RoundHandle> = self
            .rounds
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut ballots: Vec<Ballot> = handles
            .iter()
            .filter_map(|handle| handle.read().ballot(voter).cloned())
            .collect();
        ballots.sort_by(|a, b| {
            a.cast_at()
                .cmp(&b.cast_at())
                .then_with(|| a.round_id().cmp(b.round_id()))
        });
        ballots
    }

    /// Heaviest ballots of a round.
    pub fn top_voters(&self, round_id: &RoundId, limit: usize) -> Result<Vec<Ballot>, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let round = handle.read();
        Ok(round.top_voters(limit).into_iter().cloned().collect())
    }

    /// Snapshot of a round.
    pub fn round(&self, round_id: &RoundId) -> Result<VotingRound, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let round = handle.read();
        Ok(round.clone())
    }

    /// Phase of a round at the current time.
    pub fn round_phase(&self, round_id: &RoundId) -> Result<RoundPhase, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let now = self.clock.now();
        let phase = handle.read().phase(now);
        Ok(phase)
    }

    /// Ids of all known rounds, sorted.
    pub fn round_ids(&self) -> Vec<RoundId> {
        let mut ids: Vec<RoundId> = self.rounds.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// End an active round now so it can be resolved.
    pub fn close_early(&self, round_id: &RoundId) -> Result<(), GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let now = self.clock.now();
        handle.write().close_early(now)?;
        info!(round = %round_id, at = %now, "Voting round closed early");
        Ok(())
    }

    /// Publish the winner of a passed round as the canonical chapter.
    pub fn implement(&self, round_id: &RoundId) -> Result<ProposalId, GovernanceError> {
        let handle = self.round_handle(round_id)?;
        let round = handle.read();

        let winner = match round.outcome() {
            Some(Outcome::Passed { winner }) => winner.clone(),
            Some(outcome) => {
                return Err(GovernanceError::InvalidInput(format!(
                    "Round {} ended {:?} without a winner",
                    round_id, outcome
                )));
            }
            None => {
                return Err(GovernanceError::InvalidInput(format!(
                    "Round {} is not resolved",
                    round_id
                )));
            }
        };

        let proposal = self.store.proposal(&winner)?;
        match proposal.status {
            ProposalStatus::Implemented => {}
            ProposalStatus::Passed => {
                self.store.set_status(&winner, ProposalStatus::Implemented)?;
                info!(round = %round_id, proposal = %winner, "Proposal implemented");
            }
            other => {
                return Err(GovernanceError::InvalidInput(format!(
                    "Proposal {} is {}, expected passed",
                    winner, other
                )));
            }
        }

        Ok(winner)
    }
}
