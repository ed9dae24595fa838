//! Scenario files.
//!
//! A scenario seeds balances and proposals, opens rounds, then replays timed
//! steps against a manual clock. Engine errors during steps are part of the
//! report; setup errors abort the run.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use fabula_governance::{
    Ballot, GovernanceConfig, ManualClock, MemoryLedger, MemoryProposalStore, Outcome, Proposal,
    ProposalKind, ProposalStatus, RoundSpec, TallySnapshot, VoteRequest, VotingEngine, VotingPower,
};
use fabula_types::{AccountId, ProposalId, RoundId, StoryId, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A scenario as written in TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Overrides the configured policy when present
    pub governance: Option<GovernanceConfig>,
    /// Starting clock value
    pub start_at: u64,
    /// TOML integers are 64-bit; amounts widen on the way in
    pub balances: BTreeMap<String, u64>,
    pub proposals: Vec<ProposalEntry>,
    pub rounds: Vec<RoundSpec>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalEntry {
    pub id: ProposalId,
    pub story: StoryId,
    pub chapter: u32,
    pub author: AccountId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub kind: ProposalKind,
    pub submitted_at: u64,
    /// Start in `draft` instead of `submitted`
    #[serde(default)]
    pub draft: bool,
}

impl ProposalEntry {
    fn to_proposal(&self) -> anyhow::Result<Proposal> {
        let proposal = Proposal::new(
            self.id.clone(),
            self.story.clone(),
            self.chapter,
            self.author.clone(),
            self.title.clone(),
            self.content.clone(),
            Timestamp::new(self.submitted_at),
        )?
        .with_kind(self.kind);

        Ok(if self.draft { proposal.into_draft() } else { proposal })
    }
}

/// One timed step.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Clock value when the step runs
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Vote {
        round: RoundId,
        proposal: ProposalId,
        voter: AccountId,
        direction: String,
        weight: i64,
        #[serde(default)]
        tokens: Option<u64>,
    },
    Tally { round: RoundId },
    Resolve { round: RoundId },
    CloseEarly { round: RoundId },
    Implement { round: RoundId },
    Power { voter: AccountId },
}

impl Action {
    fn describe(&self) -> String {
        match self {
            Action::Vote { round, proposal, voter, direction, weight, .. } => {
                format!("vote {} {} {} x{} in {}", voter, direction, proposal, weight, round)
            }
            Action::Tally { round } => format!("tally {}", round),
            Action::Resolve { round } => format!("resolve {}", round),
            Action::CloseEarly { round } => format!("close {} early", round),
            Action::Implement { round } => format!("implement {}", round),
            Action::Power { voter } => format!("power of {}", voter),
        }
    }
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepResult {
    Ballot { ballot: Ballot },
    Tally { tally: TallySnapshot, remaining_secs: u64 },
    Outcome { round: RoundId, outcome: Outcome },
    Closed { round: RoundId },
    Implemented { proposal: ProposalId },
    Power { voter: AccountId, power: VotingPower },
    Failed { error: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub at: Timestamp,
    pub step: String,
    pub result: StepResult,
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
    /// Final status of every proposal, by id
    pub proposals: BTreeMap<ProposalId, ProposalStatus>,
}

impl ScenarioReport {
    /// Number of steps the engine refused.
    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.result, StepResult::Failed { .. }))
            .count()
    }
}

type ScenarioEngine = VotingEngine<Arc<MemoryLedger>, Arc<MemoryProposalStore>, Arc<ManualClock>>;

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scenario '{}': {}", path.display(), e))?;
        Self::from_toml(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario '{}': {}", path.display(), e))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = toml::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Steps must be listed in time order.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut last = self.start_at;
        for (index, step) in self.steps.iter().enumerate() {
            if step.at < last {
                anyhow::bail!(
                    "Step {} runs at {} which is before the previous step at {}",
                    index + 1,
                    step.at,
                    last
                );
            }
            last = step.at;
        }
        Ok(())
    }

    /// Run the scenario. `config` applies unless the scenario names its own.
    pub fn run(&self, config: &GovernanceConfig) -> anyhow::Result<ScenarioReport> {
        let config = self.governance.clone().unwrap_or_else(|| config.clone());

        let ledger = Arc::new(MemoryLedger::with_balances(
            self.balances
                .iter()
                .map(|(account, balance)| (AccountId::new(account.as_str()), TokenAmount::from(*balance))),
        ));
        let store = Arc::new(MemoryProposalStore::new());
        for entry in &self.proposals {
            store.insert(entry.to_proposal()?);
        }
        let clock = Arc::new(ManualClock::new(self.start_at));

        let engine = VotingEngine::with_config(ledger, Arc::clone(&store), Arc::clone(&clock), config)?;
        for spec in &self.rounds {
            engine.open_round(spec.clone())?;
        }

        info!(
            rounds = self.rounds.len(),
            proposals = self.proposals.len(),
            steps = self.steps.len(),
            "Running scenario"
        );

        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            clock.set(step.at);
            debug!(at = step.at, step = %step.action.describe(), "Scenario step");
            let result = Self::apply(&engine, &clock, &step.action);
            steps.push(StepReport {
                at: Timestamp::new(step.at),
                step: step.action.describe(),
                result,
            });
        }

        let proposals = store
            .all()
            .into_iter()
            .map(|p| (p.id, p.status))
            .collect();

        Ok(ScenarioReport { steps, proposals })
    }

    fn apply(engine: &ScenarioEngine, clock: &ManualClock, action: &Action) -> StepResult {
        use fabula_governance::Clock;

        let outcome = match action {
            Action::Vote { round, proposal, voter, direction, weight, tokens } => {
                let request = VoteRequest {
                    round_id: round.clone(),
                    proposal_id: proposal.clone(),
                    voter: voter.clone(),
                    direction: direction.clone(),
                    weight: *weight,
                    tokens_to_use: tokens.map(TokenAmount::from),
                };
                engine.submit_request(&request).map(|ballot| StepResult::Ballot { ballot })
            }
            Action::Tally { round } => engine.tally(round).and_then(|tally| {
                let remaining_secs = engine.round(round)?.time_remaining(clock.now());
                Ok(StepResult::Tally { tally, remaining_secs })
            }),
            Action::Resolve { round } => engine.resolve(round).map(|outcome| StepResult::Outcome {
                round: round.clone(),
                outcome,
            }),
            Action::CloseEarly { round } => engine
                .close_early(round)
                .map(|()| StepResult::Closed { round: round.clone() }),
            Action::Implement { round } => engine
                .implement(round)
                .map(|proposal| StepResult::Implemented { proposal }),
            Action::Power { voter } => engine.voting_power(voter).map(|power| StepResult::Power {
                voter: voter.clone(),
                power,
            }),
        };

        outcome.unwrap_or_else(|e| StepResult::Failed {
            message: e.user_message(),
            error: e.to_string(),
        })
    }
}
