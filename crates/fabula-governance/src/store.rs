//! Proposal persistence.

use std::collections::HashMap;
use fabula_types::ProposalId;
use parking_lot::RwLock;
use crate::ballot::Ballot;
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalStatus};

/// Owner of proposal records.
///
/// The engine reads proposals when opening rounds, writes terminal statuses
/// when resolving, and hands every accepted ballot to `record_ballot` before
/// applying it. A failing `record_ballot` leaves the round untouched.
pub trait ProposalStore: Send + Sync {
    fn proposal(&self, id: &ProposalId) -> Result<Proposal, GovernanceError>;

    fn set_status(&self, id: &ProposalId, status: ProposalStatus) -> Result<(), GovernanceError>;

    fn record_ballot(&self, _ballot: &Ballot) -> Result<(), GovernanceError> {
        Ok(())
    }
}

impl<T: ProposalStore + ?Sized> ProposalStore for std::sync::Arc<T> {
    fn proposal(&self, id: &ProposalId) -> Result<Proposal, GovernanceError> {
        (**self).proposal(id)
    }

    fn set_status(&self, id: &ProposalId, status: ProposalStatus) -> Result<(), GovernanceError> {
        (**self).set_status(id, status)
    }

    fn record_ballot(&self, ballot: &Ballot) -> Result<(), GovernanceError> {
        (**self).record_ballot(ballot)
    }
}

/// In-memory proposal store that also keeps the ballot log.
#[derive(Debug, Default)]
pub struct MemoryProposalStore {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    ballots: RwLock<Vec<Ballot>>,
}

impl MemoryProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a proposal.
    pub fn insert(&self, proposal: Proposal) {
        self.proposals.write().insert(proposal.id.clone(), proposal);
    }

    /// Get all proposals.
    pub fn all(&self) -> Vec<Proposal> {
        self.proposals.read().values().cloned().collect()
    }

    /// Get proposals by status.
    pub fn by_status(&self, status: ProposalStatus) -> Vec<Proposal> {
        self.proposals
            .read()
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect()
    }

    /// Ballots recorded so far, in commit order.
    pub fn ballots(&self) -> Vec<Ballot> {
        self.ballots.read().clone()
    }
}

impl ProposalStore for MemoryProposalStore {
    fn proposal(&self, id: &ProposalId) -> Result<Proposal, GovernanceError> {
        self.proposals
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| GovernanceError::UnknownProposal(id.clone()))
    }

    fn set_status(&self, id: &ProposalId, status: ProposalStatus) -> Result<(), GovernanceError> {
        let mut proposals = self.proposals.write();
        let proposal = proposals
            .get_mut(id)
            .ok_or_else(|| GovernanceError::UnknownProposal(id.clone()))?;
        proposal.status = status;
        Ok(())
    }

    fn record_ballot(&self, ballot: &Ballot) -> Result<(), GovernanceError> {
        self.ballots.write().push(ballot.clone());
        Ok(())
    }
}
