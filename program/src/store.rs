use std::collections::BTreeSet;

use crate::{
    error::{CommitteeError, CommitteeResult},
    journal::{Journal, JournalEntry},
    state::{Action, Proposal, ProposalStatus},
};

/// Ids of proposals that are still Pending.
#[derive(Debug, Default, Clone)]
pub struct PendingIndex {
    ids: BTreeSet<u64>,
}

impl PendingIndex {
    fn insert(&mut self, id: u64) -> bool {
        self.ids.insert(id)
    }

    fn remove(&mut self, id: u64) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Ascending order.
    pub fn ids(&self) -> Vec<u64> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Owning storage for all proposals of one committee.
///
/// Ids are dense indices into `proposals`. Status changes go through
/// [`ProposalStore::finalize`], which keeps the pending index in step.
#[derive(Debug, Default)]
pub struct ProposalStore {
    proposals: Vec<Proposal>,
    pending: PendingIndex,
}

impl ProposalStore {
    pub fn len(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn get(&self, id: u64) -> CommitteeResult<&Proposal> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.proposals.get(index))
            .ok_or(CommitteeError::NotFound)
    }

    fn get_mut(&mut self, id: u64) -> CommitteeResult<&mut Proposal> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.proposals.get_mut(index))
            .ok_or(CommitteeError::NotFound)
    }

    /// Fails `NotFound` or `InvalidState` unless the proposal is Pending.
    pub fn pending(&self, id: u64) -> CommitteeResult<&Proposal> {
        let proposal = self.get(id)?;
        if !proposal.is_pending() {
            return Err(CommitteeError::InvalidState);
        }
        Ok(proposal)
    }

    pub fn has_confirmed(&self, id: u64, slot: u8) -> CommitteeResult<bool> {
        Ok(self.get(id)?.confirmations.contains(slot))
    }

    pub fn pending_index(&self) -> &PendingIndex {
        &self.pending
    }

    pub(crate) fn append(&mut self, journal: &mut Journal, action: Action) -> u64 {
        let id = self.len();
        self.proposals.push(Proposal::new(id, action));
        self.pending.insert(id);
        journal.record(JournalEntry::Appended { id });
        id
    }

    /// Records `slot`'s confirmation and returns the new count.
    pub(crate) fn confirm(
        &mut self,
        journal: &mut Journal,
        id: u64,
        slot: u8,
    ) -> CommitteeResult<usize> {
        let proposal = self.get_mut(id)?;
        if !proposal.is_pending() {
            return Err(CommitteeError::InvalidState);
        }
        if !proposal.confirmations.insert(slot) {
            return Err(CommitteeError::AlreadyConfirmed);
        }
        let count = proposal.confirmation_count();
        journal.record(JournalEntry::Confirmed { id, slot });
        Ok(count)
    }

    /// Moves a Pending proposal into the terminal `status`.
    pub(crate) fn finalize(
        &mut self,
        journal: &mut Journal,
        id: u64,
        status: ProposalStatus,
    ) -> CommitteeResult<()> {
        debug_assert!(status.is_terminal());
        let proposal = self.get_mut(id)?;
        if !proposal.is_pending() {
            return Err(CommitteeError::InvalidState);
        }
        let prior = proposal.status;
        proposal.status = status;
        self.pending.remove(id);
        journal.record(JournalEntry::Finalized { id, prior });
        Ok(())
    }

    pub(crate) fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Appended { id } => {
                debug_assert_eq!(id + 1, self.len());
                self.proposals.pop();
                self.pending.remove(id);
            }
            JournalEntry::Confirmed { id, slot } => {
                if let Ok(proposal) = self.get_mut(id) {
                    proposal.confirmations.remove(slot);
                }
            }
            JournalEntry::Finalized { id, prior } => {
                if let Ok(proposal) = self.get_mut(id) {
                    proposal.status = prior;
                    if prior == ProposalStatus::Pending {
                        self.pending.insert(id);
                    }
                }
            }
        }
    }
}
