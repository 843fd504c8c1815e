//! Rollback log for in-flight operations.
//!
//! Every mutation of the proposal store is recorded together with enough
//! information to undo it. Operations open a frame with [`Journal::begin`];
//! frames nest when the external executor re-enters the committee. A nested
//! frame that commits leaves its entries in place so the enclosing frame can
//! still discard them.

use crate::{event::CommitteeEvent, state::ProposalStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JournalEntry {
    Appended { id: u64 },
    Confirmed { id: u64, slot: u8 },
    Finalized { id: u64, prior: ProposalStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    entries: usize,
    records: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    records: Vec<CommitteeEvent>,
    depth: u32,
}

impl Journal {
    pub fn begin(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            entries: self.entries.len(),
            records: self.records.len(),
        }
    }

    pub fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn emit(&mut self, record: CommitteeEvent) {
        self.records.push(record);
    }

    #[cfg(test)]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Closes the innermost frame. Returns the buffered records once the
    /// outermost frame closes, and nothing otherwise.
    pub fn commit(&mut self, checkpoint: Checkpoint) -> Vec<CommitteeEvent> {
        debug_assert!(checkpoint.entries <= self.entries.len());
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return Vec::new();
        }
        self.entries.clear();
        std::mem::take(&mut self.records)
    }

    /// Closes the innermost frame, dropping its records and returning its
    /// entries newest first, ready to be undone in order.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> Vec<JournalEntry> {
        self.depth = self.depth.saturating_sub(1);
        self.records.truncate(checkpoint.records);
        let mut undone = self.entries.split_off(checkpoint.entries);
        undone.reverse();
        undone
    }
}
