use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

/// Record emitted by a state-changing operation.
///
/// Records are buffered while an operation runs and reach the [`AuditLog`]
/// only when the outermost operation commits.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum CommitteeEvent {
    ProposalSubmitted {
        id: u64,
        target: Pubkey,
        value: u64,
        payload: Vec<u8>,
    },
    ProposalConfirmed {
        id: u64,
        owner: Pubkey,
    },
    ProposalExecuted {
        id: u64,
    },
    ProposalExecutionOutcome {
        id: u64,
        target: Pubkey,
        value: u64,
        payload: Vec<u8>,
        success: bool,
    },
    ProposalCancelled {
        id: u64,
    },
}

impl CommitteeEvent {
    pub fn proposal_id(&self) -> u64 {
        match self {
            CommitteeEvent::ProposalSubmitted { id, .. }
            | CommitteeEvent::ProposalConfirmed { id, .. }
            | CommitteeEvent::ProposalExecuted { id }
            | CommitteeEvent::ProposalExecutionOutcome { id, .. }
            | CommitteeEvent::ProposalCancelled { id } => *id,
        }
    }
}

/// Append-only trail of committed records, in commit order.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    records: Vec<CommitteeEvent>,
}

impl AuditLog {
    pub(crate) fn append(&mut self, batch: Vec<CommitteeEvent>) {
        for record in batch {
            match &record {
                CommitteeEvent::ProposalSubmitted { id, target, value, .. } => {
                    msg!("Proposal submitted: id={} target={} value={}", id, target, value)
                }
                CommitteeEvent::ProposalConfirmed { id, owner } => {
                    msg!("Proposal confirmed: id={} owner={}", id, owner)
                }
                CommitteeEvent::ProposalExecuted { id } => msg!("Proposal executed: id={}", id),
                CommitteeEvent::ProposalExecutionOutcome { id, success, .. } => {
                    msg!("Execution outcome: id={} success={}", id, success)
                }
                CommitteeEvent::ProposalCancelled { id } => msg!("Proposal cancelled: id={}", id),
            }
            self.records.push(record);
        }
    }

    pub fn records(&self) -> &[CommitteeEvent] {
        &self.records
    }

    /// Records committed at or after position `offset`.
    pub fn since(&self, offset: usize) -> &[CommitteeEvent] {
        self.records.get(offset..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
