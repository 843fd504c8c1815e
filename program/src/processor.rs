use std::cell::RefCell;

use solana_program::{msg, pubkey::Pubkey};

use crate::{
    committee::{Committee, CommitteeState},
    error::{CommitteeError, CommitteeResult},
    event::CommitteeEvent,
    instruction::CommitteeInstruction,
    state::{Action, ProposalStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Submitted { proposal_id: u64 },
    Completed,
}

pub struct Processor;

impl Processor {
    pub fn process(
        committee: &Committee,
        caller: &Pubkey,
        input: &[u8],
    ) -> CommitteeResult<ProcessOutcome> {
        let ix = CommitteeInstruction::unpack(input)?;
        Self::dispatch(committee, caller, ix)
    }

    pub fn dispatch(
        committee: &Committee,
        caller: &Pubkey,
        ix: CommitteeInstruction,
    ) -> CommitteeResult<ProcessOutcome> {
        match ix {
            CommitteeInstruction::SubmitProposal {
                target,
                value,
                payload,
            } => committee
                .submit(caller, target, value, payload)
                .map(|proposal_id| ProcessOutcome::Submitted { proposal_id }),
            CommitteeInstruction::ConfirmProposal { proposal_id } => committee
                .confirm(caller, proposal_id)
                .map(|_| ProcessOutcome::Completed),
            CommitteeInstruction::ExecuteProposal { proposal_id } => committee
                .execute(caller, proposal_id)
                .map(|_| ProcessOutcome::Completed),
            CommitteeInstruction::CancelProposal { proposal_id } => committee
                .cancel(caller, proposal_id)
                .map(|_| ProcessOutcome::Completed),
        }
    }

    pub(crate) fn process_submit(
        committee: &Committee,
        state: &RefCell<CommitteeState>,
        caller: &Pubkey,
        action: Action,
    ) -> CommitteeResult<u64> {
        committee.registry().authorize(caller)?;

        let mut guard = state.borrow_mut();
        let state = &mut *guard;
        let record = CommitteeEvent::ProposalSubmitted {
            id: state.store.len(),
            target: action.target,
            value: action.value,
            payload: action.payload.clone(),
        };
        let id = state.store.append(&mut state.journal, action);
        state.journal.emit(record);
        Ok(id)
    }

    pub(crate) fn process_confirm(
        committee: &Committee,
        state: &RefCell<CommitteeState>,
        caller: &Pubkey,
        proposal_id: u64,
    ) -> CommitteeResult<()> {
        let slot = committee.registry().authorize(caller)?;

        let mut guard = state.borrow_mut();
        let state = &mut *guard;
        let count = state.store.confirm(&mut state.journal, proposal_id, slot)?;
        state.journal.emit(CommitteeEvent::ProposalConfirmed {
            id: proposal_id,
            owner: *caller,
        });
        msg!(
            "Confirmed: {}/{}",
            count,
            committee.registry().threshold()
        );
        Ok(())
    }

    pub(crate) fn process_execute(
        committee: &Committee,
        state: &RefCell<CommitteeState>,
        caller: &Pubkey,
        proposal_id: u64,
    ) -> CommitteeResult<()> {
        committee.registry().authorize(caller)?;

        // Status flips before the action runs so a reentrant execute of the
        // same proposal is rejected.
        let action = {
            let mut guard = state.borrow_mut();
            let state = &mut *guard;
            let proposal = state.store.pending(proposal_id)?;
            if proposal.confirmation_count() < usize::from(committee.registry().threshold()) {
                return Err(CommitteeError::QuorumNotMet);
            }
            let action = proposal.action.clone();
            state
                .store
                .finalize(&mut state.journal, proposal_id, ProposalStatus::Executed)?;
            action
        };

        // No borrow is held here; the action may re-enter the committee.
        if let Err(err) = committee.invoke(&action) {
            msg!(
                "Execution failed: id={} target={} cause={}",
                proposal_id,
                action.target,
                err
            );
            return Err(CommitteeError::ExecutionFailed);
        }

        let mut guard = state.borrow_mut();
        guard
            .journal
            .emit(CommitteeEvent::ProposalExecuted { id: proposal_id });
        guard.journal.emit(CommitteeEvent::ProposalExecutionOutcome {
            id: proposal_id,
            target: action.target,
            value: action.value,
            payload: action.payload,
            success: true,
        });
        Ok(())
    }

    pub(crate) fn process_cancel(
        committee: &Committee,
        state: &RefCell<CommitteeState>,
        caller: &Pubkey,
        proposal_id: u64,
    ) -> CommitteeResult<()> {
        if *caller != committee.address() || !committee.self_dispatch_active() {
            return Err(CommitteeError::Unauthorized);
        }

        let mut guard = state.borrow_mut();
        let state = &mut *guard;
        state
            .store
            .finalize(&mut state.journal, proposal_id, ProposalStatus::Canceled)?;
        state
            .journal
            .emit(CommitteeEvent::ProposalCancelled { id: proposal_id });
        Ok(())
    }
}
