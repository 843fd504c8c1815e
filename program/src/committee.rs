use std::cell::{Cell, RefCell};

use parking_lot::ReentrantMutex;
use solana_program::{msg, pubkey::Pubkey};

use crate::{
    error::{CommitteeError, CommitteeResult},
    event::{AuditLog, CommitteeEvent},
    executor::ActionExecutor,
    journal::{Checkpoint, Journal},
    processor::Processor,
    state::{Action, CommitteeConfig, OwnerRegistry, ProposalSnapshot},
    store::ProposalStore,
};

/// Mutable part of a committee. Only reachable through the committee lock.
#[derive(Debug, Default)]
pub(crate) struct CommitteeState {
    pub store: ProposalStore,
    pub journal: Journal,
    pub audit: AuditLog,
}

impl CommitteeState {
    fn revert(&mut self, checkpoint: Checkpoint) {
        for entry in self.journal.rollback(checkpoint) {
            self.store.undo(entry);
        }
    }
}

/// Everything behind the committee lock.
#[derive(Debug, Default)]
struct Shared {
    state: RefCell<CommitteeState>,
    /// Depth of self-directed actions being carried out. Cancellation is
    /// only accepted while it is non-zero.
    self_dispatch: Cell<u32>,
}

/// Sets the self-dispatch marker for a scope and restores it on drop.
struct DispatchScope<'a> {
    marker: &'a Cell<u32>,
    prior: u32,
}

impl<'a> DispatchScope<'a> {
    fn enter(marker: &'a Cell<u32>) -> Self {
        let prior = marker.get();
        marker.set(prior.saturating_add(1));
        Self { marker, prior }
    }

    /// External code never runs with the marker raised.
    fn suspend(marker: &'a Cell<u32>) -> Self {
        let prior = marker.get();
        marker.set(0);
        Self { marker, prior }
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        self.marker.set(self.prior);
    }
}

/// An open operation, closed by [`Frame::commit`] or [`Frame::rollback`].
///
/// Operations only borrow the state inside their own scope, so no borrow is
/// live once they return or unwind.
struct Frame<'a> {
    state: &'a RefCell<CommitteeState>,
    checkpoint: Checkpoint,
    open: bool,
}

impl<'a> Frame<'a> {
    fn begin(state: &'a RefCell<CommitteeState>) -> Self {
        let checkpoint = state.borrow_mut().journal.begin();
        Self {
            state,
            checkpoint,
            open: true,
        }
    }

    fn commit(mut self) {
        self.open = false;
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let published = state.journal.commit(self.checkpoint);
        state.audit.append(published);
    }

    fn rollback(mut self) {
        self.open = false;
        self.state.borrow_mut().revert(self.checkpoint);
    }
}

impl Drop for Frame<'_> {
    // Only reached with the frame still open when the operation panicked.
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match self.state.try_borrow_mut() {
            Ok(mut state) => state.revert(self.checkpoint),
            Err(_) => msg!("Rollback skipped: committee state still borrowed"),
        }
    }
}

/// A committee of owners that jointly approve actions.
///
/// All operations on one committee are serialized behind a reentrant lock:
/// other threads wait, while calls made by the executor from inside
/// [`Committee::execute`] nest inside the running operation.
pub struct Committee {
    address: Pubkey,
    registry: OwnerRegistry,
    state: ReentrantMutex<Shared>,
    executor: Box<dyn ActionExecutor>,
}

impl std::fmt::Debug for Committee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Committee")
            .field("address", &self.address)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Committee {
    pub fn new(
        owners: Vec<Pubkey>,
        threshold: u8,
        executor: impl ActionExecutor + 'static,
    ) -> CommitteeResult<Self> {
        Self::from_config(CommitteeConfig { owners, threshold }, executor)
    }

    pub fn from_config(
        config: CommitteeConfig,
        executor: impl ActionExecutor + 'static,
    ) -> CommitteeResult<Self> {
        let registry = OwnerRegistry::from_config(config)?;
        let address = registry.derive_address();
        msg!(
            "Committee created: address={} owners={} threshold={}",
            address,
            registry.owner_count(),
            registry.threshold()
        );
        Ok(Self {
            address,
            registry,
            state: ReentrantMutex::new(Shared::default()),
            executor: Box::new(executor),
        })
    }

    /// Identity under which the committee calls itself.
    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn registry(&self) -> &OwnerRegistry {
        &self.registry
    }

    pub fn submit(
        &self,
        caller: &Pubkey,
        target: Pubkey,
        value: u64,
        payload: Vec<u8>,
    ) -> CommitteeResult<u64> {
        let action = Action {
            target,
            value,
            payload,
        };
        self.transact(|state| Processor::process_submit(self, state, caller, action))
    }

    pub fn confirm(&self, caller: &Pubkey, proposal_id: u64) -> CommitteeResult<()> {
        self.transact(|state| Processor::process_confirm(self, state, caller, proposal_id))
    }

    pub fn execute(&self, caller: &Pubkey, proposal_id: u64) -> CommitteeResult<()> {
        self.transact(|state| Processor::process_execute(self, state, caller, proposal_id))
    }

    /// Accepted only from the committee itself while it carries out an
    /// executed proposal that targets its own address with a cancel
    /// instruction. Every direct call fails `Unauthorized`.
    pub fn cancel(&self, caller: &Pubkey, proposal_id: u64) -> CommitteeResult<()> {
        self.transact(|state| Processor::process_cancel(self, state, caller, proposal_id))
    }

    pub fn owner_count(&self) -> usize {
        self.registry.owner_count()
    }

    pub fn threshold(&self) -> u8 {
        self.registry.threshold()
    }

    pub fn owners(&self) -> &[Pubkey] {
        self.registry.owners()
    }

    pub fn is_owner(&self, identity: &Pubkey) -> bool {
        self.registry.is_owner(identity)
    }

    pub fn proposal_count(&self) -> u64 {
        self.read(|state| state.store.len())
    }

    pub fn get_proposal(&self, proposal_id: u64) -> CommitteeResult<ProposalSnapshot> {
        self.read(|state| {
            let proposal = state.store.get(proposal_id)?;
            Ok(proposal.snapshot(&self.registry))
        })
    }

    pub fn has_confirmed(&self, proposal_id: u64, owner: &Pubkey) -> CommitteeResult<bool> {
        self.read(|state| {
            let proposal = state.store.get(proposal_id)?;
            Ok(self
                .registry
                .slot_of(owner)
                .is_some_and(|slot| proposal.confirmations.contains(slot)))
        })
    }

    pub fn confirmation_count(&self, proposal_id: u64) -> CommitteeResult<usize> {
        self.read(|state| Ok(state.store.get(proposal_id)?.confirmation_count()))
    }

    /// Owners that confirmed the proposal, in slot order.
    pub fn confirmations(&self, proposal_id: u64) -> CommitteeResult<Vec<Pubkey>> {
        self.get_proposal(proposal_id)
            .map(|snapshot| snapshot.confirmed_by)
    }

    /// Whether the proposal has gathered at least `threshold` confirmations.
    pub fn is_confirmed(&self, proposal_id: u64) -> CommitteeResult<bool> {
        let threshold = usize::from(self.registry.threshold());
        self.confirmation_count(proposal_id)
            .map(|count| count >= threshold)
    }

    pub fn list_pending(&self) -> Vec<u64> {
        self.read(|state| state.store.pending_index().ids())
    }

    pub fn pending_count(&self) -> usize {
        self.read(|state| state.store.pending_index().len())
    }

    pub fn audit_log(&self) -> Vec<CommitteeEvent> {
        self.read(|state| state.audit.records().to_vec())
    }

    pub fn audit_log_since(&self, offset: usize) -> Vec<CommitteeEvent> {
        self.read(|state| state.audit.since(offset).to_vec())
    }

    /// Carries out an approved action. Self-directed actions are decoded as
    /// instructions and processed with the committee as caller, with the
    /// self-dispatch marker raised.
    pub(crate) fn invoke(&self, action: &Action) -> CommitteeResult<()> {
        let guard = self.state.lock();
        if action.target != self.address {
            let _scope = DispatchScope::suspend(&guard.self_dispatch);
            let success = self
                .executor
                .execute(&action.target, action.value, &action.payload);
            return if success {
                Ok(())
            } else {
                Err(CommitteeError::ExecutionFailed)
            };
        }
        let _scope = DispatchScope::enter(&guard.self_dispatch);
        Processor::process(self, &self.address, &action.payload).map(|_| ())
    }

    /// Whether a self-directed action is being carried out right now.
    pub(crate) fn self_dispatch_active(&self) -> bool {
        self.state.lock().self_dispatch.get() > 0
    }

    fn read<T>(&self, query: impl FnOnce(&CommitteeState) -> T) -> T {
        let guard = self.state.lock();
        let state = guard.state.borrow();
        query(&state)
    }

    /// Runs `op` as one all-or-nothing unit under the committee lock.
    fn transact<T>(
        &self,
        op: impl FnOnce(&RefCell<CommitteeState>) -> CommitteeResult<T>,
    ) -> CommitteeResult<T> {
        let guard = self.state.lock();
        let cell = &guard.state;
        let frame = Frame::begin(cell);
        let result = op(cell);
        match &result {
            Ok(_) => frame.commit(),
            Err(err) => {
                msg!("Operation rolled back: {}", err);
                frame.rollback();
            }
        }
        result
    }
}

impl From<&Committee> for CommitteeConfig {
    fn from(committee: &Committee) -> Self {
        CommitteeConfig {
            owners: committee.owners().to_vec(),
            threshold: committee.threshold(),
        }
    }
}
