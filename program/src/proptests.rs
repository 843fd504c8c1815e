//! Property-based tests for the proposal lifecycle
//!
//! Random interleavings of submit/confirm/execute/cancel are replayed against
//! a committee and checked after every step:
//! - confirmation_count always equals the number of confirmers
//! - the pending set always matches the Pending statuses
//! - a proposal is executed at most once
//! - failed operations change nothing

use proptest::prelude::*;
use solana_program::pubkey::Pubkey;

use crate::{
    committee::Committee, error::CommitteeError, event::CommitteeEvent,
    instruction::CommitteeInstruction, state::ProposalStatus,
};

#[derive(Debug, Clone)]
enum Op {
    /// `succeed` is what the executor will report for this proposal.
    Submit { by: usize, succeed: bool },
    /// Submit a proposal that cancels `target` through the committee.
    SubmitCancel { by: usize, target: u64 },
    Confirm { by: usize, id: u64 },
    Execute { by: usize, id: u64 },
    /// `as_committee` passes the committee address as caller.
    DirectCancel { by: usize, id: u64, as_committee: bool },
}

const OWNERS: usize = 4;

fn op() -> impl Strategy<Value = Op> {
    // `by == OWNERS` stands for an outsider.
    let by = 0..=OWNERS;
    prop_oneof![
        (by.clone(), any::<bool>()).prop_map(|(by, succeed)| Op::Submit { by, succeed }),
        (by.clone(), 0u64..8).prop_map(|(by, target)| Op::SubmitCancel { by, target }),
        (by.clone(), 0u64..8).prop_map(|(by, id)| Op::Confirm { by, id }),
        (by.clone(), 0u64..8).prop_map(|(by, id)| Op::Execute { by, id }),
        (by, 0u64..8, any::<bool>()).prop_map(|(by, id, as_committee)| Op::DirectCancel {
            by,
            id,
            as_committee,
        }),
    ]
}

fn check_invariants(committee: &Committee) -> Result<(), TestCaseError> {
    let pending = committee.list_pending();
    for id in 0..committee.proposal_count() {
        let snapshot = committee.get_proposal(id).unwrap();
        prop_assert_eq!(snapshot.confirmation_count, snapshot.confirmed_by.len());
        for owner in &snapshot.confirmed_by {
            prop_assert!(committee.is_owner(owner));
        }
        prop_assert_eq!(
            pending.contains(&id),
            snapshot.status == ProposalStatus::Pending
        );
    }

    let log = committee.audit_log();
    for id in 0..committee.proposal_count() {
        let executed = log
            .iter()
            .filter(|r| matches!(r, CommitteeEvent::ProposalExecuted { id: e } if *e == id))
            .count();
        prop_assert!(executed <= 1);
    }
    prop_assert!(!log.iter().any(|r| matches!(
        r,
        CommitteeEvent::ProposalExecutionOutcome { success: false, .. }
    )), "audit log contains a failed ProposalExecutionOutcome");
    Ok(())
}

proptest! {
    #[test]
    fn prop_lifecycle_invariants(ops in prop::collection::vec(op(), 1..60)) {
        let mut keys: Vec<Pubkey> = (0..=OWNERS).map(|_| Pubkey::new_unique()).collect();
        let outsider = keys.pop().unwrap();
        let committee = Committee::new(
            keys.clone(),
            2,
            |_: &Pubkey, _: u64, payload: &[u8]| payload == [1u8],
        )
        .unwrap();
        let who = |by: usize| if by < OWNERS { keys[by] } else { outsider };

        for op in ops {
            let (by, direct_cancel) = match &op {
                Op::Submit { by, .. }
                | Op::SubmitCancel { by, .. }
                | Op::Confirm { by, .. }
                | Op::Execute { by, .. } => (*by, false),
                Op::DirectCancel { by, .. } => (*by, true),
            };
            let before_log = committee.audit_log();
            let before_count = committee.proposal_count();
            let before_pending = committee.list_pending();
            let before_proposals: Vec<_> = (0..before_count)
                .map(|id| committee.get_proposal(id).unwrap())
                .collect();
            let result = match op {
                Op::Submit { by, succeed } => committee
                    .submit(&who(by), Pubkey::new_unique(), 1, vec![u8::from(succeed)])
                    .map(|_| ()),
                Op::SubmitCancel { by, target } => {
                    let payload = CommitteeInstruction::CancelProposal { proposal_id: target }
                        .pack()
                        .unwrap();
                    committee
                        .submit(&who(by), committee.address(), 0, payload)
                        .map(|_| ())
                }
                Op::Confirm { by, id } => {
                    let prior = committee.confirmation_count(id).ok();
                    let result = committee.confirm(&who(by), id);
                    if result == Err(CommitteeError::AlreadyConfirmed) {
                        prop_assert_eq!(committee.confirmation_count(id).ok(), prior);
                    }
                    result
                }
                Op::Execute { by, id } => {
                    let quorum = committee.is_confirmed(id).unwrap_or(false);
                    let result = committee.execute(&who(by), id);
                    if result.is_ok() {
                        prop_assert!(quorum);
                        prop_assert_eq!(
                            committee.get_proposal(id).unwrap().status,
                            ProposalStatus::Executed
                        );
                    }
                    if result == Err(CommitteeError::QuorumNotMet) {
                        prop_assert!(!quorum);
                    }
                    result
                }
                Op::DirectCancel { by, id, as_committee } => {
                    let caller = if as_committee { committee.address() } else { who(by) };
                    let result = committee.cancel(&caller, id);
                    prop_assert_eq!(result, Err(CommitteeError::Unauthorized));
                    result
                }
            };

            if let Err(err) = result {
                prop_assert_eq!(committee.audit_log(), before_log);
                prop_assert_eq!(committee.proposal_count(), before_count);
                prop_assert_eq!(committee.list_pending(), before_pending);
                let after_proposals: Vec<_> = (0..before_count)
                    .map(|id| committee.get_proposal(id).unwrap())
                    .collect();
                prop_assert_eq!(after_proposals, before_proposals);
                if err == CommitteeError::Unauthorized {
                    prop_assert!(by == OWNERS || direct_cancel);
                }
            } else {
                prop_assert!(by < OWNERS);
            }
            check_invariants(&committee)?;
        }
    }

    #[test]
    fn prop_threshold_bounds_hold(n in 1usize..12, threshold in 0u8..14) {
        let keys: Vec<Pubkey> = (0..n).map(|_| Pubkey::new_unique()).collect();
        match Committee::new(keys, threshold, crate::executor::RejectExternal) {
            Ok(committee) => {
                prop_assert!(committee.threshold() >= 1);
                prop_assert!(usize::from(committee.threshold()) <= committee.owner_count());
            }
            Err(err) => {
                prop_assert_eq!(err, CommitteeError::InvalidConfiguration);
                prop_assert!(threshold == 0 || usize::from(threshold) > n);
            }
        }
    }
}
