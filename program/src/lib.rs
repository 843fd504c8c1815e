//! Quorum-gated execution of actions by a fixed committee of owners.
//!
//! Owners submit proposals, confirm them individually, and execute them once
//! `threshold` distinct confirmations exist. Cancelling a proposal is itself
//! a proposal: its target is the committee address and its payload a
//! [`CommitteeInstruction::CancelProposal`].

pub mod committee;
pub mod error;
pub mod event;
pub mod executor;
pub mod instruction;
mod journal;
pub mod processor;
pub mod state;
pub mod store;

#[cfg(test)]
mod proptests;

pub use committee::Committee;
pub use error::{CommitteeError, CommitteeResult};
pub use event::{AuditLog, CommitteeEvent};
pub use executor::{ActionExecutor, RejectExternal};
pub use instruction::CommitteeInstruction;
pub use processor::{ProcessOutcome, Processor};
pub use state::{
    Action, CommitteeConfig, OwnerRegistry, ProposalSnapshot, ProposalStatus, MAX_OWNERS,
};
