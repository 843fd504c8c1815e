use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::{CommitteeError, CommitteeResult};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum CommitteeInstruction {
    /// Record a new proposal.
    /// Caller: any owner.
    SubmitProposal {
        /// Identity the action is directed at.
        target: Pubkey,
        /// Quantity transferred with the action.
        value: u64,
        /// Opaque data interpreted by the target.
        payload: Vec<u8>,
    },

    /// Confirm a pending proposal.
    /// Caller: any owner that has not confirmed it yet.
    ConfirmProposal { proposal_id: u64 },

    /// Carry out a pending proposal that has reached quorum.
    /// Caller: any owner.
    ExecuteProposal { proposal_id: u64 },

    /// Cancel a pending proposal.
    /// Caller: the committee itself, i.e. an executed proposal whose target
    /// is the committee address and whose payload is this instruction.
    CancelProposal { proposal_id: u64 },
}

impl CommitteeInstruction {
    pub fn unpack(input: &[u8]) -> CommitteeResult<Self> {
        Self::try_from_slice(input).map_err(|_| CommitteeError::InvalidInstruction)
    }

    pub fn pack(&self) -> CommitteeResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| CommitteeError::InvalidInstruction)
    }
}
