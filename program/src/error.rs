use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommitteeError {
    #[error("Invalid instruction")]
    InvalidInstruction,

    #[error("Invalid committee configuration")]
    InvalidConfiguration,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Proposal not found")]
    NotFound,

    #[error("Proposal is not pending")]
    InvalidState,

    #[error("Already confirmed")]
    AlreadyConfirmed,

    #[error("Not enough confirmations")]
    QuorumNotMet,

    #[error("Proposal action failed")]
    ExecutionFailed,
}

pub type CommitteeResult<T> = Result<T, CommitteeError>;

impl From<CommitteeError> for ProgramError {
    fn from(e: CommitteeError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_follow_declaration_order() {
        assert_eq!(
            ProgramError::from(CommitteeError::InvalidInstruction),
            ProgramError::Custom(0)
        );
        assert_eq!(
            ProgramError::from(CommitteeError::QuorumNotMet),
            ProgramError::Custom(6)
        );
        assert_eq!(
            ProgramError::from(CommitteeError::ExecutionFailed),
            ProgramError::Custom(7)
        );
    }
}
