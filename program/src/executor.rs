use solana_program::pubkey::Pubkey;

/// Carries out approved actions on behalf of a committee.
///
/// Called synchronously while the committee is locked. An implementation may
/// call back into the same committee from the calling thread; such calls run
/// as nested operations and are discarded if this call reports failure.
pub trait ActionExecutor: Send + Sync {
    /// Performs the action and reports whether it succeeded.
    fn execute(&self, target: &Pubkey, value: u64, payload: &[u8]) -> bool;
}

impl<F> ActionExecutor for F
where
    F: Fn(&Pubkey, u64, &[u8]) -> bool + Send + Sync,
{
    fn execute(&self, target: &Pubkey, value: u64, payload: &[u8]) -> bool {
        self(target, value, payload)
    }
}

/// Executor for committees whose only actions are self-directed.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectExternal;

impl ActionExecutor for RejectExternal {
    fn execute(&self, _target: &Pubkey, _value: u64, _payload: &[u8]) -> bool {
        false
    }
}
