use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{hash::hashv, pubkey::Pubkey};

use crate::error::{CommitteeError, CommitteeResult};

/// Largest committee a `u8` threshold can express.
pub const MAX_OWNERS: usize = u8::MAX as usize;

/// Committee parameters, as carried in a host's operation log.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommitteeConfig {
    /// Owner identities, in slot order.
    pub owners: Vec<Pubkey>,
    /// Confirmations required before a proposal may execute.
    pub threshold: u8,
}

impl CommitteeConfig {
    pub fn unpack(input: &[u8]) -> CommitteeResult<Self> {
        Self::try_from_slice(input).map_err(|_| CommitteeError::InvalidConfiguration)
    }

    pub fn pack(&self) -> CommitteeResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| CommitteeError::InvalidConfiguration)
    }
}

/// Immutable owner set and quorum threshold of one committee.
///
/// Every owner is assigned a stable slot (its position in the construction
/// list); confirmation sets are keyed by slot.
#[derive(Debug, Clone)]
pub struct OwnerRegistry {
    owners: Vec<Pubkey>,
    slots: HashMap<Pubkey, u8>,
    threshold: u8,
}

impl OwnerRegistry {
    pub fn new(owners: Vec<Pubkey>, threshold: u8) -> CommitteeResult<Self> {
        if owners.is_empty() || owners.len() > MAX_OWNERS {
            return Err(CommitteeError::InvalidConfiguration);
        }
        if threshold == 0 || usize::from(threshold) > owners.len() {
            return Err(CommitteeError::InvalidConfiguration);
        }

        let mut slots = HashMap::with_capacity(owners.len());
        for (slot, owner) in owners.iter().enumerate() {
            if *owner == Pubkey::default() {
                return Err(CommitteeError::InvalidConfiguration);
            }
            // MAX_OWNERS keeps every slot inside u8.
            let slot = u8::try_from(slot).map_err(|_| CommitteeError::InvalidConfiguration)?;
            if slots.insert(*owner, slot).is_some() {
                return Err(CommitteeError::InvalidConfiguration);
            }
        }

        Ok(Self {
            owners,
            slots,
            threshold,
        })
    }

    pub fn from_config(config: CommitteeConfig) -> CommitteeResult<Self> {
        Self::new(config.owners, config.threshold)
    }

    pub fn is_owner(&self, identity: &Pubkey) -> bool {
        self.slots.contains_key(identity)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn owners(&self) -> &[Pubkey] {
        &self.owners
    }

    pub fn slot_of(&self, identity: &Pubkey) -> Option<u8> {
        self.slots.get(identity).copied()
    }

    pub fn owner_at(&self, slot: u8) -> Option<&Pubkey> {
        self.owners.get(usize::from(slot))
    }

    /// Resolves `caller` to its owner slot or fails `Unauthorized`.
    pub fn authorize(&self, caller: &Pubkey) -> CommitteeResult<u8> {
        self.slot_of(caller).ok_or(CommitteeError::Unauthorized)
    }

    /// Identity the committee acts under when it targets itself.
    pub fn derive_address(&self) -> Pubkey {
        let threshold = [self.threshold];
        let mut seeds: Vec<&[u8]> = Vec::with_capacity(self.owners.len() + 2);
        seeds.push(b"committee");
        for owner in &self.owners {
            seeds.push(owner.as_ref());
        }
        seeds.push(&threshold);
        Pubkey::new_from_array(hashv(&seeds).to_bytes())
    }
}

/// Set of owner slots, one bit per slot.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmationSet([u64; 4]);

impl ConfirmationSet {
    fn position(slot: u8) -> (usize, u64) {
        (usize::from(slot >> 6), 1u64 << (slot & 63))
    }

    pub fn contains(&self, slot: u8) -> bool {
        let (word, bit) = Self::position(slot);
        self.0[word] & bit != 0
    }

    /// Returns false if the slot was already present.
    pub fn insert(&mut self, slot: u8) -> bool {
        let (word, bit) = Self::position(slot);
        let fresh = self.0[word] & bit == 0;
        self.0[word] |= bit;
        fresh
    }

    pub fn remove(&mut self, slot: u8) -> bool {
        let (word, bit) = Self::position(slot);
        let present = self.0[word] & bit != 0;
        self.0[word] &= !bit;
        present
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    pub fn slots(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |slot| self.contains(*slot))
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    Pending,
    Executed,
    Canceled,
}

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

/// The invocation a proposal asks the committee to carry out.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub target: Pubkey,
    pub value: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub id: u64,
    pub action: Action,
    pub status: ProposalStatus,
    pub confirmations: ConfirmationSet,
}

impl Proposal {
    pub fn new(id: u64, action: Action) -> Self {
        Self {
            id,
            action,
            status: ProposalStatus::Pending,
            confirmations: ConfirmationSet::default(),
        }
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    pub fn snapshot(&self, registry: &OwnerRegistry) -> ProposalSnapshot {
        let confirmed_by: Vec<Pubkey> = self
            .confirmations
            .slots()
            .filter_map(|slot| registry.owner_at(slot).copied())
            .collect();
        ProposalSnapshot {
            id: self.id,
            target: self.action.target,
            value: self.action.value,
            payload: self.action.payload.clone(),
            status: self.status,
            confirmation_count: confirmed_by.len(),
            confirmed_by,
        }
    }
}

/// Read-only copy of a proposal handed out by queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSnapshot {
    pub id: u64,
    pub target: Pubkey,
    pub value: u64,
    pub payload: Vec<u8>,
    pub status: ProposalStatus,
    pub confirmation_count: usize,
    pub confirmed_by: Vec<Pubkey>,
}
