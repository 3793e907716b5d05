//! Owner directory of tokenized positions.

use crate::metadata::TokenMetadata;
use crate::position_token::TokenizedPosition;
use crate::trusted::TrustedRecipientSet;
use marginledger_core::domain::{Address, PositionId};
use marginledger_core::ledger::{OwnerDirectory, PositionOwner};
use std::collections::BTreeMap;
use tracing::debug;

/// Every tokenized position, keyed by contract address.
#[derive(Debug, Clone, Default)]
pub struct TokenizedRegistry {
    contracts: BTreeMap<Address, TokenizedPosition>,
    metadata: TokenMetadata,
    created: u64,
}

impl TokenizedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: TokenMetadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    /// Deploy a tokenized position for `position_id`. Transfer the position
    /// to the returned address to tokenize it.
    pub fn create(
        &mut self,
        position_id: PositionId,
        initial_holder: Address,
        trusted: impl IntoIterator<Item = Address>,
    ) -> Address {
        self.created += 1;
        let address = Address::derive(&[
            b"tokenized-position",
            position_id.as_bytes(),
            &self.created.to_le_bytes(),
        ]);
        let contract = TokenizedPosition::new(
            address,
            position_id,
            initial_holder,
            TrustedRecipientSet::new(trusted),
            self.metadata.clone(),
        );
        self.contracts.insert(address, contract);
        debug!(%address, position = %position_id, "tokenized position created");
        address
    }

    pub fn get(&self, address: &Address) -> Option<&TokenizedPosition> {
        self.contracts.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut TokenizedPosition> {
        self.contracts.get_mut(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenizedPosition> {
        self.contracts.values()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl OwnerDirectory for TokenizedRegistry {
    fn owner(&self, address: &Address) -> Option<&dyn PositionOwner> {
        self.contracts
            .get(address)
            .map(|contract| contract as &dyn PositionOwner)
    }

    fn owner_mut(&mut self, address: &Address) -> Option<&mut dyn PositionOwner> {
        self.contracts
            .get_mut(address)
            .map(|contract| contract as &mut dyn PositionOwner)
    }
}
