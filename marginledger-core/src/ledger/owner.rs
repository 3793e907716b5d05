//! Contract owners: positions owned by code rather than by an account.
//!
//! When a position's owner is registered in the [`OwnerDirectory`], actions
//! by anyone else are routed through the owner in two phases. First the
//! owner reviews the request against an immutable snapshot of the position
//! (`&self`) and returns an allowance. The ledger then validates everything
//! else and hands the owner a receipt to settle its own bookkeeping.
//! Receipts and grants can only be constructed inside this crate, so an
//! owner cannot be driven by anything but the ledger.
//!
//! Owners must accept any receipt that matches an allowance they granted,
//! and any close receipt that passed their own `check_close`.

use super::error::LedgerError;
use crate::domain::{Address, Position, PositionId};

/// Handed to a contract when a position is transferred to it.
#[derive(Debug, Clone)]
pub struct OwnershipGrant {
    from: Address,
    position: Position,
}

impl OwnershipGrant {
    pub(crate) fn new(from: Address, position: Position) -> Self {
        Self { from, position }
    }

    /// The previous owner.
    pub fn from(&self) -> Address {
        self.from
    }

    pub fn position(&self) -> &Position {
        &self.position
    }
}

/// What an owner lets a closer do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseAllowance {
    /// Principal the closer may close, at most the amount requested.
    pub amount: u128,
    /// Owner-defined claim units consumed by the close (shares to burn).
    pub claims: u128,
}

/// What an owner lets an increasing trader do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreaseAllowance {
    /// Owner-defined claim units issued to the trader (shares to mint).
    pub claims: u128,
}

/// A committed close, as seen by the position's contract owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReceipt {
    position_id: PositionId,
    closer: Address,
    payout_recipient: Address,
    closed_amount: u128,
    claims: u128,
}

impl CloseReceipt {
    pub(crate) fn new(
        position_id: PositionId,
        closer: Address,
        payout_recipient: Address,
        closed_amount: u128,
        claims: u128,
    ) -> Self {
        Self {
            position_id,
            closer,
            payout_recipient,
            closed_amount,
            claims,
        }
    }

    pub fn position_id(&self) -> &PositionId {
        &self.position_id
    }

    pub fn closer(&self) -> Address {
        self.closer
    }

    pub fn payout_recipient(&self) -> Address {
        self.payout_recipient
    }

    pub fn closed_amount(&self) -> u128 {
        self.closed_amount
    }

    pub fn claims(&self) -> u128 {
        self.claims
    }
}

/// A committed increase, as seen by the position's contract owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreaseReceipt {
    position_id: PositionId,
    trader: Address,
    added_principal: u128,
    added_collateral: u128,
    claims: u128,
}

impl IncreaseReceipt {
    pub(crate) fn new(
        position_id: PositionId,
        trader: Address,
        added_principal: u128,
        added_collateral: u128,
        claims: u128,
    ) -> Self {
        Self {
            position_id,
            trader,
            added_principal,
            added_collateral,
            claims,
        }
    }

    pub fn position_id(&self) -> &PositionId {
        &self.position_id
    }

    pub fn trader(&self) -> Address {
        self.trader
    }

    pub fn added_principal(&self) -> u128 {
        self.added_principal
    }

    pub fn added_collateral(&self) -> u128 {
        self.added_collateral
    }

    pub fn claims(&self) -> u128 {
        self.claims
    }
}

/// A contract that can own positions.
pub trait PositionOwner {
    /// Accept (or refuse) ownership. Returns the claim supply issued for it.
    /// A refusal aborts the transfer.
    fn receive_position_ownership(&mut self, grant: &OwnershipGrant) -> Result<u128, LedgerError>;

    /// Review a close requested by someone other than the owner.
    fn close_on_behalf_of(
        &self,
        closer: &Address,
        payout_recipient: &Address,
        position: &Position,
        requested: u128,
    ) -> Result<CloseAllowance, LedgerError>;

    /// Whether `settle_close` would accept `receipt`. Runs before any token
    /// moves; a settlement that passes this check must not fail.
    fn check_close(&self, _receipt: &CloseReceipt) -> Result<(), LedgerError> {
        Ok(())
    }

    fn settle_close(&mut self, receipt: &CloseReceipt) -> Result<(), LedgerError>;

    /// Review an increase requested by someone other than the owner.
    fn increase_position_on_behalf_of(
        &self,
        trader: &Address,
        position: &Position,
        added_principal: u128,
        added_collateral: u128,
    ) -> Result<IncreaseAllowance, LedgerError>;

    fn settle_increase(&mut self, receipt: &IncreaseReceipt) -> Result<(), LedgerError>;

    /// Who ultimately holds the position on this owner's behalf.
    fn position_deed_holder(&self, position_id: &PositionId) -> Result<Address, LedgerError>;

    /// Called once when the position reaches a terminal state.
    fn position_closed(&mut self, _position: &Position) {}
}

/// Resolves owner addresses to contracts.
pub trait OwnerDirectory {
    fn owner(&self, address: &Address) -> Option<&dyn PositionOwner>;

    fn owner_mut(&mut self, address: &Address) -> Option<&mut dyn PositionOwner>;

    fn is_contract(&self, address: &Address) -> bool {
        self.owner(address).is_some()
    }
}

/// A directory with no contracts: every owner is a plain account.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContracts;

impl OwnerDirectory for NoContracts {
    fn owner(&self, _address: &Address) -> Option<&dyn PositionOwner> {
        None
    }

    fn owner_mut(&mut self, _address: &Address) -> Option<&mut dyn PositionOwner> {
        None
    }
}
