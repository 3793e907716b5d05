//! LedgerCore — the authoritative store of positions and loan fills.
//!
//! The ledger custodies all collateral at its vault address and moves funds
//! through the [`TokenLedger`] in `Env`. Every mutating operation:
//! - checks authorization, state, terms, token movements and whether a
//!   contract owner will settle, before anything moves,
//! - then asks a contract owner (if any) to settle,
//! - then commits transfers and position state, and records an event.
//!
//! An `Err` therefore never leaves partial state behind.

mod call;
mod close;
pub mod error;
pub mod events;
mod open;
pub mod owner;
mod plan;
mod transfer;
mod validate;

pub use close::CloseOutcome;
pub use error::LedgerError;
pub use events::{EventRecord, LedgerEvent};
pub use owner::{
    CloseAllowance, CloseReceipt, IncreaseAllowance, IncreaseReceipt, NoContracts,
    OwnerDirectory, OwnershipGrant, PositionOwner,
};

use crate::config::LedgerConfig;
use crate::domain::{Address, LoanHash, LoanOffering, Position, PositionId};
use crate::external::{Clock, SignatureOracle, TokenLedger};
use crate::interest::interest_owed;
use std::collections::HashMap;

/// Collaborators a ledger operation runs against.
pub struct Env<'a> {
    pub tokens: &'a mut dyn TokenLedger,
    pub oracle: &'a dyn SignatureOracle,
    pub owners: &'a mut dyn OwnerDirectory,
    pub clock: &'a dyn Clock,
}

impl<'a> Env<'a> {
    pub fn new(
        tokens: &'a mut dyn TokenLedger,
        oracle: &'a dyn SignatureOracle,
        owners: &'a mut dyn OwnerDirectory,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            tokens,
            oracle,
            owners,
            clock,
        }
    }
}

/// Principal drawn from and cancelled on one loan offering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoanUsage {
    pub filled: u128,
    pub cancelled: u128,
}

/// The margin ledger.
#[derive(Debug, Clone)]
pub struct LedgerCore {
    vault: Address,
    seconds_per_year: u64,
    positions: HashMap<PositionId, Position>,
    loans: HashMap<LoanHash, LoanUsage>,
    /// Complete audit trail of every state transition.
    events: Vec<EventRecord>,
}

impl Default for LedgerCore {
    fn default() -> Self {
        Self::new(&LedgerConfig::default())
    }
}

impl LedgerCore {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            vault: config.vault(),
            seconds_per_year: config.seconds_per_year,
            positions: HashMap::new(),
            loans: HashMap::new(),
            events: Vec::new(),
        }
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Address custodying collateral. Payers, traders and closers approve it.
    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn contains_position(&self, id: &PositionId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn is_called(&self, id: &PositionId) -> bool {
        self.positions.get(id).is_some_and(Position::is_called)
    }

    pub fn is_closed(&self, id: &PositionId) -> bool {
        self.positions.get(id).is_some_and(|p| p.closed)
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn loan_usage(&self, hash: &LoanHash) -> LoanUsage {
        self.loans.get(hash).copied().unwrap_or_default()
    }

    /// Principal the offering can still fund.
    pub fn remaining_amount(&self, offering: &LoanOffering) -> u128 {
        self.remaining_for(&offering.loan_hash(), offering)
    }

    /// Owed asset needed at `now` to close `close_amount` of principal.
    pub fn owed_amount(
        &self,
        id: &PositionId,
        close_amount: u128,
        now: u64,
    ) -> Result<u128, LedgerError> {
        let position = self.get(id)?;
        let amount = close_amount.min(position.principal);
        let interest = self.interest_on(position, amount, now)?;
        amount
            .checked_add(interest)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// The account that ultimately holds the position, following contract
    /// owners until one names itself or a plain account.
    pub fn position_deed_holder(
        &self,
        owners: &dyn OwnerDirectory,
        id: &PositionId,
    ) -> Result<Address, LedgerError> {
        let mut holder = self.get(id)?.owner;
        let mut seen = Vec::new();
        while let Some(contract) = owners.owner(&holder) {
            seen.push(holder);
            let next = contract.position_deed_holder(id)?;
            if seen.contains(&next) {
                break;
            }
            holder = next;
        }
        Ok(holder)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn get(&self, id: &PositionId) -> Result<&Position, LedgerError> {
        self.positions.get(id).ok_or(LedgerError::UnknownPosition)
    }

    fn get_mut(&mut self, id: &PositionId) -> Result<&mut Position, LedgerError> {
        self.positions.get_mut(id).ok_or(LedgerError::UnknownPosition)
    }

    fn interest_on(&self, position: &Position, amount: u128, now: u64) -> Result<u128, LedgerError> {
        Ok(interest_owed(
            amount,
            position.interest_rate,
            position.interest_period,
            position.age(now),
            self.seconds_per_year,
        )?)
    }

    fn record(&mut self, timestamp: u64, event: LedgerEvent) {
        self.events.push(EventRecord { timestamp, event });
    }

    fn remaining_for(&self, hash: &LoanHash, offering: &LoanOffering) -> u128 {
        let usage = self.loan_usage(hash);
        offering
            .rates
            .max_amount
            .saturating_sub(usage.filled)
            .saturating_sub(usage.cancelled)
    }

    fn add_fill(&mut self, hash: LoanHash, amount: u128) {
        let usage = self.loans.entry(hash).or_default();
        usage.filled = usage.filled.saturating_add(amount);
    }

    /// Tell a contract owner its position reached a terminal state.
    fn notify_closed(&self, owners: &mut dyn OwnerDirectory, id: &PositionId) {
        if let Some(position) = self.positions.get(id) {
            if let Some(contract) = owners.owner_mut(&position.owner) {
                contract.position_closed(position);
            }
        }
    }
}
