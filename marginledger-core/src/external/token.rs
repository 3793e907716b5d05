//! Fungible token ledger, the balance/transfer/allowance collaborator.
//!
//! The margin ledger only ever talks to `dyn TokenLedger`. `InMemoryTokenLedger`
//! is the reference implementation used by tests and benchmarks; `BalanceSheet`
//! is the single-asset bookkeeping it is built from (tokenized positions reuse
//! it for their share ledger).

use crate::domain::{Address, AssetId};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from token ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),

    #[error("{holder} holds {available}, needs {needed}")]
    InsufficientBalance {
        holder: Address,
        needed: u128,
        available: u128,
    },

    #[error("{spender} may move {available} for {owner}, needs {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        needed: u128,
        available: u128,
    },

    #[error("transfer to the zero address")]
    ZeroAddress,

    #[error("supply overflow")]
    Overflow,
}

/// Balances, allowances and supply of a single fungible asset.
#[derive(Debug, Clone, Default)]
pub struct BalanceSheet {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Holders with a non-zero balance, in no particular order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter().filter(|(_, amount)| **amount > 0)
    }

    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.total_supply = supply;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    pub fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.debit(from, amount)?;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) {
        self.allowances.insert((*owner, *spender), amount);
    }

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    ///
    /// Balance and allowance are both checked before anything changes.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *spender,
                needed: amount,
                available: allowed,
            });
        }
        self.ensure_balance(from, amount)?;
        self.transfer(from, to, amount)?;
        self.allowances.insert((*from, *spender), allowed - amount);
        Ok(())
    }

    pub fn ensure_balance(&self, holder: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(holder);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *holder,
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.ensure_balance(from, amount)?;
        if amount > 0 {
            if let Some(balance) = self.balances.get_mut(from) {
                *balance -= amount;
            }
        }
        Ok(())
    }
}

/// Standard fungible-token operations over many assets.
///
/// Implementations must be exact (no transfer fees) and must leave state
/// untouched when they return an error.
pub trait TokenLedger {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> u128;

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> u128;

    fn decimals(&self, asset: &AssetId) -> Result<u8, TokenError>;

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError>;

    fn approve(&mut self, asset: &AssetId, owner: &Address, spender: &Address, amount: u128);

    /// Whether `spender` could move `amount` of `from`'s `asset` right now.
    fn ensure_pullable(
        &self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *from,
                needed: amount,
                available,
            });
        }
        let allowed = self.allowance(asset, from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: *from,
                spender: *spender,
                needed: amount,
                available: allowed,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct AssetBook {
    decimals: u8,
    sheet: BalanceSheet,
}

/// In-memory multi-asset token ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenLedger {
    assets: HashMap<AssetId, AssetBook>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. Re-registering keeps existing balances.
    pub fn register_asset(&mut self, asset: AssetId, decimals: u8) {
        self.assets
            .entry(asset)
            .and_modify(|book| book.decimals = decimals)
            .or_insert(AssetBook {
                decimals,
                sheet: BalanceSheet::new(),
            });
    }

    /// Issue new units of `asset` to `to`.
    pub fn issue(&mut self, asset: &AssetId, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.book_mut(asset)?.sheet.mint(to, amount)
    }

    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        self.assets
            .get(asset)
            .map(|book| book.sheet.total_supply())
            .unwrap_or(0)
    }

    fn book_mut(&mut self, asset: &AssetId) -> Result<&mut AssetBook, TokenError> {
        self.assets
            .get_mut(asset)
            .ok_or_else(|| TokenError::UnknownAsset(asset.clone()))
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> u128 {
        self.assets
            .get(asset)
            .map(|book| book.sheet.balance_of(holder))
            .unwrap_or(0)
    }

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> u128 {
        self.assets
            .get(asset)
            .map(|book| book.sheet.allowance(owner, spender))
            .unwrap_or(0)
    }

    fn decimals(&self, asset: &AssetId) -> Result<u8, TokenError> {
        self.assets
            .get(asset)
            .map(|book| book.decimals)
            .ok_or_else(|| TokenError::UnknownAsset(asset.clone()))
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.book_mut(asset)?.sheet.transfer(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.book_mut(asset)?
            .sheet
            .transfer_from(spender, from, to, amount)
    }

    fn approve(&mut self, asset: &AssetId, owner: &Address, spender: &Address, amount: u128) {
        if let Ok(book) = self.book_mut(asset) {
            book.sheet.approve(owner, spender, amount);
        }
    }
}
