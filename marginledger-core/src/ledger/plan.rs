//! Token movements of one ledger operation, checked as a batch before any run.

use super::error::LedgerError;
use crate::domain::{Address, AssetId};
use crate::external::{TokenError, TokenLedger};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Leg {
    asset: AssetId,
    from: Address,
    to: Address,
    amount: u128,
    /// Moved with the vault's allowance rather than out of the vault itself.
    pulled: bool,
}

/// Ordered transfers through the ledger vault.
#[derive(Debug, Clone)]
pub(crate) struct TransferPlan {
    vault: Address,
    legs: Vec<Leg>,
}

impl TransferPlan {
    pub fn new(vault: Address) -> Self {
        Self {
            vault,
            legs: Vec::new(),
        }
    }

    /// Move `from`'s tokens to `to` using the allowance `from` gave the vault.
    pub fn pull(&mut self, asset: &AssetId, from: Address, to: Address, amount: u128) {
        self.push(asset, from, to, amount, true);
    }

    /// Pay `to` out of the vault's own balance.
    pub fn release(&mut self, asset: &AssetId, to: Address, amount: u128) {
        let vault = self.vault;
        self.push(asset, vault, to, amount, false);
    }

    fn push(&mut self, asset: &AssetId, from: Address, to: Address, amount: u128, pulled: bool) {
        if amount == 0 {
            return;
        }
        self.legs.push(Leg {
            asset: asset.clone(),
            from,
            to,
            amount,
            pulled,
        });
    }

    /// Verify every leg can run, summing legs that draw on the same source.
    ///
    /// Checks against current balances only, so a leg can never be funded by
    /// an earlier leg of the same plan.
    pub fn check(&self, tokens: &dyn TokenLedger) -> Result<(), LedgerError> {
        let mut needs: BTreeMap<(&AssetId, Address, bool), u128> = BTreeMap::new();
        for leg in &self.legs {
            if leg.to.is_zero() {
                return Err(TokenError::ZeroAddress.into());
            }
            let need = needs.entry((&leg.asset, leg.from, leg.pulled)).or_insert(0);
            *need = need
                .checked_add(leg.amount)
                .ok_or(LedgerError::ArithmeticOverflow)?;
        }

        for ((asset, from, pulled), amount) in needs {
            if pulled {
                tokens
                    .ensure_pullable(asset, &self.vault, &from, amount)
                    .map_err(LedgerError::InsufficientFunds)?;
            } else {
                let available = tokens.balance_of(asset, &from);
                if available < amount {
                    return Err(LedgerError::InsufficientFunds(TokenError::InsufficientBalance {
                        holder: from,
                        needed: amount,
                        available,
                    }));
                }
            }
        }
        Ok(())
    }

    /// Run every leg in order. Call [`TransferPlan::check`] first.
    pub fn execute(self, tokens: &mut dyn TokenLedger) -> Result<(), LedgerError> {
        for leg in self.legs {
            if leg.pulled {
                tokens.transfer_from(&leg.asset, &self.vault, &leg.from, &leg.to, leg.amount)?;
            } else {
                tokens.transfer(&leg.asset, &leg.from, &leg.to, leg.amount)?;
            }
        }
        Ok(())
    }
}
