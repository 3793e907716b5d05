//! Sell-order executor: liquidates released collateral for the owed asset.
//!
//! The matching venue is opaque to the ledger: it hands over an order and an
//! amount and gets proceeds back, or `OrderUnfillable`. Executors must check
//! everything before moving tokens so a failure leaves balances untouched.

use super::token::{TokenError, TokenLedger};
use crate::domain::{Address, AssetId};
use crate::math::{partial_amount, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("order unfillable: {0}")]
    OrderUnfillable(String),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

/// Sell `sell_asset` for at least `min_proceeds` of `buy_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellOrder {
    pub sell_asset: AssetId,
    pub buy_asset: AssetId,
    pub min_proceeds: u128,
}

pub trait SellOrderExecutor {
    /// Sell `amount` of `order.sell_asset` held by `seller`; proceeds are
    /// credited to `seller` and returned.
    fn execute(
        &mut self,
        tokens: &mut dyn TokenLedger,
        seller: &Address,
        order: &SellOrder,
        amount: u128,
    ) -> Result<u128, ExecutorError>;
}

/// A market maker quoting a fixed exchange rate out of its own inventory.
#[derive(Debug, Clone)]
pub struct FixedRateExecutor {
    pub maker: Address,
    /// Units of buy asset paid per `rate_denominator` units sold.
    pub rate_numerator: u128,
    pub rate_denominator: u128,
}

impl FixedRateExecutor {
    pub fn new(maker: Address, rate_numerator: u128, rate_denominator: u128) -> Self {
        Self {
            maker,
            rate_numerator,
            rate_denominator,
        }
    }

    pub fn quote(&self, amount: u128) -> Result<u128, ExecutorError> {
        Ok(partial_amount(amount, self.rate_denominator, self.rate_numerator)?)
    }
}

impl SellOrderExecutor for FixedRateExecutor {
    fn execute(
        &mut self,
        tokens: &mut dyn TokenLedger,
        seller: &Address,
        order: &SellOrder,
        amount: u128,
    ) -> Result<u128, ExecutorError> {
        let proceeds = self.quote(amount)?;
        if proceeds < order.min_proceeds {
            return Err(ExecutorError::OrderUnfillable(format!(
                "quote {} below minimum {}",
                proceeds, order.min_proceeds
            )));
        }
        let inventory = tokens.balance_of(&order.buy_asset, &self.maker);
        if inventory < proceeds {
            return Err(ExecutorError::OrderUnfillable(format!(
                "maker inventory {} below proceeds {}",
                inventory, proceeds
            )));
        }
        let held = tokens.balance_of(&order.sell_asset, seller);
        if held < amount {
            return Err(TokenError::InsufficientBalance {
                holder: *seller,
                needed: amount,
                available: held,
            }
            .into());
        }

        tokens.transfer(&order.sell_asset, seller, &self.maker, amount)?;
        tokens.transfer(&order.buy_asset, &self.maker, seller, proceeds)?;
        Ok(proceeds)
    }
}
