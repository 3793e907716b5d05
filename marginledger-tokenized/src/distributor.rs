//! Pro-rata payout of a closed position's recovered collateral.
//!
//! Each holder gets `floor(shares * pool / supply)` against the pool and
//! supply at the moment they withdraw. Paying out shrinks both, so later
//! holders are priced against what is actually left and the sum of all
//! payouts never exceeds the pool. Floor dust carries forward, and whoever
//! redeems the last shares collects what is left.

use marginledger_core::math::{partial_amount, MathError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalDistributor {
    pool: u128,
    supply: u128,
}

impl WithdrawalDistributor {
    pub fn new(pool: u128, supply: u128) -> Self {
        Self { pool, supply }
    }

    pub fn pool(&self) -> u128 {
        self.pool
    }

    pub fn supply(&self) -> u128 {
        self.supply
    }

    /// What `shares` are worth right now.
    pub fn entitlement(&self, shares: u128) -> Result<u128, MathError> {
        if shares == 0 || self.supply == 0 {
            return Ok(0);
        }
        partial_amount(shares.min(self.supply), self.supply, self.pool)
    }

    /// Redeem `shares`: returns the payout and removes both from the pool.
    pub fn redeem(&mut self, shares: u128) -> Result<u128, MathError> {
        let payout = self.entitlement(shares)?;
        self.pool -= payout;
        self.supply -= shares.min(self.supply);
        Ok(payout)
    }
}
