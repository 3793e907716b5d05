use super::ids::{Address, AssetId, LoanHash, PositionId};
use serde::{Deserialize, Serialize};

/// An outstanding margin call on a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginCall {
    pub called_at: u64,
    /// Collateral top-up that cancels the call when deposited in one go.
    pub required_deposit: u128,
}

/// A leveraged position: borrowed owed-asset principal backed by held-asset collateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owed_token: AssetId,
    pub held_token: AssetId,
    /// Current owner; may be a contract such as a tokenized position.
    pub owner: Address,
    /// Lender of record: receives repayments, may margin-call and force-recover.
    pub lender: Address,
    pub principal: u128,
    /// Held-asset collateral backing the position.
    pub balance: u128,
    pub loan_hash: LoanHash,
    pub interest_rate: u32,
    pub interest_period: u64,
    pub call_time_limit: u64,
    pub max_duration: u64,
    pub start_timestamp: u64,
    pub margin_call: Option<MarginCall>,
    pub closed: bool,
}

impl Position {
    pub fn is_called(&self) -> bool {
        self.margin_call.is_some()
    }

    /// Whether the lender may force-recover collateral at `now`.
    ///
    /// Either the call time limit has run out on an outstanding call, or the
    /// position has outlived its maximum duration.
    pub fn is_recoverable(&self, now: u64) -> bool {
        let call_expired = self
            .margin_call
            .is_some_and(|call| now >= call.called_at.saturating_add(self.call_time_limit));
        let matured = now >= self.start_timestamp.saturating_add(self.max_duration);
        call_expired || matured
    }

    /// Seconds elapsed since open, saturating at zero.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.start_timestamp)
    }
}
