//! Audit trail of ledger state transitions.

use crate::domain::{Address, LoanHash, PositionId};
use serde::{Deserialize, Serialize};

/// A state transition recorded by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    PositionOpened {
        id: PositionId,
        trader: Address,
        lender: Address,
        loan_hash: LoanHash,
        principal: u128,
        collateral: u128,
    },
    PositionIncreased {
        id: PositionId,
        trader: Address,
        loan_hash: LoanHash,
        added_principal: u128,
        added_collateral: u128,
    },
    PositionClosed {
        id: PositionId,
        closer: Address,
        payout_recipient: Address,
        closed_amount: u128,
        held_token_payout: u128,
        owed_repaid: u128,
        remaining_principal: u128,
    },
    MarginCallInitiated {
        id: PositionId,
        lender: Address,
        required_deposit: u128,
    },
    MarginCallCanceled {
        id: PositionId,
        lender: Address,
        deposit: u128,
    },
    CollateralDeposited {
        id: PositionId,
        depositor: Address,
        amount: u128,
    },
    CollateralForceRecovered {
        id: PositionId,
        recipient: Address,
        amount: u128,
    },
    PositionTransferred {
        id: PositionId,
        from: Address,
        to: Address,
    },
    LoanTransferred {
        id: PositionId,
        from: Address,
        to: Address,
    },
    LoanOfferingCanceled {
        loan_hash: LoanHash,
        payer: Address,
        cancelled: u128,
    },
}

impl LedgerEvent {
    /// The position this event concerns, if any.
    pub fn position_id(&self) -> Option<&PositionId> {
        match self {
            LedgerEvent::PositionOpened { id, .. }
            | LedgerEvent::PositionIncreased { id, .. }
            | LedgerEvent::PositionClosed { id, .. }
            | LedgerEvent::MarginCallInitiated { id, .. }
            | LedgerEvent::MarginCallCanceled { id, .. }
            | LedgerEvent::CollateralDeposited { id, .. }
            | LedgerEvent::CollateralForceRecovered { id, .. }
            | LedgerEvent::PositionTransferred { id, .. }
            | LedgerEvent::LoanTransferred { id, .. } => Some(id),
            LedgerEvent::LoanOfferingCanceled { .. } => None,
        }
    }
}

/// One audit-trail entry: an event and the ledger time it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: u64,
    pub event: LedgerEvent,
}
